//! Runtime configuration sourced from the environment.
//!
//! Every setting has a default that points at the public CapMetro feeds on
//! the Texas Open Data Portal, so the tool runs with no configuration at all.

use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_VEHICLE_POSITIONS_URL: &str =
    "https://data.texas.gov/download/eiei-9rpf/application%2Foctet-stream";
pub const DEFAULT_TRIP_UPDATES_URL: &str =
    "https://data.texas.gov/download/rmk2-acnw/application%2Foctet-stream";
pub const DEFAULT_SERVICE_ALERTS_URL: &str =
    "https://data.texas.gov/download/nusn-7fcn/application%2Foctet-stream";
pub const DEFAULT_GTFS_URL: &str =
    "https://data.texas.gov/download/r4v4-vz24/application%2Fx-zip-compressed";

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Chicago;

/// Source URLs for the realtime feeds and the static schedule archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUrls {
    pub vehicle_positions: String,
    pub trip_updates: String,
    pub service_alerts: String,
    pub gtfs_static: String,
}

impl Default for FeedUrls {
    fn default() -> Self {
        Self {
            vehicle_positions: DEFAULT_VEHICLE_POSITIONS_URL.to_string(),
            trip_updates: DEFAULT_TRIP_UPDATES_URL.to_string(),
            service_alerts: DEFAULT_SERVICE_ALERTS_URL.to_string(),
            gtfs_static: DEFAULT_GTFS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub feeds: FeedUrls,
    /// Root of everything the tool writes: `gtfs/` cache and `logs/`.
    pub home: PathBuf,
    pub log_file: PathBuf,
    pub timezone: Tz,
    pub realtime_timeout: Duration,
    pub static_timeout: Duration,
    pub gtfs_max_age: chrono::Duration,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home = match var("CAPMETRO_HOME") {
            Some(dir) => PathBuf::from(dir),
            None => var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".capmetro"),
        };

        let log_file = var("LOG_FILE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| home.join("logs").join("capmetro.log"));

        let timezone = match var("CAPMETRO_TIMEZONE") {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow!("CAPMETRO_TIMEZONE: {e}"))?,
            None => DEFAULT_TIMEZONE,
        };

        let defaults = FeedUrls::default();
        let feeds = FeedUrls {
            vehicle_positions: var("CAPMETRO_VEHICLE_POSITIONS_URL")
                .unwrap_or(defaults.vehicle_positions),
            trip_updates: var("CAPMETRO_TRIP_UPDATES_URL").unwrap_or(defaults.trip_updates),
            service_alerts: var("CAPMETRO_SERVICE_ALERTS_URL").unwrap_or(defaults.service_alerts),
            gtfs_static: var("CAPMETRO_GTFS_URL").unwrap_or(defaults.gtfs_static),
        };

        let realtime_timeout = seconds(&var, "CAPMETRO_HTTP_TIMEOUT_SECS", 30)?;
        let static_timeout = seconds(&var, "CAPMETRO_GTFS_TIMEOUT_SECS", 120)?;

        let max_age_days: i64 = match var("CAPMETRO_GTFS_MAX_AGE_DAYS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| {
                    format!("CAPMETRO_GTFS_MAX_AGE_DAYS must be a whole number of days, got '{v}'")
                })?,
            None => 90,
        };

        Ok(Self {
            feeds,
            home,
            log_file,
            timezone,
            realtime_timeout,
            static_timeout,
            gtfs_max_age: chrono::Duration::days(max_age_days),
        })
    }

    /// Directory holding the extracted static GTFS tables.
    pub fn gtfs_dir(&self) -> PathBuf {
        self.home.join("gtfs")
    }
}

fn seconds<F>(var: &F, name: &str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(v) => {
            let secs: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("{name} must be a whole number of seconds, got '{v}'"))?;
            Ok(Duration::from_secs(secs))
        }
        None => Ok(Duration::from_secs(default)),
    }
}
