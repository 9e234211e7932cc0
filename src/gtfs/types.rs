//! Rows of the static GTFS tables this tool reads.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::time::GtfsTime;
use crate::geo::Coordinate;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Stop {
    pub stop_id: String,
    #[serde(default)]
    pub stop_name: String,
    #[serde(default)]
    pub stop_desc: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub stop_lat: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub stop_lon: Option<f64>,
}

impl Stop {
    /// `None` when either coordinate is missing or unparseable.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate::new(self.stop_lat?, self.stop_lon?))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Route {
    pub route_id: String,
    #[serde(default)]
    pub route_short_name: Option<String>,
    #[serde(default)]
    pub route_long_name: Option<String>,
    /// Raw `route_type` cell; `None` only when the column is absent.
    #[serde(default, deserialize_with = "present_field")]
    pub route_type: Option<String>,
    #[serde(default)]
    pub route_url: Option<String>,
}

impl Route {
    /// Short name, or the route id when the feed leaves it blank.
    pub fn short_name(&self) -> &str {
        non_blank(&self.route_short_name).unwrap_or(&self.route_id)
    }

    pub fn long_name(&self) -> &str {
        non_blank(&self.route_long_name).unwrap_or("")
    }

    /// A missing `route_type` column means bus; a blank or unknown code is
    /// `Other`.
    pub fn kind(&self) -> RouteKind {
        match self.route_type.as_deref().map(str::trim) {
            None => RouteKind::Bus,
            Some(code) => code.parse().map_or(RouteKind::Other, RouteKind::from_code),
        }
    }
}

/// Human-facing name for the GTFS `route_type` codes this agency runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteKind {
    Tram,
    Subway,
    Rail,
    Bus,
    Ferry,
    Other,
}

impl RouteKind {
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => RouteKind::Tram,
            1 => RouteKind::Subway,
            2 => RouteKind::Rail,
            3 => RouteKind::Bus,
            4 => RouteKind::Ferry,
            _ => RouteKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Tram => "Tram",
            RouteKind::Subway => "Subway",
            RouteKind::Rail => "Rail",
            RouteKind::Bus => "Bus",
            RouteKind::Ferry => "Ferry",
            RouteKind::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Trip {
    pub route_id: String,
    #[serde(default)]
    pub service_id: String,
    pub trip_id: String,
    #[serde(default)]
    pub trip_headsign: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub direction_id: Option<u8>,
}

impl Trip {
    pub fn headsign(&self) -> Option<&str> {
        non_blank(&self.trip_headsign)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StopTime {
    pub trip_id: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub arrival_time: Option<GtfsTime>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub departure_time: Option<GtfsTime>,
    pub stop_id: String,
    #[serde(default)]
    pub stop_sequence: u32,
}

impl StopTime {
    /// Arrival time, falling back to departure time.
    pub fn time(&self) -> Option<GtfsTime> {
        self.arrival_time.or(self.departure_time)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CalendarRow {
    pub service_id: String,
    pub monday: u8,
    pub tuesday: u8,
    pub wednesday: u8,
    pub thursday: u8,
    pub friday: u8,
    pub saturday: u8,
    pub sunday: u8,
    #[serde(deserialize_with = "gtfs_date")]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "gtfs_date")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CalendarDateRow {
    pub service_id: String,
    #[serde(deserialize_with = "gtfs_date")]
    pub date: NaiveDate,
    pub exception_type: u8,
}

/// Parses GTFS `YYYYMMDD` dates.
fn gtfs_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(raw.trim(), "%Y%m%d").map_err(serde::de::Error::custom)
}

/// Keeps empty cells as `Some("")`, unlike the `Option` default.
fn present_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(Some)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
