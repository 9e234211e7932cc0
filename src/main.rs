//! CLI entry point for the CapMetro transit tool.
//!
//! Realtime commands read the agency's GTFS-RT feeds on demand; schedule
//! commands read the static GTFS tables cached locally by `refresh-gtfs`.

use anyhow::{Context, Result, bail};
use capmetro::{
    config::Config,
    fetch::{BasicClient, load_source},
    geo::Coordinate,
    gtfs::{GtfsStatic, refresh::refresh_gtfs},
    gtfs_rt::FeedMessage,
    output,
    parser::parse_feed,
    query::{alerts, arrivals, routes, stops, vehicles},
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "capmetro")]
#[command(about = "Austin CapMetro alerts, vehicles, arrivals and schedules", long_about = None)]
struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show active service alerts
    Alerts {
        /// Only alerts affecting this route (id or short name)
        #[arg(short, long)]
        route: Option<String>,

        /// Read the alerts feed from a file or URL instead
        #[arg(long, value_name = "FILE_OR_URL")]
        source: Option<String>,
    },
    /// Show in-service vehicle positions grouped by route
    Vehicles {
        /// Only vehicles on this route (id or short name)
        #[arg(short, long)]
        route: Option<String>,

        /// Read the vehicle positions feed from a file or URL instead
        #[arg(long, value_name = "FILE_OR_URL")]
        source: Option<String>,
    },
    /// Show the next arrivals at a stop
    Arrivals {
        /// Stop id (see `stops --search`)
        #[arg(short, long)]
        stop: String,

        /// Only arrivals on this route (id or short name)
        #[arg(short, long)]
        route: Option<String>,

        /// Read the trip updates feed from a file or URL instead
        #[arg(long, value_name = "FILE_OR_URL")]
        source: Option<String>,
    },
    /// Search stops by name or find stops near a location
    Stops {
        /// Case-insensitive text to look for in stop names and descriptions
        #[arg(short, long, conflicts_with = "near")]
        search: Option<String>,

        /// Center point as LAT,LON
        #[arg(short, long, value_name = "LAT,LON", allow_hyphen_values = true)]
        near: Option<Coordinate>,

        /// Search radius in miles for --near
        #[arg(long, default_value_t = stops::DEFAULT_RADIUS_MILES)]
        radius: f64,
    },
    /// List every route
    Routes,
    /// Show a route and the stops it serves
    RouteInfo {
        /// Route id or short name
        #[arg(short, long)]
        route: String,
    },
    /// Download and install the static GTFS schedule
    RefreshGtfs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _file_guard = init_logging(&config.log_file);
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Alerts { route, source } => {
            let client = BasicClient::new(config.realtime_timeout)?;
            let source = source.unwrap_or_else(|| config.feeds.service_alerts.clone());
            let feed = realtime_feed(&client, &source).await?;
            let gtfs = optional_static(&config)?;

            let summaries =
                alerts::summarize_alerts(&feed, gtfs.as_ref(), route.as_deref(), config.timezone);
            info!(count = summaries.len(), "Summarized service alerts");
            emit(&mut out, cli.json, summaries.as_slice(), output::render_alerts)?;
        }
        Commands::Vehicles { route, source } => {
            let client = BasicClient::new(config.realtime_timeout)?;
            let source = source.unwrap_or_else(|| config.feeds.vehicle_positions.clone());
            let feed = realtime_feed(&client, &source).await?;
            let gtfs = optional_static(&config)?;

            let groups =
                vehicles::active_vehicles(&feed, gtfs.as_ref(), route.as_deref(), config.timezone);
            info!(
                routes = groups.len(),
                vehicles = vehicles::RouteVehicles::count(&groups),
                "Collected active vehicles"
            );
            if cli.json {
                output::print_json(&mut out, &groups)?;
            } else {
                output::render_vehicles(&mut out, &groups, route.as_deref())?;
            }
        }
        Commands::Arrivals { stop, route, source } => {
            let gtfs = required_static(&config)?;
            arrivals::require_stop(&gtfs, &stop)?;

            let client = BasicClient::new(config.realtime_timeout)?;
            let source = source.unwrap_or_else(|| config.feeds.trip_updates.clone());
            let feed = match realtime_feed(&client, &source).await {
                Ok(feed) => Some(feed),
                Err(e) => {
                    warn!(error = %e, "Real-time trip updates unavailable; using the schedule");
                    None
                }
            };

            let now = Utc::now().with_timezone(&config.timezone);
            let board =
                arrivals::arrival_board(&gtfs, feed.as_ref(), &stop, route.as_deref(), now)?;
            emit(&mut out, cli.json, &board, output::render_arrivals)?;
        }
        Commands::Stops {
            search,
            near,
            radius,
        } => {
            if radius <= 0.0 {
                bail!("--radius must be a positive number of miles");
            }
            let gtfs = required_static(&config)?;

            match (search, near) {
                (Some(query), _) => {
                    let found = stops::search_stops(gtfs.stops(), &query);
                    emit(&mut out, cli.json, &found, output::render_stop_search)?;
                }
                (None, Some(center)) => {
                    let nearby = stops::nearby_stops(gtfs.stops(), center, radius);
                    emit(&mut out, cli.json, &nearby, output::render_nearby)?;
                }
                (None, None) => bail!(
                    "specify --search <TEXT> or --near <LAT,LON> (e.g. --near 30.267,-97.743)"
                ),
            }
        }
        Commands::Routes => {
            let gtfs = required_static(&config)?;
            let list = routes::list_routes(&gtfs);
            emit(&mut out, cli.json, list.as_slice(), output::render_routes)?;
        }
        Commands::RouteInfo { route } => {
            let gtfs = required_static(&config)?;
            let info = routes::route_info(&gtfs, &route)?;
            emit(&mut out, cli.json, &info, output::render_route_info)?;
        }
        Commands::RefreshGtfs => {
            let client = BasicClient::new(config.static_timeout)?;
            let dir = config.gtfs_dir();
            if !cli.json {
                writeln!(out, "Downloading GTFS static data to {} ...", dir.display())?;
            }

            let summary = refresh_gtfs(&client, &config.feeds.gtfs_static, &dir).await?;
            info!(files = summary.files.len(), bytes = summary.bytes, "GTFS static data refreshed");
            emit(&mut out, cli.json, &summary, output::render_refresh)?;
        }
    }

    out.flush()?;
    Ok(())
}

/// Colored stderr plus a JSON rolling log file. The returned guard must stay
/// alive for the file writer to flush. When the log directory cannot be
/// created only the stderr layer is installed.
fn init_logging(log_file_path: &Path) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "warn"));

    let (json_layer, file_guard, file_error) = match open_log_file(log_file_path) {
        Ok(appender) => {
            let (non_blocking_file, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(non_blocking_file)
                .with_filter(env_filter("RUST_LOG_JSON", "debug"));
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    if let Some(e) = file_error {
        warn!(error = %e, path = %log_file_path.display(), "File logging disabled");
    }
    file_guard
}

/// Daily-rotated appender for `log_file_path`, creating its directory.
fn open_log_file(log_file_path: &Path) -> Result<RollingFileAppender, InitError> {
    let log_dir = log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let log_file_name = log_file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("capmetro.log");

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(log_file_name)
        .build(log_dir)
}

fn env_filter(var: &str, default: &str) -> EnvFilter {
    EnvFilter::try_from_env(var).unwrap_or_else(|_| EnvFilter::new(default))
}

async fn realtime_feed(client: &BasicClient, source: &str) -> Result<FeedMessage> {
    let bytes = load_source(client, source).await?;
    parse_feed(&bytes).with_context(|| format!("invalid GTFS-realtime data from {source}"))
}

/// Loads the cached static tables, failing with a refresh hint when absent.
fn required_static(config: &Config) -> Result<GtfsStatic> {
    let gtfs = GtfsStatic::load(&config.gtfs_dir())?;
    debug!(dir = %gtfs.dir().display(), "Loaded static GTFS data");
    gtfs.warn_if_stale(config.gtfs_max_age);
    Ok(gtfs)
}

/// Realtime commands only use the static tables for names, so a missing
/// cache degrades the output to raw ids.
fn optional_static(config: &Config) -> Result<Option<GtfsStatic>> {
    let gtfs = GtfsStatic::load_if_installed(&config.gtfs_dir())?;
    if let Some(gtfs) = &gtfs {
        gtfs.warn_if_stale(config.gtfs_max_age);
    }
    Ok(gtfs)
}

fn emit<W, T, F>(out: &mut W, json: bool, value: &T, render: F) -> Result<()>
where
    W: Write,
    T: Serialize + ?Sized,
    F: FnOnce(&mut W, &T) -> Result<()>,
{
    if json {
        output::print_json(out, value)
    } else {
        render(out, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_help_parses_without_config() {
        let err = Cli::try_parse_from(["capmetro", "--help"]).err().unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);

        let args = ["capmetro", "--json", "route-info", "--route", "Red"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::RouteInfo { ref route } if route == "Red"));
    }

    #[test]
    fn test_unwritable_log_dir_is_an_error() {
        let root = env::temp_dir().join("capmetro_test_log_blocked");
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(&root).unwrap();
        // A regular file where the log directory should be
        let blocker = root.join("logs");
        fs::write(&blocker, "").unwrap();

        assert!(open_log_file(&blocker.join("capmetro.log")).is_err());
        assert!(open_log_file(&root.join("ok").join("capmetro.log")).is_ok());

        fs::remove_dir_all(&root).unwrap();
    }
}
