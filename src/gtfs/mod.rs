//! Static GTFS schedule data cached on disk.
//!
//! [`GtfsStatic::load`] reads the small tables (stops, routes, trips and the
//! service calendar) into memory. `stop_times.txt` is typically the largest
//! file in the feed, so it is scanned per query instead of being held.

pub mod calendar;
pub mod refresh;
pub mod time;
pub mod types;

pub use calendar::ServiceCalendar;
pub use time::GtfsTime;
pub use types::{CalendarDateRow, CalendarRow, Route, RouteKind, Stop, StopTime, Trip};

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// The table whose presence marks an installed feed.
pub const MARKER_FILE: &str = "stops.txt";

pub struct GtfsStatic {
    dir: PathBuf,
    stops: HashMap<String, Stop>,
    routes: HashMap<String, Route>,
    /// File order is kept so "first trip of a route" is deterministic.
    trips: Vec<Trip>,
    trip_index: HashMap<String, usize>,
    calendar: ServiceCalendar,
}

impl GtfsStatic {
    pub fn is_installed(dir: &Path) -> bool {
        dir.join(MARKER_FILE).is_file()
    }

    #[tracing::instrument(skip(dir), fields(dir = %dir.display()))]
    pub fn load(dir: &Path) -> Result<Self> {
        if !Self::is_installed(dir) {
            bail!(
                "GTFS static data not found at {}; run `capmetro refresh-gtfs` first",
                dir.display()
            );
        }

        let stops: Vec<Stop> = read_table(dir, "stops.txt")?;
        let routes: Vec<Route> = read_table(dir, "routes.txt")?;
        let trips: Vec<Trip> = read_table(dir, "trips.txt")?;
        let calendar = ServiceCalendar::new(
            read_table(dir, "calendar.txt")?,
            read_table(dir, "calendar_dates.txt")?,
        );

        debug!(
            stops = stops.len(),
            routes = routes.len(),
            trips = trips.len(),
            "Loaded GTFS static tables"
        );

        let trip_index = trips
            .iter()
            .enumerate()
            .map(|(i, t)| (t.trip_id.clone(), i))
            .collect();

        Ok(Self {
            dir: dir.to_path_buf(),
            stops: stops.into_iter().map(|s| (s.stop_id.clone(), s)).collect(),
            routes: routes.into_iter().map(|r| (r.route_id.clone(), r)).collect(),
            trips,
            trip_index,
            calendar,
        })
    }

    /// Loads the feed if it is installed; `Ok(None)` otherwise.
    pub fn load_if_installed(dir: &Path) -> Result<Option<Self>> {
        if Self::is_installed(dir) {
            Self::load(dir).map(Some)
        } else {
            warn!(dir = %dir.display(), "GTFS static data not installed; showing raw ids");
            Ok(None)
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stop(&self, stop_id: &str) -> Option<&Stop> {
        self.stops.get(stop_id)
    }

    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.values()
    }

    pub fn route(&self, route_id: &str) -> Option<&Route> {
        self.routes.get(route_id)
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    pub fn trip(&self, trip_id: &str) -> Option<&Trip> {
        self.trip_index.get(trip_id).map(|&i| &self.trips[i])
    }

    /// Trips of a route in file order.
    pub fn trips_for_route<'a>(&'a self, route_id: &'a str) -> impl Iterator<Item = &'a Trip> {
        self.trips.iter().filter(move |t| t.route_id == route_id)
    }

    pub fn calendar(&self) -> &ServiceCalendar {
        &self.calendar
    }

    /// Display name for a route id, the id itself when unknown.
    pub fn route_short_name<'a>(&'a self, route_id: &'a str) -> &'a str {
        self.route(route_id).map_or(route_id, Route::short_name)
    }

    pub fn route_long_name(&self, route_id: &str) -> &str {
        self.route(route_id).map_or("", Route::long_name)
    }

    /// Every `stop_times.txt` row serving `stop_id`, in file order.
    #[tracing::instrument(skip(self))]
    pub fn stop_times_for_stop(&self, stop_id: &str) -> Result<Vec<StopTime>> {
        scan_table(&self.dir, "stop_times.txt", |st: &StopTime| st.stop_id == stop_id)
    }

    /// The stop sequence of one trip, ordered by `stop_sequence`.
    #[tracing::instrument(skip(self))]
    pub fn stop_times_for_trip(&self, trip_id: &str) -> Result<Vec<StopTime>> {
        let mut rows = scan_table(&self.dir, "stop_times.txt", |st: &StopTime| {
            st.trip_id == trip_id
        })?;
        rows.sort_by_key(|st| st.stop_sequence);
        Ok(rows)
    }

    /// Time since the feed was last extracted.
    pub fn age(&self) -> Option<std::time::Duration> {
        let modified = std::fs::metadata(self.dir.join(MARKER_FILE))
            .and_then(|m| m.modified())
            .ok()?;
        SystemTime::now().duration_since(modified).ok()
    }

    /// Logs a warning when the cache is older than `max_age`.
    pub fn warn_if_stale(&self, max_age: chrono::Duration) -> bool {
        let Some(age) = self.age() else {
            return false;
        };
        let stale = chrono::Duration::from_std(age).is_ok_and(|age| age > max_age);
        if stale {
            warn!(
                age_days = age.as_secs() / 86_400,
                "GTFS static data is out of date; run `capmetro refresh-gtfs`"
            );
        }
        stale
    }
}

fn open_table(dir: &Path, name: &str) -> Result<Option<csv::Reader<BufReader<File>>>> {
    let path = dir.join(name);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to open {}", path.display())),
    };

    let mut reader = BufReader::new(file);
    skip_bom(&mut reader)?;

    Ok(Some(
        csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader),
    ))
}

/// Consumes a leading UTF-8 byte-order mark, if any.
fn skip_bom<R: BufRead>(reader: &mut R) -> Result<()> {
    const BOM: &[u8] = b"\xEF\xBB\xBF";
    if reader.fill_buf()?.starts_with(BOM) {
        reader.consume(BOM.len());
    }
    Ok(())
}

/// Reads a whole table. A missing file is an empty table.
fn read_table<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<Vec<T>> {
    scan_table(dir, name, |_: &T| true)
}

/// Streams a table, keeping rows matching `keep`.
fn scan_table<T, F>(dir: &Path, name: &str, mut keep: F) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    F: FnMut(&T) -> bool,
{
    let Some(mut rdr) = open_table(dir, name)? else {
        debug!(table = name, "Optional GTFS table missing");
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        let row: T = result.with_context(|| format!("{name}: bad record {}", line + 1))?;
        if keep(&row) {
            rows.push(row);
        }
    }
    Ok(rows)
}
