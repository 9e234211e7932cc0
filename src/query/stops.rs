//! `stops --search` and `stops --near`.

use serde::Serialize;

use crate::geo::{Coordinate, haversine_miles};
use crate::gtfs::Stop;

pub const DEFAULT_RADIUS_MILES: f64 = 0.5;
pub const SEARCH_LIMIT: usize = 25;
pub const NEARBY_LIMIT: usize = 20;

#[derive(Debug, Serialize)]
pub struct StopSearch {
    pub query: String,
    /// Number of matches before truncation.
    pub total: usize,
    pub stops: Vec<Stop>,
}

/// Case-insensitive substring match on stop name and description, sorted by
/// name and truncated to [`SEARCH_LIMIT`].
pub fn search_stops<'a>(stops: impl IntoIterator<Item = &'a Stop>, query: &str) -> StopSearch {
    let needle = query.to_lowercase();
    let mut matches: Vec<&Stop> = stops
        .into_iter()
        .filter(|s| {
            s.stop_name.to_lowercase().contains(&needle)
                || s.stop_desc
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
        .collect();
    matches.sort_by(|a, b| a.stop_name.cmp(&b.stop_name).then_with(|| a.stop_id.cmp(&b.stop_id)));

    StopSearch {
        query: query.to_string(),
        total: matches.len(),
        stops: matches.into_iter().take(SEARCH_LIMIT).cloned().collect(),
    }
}

#[derive(Debug, Serialize)]
pub struct NearbyStop {
    pub stop: Stop,
    pub distance_miles: f64,
}

#[derive(Debug, Serialize)]
pub struct NearbyStops {
    pub center: Coordinate,
    pub radius_miles: f64,
    pub total: usize,
    pub stops: Vec<NearbyStop>,
}

/// Stops within `radius_miles` of `center`, nearest first, truncated to
/// [`NEARBY_LIMIT`]. Stops without usable coordinates are skipped.
pub fn nearby_stops<'a>(
    stops: impl IntoIterator<Item = &'a Stop>,
    center: Coordinate,
    radius_miles: f64,
) -> NearbyStops {
    let mut nearby: Vec<(f64, &Stop)> = stops
        .into_iter()
        .filter_map(|s| Some((haversine_miles(center, s.coordinate()?), s)))
        .filter(|(d, _)| *d <= radius_miles)
        .collect();
    nearby.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.stop_id.cmp(&b.1.stop_id)));

    NearbyStops {
        center,
        radius_miles,
        total: nearby.len(),
        stops: nearby
            .into_iter()
            .take(NEARBY_LIMIT)
            .map(|(distance_miles, stop)| NearbyStop {
                stop: stop.clone(),
                distance_miles,
            })
            .collect(),
    }
}
