//! `routes` and `route-info`.

use anyhow::{Result, bail};
use serde::Serialize;

use super::route_sort_key;
use crate::gtfs::{GtfsStatic, Route, RouteKind};

#[derive(Debug, Serialize)]
pub struct RouteSummary {
    pub route_id: String,
    pub short_name: String,
    pub long_name: String,
    pub kind: RouteKind,
}

/// Every route, ordered by zero-padded route id.
pub fn list_routes(gtfs: &GtfsStatic) -> Vec<RouteSummary> {
    let mut routes: Vec<&Route> = gtfs.routes().collect();
    routes.sort_by_key(|r| route_sort_key(&r.route_id));

    routes
        .into_iter()
        .map(|r| RouteSummary {
            route_id: r.route_id.clone(),
            short_name: r.short_name().to_string(),
            long_name: r.long_name().to_string(),
            kind: r.kind(),
        })
        .collect()
}

/// Finds a route by id, then by short name.
pub fn resolve_route<'a>(gtfs: &'a GtfsStatic, query: &str) -> Option<&'a Route> {
    gtfs.route(query).or_else(|| {
        let mut by_name: Vec<&Route> = gtfs
            .routes()
            .filter(|r| r.route_short_name.as_deref() == Some(query))
            .collect();
        by_name.sort_by_key(|r| route_sort_key(&r.route_id));
        by_name.into_iter().next()
    })
}

#[derive(Debug, Serialize)]
pub struct RouteStop {
    pub stop_sequence: u32,
    pub stop_id: String,
    pub stop_name: String,
}

#[derive(Debug, Serialize)]
pub struct RouteInfo {
    pub route: Route,
    pub kind: RouteKind,
    /// Trip whose stop pattern is listed, `None` when the route has no trips.
    pub sample_trip_id: Option<String>,
    pub headsign: Option<String>,
    pub stops: Vec<RouteStop>,
}

/// Route details plus the stop pattern of a representative trip: the first
/// trip in direction 0, or the first trip at all.
pub fn route_info(gtfs: &GtfsStatic, query: &str) -> Result<RouteInfo> {
    let Some(route) = resolve_route(gtfs, query) else {
        bail!("route '{query}' not found; use `capmetro routes` to list routes");
    };

    let sample = gtfs
        .trips_for_route(&route.route_id)
        .find(|t| t.direction_id == Some(0))
        .or_else(|| gtfs.trips_for_route(&route.route_id).next());

    let mut info = RouteInfo {
        route: route.clone(),
        kind: route.kind(),
        sample_trip_id: None,
        headsign: None,
        stops: Vec::new(),
    };

    let Some(trip) = sample else {
        return Ok(info);
    };

    info.sample_trip_id = Some(trip.trip_id.clone());
    info.headsign = trip.headsign().map(str::to_string);
    info.stops = gtfs
        .stop_times_for_trip(&trip.trip_id)?
        .into_iter()
        .map(|st| RouteStop {
            stop_sequence: st.stop_sequence,
            stop_name: gtfs
                .stop(&st.stop_id)
                .map_or_else(|| st.stop_id.clone(), |s| s.stop_name.clone()),
            stop_id: st.stop_id,
        })
        .collect();

    Ok(info)
}
