//! `vehicles`: in-service vehicle positions grouped by route.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashMap;

use super::{local_time, route_matches, route_sort_key};
use crate::gtfs::GtfsStatic;
use crate::gtfs_rt::FeedMessage;

#[derive(Debug, Clone, Serialize)]
pub struct Vehicle {
    pub id: String,
    pub trip_id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub bearing: Option<f32>,
    /// Metres per second, as reported by the feed.
    pub speed: Option<f32>,
    pub timestamp: Option<DateTime<Tz>>,
}

#[derive(Debug, Serialize)]
pub struct RouteVehicles {
    pub route_id: String,
    pub route: String,
    pub route_name: String,
    pub vehicles: Vec<Vehicle>,
}

impl RouteVehicles {
    pub fn count(groups: &[RouteVehicles]) -> usize {
        groups.iter().map(|g| g.vehicles.len()).sum()
    }
}

/// Vehicles currently assigned to a route, grouped per route in route order.
///
/// Vehicles without a route id are out of service and vehicles without a
/// position cannot be shown; both are skipped.
pub fn active_vehicles(
    feed: &FeedMessage,
    gtfs: Option<&GtfsStatic>,
    route: Option<&str>,
    tz: Tz,
) -> Vec<RouteVehicles> {
    let mut groups: Vec<RouteVehicles> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entity in &feed.entity {
        let Some(v) = &entity.vehicle else {
            continue;
        };
        let route_id = v.trip.as_ref().map_or("", |t| t.route_id());
        if route_id.is_empty() || !route_matches(gtfs, route_id, route) {
            continue;
        }
        let Some(pos) = &v.position else {
            continue;
        };

        let descriptor = v.vehicle.as_ref();
        let id = descriptor
            .and_then(|d| d.id.as_deref().or(d.label.as_deref()))
            .filter(|s| !s.is_empty())
            .unwrap_or("?");

        let vehicle = Vehicle {
            id: id.to_string(),
            trip_id: v.trip.as_ref().and_then(|t| t.trip_id.clone()),
            lat: f64::from(pos.latitude),
            lon: f64::from(pos.longitude),
            bearing: pos.bearing,
            speed: pos.speed,
            timestamp: v
                .timestamp
                .and_then(|t| i64::try_from(t).ok())
                .and_then(|t| local_time(t, tz)),
        };

        let slot = *index.entry(route_id.to_string()).or_insert_with(|| {
            groups.push(RouteVehicles {
                route_id: route_id.to_string(),
                route: gtfs.map_or(route_id, |g| g.route_short_name(route_id)).to_string(),
                route_name: gtfs.map_or("", |g| g.route_long_name(route_id)).to_string(),
                vehicles: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].vehicles.push(vehicle);
    }

    groups.sort_by(|a, b| {
        route_sort_key(&a.route)
            .cmp(&route_sort_key(&b.route))
            .then_with(|| a.route_id.cmp(&b.route_id))
    });
    groups
}
