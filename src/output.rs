//! Output formatting for query results.
//!
//! Every result can be rendered as terminal text or as pretty JSON. Renderers
//! take any [`Write`] so they can be pointed at stdout or a buffer.

use anyhow::Result;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use std::io::Write;

use crate::gtfs::refresh::RefreshSummary;
use crate::query::alerts::AlertSummary;
use crate::query::arrivals::{ArrivalBoard, Arrivals};
use crate::query::routes::{RouteInfo, RouteSummary};
use crate::query::stops::{NearbyStops, StopSearch};
use crate::query::vehicles::RouteVehicles;

/// Writes `value` as pretty-printed JSON followed by a newline.
pub fn print_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, value)?;
    writeln!(w)?;
    Ok(())
}

pub fn render_alerts<W: Write>(w: &mut W, alerts: &[AlertSummary]) -> Result<()> {
    if alerts.is_empty() {
        writeln!(w, "No active service alerts.")?;
        return Ok(());
    }

    writeln!(w, "=== CapMetro Service Alerts ({} active) ===\n", alerts.len())?;
    for alert in alerts {
        writeln!(w, "📢 {}", alert.header)?;
        if !alert.routes.is_empty() {
            writeln!(w, "   Routes: {}", alert.routes.join(", "))?;
        }
        if !alert.periods.is_empty() {
            let periods: Vec<String> = alert
                .periods
                .iter()
                .map(|p| {
                    let stamp = |t: &DateTime<Tz>| t.format("%m/%d %I:%M%p").to_string();
                    let start = p.start.as_ref().map_or_else(|| "?".to_string(), stamp);
                    let end = p.end.as_ref().map_or_else(|| "ongoing".to_string(), stamp);
                    format!("{start} - {end}")
                })
                .collect();
            writeln!(w, "   Period: {}", periods.join("; "))?;
        }
        match (&alert.cause, &alert.effect) {
            (Some(cause), Some(effect)) => writeln!(w, "   Cause: {cause}  |  Effect: {effect}")?,
            (Some(cause), None) => writeln!(w, "   Cause: {cause}")?,
            (None, Some(effect)) => writeln!(w, "   Effect: {effect}")?,
            (None, None) => {}
        }
        if !alert.description.is_empty() {
            writeln!(w, "   {}", alert.description)?;
        }
        if let Some(url) = &alert.url {
            writeln!(w, "   More: {url}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

pub fn render_vehicles<W: Write>(
    w: &mut W,
    groups: &[RouteVehicles],
    route: Option<&str>,
) -> Result<()> {
    if groups.is_empty() {
        let filter = route.map(|r| format!(" on route {r}")).unwrap_or_default();
        writeln!(w, "No active vehicles found{filter}.")?;
        return Ok(());
    }

    writeln!(w, "\n=== Active CapMetro Vehicles ({}) ===\n", RouteVehicles::count(groups))?;
    for group in groups {
        writeln!(
            w,
            "Route {} — {} ({} vehicles)",
            group.route,
            group.route_name,
            group.vehicles.len()
        )?;
        for v in &group.vehicles {
            let at = v
                .timestamp
                .map(|t| t.format("%I:%M:%S %p").to_string())
                .unwrap_or_else(|| "?".to_string());
            writeln!(w, "  🚍 Vehicle {}: ({:.5}, {:.5}) @ {at}", v.id, v.lat, v.lon)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

pub fn render_arrivals<W: Write>(w: &mut W, board: &ArrivalBoard) -> Result<()> {
    writeln!(
        w,
        "\n=== Arrivals at: {} (ID: {}) ===\n",
        board.stop.stop_name, board.stop.stop_id
    )?;

    match &board.arrivals {
        Arrivals::Realtime(arrivals) => {
            writeln!(w, "Real-time arrivals:")?;
            for a in arrivals {
                let late = if a.delay_minutes > 0 {
                    format!(" (+{}m late)", a.delay_minutes)
                } else {
                    String::new()
                };
                writeln!(w, "  🚌 Route {} → {}", a.route, a.headsign)?;
                writeln!(w, "     {} ({}){late}", a.time.format("%I:%M %p"), a.eta())?;
                writeln!(w)?;
            }
        }
        Arrivals::Scheduled(arrivals) => {
            writeln!(w, "No real-time data available. Showing scheduled times:")?;
            if arrivals.is_empty() {
                writeln!(w, "  No more scheduled arrivals today.")?;
            }
            for a in arrivals {
                writeln!(w, "  🚌 Route {} → {} at {}", a.route, a.headsign, a.time.to_12h())?;
            }
        }
    }
    Ok(())
}

pub fn render_stop_search<W: Write>(w: &mut W, search: &StopSearch) -> Result<()> {
    if search.stops.is_empty() {
        writeln!(w, "No stops found matching '{}'.", search.query)?;
        return Ok(());
    }

    writeln!(
        w,
        "\n=== Stops matching '{}' ({} found) ===\n",
        search.query, search.total
    )?;
    for s in &search.stops {
        let coord = s
            .coordinate()
            .map_or_else(|| "no location".to_string(), |c| c.to_string());
        writeln!(w, "  📍 {}", s.stop_name)?;
        writeln!(w, "     ID: {}  |  {coord}", s.stop_id)?;
        if let Some(desc) = s.stop_desc.as_deref().filter(|d| !d.is_empty()) {
            writeln!(w, "     {desc}")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

pub fn render_nearby<W: Write>(w: &mut W, nearby: &NearbyStops) -> Result<()> {
    if nearby.stops.is_empty() {
        writeln!(
            w,
            "No stops found within {} miles of {}.",
            nearby.radius_miles, nearby.center
        )?;
        return Ok(());
    }

    writeln!(
        w,
        "\n=== Nearby Stops ({} within {} mi) ===\n",
        nearby.total, nearby.radius_miles
    )?;
    for n in &nearby.stops {
        writeln!(w, "  📍 {} — {:.2} mi", n.stop.stop_name, n.distance_miles)?;
        writeln!(w, "     ID: {}", n.stop.stop_id)?;
        writeln!(w)?;
    }
    Ok(())
}

pub fn render_routes<W: Write>(w: &mut W, routes: &[RouteSummary]) -> Result<()> {
    writeln!(w, "\n=== CapMetro Routes ({}) ===\n", routes.len())?;
    for r in routes {
        writeln!(w, "  {:>6} | {:<5} | {}", r.short_name, r.kind.as_str(), r.long_name)?;
    }
    Ok(())
}

pub fn render_route_info<W: Write>(w: &mut W, info: &RouteInfo) -> Result<()> {
    let route = &info.route;
    writeln!(w, "\n=== Route {} — {} ===", route.short_name(), route.long_name())?;
    writeln!(w, "    Type: {}  |  ID: {}", info.kind.as_str(), route.route_id)?;
    if let Some(url) = route.route_url.as_deref().filter(|u| !u.is_empty()) {
        writeln!(w, "    URL: {url}")?;
    }
    writeln!(w)?;

    if info.sample_trip_id.is_none() {
        writeln!(w, "No trips found for this route.")?;
        return Ok(());
    }

    writeln!(w, "Stops (direction: {}):", info.headsign.as_deref().unwrap_or(""))?;
    for s in &info.stops {
        writeln!(w, "  {:>3}. {} (ID: {})", s.stop_sequence, s.stop_name, s.stop_id)?;
    }
    Ok(())
}

pub fn render_refresh<W: Write>(w: &mut W, summary: &RefreshSummary) -> Result<()> {
    writeln!(w, "Extracted {} files:", summary.files.len())?;
    for f in &summary.files {
        writeln!(w, "  {f}")?;
    }
    writeln!(w, "GTFS data refreshed successfully.")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::gtfs::tests::fixture;
    use crate::query::alerts::ActivePeriod;
    use crate::query::arrivals::arrival_board;
    use crate::query::routes::{list_routes, route_info};
    use crate::query::stops::{nearby_stops, search_stops};
    use chrono::TimeZone;
    use chrono_tz::America::Chicago;

    fn rendered<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_print_json() {
        let gtfs = fixture();
        let routes = list_routes(&gtfs);
        let out = rendered(|w| print_json(w, &routes));

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value[0]["route_id"], "1");
        assert_eq!(value[2]["kind"], "Rail");
    }

    #[test]
    fn test_render_alerts() {
        let alert = AlertSummary {
            id: "a".into(),
            header: "Congress Ave detour".into(),
            description: "Buses detour via Colorado St.".into(),
            url: None,
            routes: vec!["801".into(), "1".into()],
            periods: vec![ActivePeriod {
                start: Some(Chicago.with_ymd_and_hms(2026, 10, 15, 8, 0, 0).unwrap()),
                end: None,
            }],
            cause: None,
            effect: Some("Detour".into()),
        };

        let out = rendered(|w| render_alerts(w, &[alert]));
        assert!(out.contains("(1 active)"));
        assert!(out.contains("📢 Congress Ave detour"));
        assert!(out.contains("   Routes: 801, 1"));
        assert!(out.contains("   Period: 10/15 08:00AM - ongoing"));
        assert!(out.contains("   Effect: Detour"));

        assert_eq!(rendered(|w| render_alerts(w, &[])), "No active service alerts.\n");
    }

    #[test]
    fn test_render_empty_vehicles() {
        let out = rendered(|w| render_vehicles(w, &[], Some("801")));
        assert_eq!(out, "No active vehicles found on route 801.\n");
    }

    #[test]
    fn test_render_scheduled_arrivals() {
        let gtfs = fixture();
        let now = Chicago.with_ymd_and_hms(2026, 10, 15, 8, 0, 0).unwrap();
        let board = arrival_board(&gtfs, None, "1002", None, now).unwrap();

        let out = rendered(|w| render_arrivals(w, &board));
        assert!(out.contains("=== Arrivals at: Congress & 11th (ID: 1002) ==="));
        assert!(out.contains("Showing scheduled times"));
        assert!(out.contains("  🚌 Route 801 → Tech Ridge at 8:06 AM"));
        assert!(out.contains("  🚌 Route 1 → North Lamar Transit Center at 12:05 AM"));
    }

    #[test]
    fn test_render_stop_search() {
        let gtfs = fixture();
        let search = search_stops(gtfs.stops(), "congress");
        let out = rendered(|w| render_stop_search(w, &search));

        assert!(out.contains("=== Stops matching 'congress' (1 found) ==="));
        assert!(out.contains("     ID: 1002  |  (30.2729, -97.741)"));
        assert!(out.contains("     Near the Capitol"));
    }

    #[test]
    fn test_render_nearby_none() {
        let gtfs = fixture();
        let nearby = nearby_stops(gtfs.stops(), Coordinate::new(29.0, -98.0), 0.5);
        let out = rendered(|w| render_nearby(w, &nearby));
        assert_eq!(out, "No stops found within 0.5 miles of (29, -98).\n");
    }

    #[test]
    fn test_render_routes_table() {
        let gtfs = fixture();
        let out = rendered(|w| render_routes(w, &list_routes(&gtfs)));

        assert!(out.contains("=== CapMetro Routes (4) ==="));
        assert!(out.contains("     Red | Rail  | MetroRail Red Line"));
        assert!(out.contains("     801 | Bus   | MetroRapid North/South"));
    }

    #[test]
    fn test_render_route_info() {
        let gtfs = fixture();
        let out = rendered(|w| render_route_info(w, &route_info(&gtfs, "801").unwrap()));

        assert!(out.contains("=== Route 801 — MetroRapid North/South ==="));
        assert!(out.contains("    URL: https://www.capmetro.org/route/801"));
        assert!(out.contains("Stops (direction: Tech Ridge):"));
        assert!(out.contains("    1. Republic Square Station (ID: 1001)"));

        let empty = rendered(|w| render_route_info(w, &route_info(&gtfs, "20").unwrap()));
        assert!(empty.contains("No trips found for this route."));
    }
}
