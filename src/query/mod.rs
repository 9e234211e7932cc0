//! Lookups over the static schedule joined with realtime snapshots.
//!
//! Every query is a pure function of its inputs (feed, static tables and the
//! current time), so the CLI owns all I/O.

pub mod alerts;
pub mod arrivals;
pub mod routes;
pub mod stops;
pub mod vehicles;

use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;

use crate::gtfs::GtfsStatic;

/// Sort key that orders route ids numerically when they are numeric
/// (`"7" < "20" < "801"`) by left-padding them with zeros to width five.
pub fn route_sort_key(id: &str) -> String {
    format!("{id:0>5}")
}

/// Whether `route_id` satisfies a `--route` filter given as either a route
/// id or a route short name.
pub fn route_matches(gtfs: Option<&GtfsStatic>, route_id: &str, filter: Option<&str>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    route_id == filter
        || gtfs
            .and_then(|g| g.route(route_id))
            .and_then(|r| r.route_short_name.as_deref())
            .is_some_and(|short| short == filter)
}

/// Converts a POSIX timestamp from a realtime feed into local time.
pub fn local_time(timestamp: i64, tz: Tz) -> Option<DateTime<Tz>> {
    tz.timestamp_opt(timestamp, 0).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_sort_key_orders_numeric_ids() {
        let mut ids = vec!["801", "1", "550", "20", "10"];
        ids.sort_by_key(|id| route_sort_key(id));
        assert_eq!(ids, ["1", "10", "20", "550", "801"]);
    }

    #[test]
    fn test_route_sort_key_keeps_long_ids() {
        assert_eq!(route_sort_key("123456"), "123456");
        assert_eq!(route_sort_key("X"), "0000X");
    }

    #[test]
    fn test_route_matches_id_or_short_name() {
        let gtfs = crate::gtfs::tests::fixture();

        assert!(route_matches(Some(&gtfs), "550", None));
        assert!(route_matches(Some(&gtfs), "550", Some("550")));
        assert!(route_matches(Some(&gtfs), "550", Some("Red")));
        assert!(!route_matches(Some(&gtfs), "801", Some("Red")));
        assert!(!route_matches(None, "550", Some("Red")));
    }

    #[test]
    fn test_local_time_uses_daylight_offset() {
        // 2026-10-15 13:00:00 UTC
        let t = local_time(1_792_069_200, chrono_tz::America::Chicago).unwrap();
        assert_eq!(t.format("%H:%M %Z").to_string(), "08:00 CDT");
    }
}
