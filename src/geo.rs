//! Coordinates and great-circle distance.

use anyhow::{Result, anyhow};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Mean Earth radius in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl FromStr for Coordinate {
    type Err = anyhow::Error;

    /// Parses `"LAT,LON"`, e.g. `"30.267,-97.743"`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid =
            || anyhow!("invalid coordinate '{s}'; use LAT,LON (e.g. --near 30.267,-97.743)");

        let (lat, lon) = s.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(invalid());
        }
        Ok(Self { lat, lon })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

/// Haversine distance between two points, in miles.
pub fn haversine_miles(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_MILES * 2.0 * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinate() {
        let c: Coordinate = "30.267,-97.743".parse().unwrap();
        assert_eq!(c, Coordinate::new(30.267, -97.743));

        let spaced: Coordinate = " 30.267 , -97.743 ".parse().unwrap();
        assert_eq!(spaced, c);
    }

    #[test]
    fn test_parse_coordinate_rejects_garbage() {
        for bad in ["", "30.267", "30.267;-97.743", "north,west", "91,0", "0,181"] {
            let err = bad.parse::<Coordinate>().unwrap_err();
            assert!(err.to_string().contains("LAT,LON"), "{bad}");
        }
    }

    #[test]
    fn test_haversine_same_point_is_zero() {
        let c = Coordinate::new(30.2672, -97.7431);
        assert_eq!(haversine_miles(c, c), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let a = Coordinate::new(30.0, -97.7);
        let b = Coordinate::new(31.0, -97.7);
        let expected = EARTH_RADIUS_MILES * std::f64::consts::PI / 180.0;
        assert!((haversine_miles(a, b) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let capitol = Coordinate::new(30.2747, -97.7404);
        let domain = Coordinate::new(30.4021, -97.7253);
        let d = haversine_miles(capitol, domain);
        assert!((d - haversine_miles(domain, capitol)).abs() < 1e-12);
        assert!(d > 8.0 && d < 9.5, "{d}");
    }
}
