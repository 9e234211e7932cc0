use anyhow::{Result, anyhow};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A GTFS stop time: seconds after midnight of the service day.
///
/// Values past `24:00:00` are legal and belong to trips running after
/// midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GtfsTime(u32);

impl GtfsTime {
    pub fn from_hms(h: u32, m: u32, s: u32) -> Self {
        Self(h * 3600 + m * 60 + s)
    }

    pub fn from_seconds(seconds: u32) -> Self {
        Self(seconds)
    }

    pub fn seconds(self) -> u32 {
        self.0
    }

    /// `h:MM AM`/`h:MM PM` on a 12-hour clock.
    pub fn to_12h(self) -> String {
        let hour = (self.0 / 3600) % 24;
        let minute = (self.0 / 60) % 60;
        let suffix = if hour < 12 { "AM" } else { "PM" };
        let display = match hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{display}:{minute:02} {suffix}")
    }
}

impl FromStr for GtfsTime {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || anyhow!("invalid GTFS time '{s}'");
        let mut parts = s.trim().split(':');
        let mut next = || -> Result<u32> {
            parts
                .next()
                .and_then(|p| p.parse().ok())
                .ok_or_else(invalid)
        };
        let (h, m, sec) = (next()?, next()?, next()?);
        if parts.next().is_some() || m > 59 || sec > 59 {
            return Err(invalid());
        }
        let seconds = h
            .checked_mul(3600)
            .and_then(|t| t.checked_add(m * 60 + sec))
            .ok_or_else(invalid)?;
        Ok(Self(seconds))
    }
}

impl fmt::Display for GtfsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.0 / 3600,
            (self.0 / 60) % 60,
            self.0 % 60
        )
    }
}

impl<'de> Deserialize<'de> for GtfsTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Serialize for GtfsTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
