//! `alerts`: active service alerts in readable form.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use super::{local_time, route_matches};
use crate::gtfs::GtfsStatic;
use crate::gtfs_rt::alert::{Cause, Effect};
use crate::gtfs_rt::{Alert, FeedMessage, TimeRange, TranslatedString};

pub const DESCRIPTION_LIMIT: usize = 300;

#[derive(Debug, Clone, Serialize)]
pub struct ActivePeriod {
    /// `None` when the feed leaves the start open.
    pub start: Option<DateTime<Tz>>,
    /// `None` while the alert is ongoing.
    pub end: Option<DateTime<Tz>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub id: String,
    pub header: String,
    pub description: String,
    pub url: Option<String>,
    /// Affected routes by short name, in feed order without repeats.
    pub routes: Vec<String>,
    pub periods: Vec<ActivePeriod>,
    pub cause: Option<String>,
    pub effect: Option<String>,
}

pub fn summarize_alerts(
    feed: &FeedMessage,
    gtfs: Option<&GtfsStatic>,
    route: Option<&str>,
    tz: Tz,
) -> Vec<AlertSummary> {
    feed.entity
        .iter()
        .filter(|e| !e.is_deleted())
        .filter_map(|e| Some((e.id.as_str(), e.alert.as_ref()?)))
        .filter(|(_, a)| route.is_none() || affects_route(a, gtfs, route))
        .map(|(id, a)| summarize(id, a, gtfs, tz))
        .collect()
}

fn affects_route(alert: &Alert, gtfs: Option<&GtfsStatic>, route: Option<&str>) -> bool {
    alert
        .informed_entity
        .iter()
        .filter_map(|ie| ie.route_id.as_deref())
        .any(|route_id| route_matches(gtfs, route_id, route))
}

fn summarize(id: &str, alert: &Alert, gtfs: Option<&GtfsStatic>, tz: Tz) -> AlertSummary {
    let mut routes: Vec<String> = Vec::new();
    for route_id in alert
        .informed_entity
        .iter()
        .filter_map(|ie| ie.route_id.as_deref())
        .filter(|r| !r.is_empty())
    {
        let name = gtfs.map_or(route_id, |g| g.route_short_name(route_id));
        if !routes.iter().any(|r| r == name) {
            routes.push(name.to_string());
        }
    }

    let cause = alert
        .cause
        .and_then(|c| Cause::try_from(c).ok())
        .filter(|c| *c != Cause::UnknownCause)
        .map(|c| humanize(c.as_str_name()));
    let effect = alert
        .effect
        .and_then(|e| Effect::try_from(e).ok())
        .filter(|e| *e != Effect::UnknownEffect)
        .map(|e| humanize(e.as_str_name()));

    AlertSummary {
        id: id.to_string(),
        header: translation(alert.header_text.as_ref()).unwrap_or_default(),
        description: truncate(
            &translation(alert.description_text.as_ref()).unwrap_or_default(),
            DESCRIPTION_LIMIT,
        ),
        url: translation(alert.url.as_ref()),
        routes,
        periods: alert
            .active_period
            .iter()
            .map(|p| period(p, tz))
            .collect(),
        cause,
        effect,
    }
}

fn period(range: &TimeRange, tz: Tz) -> ActivePeriod {
    let at = |t: Option<u64>| {
        t.filter(|&t| t > 0)
            .and_then(|t| i64::try_from(t).ok())
            .and_then(|t| local_time(t, tz))
    };
    ActivePeriod {
        start: at(range.start),
        end: at(range.end),
    }
}

/// Picks the English translation, else the first one.
fn translation(text: Option<&TranslatedString>) -> Option<String> {
    let translations = &text?.translation;
    translations
        .iter()
        .find(|t| {
            t.language
                .as_deref()
                .is_some_and(|l| l.to_ascii_lowercase().starts_with("en"))
        })
        .or_else(|| translations.first())
        .map(|t| t.text.clone())
        .filter(|t| !t.is_empty())
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// `POLICE_ACTIVITY` -> `Police activity`.
fn humanize(name: &str) -> String {
    let lower = name.replace('_', " ").to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
