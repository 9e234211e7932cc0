//! `arrivals --stop`: upcoming vehicles at one stop.
//!
//! Realtime predictions from the trip-updates feed are preferred. When the
//! feed has nothing for the stop (or could not be fetched) the board falls
//! back to the static timetable for today's active services.

use anyhow::{Result, bail};
use chrono::{DateTime, Duration, Timelike};
use chrono_tz::Tz;
use serde::Serialize;

use super::{local_time, route_matches};
use crate::gtfs::{GtfsStatic, GtfsTime, Stop, StopTime};
use crate::gtfs_rt::{FeedMessage, trip_descriptor, trip_update};

pub const REALTIME_LIMIT: usize = 15;
pub const SCHEDULED_LIMIT: usize = 10;

/// Predictions this far in the past are still shown as "NOW"; older ones
/// are dropped.
pub const PASSED_GRACE_MINUTES: f64 = 5.0;

const SECONDS_PER_DAY: u32 = 24 * 3600;

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeArrival {
    pub trip_id: String,
    pub route_id: String,
    pub route: String,
    pub headsign: String,
    pub time: DateTime<Tz>,
    pub minutes_away: i64,
    pub delay_minutes: i64,
}

impl RealtimeArrival {
    pub fn eta(&self) -> String {
        match self.minutes_away {
            m if m <= 0 => "NOW".to_string(),
            1 => "1 min".to_string(),
            m => format!("{m} min"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledArrival {
    pub trip_id: String,
    pub route_id: String,
    pub route: String,
    pub headsign: String,
    /// Service time; after-midnight trips of yesterday's service are wrapped
    /// onto today's clock.
    pub time: GtfsTime,
}

#[derive(Debug, Serialize)]
#[serde(tag = "source", content = "arrivals", rename_all = "snake_case")]
pub enum Arrivals {
    Realtime(Vec<RealtimeArrival>),
    Scheduled(Vec<ScheduledArrival>),
}

#[derive(Debug, Serialize)]
pub struct ArrivalBoard {
    pub stop: Stop,
    pub arrivals: Arrivals,
}

/// Looks up `stop_id`, erroring with a search hint when it does not exist.
pub fn require_stop<'a>(gtfs: &'a GtfsStatic, stop_id: &str) -> Result<&'a Stop> {
    match gtfs.stop(stop_id) {
        Some(stop) => Ok(stop),
        None => bail!(
            "stop id '{stop_id}' not found in GTFS data; \
             use `capmetro stops --search <name>` to find stop ids"
        ),
    }
}

/// Builds the board for a stop from an optional realtime snapshot.
pub fn arrival_board(
    gtfs: &GtfsStatic,
    feed: Option<&FeedMessage>,
    stop_id: &str,
    route: Option<&str>,
    now: DateTime<Tz>,
) -> Result<ArrivalBoard> {
    let stop = require_stop(gtfs, stop_id)?.clone();

    let realtime = feed
        .map(|f| realtime_arrivals(f, gtfs, stop_id, route, now))
        .unwrap_or_default();

    let arrivals = if realtime.is_empty() {
        let stop_times = gtfs.stop_times_for_stop(stop_id)?;
        Arrivals::Scheduled(scheduled_arrivals(gtfs, &stop_times, route, now))
    } else {
        Arrivals::Realtime(realtime)
    };

    Ok(ArrivalBoard { stop, arrivals })
}

/// Joins trip-update predictions for `stop_id` with static trips and routes.
pub fn realtime_arrivals(
    feed: &FeedMessage,
    gtfs: &GtfsStatic,
    stop_id: &str,
    route: Option<&str>,
    now: DateTime<Tz>,
) -> Vec<RealtimeArrival> {
    let tz = now.timezone();
    let mut arrivals = Vec::new();

    for entity in &feed.entity {
        let Some(tu) = &entity.trip_update else {
            continue;
        };
        if tu.trip.schedule_relationship() == trip_descriptor::ScheduleRelationship::Canceled {
            continue;
        }

        let trip_id = tu.trip.trip_id();
        let trip = gtfs.trip(trip_id);
        let route_id = match tu.trip.route_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => trip.map_or("", |t| t.route_id.as_str()),
        };
        if !route_matches(Some(gtfs), route_id, route) {
            continue;
        }

        for stu in &tu.stop_time_update {
            if stu.stop_id() != stop_id
                || stu.schedule_relationship()
                    == trip_update::stop_time_update::ScheduleRelationship::Skipped
            {
                continue;
            }

            let event = [&stu.arrival, &stu.departure]
                .into_iter()
                .flatten()
                .find(|e| e.time.is_some_and(|t| t > 0));
            let Some(event) = event else {
                continue;
            };
            let Some(time) = local_time(event.time(), tz) else {
                continue;
            };

            let minutes = (time - now).num_seconds() as f64 / 60.0;
            if minutes < -PASSED_GRACE_MINUTES {
                continue;
            }

            let headsign = trip
                .and_then(|t| t.headsign())
                .unwrap_or_else(|| gtfs.route_long_name(route_id));

            arrivals.push(RealtimeArrival {
                trip_id: trip_id.to_string(),
                route_id: route_id.to_string(),
                route: gtfs.route_short_name(route_id).to_string(),
                headsign: headsign.to_string(),
                time,
                minutes_away: minutes.round() as i64,
                delay_minutes: (event.delay() as f64 / 60.0).round() as i64,
            });
        }
    }

    arrivals.sort_by_key(|a| (a.minutes_away, a.time));
    arrivals.truncate(REALTIME_LIMIT);
    arrivals
}

/// Timetabled arrivals after `now` from `stop_times` rows of one stop.
///
/// Trips of today's services are included when they are still ahead;
/// after-midnight trips (`24:xx:xx` and later) of yesterday's services are
/// included at their wrapped time of day.
pub fn scheduled_arrivals(
    gtfs: &GtfsStatic,
    stop_times: &[StopTime],
    route: Option<&str>,
    now: DateTime<Tz>,
) -> Vec<ScheduledArrival> {
    let today = now.date_naive();
    let yesterday = today - Duration::days(1);
    let now_secs = now.time().num_seconds_from_midnight();
    let calendar = gtfs.calendar();

    let mut upcoming: Vec<(u32, ScheduledArrival)> = Vec::new();

    for st in stop_times {
        let (Some(trip), Some(time)) = (gtfs.trip(&st.trip_id), st.time()) else {
            continue;
        };
        if !route_matches(Some(gtfs), &trip.route_id, route) {
            continue;
        }

        let secs = time.seconds();
        let mut instances = Vec::with_capacity(2);
        if secs > now_secs && calendar.is_active(&trip.service_id, today) {
            instances.push(secs);
        }
        if secs >= SECONDS_PER_DAY
            && secs - SECONDS_PER_DAY > now_secs
            && calendar.is_active(&trip.service_id, yesterday)
        {
            instances.push(secs - SECONDS_PER_DAY);
        }

        for effective in instances {
            upcoming.push((
                effective,
                ScheduledArrival {
                    trip_id: trip.trip_id.clone(),
                    route_id: trip.route_id.clone(),
                    route: gtfs.route_short_name(&trip.route_id).to_string(),
                    headsign: trip.headsign().unwrap_or("").to_string(),
                    time: GtfsTime::from_seconds(effective),
                },
            ));
        }
    }

    upcoming.sort_by_key(|(secs, a)| (*secs, a.trip_id.clone()));
    upcoming
        .into_iter()
        .take(SCHEDULED_LIMIT)
        .map(|(_, a)| a)
        .collect()
}
