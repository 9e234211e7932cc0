use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashMap;

use super::types::{CalendarDateRow, CalendarRow};

const SERVICE_ADDED: u8 = 1;
const SERVICE_REMOVED: u8 = 2;

/// Answers "does this service_id run on this date" from `calendar.txt` and
/// `calendar_dates.txt`.
#[derive(Debug, Default, Clone)]
pub struct ServiceCalendar {
    regular: HashMap<String, CalendarRow>,
    exceptions: HashMap<(String, NaiveDate), u8>,
}

impl ServiceCalendar {
    pub fn new(regular: Vec<CalendarRow>, exceptions: Vec<CalendarDateRow>) -> Self {
        Self {
            regular: regular
                .into_iter()
                .map(|row| (row.service_id.clone(), row))
                .collect(),
            exceptions: exceptions
                .into_iter()
                .map(|row| ((row.service_id, row.date), row.exception_type))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.regular.is_empty() && self.exceptions.is_empty()
    }

    pub fn is_active(&self, service_id: &str, date: NaiveDate) -> bool {
        // Feeds without any calendar carry no service restrictions.
        if self.is_empty() {
            return true;
        }

        match self.exceptions.get(&(service_id.to_string(), date)) {
            Some(&SERVICE_ADDED) => return true,
            Some(&SERVICE_REMOVED) => return false,
            _ => {}
        }

        let Some(row) = self.regular.get(service_id) else {
            return false;
        };
        if date < row.start_date || date > row.end_date {
            return false;
        }

        let flag = match date.weekday() {
            Weekday::Mon => row.monday,
            Weekday::Tue => row.tuesday,
            Weekday::Wed => row.wednesday,
            Weekday::Thu => row.thursday,
            Weekday::Fri => row.friday,
            Weekday::Sat => row.saturday,
            Weekday::Sun => row.sunday,
        };
        flag == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekday_service() -> CalendarRow {
        CalendarRow {
            service_id: "WKDY".to_string(),
            monday: 1,
            tuesday: 1,
            wednesday: 1,
            thursday: 1,
            friday: 1,
            saturday: 0,
            sunday: 0,
            start_date: date(2026, 8, 16),
            end_date: date(2027, 1, 9),
        }
    }

    #[test]
    fn test_weekday_pattern() {
        let calendar = ServiceCalendar::new(vec![weekday_service()], vec![]);

        assert!(calendar.is_active("WKDY", date(2026, 10, 15))); // Thursday
        assert!(!calendar.is_active("WKDY", date(2026, 10, 17))); // Saturday
        assert!(!calendar.is_active("WKND", date(2026, 10, 17)));
    }

    #[test]
    fn test_outside_date_range() {
        let calendar = ServiceCalendar::new(vec![weekday_service()], vec![]);

        assert!(!calendar.is_active("WKDY", date(2026, 8, 14)));
        assert!(calendar.is_active("WKDY", date(2027, 1, 8)));
        assert!(!calendar.is_active("WKDY", date(2027, 1, 11)));
    }

    #[test]
    fn test_exceptions_override_pattern() {
        let thanksgiving = date(2026, 11, 26);
        let calendar = ServiceCalendar::new(
            vec![weekday_service()],
            vec![
                CalendarDateRow {
                    service_id: "WKDY".to_string(),
                    date: thanksgiving,
                    exception_type: SERVICE_REMOVED,
                },
                CalendarDateRow {
                    service_id: "HOLIDAY".to_string(),
                    date: thanksgiving,
                    exception_type: SERVICE_ADDED,
                },
            ],
        );

        assert!(!calendar.is_active("WKDY", thanksgiving));
        assert!(calendar.is_active("HOLIDAY", thanksgiving));
        assert!(!calendar.is_active("HOLIDAY", date(2026, 11, 27)));
    }

    #[test]
    fn test_no_calendar_means_always_active() {
        let calendar = ServiceCalendar::default();
        assert!(calendar.is_active("anything", date(2026, 10, 15)));
    }
}
