use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Staffed hours in a fixed timezone: `[start_hour, end_hour)` on `days`.
#[derive(Debug, Clone)]
pub struct BusinessHours {
    pub timezone: Tz,
    pub start_hour: u32,
    pub end_hour: u32,
    pub days: Vec<Weekday>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            start_hour: 9,
            end_hour: 17,
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

impl BusinessHours {
    pub fn is_after_hours(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.timezone);
        if !self.days.contains(&local.weekday()) {
            return true;
        }
        let hour = local.hour();
        hour < self.start_hour || hour >= self.end_hour
    }
}

/// Parse `"mon,tue,wed"` style day lists.
pub fn parse_days(s: &str) -> Result<Vec<Weekday>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| d.parse::<Weekday>().map_err(|_| format!("invalid weekday '{}'", d)))
        .collect()
}
