pub mod auth;
pub mod cache;
pub mod conversation;
pub mod intent;
pub mod message;
pub mod response;
pub mod ticket;

pub use auth::*;
pub use cache::*;
pub use conversation::*;
pub use intent::*;
pub use message::*;
pub use response::*;
pub use ticket::*;

use chrono::{DateTime, NaiveDateTime, Utc};

/// Fixed-width UTC timestamp format; lexical order equals chronological order.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format_is_fixed_width_and_parses_back() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let formatted = format_timestamp(&ts);
        assert_eq!(formatted, "2024-03-05T07:08:09.000000Z");
        assert_eq!(parse_timestamp(&formatted), Some(ts));
    }

    #[test]
    fn test_lexical_order_matches_chronological_order() {
        let a = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        let b = a + chrono::Duration::microseconds(1);
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }
}
