//! Epoch-millisecond helpers
//!
//! Every timestamp on the wire (`when`, `modtime`, trapstate `<timestamp>`)
//! is milliseconds since 00:00:00 UTC on January 1, 1970.

use chrono::{DateTime, TimeZone, Utc};

/// Milliseconds since the epoch for `now`
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Milliseconds since the epoch for the given instant
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Instant for the given epoch milliseconds, `None` when out of range
pub fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_keep_sub_second_precision() {
        let at = from_millis(1_368_101_400_107).unwrap();
        assert_eq!(to_millis(at), 1_368_101_400_107);
    }

    #[test]
    fn test_now_is_recent() {
        // 2020-01-01
        assert!(now_millis() > 1_577_836_800_000);
    }
}
