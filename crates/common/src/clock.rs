//! Wall-clock helper.
//!
//! All persisted timestamps in the workspace are Unix milliseconds as
//! `u64`. This is the single place that reads the system clock.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in milliseconds. A clock before the epoch maps to 0
/// rather than panicking.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_recent() {
        // 2020-01-01 in millis; anything running this test is later.
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_now_millis_monotonic_enough() {
        let a = now_millis();
        let b = now_millis();
        assert!(b >= a);
    }
}
