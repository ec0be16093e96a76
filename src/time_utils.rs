// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with a `Z` suffix and second precision.
///
/// Used for webhook payload timestamps and admin API responses, so the
/// wire format stays identical everywhere.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z_suffix_second_precision() {
        let date = DateTime::from_timestamp(1_735_689_600, 123_456_789).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2025-01-01T00:00:00Z");
    }
}
