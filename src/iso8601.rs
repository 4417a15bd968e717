// SPDX-License-Identifier: MIT

//! ISO 8601 timestamp parsing for `period` traits.
//!
//! Accepted forms:
//!
//! ```plaintext
//!     2016-04-20                      date only, midnight UTC
//!     2016-04-20T12:34:32             zone-less; taken as UTC
//!     2016-04-20T12:34:32.778943321   any number of fractional digits
//!     2016-04-20T12:34:32Z            UTC
//!     2016-04-20T12:34:32-05:00       fixed offset; converted to UTC
//! ```
//!
//! All returned datetimes are in UTC.
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse an ISO 8601 timestamp, or return `None` if the text matches no accepted form.
pub fn parse(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return Some(with_offset.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    None
}

/// Render a timestamp as the second-precision ISO text used for SQL comparisons against
/// `StartIso8601`.
pub fn sql_text(datetime: &DateTime<Utc>) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%S").to_string()
}
