//! RFC 1123 date formatting/parsing for `Last-Modified`, `Date` and
//! `If-Modified-Since`.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::SystemTime;

pub fn format(t: SystemTime) -> String {
    DateTime::<Utc>::from(t).format("%a, %d %b %Y %T GMT").to_string()
}

/// Accepts both the canonical `GMT`-suffixed form this server emits and the
/// numeric-offset form RFC 1123 also allows on input.
pub fn parse(s: &str) -> Option<SystemTime> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s.trim(), "%a, %d %b %Y %T GMT") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc).into());
    }
    DateTime::parse_from_rfc2822(s.trim())
        .ok()
        .map(|dt| dt.into())
}
