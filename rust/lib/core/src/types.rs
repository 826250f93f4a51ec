use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;

/// Result wrapper for list operations.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult<T: Serialize> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Generate a new random ID (UUIDv4, no dashes).
///
/// Drawn from the v4 random space with no shared counter, so concurrent
/// callers never coordinate.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Get the current time as an RFC 3339 string.
///
/// Always microsecond precision with a `Z` suffix, so lexical order of the
/// strings equals chronological order.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The current time, or one microsecond past `prev` if the clock has not
/// moved beyond it. Successive values for one record strictly increase.
///
/// An unparseable `prev` is ignored.
pub fn advance_rfc3339(prev: &str) -> String {
    let now = Utc::now().trunc_subsecs(6);
    let next = match DateTime::parse_from_rfc3339(prev) {
        Ok(p) => now.max(p.with_timezone(&Utc) + chrono::Duration::microseconds(1)),
        Err(_) => now,
    };
    next.to_rfc3339_opts(SecondsFormat::Micros, true)
}
