//! Timestamp Tagger
//!
//! Stamps a capture time onto every persisted response and answers
//! staleness questions about it later.

use super::ResponseSnapshot;

/// Synthetic header carrying the capture time in epoch milliseconds.
pub const CAPTURE_HEADER: &str = "x-agent-captured-at";

/// Age classification of a stored response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Expired,
    /// Age bound applies but the marker is missing or unparseable.
    Unmarked,
}

/// Returns a copy of `response` carrying `now_ms` as its capture time.
pub fn stamp(response: &ResponseSnapshot, now_ms: u64) -> ResponseSnapshot {
    let mut stamped = response.clone();
    stamped.set_header(CAPTURE_HEADER, now_ms.to_string());
    stamped
}

/// Reads the capture marker.
pub fn captured_at(response: &ResponseSnapshot) -> Option<u64> {
    response
        .header(CAPTURE_HEADER)
        .and_then(|v| v.trim().parse().ok())
}

/// Classifies a response against `max_age_ms` (0 = no expiry).
///
/// Expired means strictly older than the bound: `now - captured > max_age`.
pub fn freshness(response: &ResponseSnapshot, max_age_ms: u64, now_ms: u64) -> Freshness {
    if max_age_ms == 0 {
        return Freshness::Fresh;
    }

    match captured_at(response) {
        Some(captured) if now_ms.saturating_sub(captured) > max_age_ms => Freshness::Expired,
        Some(_) => Freshness::Fresh,
        None => Freshness::Unmarked,
    }
}

/// Unmarked responses never expire by age.
pub fn is_expired(response: &ResponseSnapshot, max_age_ms: u64, now_ms: u64) -> bool {
    freshness(response, max_age_ms, now_ms) == Freshness::Expired
}
