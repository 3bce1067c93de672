//! Cache Entry Module
//!
//! Defines the response snapshot stored for each cached request.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

// == Response Snapshot ==
/// A stored copy of a network response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    /// HTTP status code (0 for opaque responses)
    pub status: u16,
    /// Response headers in arrival order
    pub headers: Vec<(String, String)>,
    /// Response body
    pub body: Bytes,
    /// Cross-origin response whose status cannot be inspected
    #[serde(default)]
    pub opaque: bool,
}

impl ResponseSnapshot {
    // == Constructor ==
    /// Creates a snapshot with no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            opaque: false,
        }
    }

    /// Creates an opaque snapshot.
    pub fn opaque(body: impl Into<Bytes>) -> Self {
        Self {
            status: 0,
            headers: Vec::new(),
            body: body.into(),
            opaque: true,
        }
    }

    /// Builder-style header append.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    // == Headers ==
    /// Returns the first value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replaces every value of a header with a single value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    // == Cacheability ==
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when the response sets a cookie for whoever receives it.
    pub fn sets_cookie(&self) -> bool {
        self.header("set-cookie").is_some()
    }

    /// A response may be stored when it succeeded or is opaque, and sets no cookie.
    ///
    /// Opaque responses pass the status check since their status is hidden.
    pub fn is_cacheable(&self) -> bool {
        (self.opaque || self.is_success()) && !self.sets_cookie()
    }
}
