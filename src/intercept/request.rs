//! Intercepted Request Module
//!
//! The agent's view of an outbound browser request.

use axum::http::{header, HeaderMap, Method};
use bytes::Bytes;
use url::Url;

/// Whether the request is a top-level document load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    Other,
}

/// What the response will be used for (the `Sec-Fetch-Dest` value).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Script,
    Style,
    Font,
    Worker,
    Image,
    Other,
}

impl Destination {
    /// Parses a `Sec-Fetch-Dest` header value.
    pub fn from_fetch_dest(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" | "iframe" | "frame" => Destination::Document,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "font" => Destination::Font,
            "worker" | "sharedworker" | "serviceworker" => Destination::Worker,
            "image" => Destination::Image,
            _ => Destination::Other,
        }
    }
}

/// An outbound request seen by the agent.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub mode: RequestMode,
    pub destination: Destination,
    pub body: Bytes,
}

impl InterceptedRequest {
    /// Builds a request from its parts, deriving mode and destination from
    /// the Fetch Metadata headers.
    ///
    /// Without `Sec-Fetch-Mode`, a GET accepting `text/html` counts as a navigation.
    pub fn new(method: Method, url: Url, headers: HeaderMap, body: Bytes) -> Self {
        let mode = match headers
            .get("sec-fetch-mode")
            .and_then(|v| v.to_str().ok())
        {
            Some(value) if value.eq_ignore_ascii_case("navigate") => RequestMode::Navigate,
            Some(_) => RequestMode::Other,
            None => {
                let accepts_html = headers
                    .get(header::ACCEPT)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.contains("text/html"))
                    .unwrap_or(false);
                if method == Method::GET && accepts_html {
                    RequestMode::Navigate
                } else {
                    RequestMode::Other
                }
            }
        };

        let destination = headers
            .get("sec-fetch-dest")
            .and_then(|v| v.to_str().ok())
            .map(Destination::from_fetch_dest)
            .unwrap_or(if mode == RequestMode::Navigate {
                Destination::Document
            } else {
                Destination::Other
            });

        Self {
            method,
            url,
            headers,
            mode,
            destination,
            body,
        }
    }

    /// Plain GET subresource request with no headers.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, HeaderMap::new(), Bytes::new())
    }

    /// Identity used to key stored entries.
    pub fn key(&self) -> String {
        request_key(&self.method, &self.url)
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }
}

/// Builds the storage key for a method and URL.
pub fn request_key(method: &Method, url: &Url) -> String {
    format!("{} {}", method, url)
}
