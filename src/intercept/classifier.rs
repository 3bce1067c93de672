//! Request Classifier
//!
//! Assigns every intercepted request to exactly one [`Classification`].
//! Order matters: navigation wins over sensitivity, and sensitivity wins over
//! the static-asset and image checks.

use std::collections::HashSet;

use axum::http::header;
use url::{Origin, Url};

use super::request::{Destination, InterceptedRequest, RequestMode};
use crate::config::Config;

/// Which handling path a request takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Navigation,
    Sensitive,
    StaticAsset,
    Image,
    Unhandled,
}

/// Classifies requests against the configured origin and path/query sets.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    origin: Origin,
    static_asset_prefixes: Vec<String>,
    sensitive_path_prefixes: Vec<String>,
    sensitive_query_keys: HashSet<String>,
}

impl RequestClassifier {
    pub fn new(config: &Config) -> Self {
        // An unparseable origin matches nothing, so every request passes through.
        let origin = Url::parse(&config.public_origin)
            .map(|u| u.origin())
            .unwrap_or_else(|_| Origin::new_opaque());

        Self {
            origin,
            static_asset_prefixes: config.static_asset_prefixes.clone(),
            sensitive_path_prefixes: config.sensitive_path_prefixes.clone(),
            sensitive_query_keys: config
                .sensitive_query_keys
                .iter()
                .map(|k| k.to_ascii_lowercase())
                .collect(),
        }
    }

    /// Returns true when the URL shares the agent's origin.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    // == Classify ==
    /// Classifies a request.
    ///
    /// Non-GET requests are always `Unhandled`: they bypass the engine.
    pub fn classify(&self, request: &InterceptedRequest) -> Classification {
        if !request.is_get() {
            return Classification::Unhandled;
        }

        if !self.is_same_origin(&request.url) {
            return Classification::Unhandled;
        }

        if request.mode == RequestMode::Navigate {
            return Classification::Navigation;
        }

        if self.is_sensitive(request) {
            return Classification::Sensitive;
        }

        let path = request.url.path();
        let static_destination = matches!(
            request.destination,
            Destination::Script | Destination::Style | Destination::Font | Destination::Worker
        );
        if static_destination
            || self
                .static_asset_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return Classification::StaticAsset;
        }

        if request.destination == Destination::Image {
            return Classification::Image;
        }

        Classification::Unhandled
    }

    fn is_sensitive(&self, request: &InterceptedRequest) -> bool {
        if request.headers.contains_key(header::AUTHORIZATION) {
            return true;
        }

        let path = request.url.path();
        if self
            .sensitive_path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return true;
        }

        request
            .url
            .query_pairs()
            .any(|(key, _)| self.sensitive_query_keys.contains(&key.to_ascii_lowercase()))
    }
}
