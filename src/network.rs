//! Network Module
//!
//! The outbound seam of the agent. Strategies call [`Network::fetch`] with a
//! [`CancellationToken`]; implementations must stop work and release the
//! in-flight call once the token fires.

use std::fmt::Debug;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName};
use reqwest::Client;
use tracing::debug;
use url::{Origin, Url};

use crate::cache::ResponseSnapshot;
use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::intercept::InterceptedRequest;

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Performs network requests on behalf of the agent.
#[async_trait]
pub trait Network: Send + Sync + Debug {
    /// Fetches `request`, giving up with `NetworkFailure` once `cancel` fires.
    async fn fetch(&self, request: &InterceptedRequest, cancel: &CancellationToken)
        -> Result<ResponseSnapshot>;
}

// == HTTP Network ==
/// `reqwest`-backed network that forwards same-origin requests upstream.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    client: Client,
    public_origin: Origin,
    upstream: Url,
}

impl HttpNetwork {
    pub fn new(config: &Config) -> Result<Self> {
        let public_origin = Url::parse(&config.public_origin)
            .map_err(|e| AgentError::InvalidRequest(format!("invalid public origin: {}", e)))?
            .origin();
        let upstream = Url::parse(&config.upstream_origin)
            .map_err(|e| AgentError::InvalidRequest(format!("invalid upstream origin: {}", e)))?;

        // Redirects are relayed to the browser untouched.
        let client = Client::builder()
            .timeout(Duration::from_millis(config.upstream_timeout_ms))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AgentError::NetworkFailure(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            public_origin,
            upstream,
        })
    }

    /// Maps a browser-facing URL onto the address actually contacted.
    pub fn target_url(&self, url: &Url) -> Url {
        if url.origin() != self.public_origin {
            return url.clone();
        }

        let mut target = self.upstream.clone();
        target.set_path(url.path());
        target.set_query(url.query());
        target
    }

    async fn send(&self, request: &InterceptedRequest) -> Result<ResponseSnapshot> {
        let start = Instant::now();
        let target = self.target_url(&request.url);
        let cross_origin = request.url.origin() != self.public_origin;

        let mut forwarded = HeaderMap::new();
        for (name, value) in request.headers.iter() {
            if !is_hop_by_hop(name) {
                forwarded.append(name.clone(), value.clone());
            }
        }

        let mut builder = self
            .client
            .request(request.method.clone(), target.as_str())
            .headers(forwarded);
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AgentError::NetworkFailure(format!("network error: {}", e)))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| AgentError::NetworkFailure(format!("failed to read response: {}", e)))?;

        let no_cors = request
            .headers
            .get("sec-fetch-mode")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("no-cors"))
            .unwrap_or(false);

        debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            target,
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(ResponseSnapshot {
            status,
            headers,
            body,
            opaque: cross_origin && no_cors,
        })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(
        &self,
        request: &InterceptedRequest,
        cancel: &CancellationToken,
    ) -> Result<ResponseSnapshot> {
        if cancel.is_cancelled() {
            return Err(AgentError::NetworkFailure("request aborted".to_string()));
        }

        // Losing the race drops the send future, which closes the connection.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::NetworkFailure("request aborted".to_string())),
            result = self.send(request) => result,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> HttpNetwork {
        let config = Config {
            public_origin: "https://shop.test".to_string(),
            upstream_origin: "http://10.0.0.5:8080".to_string(),
            ..Config::default()
        };
        HttpNetwork::new(&config).unwrap()
    }

    #[test]
    fn test_same_origin_rewritten_upstream() {
        let url = Url::parse("https://shop.test/products/1?color=red").unwrap();
        assert_eq!(
            network().target_url(&url).as_str(),
            "http://10.0.0.5:8080/products/1?color=red"
        );
    }

    #[test]
    fn test_cross_origin_untouched() {
        let url = Url::parse("https://cdn.test/a.png").unwrap();
        assert_eq!(network().target_url(&url), url);
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let config = Config {
            upstream_origin: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(HttpNetwork::new(&config), Err(AgentError::InvalidRequest(_))));
    }

    #[test]
    fn test_hop_by_hop_filter() {
        assert!(is_hop_by_hop(&HeaderName::from_static("connection")));
        assert!(is_hop_by_hop(&HeaderName::from_static("host")));
        assert!(!is_hop_by_hop(&HeaderName::from_static("authorization")));
    }

    #[tokio::test]
    async fn test_stalled_upstream_hits_deadline() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = Config {
            upstream_origin: format!("http://{}", addr),
            upstream_timeout_ms: 100,
            ..Config::default()
        };
        let network = HttpNetwork::new(&config).unwrap();
        let request = InterceptedRequest::get(Url::parse("http://localhost:3000/static/app.js").unwrap());

        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            network.fetch(&request, &CancellationToken::new()),
        )
        .await
        .expect("upstream call must give up on its own");

        assert!(matches!(result, Err(AgentError::NetworkFailure(_))));
        server.abort();
    }

    #[tokio::test]
    async fn test_cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = InterceptedRequest::get(Url::parse("https://shop.test/").unwrap());
        let result = network().fetch(&request, &cancel).await;
        assert!(matches!(result, Err(AgentError::NetworkFailure(_))));
    }
}
