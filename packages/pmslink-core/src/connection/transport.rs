//! HTTP seams used by the arbiter.
//!
//! [`Prober`] issues reachability probes and [`HttpTransport`] carries data
//! requests. Both are traits so arbitration can be tested without sockets.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use super::candidate::ConnectionCandidate;
use crate::protocol_constants::{HTTP_CONNECT_TIMEOUT_SECS, HTTP_READ_TIMEOUT_SECS};

/// HTTP verbs used against media servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// Failure classes that drive fallback and offline marking.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No connection could be established (refused, unreachable, TLS handshake).
    #[error("connection failed: {0}")]
    Connect(String),

    /// Connected, but the response did not arrive in time.
    #[error("read timed out")]
    ReadTimeout,

    /// Any other request failure.
    #[error("request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_timeout() {
            TransportError::ReadTimeout
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Data requests against a media server.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `method url` with `query` appended.
    ///
    /// `verify_tls` only matters for https URLs.
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        query: &[(String, String)],
        verify_tls: bool,
    ) -> Result<HttpResponse, TransportError>;
}

/// Reachability probes for connection candidates.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Returns true if the candidate answered with 200 or 401.
    async fn probe(&self, candidate: &ConnectionCandidate, query: &[(String, String)]) -> bool;
}

fn build_client(verify_tls: bool) -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .read_timeout(Duration::from_secs(HTTP_READ_TIMEOUT_SECS))
        .danger_accept_invalid_certs(!verify_tls)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("[Talk] Failed to build HTTP client, using defaults: {}", e);
            Client::new()
        })
}

/// reqwest-backed transport and prober.
///
/// Holds one verifying and one non-verifying client; probes always use the
/// latter.
#[derive(Clone)]
pub struct ReqwestTransport {
    verified: Client,
    unverified: Client,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            verified: build_client(true),
            unverified: build_client(false),
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        query: &[(String, String)],
        verify_tls: bool,
    ) -> Result<HttpResponse, TransportError> {
        let client = if verify_tls {
            &self.verified
        } else {
            &self.unverified
        };
        let builder = match method {
            HttpMethod::Get => client.get(url),
            HttpMethod::Put => client.put(url),
            HttpMethod::Delete => client.delete(url),
        };

        let response = builder.query(query).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Prober for ReqwestTransport {
    async fn probe(&self, candidate: &ConnectionCandidate, query: &[(String, String)]) -> bool {
        let url = candidate.url();
        match self.unverified.head(&url).query(query).send().await {
            Ok(resp) => {
                let status = resp.status();
                log::debug!("[Arbiter] HEAD {} -> {}", url, status.as_u16());
                status == StatusCode::OK || status == StatusCode::UNAUTHORIZED
            }
            Err(e) => {
                log::debug!("[Arbiter] HEAD {} failed: {}", url, e);
                false
            }
        }
    }
}
