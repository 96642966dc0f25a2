//! Purge dispatch over HTTP.
//!
//! Sends a single `PURGE` request per call, bounded by the configured
//! timeout. The response status is logged but never interpreted: any
//! answer short of a transport failure counts as "request delivered",
//! and whether Varnish actually evicted the object is the cache
//! server's business.

use std::time::{Duration, Instant};

use metrics::histogram;
use once_cell::sync::Lazy;
use reqwest::{Client, Method, header};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use super::retarget::RetargetError;

const METRIC_PURGE_DURATION_MS: &str = "refolo_purge_duration_ms";

/// User agent presented to the cache server.
pub const USER_AGENT: &str = concat!("refolo/", env!("CARGO_PKG_VERSION"));

static PURGE_METHOD: Lazy<Method> =
    Lazy::new(|| Method::from_bytes(b"PURGE").expect("PURGE is a valid method token"));

/// One purge request, constructed per call and never persisted.
#[derive(Debug, Clone)]
pub struct PurgeRequest {
    /// Subject URL as the public site sees it, echoed back in the result.
    pub subject: String,
    /// Where the request is actually sent: the cache endpoint's authority
    /// with the subject's scheme, path, and query.
    pub destination: Url,
    /// Original host identity, so Varnish purges the right virtual host.
    pub host_header: String,
    /// Upper bound on connect-plus-response time.
    pub timeout: Duration,
}

/// Outcome of one purge attempt.
#[derive(Debug)]
pub struct PurgeResult {
    /// The subject URL the attempt was for.
    pub url: String,
    /// The failure, when the request never made it to the endpoint.
    pub error: Option<PurgeError>,
}

impl PurgeResult {
    pub fn delivered(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: PurgeError) -> Self {
        Self {
            url: url.into(),
            error: Some(error),
        }
    }

    /// True when the request was delivered, regardless of how the cache
    /// server answered it.
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Error)]
pub enum PurgeError {
    /// The subject URL could not be rewritten; nothing was dispatched.
    #[error(transparent)]
    Retarget(#[from] RetargetError),
    /// The cache endpoint did not answer within the configured wait.
    #[error("purge of `{url}` timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    /// The cache endpoint was unreachable.
    #[error("failed to reach the cache endpoint for `{url}`: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// HTTP client for purge dispatch.
///
/// Wraps a [`reqwest::Client`] carrying the companion's user agent.
/// Cheap to clone; one instance serves a whole purge burst.
#[derive(Debug, Clone)]
pub struct PurgeClient {
    http: Client,
}

impl PurgeClient {
    /// Build a client with the default user agent.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_user_agent(USER_AGENT)
    }

    /// Build a client presenting a custom user agent.
    pub fn with_user_agent(user_agent: &str) -> Result<Self, reqwest::Error> {
        // Purges target the cache node directly; never route them
        // through a proxy.
        let http = Client::builder().user_agent(user_agent).no_proxy().build()?;
        Ok(Self { http })
    }

    /// Send one `PURGE` request and report the outcome.
    ///
    /// Exactly one outbound request per call, no retries. Transport
    /// failures and timeouts come back inside the result, never as a
    /// fault that would interrupt a caller working through a batch.
    pub async fn dispatch(&self, req: PurgeRequest) -> PurgeResult {
        let started = Instant::now();
        let sent = self
            .http
            .request(PURGE_METHOD.clone(), req.destination.clone())
            .header(header::HOST, req.host_header.as_str())
            .timeout(req.timeout)
            .send()
            .await;
        histogram!(METRIC_PURGE_DURATION_MS).record(started.elapsed().as_secs_f64() * 1000.0);

        match sent {
            Ok(response) => {
                info!(
                    url = %req.subject,
                    destination = %req.destination,
                    status = %response.status(),
                    "purge delivered"
                );
                PurgeResult::delivered(req.subject)
            }
            Err(source) if source.is_timeout() => {
                let error = PurgeError::Timeout {
                    url: req.subject.clone(),
                    timeout: req.timeout,
                };
                warn!(url = %req.subject, destination = %req.destination, error = %error, "purge timed out");
                PurgeResult::failed(req.subject, error)
            }
            Err(source) => {
                let error = PurgeError::Connection {
                    url: req.subject.clone(),
                    source,
                };
                warn!(url = %req.subject, destination = %req.destination, error = %error, "purge failed");
                PurgeResult::failed(req.subject, error)
            }
        }
    }
}
