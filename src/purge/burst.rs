//! Purge burst orchestration.
//!
//! Retargets and dispatches every subject URL for one content-change
//! event. Failures stay local to their URL: one bad subject or an
//! unreachable endpoint never aborts the rest of the burst.

use std::time::Duration;

use futures::future::join_all;
use metrics::counter;
use tracing::{info, warn};

use super::dispatch::{PurgeClient, PurgeRequest, PurgeResult};
use super::endpoint::CacheEndpoint;
use super::retarget::retarget;

const METRIC_PURGE_TOTAL: &str = "refolo_purge_total";
const METRIC_PURGE_FAILURE_TOTAL: &str = "refolo_purge_failure_total";

/// Purge every subject URL against the configured endpoint.
///
/// Dispatches run concurrently since they share no state; each is
/// independently bounded by `timeout`. Returns one result per subject
/// URL, in input order. Never returns an error: failures come back as
/// result values.
pub async fn purge_all(
    client: &PurgeClient,
    endpoint: &CacheEndpoint,
    timeout: Duration,
    urls: &[String],
) -> Vec<PurgeResult> {
    let results = join_all(
        urls.iter()
            .map(|url| purge_one(client, endpoint, timeout, url)),
    )
    .await;

    let failed = results.iter().filter(|result| !result.succeeded()).count();
    info!(total = results.len(), failed, endpoint = %endpoint, "purge burst finished");

    results
}

async fn purge_one(
    client: &PurgeClient,
    endpoint: &CacheEndpoint,
    timeout: Duration,
    url: &str,
) -> PurgeResult {
    counter!(METRIC_PURGE_TOTAL).increment(1);

    let result = match retarget(url, endpoint) {
        Ok(retargeted) => {
            client
                .dispatch(PurgeRequest {
                    subject: url.to_string(),
                    destination: retargeted.destination,
                    host_header: retargeted.host_header,
                    timeout,
                })
                .await
        }
        Err(error) => {
            warn!(url, error = %error, "skipping purge for unusable URL");
            PurgeResult::failed(url, error.into())
        }
    };

    if !result.succeeded() {
        counter!(METRIC_PURGE_FAILURE_TOTAL).increment(1);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::purge::dispatch::PurgeError;

    #[tokio::test]
    async fn empty_burst_is_a_no_op() {
        let client = PurgeClient::new().expect("build client");
        let endpoint = CacheEndpoint::new("127.0.0.1", None);

        let results = purge_all(&client, &endpoint, Duration::from_secs(1), &[]).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn malformed_urls_fail_without_touching_the_network() {
        let client = PurgeClient::new().expect("build client");
        let endpoint = CacheEndpoint::new("127.0.0.1", None);

        let urls = vec!["not a url".to_string(), "/relative/only/".to_string()];
        let results = purge_all(&client, &endpoint, Duration::from_secs(1), &urls).await;

        assert_eq!(results.len(), 2);
        for (result, url) in results.iter().zip(&urls) {
            assert_eq!(&result.url, url);
            assert!(matches!(result.error, Some(PurgeError::Retarget(_))));
        }
    }
}
