//! URL retargeting for cache purges.
//!
//! A purge request must reach the Varnish instance itself, not the public
//! origin the URL names. Retargeting swaps the URL's authority for the
//! cache endpoint's while keeping the original host as the request's
//! virtual-host identity, so a cache node fronting several sites evicts
//! the right object.

use thiserror::Error;
use url::Url;

use super::endpoint::CacheEndpoint;

/// A subject URL rewritten to point at the cache endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retargeted {
    /// Where to send the request: the original scheme, path, and query
    /// with the endpoint's authority.
    pub destination: Url,
    /// Value for the `Host` header: the original URL's host, plus
    /// `:port` when the URL carries a non-default port.
    pub host_header: String,
}

#[derive(Debug, Error)]
pub enum RetargetError {
    /// The subject URL is not an absolute, well-formed URL.
    #[error("failed to parse `{url}`: {source}")]
    Parse {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// The subject URL has no host component to preserve.
    #[error("`{url}` has no host to retarget")]
    MissingHost { url: String },
    /// Purges travel over HTTP; other schemes cannot be dispatched.
    #[error("`{url}` uses unsupported scheme `{scheme}`")]
    UnsupportedScheme { url: String, scheme: String },
    /// The configured endpoint cannot stand in as the URL's authority.
    #[error("cache endpoint `{endpoint}` is not usable: {reason}")]
    Endpoint { endpoint: String, reason: String },
}

/// Rewrite `url` so the request goes to `endpoint` while keeping the
/// original host identity.
///
/// Pure and idempotent: the same inputs always produce the same output,
/// and a failure never yields a partially-constructed destination. Query
/// strings pass through exactly as parsed, with no re-encoding.
pub fn retarget(url: &str, endpoint: &CacheEndpoint) -> Result<Retargeted, RetargetError> {
    let parsed = Url::parse(url).map_err(|source| RetargetError::Parse {
        url: url.to_string(),
        source,
    })?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(RetargetError::UnsupportedScheme {
            url: url.to_string(),
            scheme: scheme.to_string(),
        });
    }

    let host = parsed.host_str().ok_or_else(|| RetargetError::MissingHost {
        url: url.to_string(),
    })?;
    // `Url::port` is None for the scheme default, so the header only
    // names a port the subject URL spelled out.
    let host_header = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut destination = parsed.clone();
    destination
        .set_host(Some(endpoint.host.as_str()))
        .map_err(|source| RetargetError::Endpoint {
            endpoint: endpoint.to_string(),
            reason: source.to_string(),
        })?;
    if destination.set_port(endpoint.port).is_err() {
        return Err(RetargetError::Endpoint {
            endpoint: endpoint.to_string(),
            reason: "cannot carry a port".to_string(),
        });
    }

    Ok(Retargeted {
        destination,
        host_header,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> CacheEndpoint {
        CacheEndpoint::new("127.0.0.1", None)
    }

    #[test]
    fn authority_is_replaced_and_host_preserved() {
        let retargeted =
            retarget("http://example.com/2012/my-post/", &loopback()).expect("retarget");

        assert_eq!(
            retargeted.destination.as_str(),
            "http://127.0.0.1/2012/my-post/"
        );
        assert_eq!(retargeted.host_header, "example.com");
    }

    #[test]
    fn query_string_passes_through_unmodified() {
        let retargeted = retarget(
            "http://example.com/2012/my-post/?preview=true",
            &loopback(),
        )
        .expect("retarget");

        assert_eq!(
            retargeted.destination.as_str(),
            "http://127.0.0.1/2012/my-post/?preview=true"
        );
    }

    #[test]
    fn endpoint_port_lands_in_the_destination() {
        let endpoint = CacheEndpoint::new("cache.internal", Some(6081));
        let retargeted = retarget("https://blog.example.org/feed/", &endpoint).expect("retarget");

        assert_eq!(
            retargeted.destination.as_str(),
            "https://cache.internal:6081/feed/"
        );
        assert_eq!(retargeted.host_header, "blog.example.org");
    }

    #[test]
    fn bare_domain_gains_the_root_path_at_parse_time() {
        let retargeted = retarget("http://example.com", &loopback()).expect("retarget");
        assert_eq!(retargeted.destination.as_str(), "http://127.0.0.1/");
    }

    #[test]
    fn non_default_port_survives_in_the_host_header() {
        let retargeted = retarget("http://example.com:8080/a/", &loopback()).expect("retarget");

        assert_eq!(retargeted.host_header, "example.com:8080");
        assert_eq!(retargeted.destination.as_str(), "http://127.0.0.1/a/");
    }

    #[test]
    fn explicit_default_port_is_dropped_from_the_host_header() {
        let retargeted = retarget("http://example.com:80/a/", &loopback()).expect("retarget");
        assert_eq!(retargeted.host_header, "example.com");
    }

    #[test]
    fn relative_url_is_rejected() {
        let error = retarget("/2012/my-post/", &loopback()).expect_err("must fail");
        assert!(matches!(error, RetargetError::Parse { .. }));
    }

    #[test]
    fn hostless_url_is_rejected() {
        let error = retarget("http://", &loopback()).expect_err("must fail");
        assert!(matches!(error, RetargetError::Parse { .. }));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let error = retarget("mailto:webmaster@example.com", &loopback()).expect_err("must fail");
        assert!(matches!(error, RetargetError::UnsupportedScheme { .. }));
    }

    #[test]
    fn unusable_endpoint_host_is_reported() {
        let endpoint = CacheEndpoint::new("not a host", None);
        let error = retarget("http://example.com/", &endpoint).expect_err("must fail");
        assert!(matches!(error, RetargetError::Endpoint { .. }));
    }

    #[test]
    fn retarget_is_idempotent() {
        let endpoint = CacheEndpoint::new("cache.internal", Some(6081));
        let first = retarget("https://blog.example.org/feed/?page=2", &endpoint).expect("first");
        let second = retarget("https://blog.example.org/feed/?page=2", &endpoint).expect("second");

        assert_eq!(first, second);
    }
}
