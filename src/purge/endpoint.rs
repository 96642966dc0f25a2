//! Cache endpoint identity.

use std::fmt;

/// Network address of the Varnish instance that terminates purge
/// requests, distinct from the public origin address the subject URLs
/// name.
///
/// Immutable once loaded. When `port` is unset, the scheme-default port
/// of the retargeted URL applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEndpoint {
    /// IP address or hostname where Varnish listens.
    pub host: String,
    /// Explicit listener port, if any.
    pub port: Option<u16>,
}

impl CacheEndpoint {
    /// Create a new cache endpoint.
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for CacheEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{port}", self.host),
            None => f.write_str(&self.host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_without_port() {
        let endpoint = CacheEndpoint::new("127.0.0.1", None);
        assert_eq!(endpoint.to_string(), "127.0.0.1");
    }

    #[test]
    fn display_with_port() {
        let endpoint = CacheEndpoint::new("cache.internal", Some(6081));
        assert_eq!(endpoint.to_string(), "cache.internal:6081");
    }
}
