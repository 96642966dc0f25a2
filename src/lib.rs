//! Refolo tells a Varnish cache which URLs to drop when content changes.
//!
//! The interesting part is small: [`purge::retarget`] rewrites a public
//! URL so the request reaches the cache endpoint instead of the public
//! origin while keeping the original host identity, and
//! [`purge::PurgeClient`] issues the `PURGE` request with a bounded wait.
//! Everything else is the plumbing a deployment needs around that pair:
//! layered configuration, structured logging, and a small command-line
//! collaborator.

pub mod config;
pub mod infra;
pub mod purge;
