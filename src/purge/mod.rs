//! Varnish purge pipeline.
//!
//! Turns a content change into delivered `PURGE` requests in three
//! steps:
//!
//! - **Plan**: collect the subject URLs one change affects
//! - **Retarget**: swap each URL's authority for the cache endpoint's,
//!   keeping the original host identity
//! - **Dispatch**: send one timeout-bounded `PURGE` request per URL
//!
//! ## Configuration
//!
//! The endpoint and timeout come from `refolo.toml`:
//!
//! ```toml
//! [varnish]
//! host = "127.0.0.1"
//! port = 6081
//! timeout_seconds = 1
//! ```

mod burst;
mod dispatch;
mod endpoint;
mod plan;
mod retarget;

pub use burst::purge_all;
pub use dispatch::{PurgeClient, PurgeError, PurgeRequest, PurgeResult, USER_AGENT};
pub use endpoint::CacheEndpoint;
pub use plan::ContentChange;
pub use retarget::{RetargetError, Retargeted, retarget};
