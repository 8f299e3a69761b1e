//! Brezza cache layer.
//!
//! A single generic primitive, [`ExpiringCache`], backs every memoization
//! site in the pipeline: rendered page bytes (per-weblog and site-wide)
//! and parsed remote newsfeeds. Instances are constructed explicitly by
//! the composition root and injected where needed; there is no process-wide
//! cache state.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! page_capacity = 200
//! page_ttl_secs = 1800
//! # ... see config.rs for all options
//! ```

mod config;
mod expiring;
mod keys;
mod lock;

pub use config::CacheConfig;
pub use expiring::ExpiringCache;
pub use keys::PageKey;
