//! Cache configuration.
//!
//! Capacities and TTLs for the three cache instances the composition root
//! constructs: per-weblog page bytes, site-wide page bytes, and parsed
//! newsfeed documents.

use std::time::Duration;

use serde::Deserialize;

const DEFAULT_PAGE_CAPACITY: usize = 200;
const DEFAULT_PAGE_TTL_SECS: u64 = 1800;
const DEFAULT_SITE_CAPACITY: usize = 100;
const DEFAULT_SITE_TTL_SECS: u64 = 1800;
const DEFAULT_NEWSFEED_CAPACITY: usize = 50;
const DEFAULT_NEWSFEED_TTL_SECS: u64 = 3600;

/// Cache configuration from `brezza.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum rendered pages in the per-weblog cache. 0 disables it.
    pub page_capacity: usize,
    /// Maximum age of a cached page in seconds.
    pub page_ttl_secs: u64,
    /// Maximum rendered pages in the site-wide cache. 0 disables it.
    pub site_capacity: usize,
    /// Maximum age of a site-wide cached page in seconds.
    pub site_ttl_secs: u64,
    /// Maximum parsed newsfeeds kept in memory. 0 disables the cache.
    pub newsfeed_capacity: usize,
    /// Maximum age of a cached newsfeed in seconds.
    pub newsfeed_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            page_capacity: DEFAULT_PAGE_CAPACITY,
            page_ttl_secs: DEFAULT_PAGE_TTL_SECS,
            site_capacity: DEFAULT_SITE_CAPACITY,
            site_ttl_secs: DEFAULT_SITE_TTL_SECS,
            newsfeed_capacity: DEFAULT_NEWSFEED_CAPACITY,
            newsfeed_ttl_secs: DEFAULT_NEWSFEED_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl_secs)
    }

    pub fn site_ttl(&self) -> Duration {
        Duration::from_secs(self.site_ttl_secs)
    }

    pub fn newsfeed_ttl(&self) -> Duration {
        Duration::from_secs(self.newsfeed_ttl_secs)
    }
}
