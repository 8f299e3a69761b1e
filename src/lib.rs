//! Brezza: a weblog page rendering server.
//!
//! Pages are produced by a render pipeline that resolves a weblog, picks a
//! template from its theme, populates a model and dispatches to a renderer
//! keyed by template language and device class. Rendered bytes are
//! memoized in capacity-bounded, TTL-expiring caches.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
