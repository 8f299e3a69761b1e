//! Infrastructure adapters: disk-backed site data, remote feeds, HTTP
//! surface and telemetry bootstrap.

pub mod error;
pub mod feed;
pub mod fetch;
pub mod http;
pub mod site;
pub mod telemetry;

pub use error::InfraError;
