//! # murmur-client
//!
//! Resilient HTTP client layer for murmur modules that run as separate
//! services. Exposes:
//!
//! - **[`breaker`]** -- per-endpoint circuit breaker with a single-probe
//!   half-open policy.
//! - **[`discovery`]** -- Consul-style catalog access plus a TTL-cached
//!   endpoint resolver.
//! - **[`client`]** -- [`ModuleClient`], which combines breaker gate,
//!   endpoint resolution, retries, and error-envelope decoding behind a
//!   transport seam.

pub mod breaker;
pub mod client;
pub mod discovery;
pub mod error;

pub use breaker::{BreakerConfig, CircuitBreaker};
pub use client::{HttpTransport, ModuleClient, Transport, TransportResponse};
pub use discovery::{
    Catalog, DiscoveryClient, HttpCatalog, ServiceInstance, ServiceRegistration,
};
pub use error::{ClientError, Result};
