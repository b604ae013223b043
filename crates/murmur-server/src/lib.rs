//! # murmur-server
//!
//! Standardized base for murmur modules deployed as separate services.
//! A module brings its own routes; this crate supplies the shared
//! contract the host relies on:
//!
//! - **[`envelope`]** -- the `{"error": {"code", "message"}}` error
//!   envelope and the [`require_service`] guard.
//! - **[`health`]** -- the `/health` document, shared readiness flag,
//!   and the periodic [`HealthReporter`] probe task.
//! - **[`server`]** -- [`ModuleServer`], which assembles the router,
//!   serves it, and handles discovery registration.

pub mod envelope;
pub mod error;
pub mod health;
pub mod server;

pub use envelope::{error_response, require_service, service_unavailable, ErrorBody, ErrorDetail};
pub use error::{Result, ServerError};
pub use health::{HealthReporter, HealthState, Readiness, ReadinessProbe};
pub use server::{ModuleServer, ServerState};
