//! Module server assembly and lifecycle.
//!
//! [`ModuleServer`] wires a module's routes into the standardized base:
//! the `/health` route, request counting, and request tracing. It then
//! owns the serve loop, including optional discovery registration on
//! startup and best-effort deregistration on shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use murmur_client::{Catalog, HttpCatalog, ServiceRegistration};
use murmur_types::ModuleServerConfig;

use crate::error::{Result, ServerError};
use crate::health::{health_handler, HealthState, Readiness};

/// Per-server counters shared with middleware.
#[derive(Clone)]
pub struct ServerState {
    requests: Arc<AtomicU64>,
}

impl ServerState {
    fn new() -> Self {
        Self {
            requests: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

async fn count_requests(State(state): State<ServerState>, request: Request, next: Next) -> Response {
    state.requests.fetch_add(1, Ordering::Relaxed);
    next.run(request).await
}

/// A module service built on the standardized base.
pub struct ModuleServer {
    name: String,
    config: ModuleServerConfig,
    routes: Router,
    readiness: Readiness,
    state: ServerState,
}

impl ModuleServer {
    /// Modules that never report unready can leave the default
    /// always-ready flag in place.
    pub fn new(name: &str, config: ModuleServerConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            routes: Router::new(),
            readiness: Readiness::new(true),
            state: ServerState::new(),
        }
    }

    /// Mount the module's own routes alongside the base routes.
    pub fn with_routes(mut self, routes: Router) -> Self {
        self.routes = routes;
        self
    }

    /// Share an externally managed readiness flag, typically driven by
    /// a [`crate::health::HealthReporter`].
    pub fn with_readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }

    pub fn state(&self) -> ServerState {
        self.state.clone()
    }

    /// Assemble the full router.
    ///
    /// The counter state exists before the middleware that references it
    /// is installed; layers added here see every route, including
    /// `/health` and the module's own.
    pub fn router(&self) -> Router {
        let health = Router::new()
            .route("/health", get(health_handler))
            .with_state(HealthState::new(self.readiness.clone()));

        self.routes
            .clone()
            .merge(health)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                count_requests,
            ))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind, optionally register with discovery, and serve until the
    /// cancellation token fires. Deregistration is best-effort.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!(module = %self.name, %addr, "module server listening");

        let registration = if self.config.use_service_discovery {
            Some(self.register_with_discovery().await?)
        } else {
            None
        };

        let router = self.router();
        let shutdown = cancel.clone();
        let served = axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;

        if let Some((catalog, service_id)) = registration {
            if let Err(err) = catalog.deregister(&service_id).await {
                warn!(module = %self.name, error = %err, "discovery deregistration failed");
            }
        }

        served?;
        info!(module = %self.name, "module server stopped");
        Ok(())
    }

    async fn register_with_discovery(&self) -> Result<(HttpCatalog, String)> {
        let catalog = HttpCatalog::new(&self.config.discovery)?;
        let mut registration =
            ServiceRegistration::new(&self.name, &self.config.host, self.config.port);
        registration.check_interval =
            Duration::from_secs_f64(self.config.health_check_interval_sec.max(1.0));
        // Registration failure is survivable; clients fall back to
        // static addressing.
        if let Err(err) = catalog.register(&registration).await {
            warn!(module = %self.name, error = %err, "discovery registration failed");
        }
        Ok((catalog, registration.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;

    fn server() -> ModuleServer {
        let mut config = ModuleServerConfig::default();
        config.enabled = true;
        ModuleServer::new("browser", config)
    }

    #[test]
    fn request_counter_starts_at_zero() {
        let s = server();
        assert_eq!(s.state().request_count(), 0);
    }

    #[test]
    fn router_builds_with_module_routes() {
        let routes = Router::new().route("/execute", post(|| async { "ok" }));
        let s = server().with_routes(routes);
        // Router construction panics on conflicting routes; building it
        // proves /health and the module routes coexist.
        let _ = s.router();
    }

    #[test]
    fn readiness_defaults_to_ready() {
        let s = server();
        assert!(s.readiness().is_ready());
    }

    #[test]
    fn external_readiness_flag_is_shared() {
        let flag = Readiness::default();
        let s = server().with_readiness(flag.clone());
        flag.set(true);
        assert!(s.readiness().is_ready());
    }
}
