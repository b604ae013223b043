//! Health and readiness surface.
//!
//! Every module server exposes `GET /health` with
//! `{status, ready, version, uptime_secs}`. Readiness is a shared flag;
//! a [`HealthReporter`] task polls the module's [`ReadinessProbe`] on an
//! interval and keeps the flag current, so the handler itself never
//! touches module internals.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shared readiness flag, cheap to clone into handlers and reporters.
#[derive(Clone)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn new(initial: bool) -> Self {
        Self(Arc::new(AtomicBool::new(initial)))
    }

    pub fn set(&self, ready: bool) {
        self.0.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new(false)
    }
}

/// A module's own view of whether it can serve requests.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn check(&self) -> bool;
}

/// Polls a [`ReadinessProbe`] on an interval and mirrors the result
/// into a [`Readiness`] flag. Exits when the cancellation token fires.
pub struct HealthReporter {
    probe: Arc<dyn ReadinessProbe>,
    readiness: Readiness,
    interval: Duration,
}

impl HealthReporter {
    pub fn new(probe: Arc<dyn ReadinessProbe>, readiness: Readiness, interval: Duration) -> Self {
        Self {
            probe,
            readiness,
            interval,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "health reporter started"
        );
        let mut interval = tokio::time::interval(self.interval);
        // The first tick fires immediately, giving an initial reading
        // before one full interval elapses.
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("health reporter shutting down");
                    return;
                }
                _ = interval.tick() => {
                    let ready = self.probe.check().await;
                    if ready != self.readiness.is_ready() {
                        if ready {
                            info!("module became ready");
                        } else {
                            warn!("module became unready");
                        }
                    }
                    self.readiness.set(ready);
                }
            }
        }
    }
}

/// State behind the `/health` route.
#[derive(Clone)]
pub struct HealthState {
    pub readiness: Readiness,
    pub started: Instant,
    pub version: &'static str,
}

impl HealthState {
    pub fn new(readiness: Readiness) -> Self {
        Self {
            readiness,
            started: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// `GET /health`. 200 while ready, 503 while not; the body is served
/// either way so operators can read uptime during startup.
pub async fn health_handler(State(state): State<HealthState>) -> Response {
    let ready = state.readiness.is_ready();
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = serde_json::json!({
        "status": if ready { "ok" } else { "starting" },
        "ready": ready,
        "version": state.version,
        "uptime_secs": state.started.elapsed().as_secs(),
    });
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProbe(bool);

    #[async_trait]
    impl ReadinessProbe for FixedProbe {
        async fn check(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn readiness_flag_is_shared() {
        let flag = Readiness::default();
        let clone = flag.clone();
        assert!(!clone.is_ready());
        flag.set(true);
        assert!(clone.is_ready());
    }

    #[tokio::test]
    async fn reporter_flips_flag_from_probe() {
        let readiness = Readiness::default();
        let reporter = HealthReporter::new(
            Arc::new(FixedProbe(true)),
            readiness.clone(),
            Duration::from_millis(10),
        );

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(async move { reporter.run(cancel_clone).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(readiness.is_ready());
    }

    #[tokio::test]
    async fn reporter_shuts_down_on_cancel() {
        let reporter = HealthReporter::new(
            Arc::new(FixedProbe(true)),
            Readiness::default(),
            Duration::from_secs(3600),
        );

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(async move { reporter.run(cancel_clone).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn health_handler_ready_and_unready() {
        let readiness = Readiness::new(true);
        let state = HealthState::new(readiness.clone());

        let response = health_handler(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["ready"], true);

        readiness.set(false);
        let response = health_handler(State(state)).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
