//! Resilient client for module servers.
//!
//! [`ModuleClient`] wraps every call to a module service with the full
//! resilience stack: circuit-breaker gate, endpoint resolution (static
//! host/port or service discovery), bounded retries with a fixed delay,
//! and decoding of the standardized error envelope. The HTTP layer sits
//! behind the [`Transport`] seam so call semantics are testable without
//! a server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use murmur_types::ModuleServerConfig;

use crate::breaker::{BreakerConfig, CircuitBreaker};
use crate::discovery::{Catalog, DiscoveryClient, HttpCatalog};
use crate::error::{ClientError, Result};

/// Status and decoded JSON body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP surface the client needs.
///
/// Errors mean the exchange never completed (connect, timeout, broken
/// body); a served error status comes back as a normal response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse>;
    async fn get_json(&self, url: &str) -> Result<TransportResponse>;
}

/// Production transport: reqwest with a per-request timeout and an
/// optional `X-Api-Key` header.
pub struct HttpTransport {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl HttpTransport {
    pub fn new(timeout: Duration, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, api_key })
    }

    async fn decode(response: reqwest::Response) -> Result<TransportResponse> {
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        // A success reply must carry JSON; a broken body there is a
        // transport-level failure and gets retried. Error pages are not
        // always JSON, so those decode to null and the caller falls back
        // to status-derived messages.
        let body = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(err) if (200..300).contains(&status) => return Err(err.into()),
            Err(_) => Value::Null,
        };
        Ok(TransportResponse { status, body })
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-Api-Key", key),
            None => request,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<TransportResponse> {
        let request = self.apply_auth(self.http.post(url).json(body));
        Self::decode(request.send().await?).await
    }

    async fn get_json(&self, url: &str) -> Result<TransportResponse> {
        let request = self.apply_auth(self.http.get(url));
        Self::decode(request.send().await?).await
    }
}

/// Whether a served status is worth another attempt.
fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Extract `{"error": {"code", "message"}}` from a response body,
/// falling back to status-derived values.
fn decode_error_envelope(status: u16, body: &Value) -> (String, String) {
    let envelope = body.get("error");
    let code = envelope
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .unwrap_or("http_error")
        .to_string();
    let message = envelope
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("request failed with status {status}"));
    (code, message)
}

/// Client for one module's service endpoint.
pub struct ModuleClient<T = HttpTransport, C = HttpCatalog> {
    module: String,
    config: ModuleServerConfig,
    transport: T,
    breaker: Arc<CircuitBreaker>,
    discovery: Option<Arc<DiscoveryClient<C>>>,
}

impl ModuleClient {
    /// Build a production client from a module's server namespace.
    pub fn new(module: &str, config: ModuleServerConfig) -> Result<Self> {
        let timeout = Duration::from_secs_f64(config.timeout_sec.max(0.1));
        let transport = HttpTransport::new(timeout, config.api_key.clone())?;
        let breaker = Arc::new(CircuitBreaker::new(BreakerConfig::from_server(&config)));
        let discovery = if config.use_service_discovery {
            let catalog = HttpCatalog::new(&config.discovery)?;
            // Cached endpoints go stale no slower than the health checks
            // that would mark an instance unhealthy.
            let ttl = Duration::from_secs_f64(config.health_check_interval_sec.max(1.0));
            Some(Arc::new(DiscoveryClient::new(catalog, ttl)))
        } else {
            None
        };
        Ok(Self::with_parts(module, config, transport, breaker, discovery))
    }
}

impl<T: Transport, C: Catalog> ModuleClient<T, C> {
    /// Assemble a client from explicit parts. Test seams and shared
    /// breakers enter here.
    pub fn with_parts(
        module: &str,
        config: ModuleServerConfig,
        transport: T,
        breaker: Arc<CircuitBreaker>,
        discovery: Option<Arc<DiscoveryClient<C>>>,
    ) -> Self {
        Self {
            module: module.to_string(),
            config,
            transport,
            breaker,
            discovery,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// POST `payload` to the named operation and return the JSON reply.
    ///
    /// The operation maps to a path through the config's `endpoints`
    /// table, defaulting to `/{operation}`. One breaker outcome is
    /// recorded per call, not per attempt.
    pub async fn call(&self, operation: &str, payload: &Value) -> Result<Value> {
        if !self.breaker.allow(&self.module) {
            return Err(ClientError::CircuitOpen {
                module: self.module.clone(),
            });
        }

        let path = self
            .config
            .endpoints
            .get(operation)
            .cloned()
            .unwrap_or_else(|| format!("/{operation}"));
        let attempts = self.config.retry_max.max(1);
        let delay = Duration::from_secs_f64(self.config.retry_delay_sec.max(0.0));

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(delay).await;
            }

            let base_url = match self.resolve_base_url().await {
                Ok(url) => url,
                Err(err) => {
                    // Resolution failure spends an attempt like any other
                    // transient error.
                    warn!(module = %self.module, attempt, error = %err,
                        "endpoint resolution failed");
                    continue;
                }
            };

            let url = format!("{base_url}{path}");
            match self.transport.post_json(&url, payload).await {
                Ok(response) if response.is_success() => {
                    if attempt > 1 {
                        debug!(module = %self.module, attempt, "call succeeded after retry");
                    }
                    self.breaker.on_success(&self.module);
                    return Ok(response.body);
                }
                Ok(response) if is_retryable_status(response.status) => {
                    warn!(module = %self.module, attempt, status = response.status,
                        "retryable server status");
                }
                Ok(response) => {
                    let (code, message) = decode_error_envelope(response.status, &response.body);
                    self.breaker.on_failure(&self.module);
                    return Err(ClientError::Application {
                        status: response.status,
                        code,
                        message,
                    });
                }
                Err(err) => {
                    warn!(module = %self.module, attempt, error = %err, "transport error");
                    // The resolved instance may be gone; re-resolve next
                    // attempt.
                    if let Some(discovery) = &self.discovery {
                        discovery.invalidate(&self.module);
                    }
                }
            }
        }

        self.breaker.on_failure(&self.module);
        Err(ClientError::Unavailable {
            module: self.module.clone(),
            attempts,
        })
    }

    /// Fetch the module's `/health` document. Not breaker-gated; health
    /// checks are how a broken circuit gets evidence for recovery.
    pub async fn health(&self) -> Result<Value> {
        let base_url = self.resolve_base_url().await?;
        let response = self.transport.get_json(&format!("{base_url}/health")).await?;
        Ok(response.body)
    }

    async fn resolve_base_url(&self) -> Result<String> {
        match &self.discovery {
            Some(discovery) => discovery.resolve(&self.module).await,
            None => Ok(self.config.base_url()),
        }
    }
}
