//! Consul-backed service discovery with a TTL resolution cache.
//!
//! The catalog seam is a trait so the resolution and caching logic can
//! be tested without a discovery backend. [`HttpCatalog`] speaks the
//! Consul agent HTTP API; [`DiscoveryClient`] layers first-healthy
//! selection and a per-service cache on top of any catalog.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use murmur_types::DiscoveryBackend;

use crate::error::{ClientError, Result};

/// One healthy instance of a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub address: String,
    pub port: u16,
}

impl ServiceInstance {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.address, self.port)
    }
}

/// Registration details for a module server announcing itself.
#[derive(Debug, Clone)]
pub struct ServiceRegistration {
    /// Logical service name modules look up.
    pub name: String,
    /// Unique instance id; defaults to `{name}-{address}-{port}`.
    pub id: String,
    pub address: String,
    pub port: u16,
    /// Path the backend's HTTP health check should hit.
    pub health_path: String,
    /// How often the backend probes the health path.
    pub check_interval: Duration,
}

impl ServiceRegistration {
    pub fn new(name: &str, address: &str, port: u16) -> Self {
        Self {
            name: name.to_string(),
            id: format!("{name}-{address}-{port}"),
            address: address.to_string(),
            port,
            health_path: "/health".to_string(),
            check_interval: Duration::from_secs(10),
        }
    }
}

/// Read/write access to a service catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All passing instances of `service`, in backend order.
    async fn healthy_instances(&self, service: &str) -> Result<Vec<ServiceInstance>>;

    /// Announce an instance with an HTTP health check.
    async fn register(&self, registration: &ServiceRegistration) -> Result<()>;

    /// Remove an instance by id.
    async fn deregister(&self, service_id: &str) -> Result<()>;
}

#[derive(Deserialize)]
struct HealthEntry {
    #[serde(rename = "Node")]
    node: NodeEntry,
    #[serde(rename = "Service")]
    service: ServiceEntry,
}

#[derive(Deserialize)]
struct NodeEntry {
    #[serde(rename = "Address")]
    address: String,
}

#[derive(Deserialize)]
struct ServiceEntry {
    #[serde(rename = "Address", default)]
    address: String,
    #[serde(rename = "Port")]
    port: u16,
}

#[derive(Serialize)]
struct RegisterBody {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Address")]
    address: String,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Check")]
    check: RegisterCheck,
}

#[derive(Serialize)]
struct RegisterCheck {
    #[serde(rename = "HTTP")]
    http: String,
    #[serde(rename = "Interval")]
    interval: String,
    #[serde(rename = "DeregisterCriticalServiceAfter")]
    deregister_after: String,
}

/// Consul agent HTTP API client.
pub struct HttpCatalog {
    base: String,
    http: reqwest::Client,
}

impl HttpCatalog {
    pub fn new(backend: &DiscoveryBackend) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            base: format!("http://{}:{}", backend.host, backend.port),
            http,
        })
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn healthy_instances(&self, service: &str) -> Result<Vec<ServiceInstance>> {
        let url = format!("{}/v1/health/service/{service}?passing=true", self.base);
        let response = self.http.get(&url).send().await?.error_for_status()?;
        let entries: Vec<HealthEntry> = response.json().await?;
        let instances = entries
            .into_iter()
            .map(|entry| {
                // Consul leaves Service.Address empty when the service
                // inherits the node address.
                let address = if entry.service.address.is_empty() {
                    entry.node.address
                } else {
                    entry.service.address
                };
                ServiceInstance {
                    address,
                    port: entry.service.port,
                }
            })
            .collect();
        Ok(instances)
    }

    async fn register(&self, registration: &ServiceRegistration) -> Result<()> {
        let body = RegisterBody {
            id: registration.id.clone(),
            name: registration.name.clone(),
            address: registration.address.clone(),
            port: registration.port,
            check: RegisterCheck {
                http: format!(
                    "http://{}:{}{}",
                    registration.address, registration.port, registration.health_path
                ),
                interval: format!("{}s", registration.check_interval.as_secs().max(1)),
                deregister_after: "60s".to_string(),
            },
        };
        let url = format!("{}/v1/agent/service/register", self.base);
        self.http
            .put(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        info!(service = %registration.name, id = %registration.id, "registered with discovery");
        Ok(())
    }

    async fn deregister(&self, service_id: &str) -> Result<()> {
        let url = format!("{}/v1/agent/service/deregister/{service_id}", self.base);
        self.http.put(&url).send().await?.error_for_status()?;
        info!(id = %service_id, "deregistered from discovery");
        Ok(())
    }
}

struct CachedEndpoint {
    base_url: String,
    resolved_at: Instant,
}

/// Resolves service names to base URLs, caching each answer for a TTL.
pub struct DiscoveryClient<C> {
    catalog: C,
    ttl: Duration,
    cache: Mutex<HashMap<String, CachedEndpoint>>,
}

impl<C: Catalog> DiscoveryClient<C> {
    pub fn new(catalog: C, ttl: Duration) -> Self {
        Self {
            catalog,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Base URL of the first healthy instance of `service`.
    ///
    /// Lookup failures are logged and returned as
    /// [`ClientError::Discovery`]; the caller decides whether to retry.
    pub async fn resolve(&self, service: &str) -> Result<String> {
        self.resolve_at(service, Instant::now()).await
    }

    /// Drop the cached answer for `service`, forcing a fresh lookup.
    pub fn invalidate(&self, service: &str) {
        self.cache.lock().remove(service);
    }

    async fn resolve_at(&self, service: &str, now: Instant) -> Result<String> {
        if let Some(cached) = self.cache.lock().get(service) {
            if now.duration_since(cached.resolved_at) < self.ttl {
                return Ok(cached.base_url.clone());
            }
        }

        let instances = match self.catalog.healthy_instances(service).await {
            Ok(instances) => instances,
            Err(err) => {
                warn!(service, error = %err, "discovery lookup failed");
                Vec::new()
            }
        };

        let Some(first) = instances.first() else {
            return Err(ClientError::Discovery(format!(
                "no healthy instances of '{service}'"
            )));
        };

        let base_url = first.base_url();
        debug!(service, endpoint = %base_url, "resolved service endpoint");
        self.cache.lock().insert(
            service.to_string(),
            CachedEndpoint {
                base_url: base_url.clone(),
                resolved_at: now,
            },
        );
        Ok(base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedCatalog {
        instances: Vec<ServiceInstance>,
        lookups: AtomicU32,
    }

    impl FixedCatalog {
        fn new(instances: Vec<ServiceInstance>) -> Self {
            Self {
                instances,
                lookups: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Catalog for FixedCatalog {
        async fn healthy_instances(&self, _service: &str) -> Result<Vec<ServiceInstance>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.instances.clone())
        }

        async fn register(&self, _registration: &ServiceRegistration) -> Result<()> {
            Ok(())
        }

        async fn deregister(&self, _service_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn instance(address: &str, port: u16) -> ServiceInstance {
        ServiceInstance {
            address: address.to_string(),
            port,
        }
    }

    #[tokio::test]
    async fn resolves_first_healthy_instance() {
        let client = DiscoveryClient::new(
            FixedCatalog::new(vec![instance("10.0.0.4", 8711), instance("10.0.0.5", 8711)]),
            Duration::from_secs(30),
        );
        let url = client.resolve("browser").await.unwrap();
        assert_eq!(url, "http://10.0.0.4:8711");
    }

    #[tokio::test]
    async fn no_instances_is_discovery_error() {
        let client = DiscoveryClient::new(FixedCatalog::new(vec![]), Duration::from_secs(30));
        let err = client.resolve("browser").await.unwrap_err();
        assert!(matches!(err, ClientError::Discovery(_)));
    }

    #[tokio::test]
    async fn cache_hit_within_ttl() {
        let client = DiscoveryClient::new(
            FixedCatalog::new(vec![instance("10.0.0.4", 8711)]),
            Duration::from_secs(30),
        );
        let t0 = Instant::now();
        client.resolve_at("browser", t0).await.unwrap();
        client
            .resolve_at("browser", t0 + Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(client.catalog.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cache_expires_after_ttl() {
        let client = DiscoveryClient::new(
            FixedCatalog::new(vec![instance("10.0.0.4", 8711)]),
            Duration::from_secs(30),
        );
        let t0 = Instant::now();
        client.resolve_at("browser", t0).await.unwrap();
        client
            .resolve_at("browser", t0 + Duration::from_secs(31))
            .await
            .unwrap();
        assert_eq!(client.catalog.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_fresh_lookup() {
        let client = DiscoveryClient::new(
            FixedCatalog::new(vec![instance("10.0.0.4", 8711)]),
            Duration::from_secs(30),
        );
        client.resolve("browser").await.unwrap();
        client.invalidate("browser");
        client.resolve("browser").await.unwrap();
        assert_eq!(client.catalog.lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn registration_defaults() {
        let reg = ServiceRegistration::new("murmur-browser", "10.0.0.4", 8711);
        assert_eq!(reg.id, "murmur-browser-10.0.0.4-8711");
        assert_eq!(reg.health_path, "/health");
    }
}
