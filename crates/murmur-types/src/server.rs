//! Per-module server-mode configuration.
//!
//! When a module runs as a separate network service instead of in-process,
//! its host-side client and the module's own server are both configured
//! from one uniform namespace under the module's config section:
//!
//! ```yaml
//! browser:
//!   server:
//!     enabled: true
//!     host: 127.0.0.1
//!     port: 8711
//!     timeout_sec: 10.0
//!     retry_max: 3
//!     retry_delay_sec: 0.5
//!     health_check_interval_sec: 30
//!     circuit_breaker_failure_threshold: 5
//!     circuit_breaker_recovery_timeout_sec: 30
//!     api_key: secret
//!     use_service_discovery: false
//!     discovery:
//!       host: 127.0.0.1
//!       port: 8500
//! ```
//!
//! All keys are optional; defaults are defined here and nowhere else.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::HostConfig;

/// Circuit-breaker default: consecutive failures before the circuit opens.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Circuit-breaker default: seconds the circuit stays open before probing.
pub const DEFAULT_RECOVERY_TIMEOUT_SEC: f64 = 30.0;

/// Server-mode settings for one module, parsed from `<module>.server`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleServerConfig {
    /// Whether server mode is enabled for this module.
    #[serde(default)]
    pub enabled: bool,

    /// Static host used when service discovery is disabled.
    #[serde(default = "default_host")]
    pub host: String,

    /// Static port used when service discovery is disabled.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: f64,

    /// Total request attempts per call (first try included).
    #[serde(default = "default_retry_max")]
    pub retry_max: u32,

    /// Delay between attempts in seconds.
    #[serde(default = "default_retry_delay_sec")]
    pub retry_delay_sec: f64,

    /// Interval between readiness probes, in seconds.
    #[serde(default = "default_health_check_interval_sec")]
    pub health_check_interval_sec: f64,

    /// Consecutive failures before the circuit opens.
    #[serde(default = "default_failure_threshold")]
    pub circuit_breaker_failure_threshold: u32,

    /// Seconds the circuit stays open before allowing a probe.
    #[serde(default = "default_recovery_timeout_sec")]
    pub circuit_breaker_recovery_timeout_sec: f64,

    /// Optional shared secret sent as `X-Api-Key`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Resolve the endpoint through service discovery instead of
    /// the static host/port.
    #[serde(default)]
    pub use_service_discovery: bool,

    /// Discovery backend address, used when `use_service_discovery` is set
    /// and by servers that register themselves.
    #[serde(default)]
    pub discovery: DiscoveryBackend,

    /// Relative endpoint paths the module exposes, keyed by operation name.
    #[serde(default)]
    pub endpoints: std::collections::BTreeMap<String, String>,
}

/// Address of the service-discovery backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryBackend {
    #[serde(default = "default_discovery_host")]
    pub host: String,
    #[serde(default = "default_discovery_port")]
    pub port: u16,
}

impl Default for DiscoveryBackend {
    fn default() -> Self {
        Self {
            host: default_discovery_host(),
            port: default_discovery_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8700
}
fn default_timeout_sec() -> f64 {
    10.0
}
fn default_retry_max() -> u32 {
    3
}
fn default_retry_delay_sec() -> f64 {
    0.5
}
fn default_health_check_interval_sec() -> f64 {
    30.0
}
fn default_failure_threshold() -> u32 {
    DEFAULT_FAILURE_THRESHOLD
}
fn default_recovery_timeout_sec() -> f64 {
    DEFAULT_RECOVERY_TIMEOUT_SEC
}
fn default_discovery_host() -> String {
    "127.0.0.1".into()
}
fn default_discovery_port() -> u16 {
    8500
}

impl Default for ModuleServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
            timeout_sec: default_timeout_sec(),
            retry_max: default_retry_max(),
            retry_delay_sec: default_retry_delay_sec(),
            health_check_interval_sec: default_health_check_interval_sec(),
            circuit_breaker_failure_threshold: default_failure_threshold(),
            circuit_breaker_recovery_timeout_sec: default_recovery_timeout_sec(),
            api_key: None,
            use_service_discovery: false,
            discovery: DiscoveryBackend::default(),
            endpoints: std::collections::BTreeMap::new(),
        }
    }
}

impl ModuleServerConfig {
    /// Parse `<module>.server` from the merged config.
    ///
    /// Returns `None` when the namespace is absent, not a mapping, or
    /// `enabled` is false -- callers treat `None` as "run in-process".
    /// Unknown keys are ignored; a malformed namespace is logged and
    /// also yields `None`.
    pub fn from_config(config: &HostConfig, module: &str) -> Option<Self> {
        let section = config.section(module)?;
        let server = section.get("server")?;
        let parsed: Self = match serde_json::from_value(server.clone()) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(module, error = %err,
                    "malformed server namespace, treating module as in-process");
                return None;
            }
        };
        parsed.enabled.then_some(parsed)
    }

    /// The static base URL for this module's server.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_namespace_is_none() {
        let cfg = HostConfig::new(json!({"browser": {"cooldown_sec": 2}}));
        assert!(ModuleServerConfig::from_config(&cfg, "browser").is_none());
        assert!(ModuleServerConfig::from_config(&cfg, "speech").is_none());
    }

    #[test]
    fn disabled_is_none() {
        let cfg = HostConfig::new(json!({"speech": {"server": {"enabled": false, "port": 9000}}}));
        assert!(ModuleServerConfig::from_config(&cfg, "speech").is_none());
    }

    #[test]
    fn enabled_with_defaults() {
        let cfg = HostConfig::new(json!({"speech": {"server": {"enabled": true}}}));
        let server = ModuleServerConfig::from_config(&cfg, "speech").unwrap();
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.port, 8700);
        assert_eq!(server.retry_max, 3);
        assert_eq!(server.circuit_breaker_failure_threshold, 5);
        assert!((server.circuit_breaker_recovery_timeout_sec - 30.0).abs() < f64::EPSILON);
        assert!(!server.use_service_discovery);
        assert!(server.api_key.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let cfg = HostConfig::new(json!({
            "browser": {"server": {
                "enabled": true,
                "host": "10.0.0.4",
                "port": 8711,
                "timeout_sec": 2.5,
                "retry_max": 5,
                "api_key": "secret",
                "use_service_discovery": true,
                "discovery": {"host": "consul.local", "port": 8501},
                "endpoints": {"execute": "/browse/execute"}
            }}
        }));
        let server = ModuleServerConfig::from_config(&cfg, "browser").unwrap();
        assert_eq!(server.base_url(), "http://10.0.0.4:8711");
        assert_eq!(server.retry_max, 5);
        assert_eq!(server.api_key.as_deref(), Some("secret"));
        assert!(server.use_service_discovery);
        assert_eq!(server.discovery.host, "consul.local");
        assert_eq!(server.endpoints.get("execute").unwrap(), "/browse/execute");
    }

    #[test]
    fn unknown_keys_ignored() {
        let cfg = HostConfig::new(json!({
            "speech": {"server": {"enabled": true, "future_knob": 12}}
        }));
        assert!(ModuleServerConfig::from_config(&cfg, "speech").is_some());
    }

    #[test]
    fn malformed_namespace_is_none() {
        let cfg = HostConfig::new(json!({"speech": {"server": {"enabled": true, "port": "many"}}}));
        assert!(ModuleServerConfig::from_config(&cfg, "speech").is_none());
    }
}
