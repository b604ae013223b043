//! Per-endpoint circuit breaker.
//!
//! Each module endpoint gets its own three-state circuit: closed while
//! calls succeed, open after `failure_threshold` consecutive failures,
//! half-open once `recovery_timeout` has elapsed. The half-open state
//! admits exactly one probe request; concurrent callers are rejected
//! until that probe reports back through [`CircuitBreaker::on_success`]
//! or [`CircuitBreaker::on_failure`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

use murmur_types::{ModuleServerConfig, DEFAULT_FAILURE_THRESHOLD, DEFAULT_RECOVERY_TIMEOUT_SEC};

/// Tunables for one breaker registry.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before admitting a probe.
    pub recovery_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout: Duration::from_secs_f64(DEFAULT_RECOVERY_TIMEOUT_SEC),
        }
    }
}

impl BreakerConfig {
    /// Derive breaker settings from a module's server namespace.
    pub fn from_server(config: &ModuleServerConfig) -> Self {
        Self {
            failure_threshold: config.circuit_breaker_failure_threshold.max(1),
            recovery_timeout: Duration::from_secs_f64(
                config.circuit_breaker_recovery_timeout_sec.max(0.0),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum State {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen,
}

/// Registry of circuit states keyed by endpoint name.
///
/// All transitions happen under one lock, so observed state is always a
/// legal point in the closed → open → half-open cycle.
pub struct CircuitBreaker {
    config: BreakerConfig,
    states: Mutex<HashMap<String, State>>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a request to `key` may proceed right now.
    ///
    /// The open-to-half-open transition happens here: the first call
    /// after the recovery timeout gets `true` (the probe) and moves the
    /// circuit to half-open, where every further call is rejected until
    /// the probe's outcome is reported.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Record a successful call. Closes the circuit and resets failures.
    pub fn on_success(&self, key: &str) {
        let mut states = self.states.lock();
        let prev = states.insert(key.to_string(), State::Closed { failures: 0 });
        if matches!(prev, Some(State::HalfOpen)) {
            info!(endpoint = %key, "circuit closed after successful probe");
        }
    }

    /// Record a failed call.
    pub fn on_failure(&self, key: &str) {
        self.on_failure_at(key, Instant::now());
    }

    /// Current state label for diagnostics.
    pub fn state_name(&self, key: &str) -> &'static str {
        match self.states.lock().get(key) {
            None | Some(State::Closed { .. }) => "closed",
            Some(State::Open { .. }) => "open",
            Some(State::HalfOpen) => "half_open",
        }
    }

    /// Consecutive failure count while closed; 0 otherwise.
    pub fn consecutive_failures(&self, key: &str) -> u32 {
        match self.states.lock().get(key) {
            Some(State::Closed { failures }) => *failures,
            _ => 0,
        }
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut states = self.states.lock();
        let state = states
            .entry(key.to_string())
            .or_insert(State::Closed { failures: 0 });
        match *state {
            State::Closed { .. } => true,
            State::Open { opened_at } => {
                if now.duration_since(opened_at) >= self.config.recovery_timeout {
                    *state = State::HalfOpen;
                    info!(endpoint = %key, "circuit half-open, admitting probe");
                    true
                } else {
                    false
                }
            }
            State::HalfOpen => false,
        }
    }

    fn on_failure_at(&self, key: &str, now: Instant) {
        let mut states = self.states.lock();
        let state = states
            .entry(key.to_string())
            .or_insert(State::Closed { failures: 0 });
        match *state {
            State::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.config.failure_threshold {
                    *state = State::Open { opened_at: now };
                    warn!(endpoint = %key, failures, "circuit opened");
                } else {
                    *state = State::Closed { failures };
                }
            }
            State::HalfOpen => {
                *state = State::Open { opened_at: now };
                warn!(endpoint = %key, "probe failed, circuit reopened");
            }
            // A failure report while already open keeps the existing
            // opened_at so the recovery window is not pushed out by
            // stragglers.
            State::Open { .. } => {}
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, recovery: Duration) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            failure_threshold: threshold,
            recovery_timeout: recovery,
        })
    }

    #[test]
    fn closed_allows_and_counts_failures() {
        let b = breaker(3, Duration::from_secs(30));
        assert!(b.allow("speech"));
        b.on_failure("speech");
        b.on_failure("speech");
        assert_eq!(b.state_name("speech"), "closed");
        assert_eq!(b.consecutive_failures("speech"), 2);
        assert!(b.allow("speech"));
    }

    #[test]
    fn success_resets_failure_count() {
        let b = breaker(3, Duration::from_secs(30));
        b.on_failure("speech");
        b.on_failure("speech");
        b.on_success("speech");
        assert_eq!(b.consecutive_failures("speech"), 0);
        b.on_failure("speech");
        b.on_failure("speech");
        assert_eq!(b.state_name("speech"), "closed");
    }

    #[test]
    fn threshold_opens_circuit() {
        let b = breaker(3, Duration::from_secs(30));
        for _ in 0..3 {
            b.on_failure("speech");
        }
        assert_eq!(b.state_name("speech"), "open");
        assert!(!b.allow("speech"));
    }

    #[test]
    fn recovery_timeout_admits_single_probe() {
        let b = breaker(1, Duration::from_secs(30));
        let t0 = Instant::now();
        b.on_failure_at("speech", t0);
        assert!(!b.allow_at("speech", t0 + Duration::from_secs(10)));

        // First caller after the window becomes the probe.
        assert!(b.allow_at("speech", t0 + Duration::from_secs(30)));
        assert_eq!(b.state_name("speech"), "half_open");

        // Concurrent callers are rejected until the probe reports.
        assert!(!b.allow_at("speech", t0 + Duration::from_secs(31)));
        assert!(!b.allow_at("speech", t0 + Duration::from_secs(120)));
    }

    #[test]
    fn probe_success_closes() {
        let b = breaker(1, Duration::from_secs(30));
        let t0 = Instant::now();
        b.on_failure_at("speech", t0);
        assert!(b.allow_at("speech", t0 + Duration::from_secs(30)));
        b.on_success("speech");
        assert_eq!(b.state_name("speech"), "closed");
        assert!(b.allow("speech"));
    }

    #[test]
    fn probe_failure_reopens_with_fresh_window() {
        let b = breaker(1, Duration::from_secs(30));
        let t0 = Instant::now();
        b.on_failure_at("speech", t0);
        assert!(b.allow_at("speech", t0 + Duration::from_secs(30)));
        b.on_failure_at("speech", t0 + Duration::from_secs(31));

        assert_eq!(b.state_name("speech"), "open");
        // The window restarts from the probe failure, not the original open.
        assert!(!b.allow_at("speech", t0 + Duration::from_secs(60)));
        assert!(b.allow_at("speech", t0 + Duration::from_secs(61)));
    }

    #[test]
    fn endpoints_are_independent() {
        let b = breaker(1, Duration::from_secs(30));
        b.on_failure("speech");
        assert_eq!(b.state_name("speech"), "open");
        assert_eq!(b.state_name("browser"), "closed");
        assert!(b.allow("browser"));
    }

    #[test]
    fn config_from_server_namespace() {
        let mut server = ModuleServerConfig::default();
        server.circuit_breaker_failure_threshold = 2;
        server.circuit_breaker_recovery_timeout_sec = 5.0;
        let cfg = BreakerConfig::from_server(&server);
        assert_eq!(cfg.failure_threshold, 2);
        assert_eq!(cfg.recovery_timeout, Duration::from_secs(5));
    }
}
