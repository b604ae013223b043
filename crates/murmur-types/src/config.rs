//! The merged host configuration tree.
//!
//! [`HostConfig`] wraps the raw merged `serde_json::Value` produced by the
//! config loader. Typed accessors normalize the sections the host itself
//! reads; modules read their own namespace via [`HostConfig::section`].

use serde_json::Value;
use std::sync::Arc;

/// The process-wide merged configuration.
///
/// Cheap to clone (the tree is behind an `Arc`); immutable after startup.
#[derive(Debug, Clone)]
pub struct HostConfig {
    raw: Arc<Value>,
}

impl HostConfig {
    /// Wrap a merged configuration tree.
    ///
    /// Non-object trees are normalized to an empty object so that section
    /// lookups on a degenerate config behave like lookups on an empty one.
    pub fn new(raw: Value) -> Self {
        let raw = if raw.is_object() {
            raw
        } else {
            Value::Object(serde_json::Map::new())
        };
        Self { raw: Arc::new(raw) }
    }

    /// The raw merged tree.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// A top-level section by name, or `None` if absent or not a mapping.
    pub fn section(&self, name: &str) -> Option<&serde_json::Map<String, Value>> {
        self.raw.get(name).and_then(Value::as_object)
    }

    /// Log level from `logging.level`, defaulting to `"info"`.
    pub fn log_level(&self) -> String {
        self.string_at(&["logging", "level"])
            .unwrap_or_else(|| "info".to_string())
    }

    /// A string leaf at a key path, `None` if absent or not a string.
    pub fn string_at(&self, path: &[&str]) -> Option<String> {
        let mut node = self.raw.as_ref();
        for key in path {
            node = node.get(key)?;
        }
        node.as_str().map(|s| s.trim().to_string())
    }

    /// An integer leaf at a key path, clamped to `[low, high]`, or
    /// `default` when absent or not numeric.
    pub fn clamped_int_at(&self, path: &[&str], low: i64, high: i64, default: i64) -> i64 {
        let mut node = self.raw.as_ref();
        for key in path {
            match node.get(key) {
                Some(next) => node = next,
                None => return default,
            }
        }
        clamp_int(node, low, high, default)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self::new(Value::Object(serde_json::Map::new()))
    }
}

/// Parse a JSON value to an integer and clamp it to `[low, high]`.
///
/// Returns `default` when the value is missing, non-numeric, or a float
/// without an integral representation.
pub fn clamp_int(value: &Value, low: i64, high: i64, default: i64) -> i64 {
    match value.as_i64() {
        Some(n) => n.clamp(low, high),
        None => default,
    }
}

/// Parse a JSON value to a float and clamp it to `[low, high]`.
pub fn clamp_float(value: &Value, low: f64, high: f64, default: f64) -> f64 {
    match value.as_f64() {
        Some(n) => n.clamp(low, high),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn section_lookup() {
        let cfg = HostConfig::new(json!({"speech": {"model": "base"}}));
        let section = cfg.section("speech").unwrap();
        assert_eq!(section.get("model").unwrap(), "base");
        assert!(cfg.section("missing").is_none());
    }

    #[test]
    fn section_on_non_mapping_is_none() {
        let cfg = HostConfig::new(json!({"speech": "base"}));
        assert!(cfg.section("speech").is_none());
    }

    #[test]
    fn non_object_root_normalized() {
        let cfg = HostConfig::new(json!([1, 2, 3]));
        assert!(cfg.raw().is_object());
        assert!(cfg.section("anything").is_none());
    }

    #[test]
    fn log_level_default_and_override() {
        assert_eq!(HostConfig::default().log_level(), "info");
        let cfg = HostConfig::new(json!({"logging": {"level": "debug"}}));
        assert_eq!(cfg.log_level(), "debug");
    }

    #[test]
    fn string_at_trims() {
        let cfg = HostConfig::new(json!({"a": {"b": "  hello  "}}));
        assert_eq!(cfg.string_at(&["a", "b"]).unwrap(), "hello");
        assert!(cfg.string_at(&["a", "c"]).is_none());
        assert!(cfg.string_at(&["a", "b", "c"]).is_none());
    }

    #[test]
    fn clamped_int_at_bounds() {
        let cfg = HostConfig::new(json!({"retrieval": {"top_k": 50}}));
        assert_eq!(cfg.clamped_int_at(&["retrieval", "top_k"], 1, 20, 5), 20);
        assert_eq!(cfg.clamped_int_at(&["retrieval", "missing"], 1, 20, 5), 5);
    }

    #[test]
    fn clamp_int_non_numeric_is_default() {
        assert_eq!(clamp_int(&json!("ten"), 0, 100, 7), 7);
        assert_eq!(clamp_int(&json!(42), 0, 100, 7), 42);
        assert_eq!(clamp_int(&json!(-5), 0, 100, 7), 0);
    }

    #[test]
    fn clamp_float_bounds() {
        assert!((clamp_float(&json!(2.5), 0.0, 2.0, 1.0) - 2.0).abs() < f64::EPSILON);
        assert!((clamp_float(&json!(null), 0.0, 2.0, 1.0) - 1.0).abs() < f64::EPSILON);
    }
}
