//! Recursive configuration merge.
//!
//! Used by the config loader to fold module configs, the root config,
//! and the optional user-override config into one tree.

use serde_json::Value;

/// Deep merge `overlay` into `base`.
///
/// Rules:
/// - **Mappings** are recursively merged (overlay keys override base).
/// - **Arrays** are REPLACED (not concatenated).
/// - **Scalars**: overlay overrides base.
///
/// The merge is associative and left-to-right: folding sources
/// `[S1..Sn]` with this function makes later sources strictly dominate
/// on conflicting leaf and array keys while preserving non-conflicting
/// sibling keys.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(base_value) = base_map.get_mut(key) {
                    deep_merge(base_value, value);
                } else {
                    base_map.insert(key.clone(), value.clone());
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Fold an ordered list of sources into one tree, first source first.
pub fn merge_all<'a, I>(sources: I) -> Value
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut merged = Value::Object(serde_json::Map::new());
    for source in sources {
        deep_merge(&mut merged, source);
    }
    merged
}
