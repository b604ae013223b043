//! Merged configuration loading.
//!
//! Load order is the load-bearing contract: each module config in
//! discovery order, then the root config, then the user-override config
//! if present. User overrides always win; the root config is the
//! operator's authority over module defaults; module defaults establish
//! the floor.
//!
//! Unlike discovery's manifest leniency, configuration correctness is
//! load-bearing for the whole process: a missing root config or any
//! unparsable present file aborts startup.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use murmur_types::HostConfig;

use crate::merge::deep_merge;

/// Environment variable overriding the root config path.
pub const CONFIG_ENV_VAR: &str = "MURMUR_CONFIG";

/// Fatal configuration errors. The host refuses to start on any of these.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The root config anchors the merge; it must exist.
    #[error("root config not found: {0}")]
    RootMissing(PathBuf),

    /// A present config file failed to parse.
    #[error("unparsable config {path}: {reason}")]
    Unparsable {
        /// The file that failed.
        path: PathBuf,
        /// Parser failure description.
        reason: String,
    },

    /// Underlying I/O error while reading a config file.
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for config-loading results.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Explicit inputs to the merge; no ambient process state is read here.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Module config files in discovery order.
    pub module_config_paths: Vec<PathBuf>,
    /// The mandatory root config.
    pub root_config_path: PathBuf,
    /// Optional user override; missing file is not an error.
    pub user_config_path: Option<PathBuf>,
}

/// Load and merge configuration per the strict load order.
pub fn load_merged_config(options: &LoadOptions) -> Result<HostConfig> {
    let mut merged = Value::Object(serde_json::Map::new());

    for path in &options.module_config_paths {
        let tree = load_yaml_tree(path)?;
        debug!(path = %path.display(), "merged module config");
        deep_merge(&mut merged, &tree);
    }

    if !options.root_config_path.is_file() {
        return Err(ConfigError::RootMissing(options.root_config_path.clone()));
    }
    let root = load_yaml_tree(&options.root_config_path)?;
    deep_merge(&mut merged, &root);

    if let Some(user_path) = &options.user_config_path {
        if user_path.is_file() {
            let user = load_yaml_tree(user_path)?;
            info!(path = %user_path.display(), "applying user config overrides");
            deep_merge(&mut merged, &user);
        } else {
            debug!(path = %user_path.display(), "no user config, skipping");
        }
    }

    Ok(HostConfig::new(merged))
}

/// Read one YAML file into a JSON tree. The file must exist and parse.
///
/// An empty file yields an empty mapping; a non-mapping document is an
/// error because only mappings participate in the merge.
fn load_yaml_tree(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if text.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    let tree: Value = serde_yaml::from_str(&text).map_err(|err| ConfigError::Unparsable {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;
    if !tree.is_object() {
        return Err(ConfigError::Unparsable {
            path: path.to_path_buf(),
            reason: "top-level document must be a mapping".into(),
        });
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir(tag: &str) -> PathBuf {
        let n = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("murmur-config-{tag}-{n}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn root_only() {
        let dir = temp_dir("root");
        let root = write(&dir, "config.yaml", "logging:\n  level: debug\n");
        let cfg = load_merged_config(&LoadOptions {
            module_config_paths: vec![],
            root_config_path: root,
            user_config_path: None,
        })
        .unwrap();
        assert_eq!(cfg.log_level(), "debug");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_root_is_fatal() {
        let dir = temp_dir("noroot");
        let err = load_merged_config(&LoadOptions {
            module_config_paths: vec![],
            root_config_path: dir.join("config.yaml"),
            user_config_path: None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::RootMissing(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_user_config_is_fine() {
        let dir = temp_dir("nouser");
        let root = write(&dir, "config.yaml", "a: 1\n");
        let cfg = load_merged_config(&LoadOptions {
            module_config_paths: vec![],
            root_config_path: root,
            user_config_path: Some(dir.join("user.yaml")),
        })
        .unwrap();
        assert_eq!(cfg.raw()["a"], 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unparsable_module_config_is_fatal() {
        let dir = temp_dir("badmodule");
        let module = write(&dir, "speech.yaml", "speech: [unclosed\n");
        let root = write(&dir, "config.yaml", "a: 1\n");
        let err = load_merged_config(&LoadOptions {
            module_config_paths: vec![module],
            root_config_path: root,
            user_config_path: None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Unparsable { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn non_mapping_document_is_fatal() {
        let dir = temp_dir("scalar");
        let root = write(&dir, "config.yaml", "- just\n- a\n- list\n");
        let err = load_merged_config(&LoadOptions {
            module_config_paths: vec![],
            root_config_path: root,
            user_config_path: None,
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Unparsable { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_order_modules_then_root_then_user() {
        let dir = temp_dir("order");
        let speech = write(
            &dir,
            "speech.yaml",
            "speech:\n  model: base\n  beam: 5\nshared: module\n",
        );
        let retrieval = write(&dir, "retrieval.yaml", "retrieval:\n  top_k: 5\n");
        let root = write(&dir, "config.yaml", "speech:\n  model: small\nshared: root\n");
        let user = write(&dir, "user.yaml", "shared: user\n");

        let cfg = load_merged_config(&LoadOptions {
            module_config_paths: vec![speech, retrieval],
            root_config_path: root,
            user_config_path: Some(user),
        })
        .unwrap();

        // root overrides module leaf, sibling module keys survive
        assert_eq!(cfg.raw()["speech"]["model"], "small");
        assert_eq!(cfg.raw()["speech"]["beam"], 5);
        assert_eq!(cfg.raw()["retrieval"]["top_k"], 5);
        // user wins over everything
        assert_eq!(cfg.raw()["shared"], "user");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_file_is_empty_mapping() {
        let dir = temp_dir("empty");
        let root = write(&dir, "config.yaml", "\n");
        let cfg = load_merged_config(&LoadOptions {
            module_config_paths: vec![],
            root_config_path: root,
            user_config_path: None,
        })
        .unwrap();
        assert!(cfg.raw().as_object().unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
