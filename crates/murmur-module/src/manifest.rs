//! Module manifest parsing.
//!
//! Each module directory may carry a `module.yaml` manifest:
//!
//! ```yaml
//! name: Browser
//! version: 1.2.0
//! description: Voice-controlled browsing
//! enabled: true
//! order: 10
//! config_file: config.yaml
//! docs_path: docs
//! help_entry: README.md
//! ui_id: web
//! ```
//!
//! Every key is optional, but present keys must type-check. Unknown keys
//! are ignored. A missing or malformed manifest degrades to defaults
//! derived from the directory name; manifests are read once at discovery
//! time and immutable thereafter.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ModuleError, Result};

/// Manifest file name inside a module directory.
pub const MANIFEST_FILENAME: &str = "module.yaml";

/// Default module config file name.
pub const DEFAULT_CONFIG_FILENAME: &str = "config.yaml";

/// Version assumed when the manifest does not declare one.
pub const DEFAULT_VERSION: &str = "0.0.0";

/// Identity and merge metadata for one module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Directory name; unique and immutable. Not read from the file.
    #[serde(skip)]
    pub id: String,

    /// Human-readable display name. Defaults to the id.
    #[serde(default)]
    pub name: Option<String>,

    /// Semantic version string. Defaults to `"0.0.0"` with a warning.
    #[serde(default)]
    pub version: Option<String>,

    /// Free-form description for presentation surfaces.
    #[serde(default)]
    pub description: String,

    /// Disabled modules are invisible to merge and registration.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Tie-break key for merge/registration sequence; lower runs first.
    #[serde(default)]
    pub order: i64,

    /// Config file path relative to the module directory.
    #[serde(default = "default_config_file")]
    pub config_file: String,

    /// Documentation directory relative to the module directory.
    #[serde(default = "default_docs_path")]
    pub docs_path: String,

    /// Help entry file inside `docs_path`.
    #[serde(default = "default_help_entry")]
    pub help_entry: String,

    /// Alternate id used by presentation surfaces.
    #[serde(default)]
    pub ui_id: Option<String>,
}

fn default_enabled() -> bool {
    true
}
fn default_config_file() -> String {
    DEFAULT_CONFIG_FILENAME.into()
}
fn default_docs_path() -> String {
    "docs".into()
}
fn default_help_entry() -> String {
    "README.md".into()
}

impl ModuleManifest {
    /// A default manifest for a directory with no (usable) manifest file.
    pub fn defaults_for(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            version: None,
            description: String::new(),
            enabled: true,
            order: 0,
            config_file: default_config_file(),
            docs_path: default_docs_path(),
            help_entry: default_help_entry(),
            ui_id: None,
        }
    }

    /// Parse a manifest from YAML. Present keys must type-check.
    pub fn from_yaml(id: &str, yaml: &str) -> Result<Self> {
        let mut manifest: Self = serde_yaml::from_str(yaml)?;
        manifest.id = id.to_string();
        Ok(manifest)
    }

    /// Read `module.yaml` from `dir`, degrading to defaults on failure.
    ///
    /// A missing manifest is normal (defaults, no log). A present but
    /// unparsable one logs a warning and degrades -- one bad module must
    /// never block the scan.
    pub fn load_or_default(dir: &Path, id: &str) -> Self {
        let path = dir.join(MANIFEST_FILENAME);
        if !path.is_file() {
            return Self::defaults_for(id);
        }
        let read = std::fs::read_to_string(&path)
            .map_err(ModuleError::from)
            .and_then(|text| Self::from_yaml(id, &text));
        match read {
            Ok(manifest) => manifest,
            Err(err) => {
                warn!(module = %id, path = %path.display(), error = %err,
                    "ignoring malformed manifest, using defaults");
                Self::defaults_for(id)
            }
        }
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.id,
        }
    }

    /// Declared version, falling back to [`DEFAULT_VERSION`] with a warning.
    pub fn resolved_version(&self) -> String {
        match self.version.as_deref() {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => {
                warn!(module = %self.id, "manifest missing 'version', defaulting to {DEFAULT_VERSION}");
                DEFAULT_VERSION.to_string()
            }
        }
    }
}
