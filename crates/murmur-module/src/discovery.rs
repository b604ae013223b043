//! On-disk module discovery.
//!
//! [`discover`] walks the modules root, pairs each candidate subdirectory
//! with its manifest (or defaults), filters disabled and config-less
//! modules, and returns records sorted by `(order, id)`. Discovery is
//! opportunistic: a missing root yields an empty list, and one bad module
//! never blocks the others.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::manifest::ModuleManifest;

/// A resolved discovery result for one module.
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Directory name; unique within the list.
    pub id: String,
    /// The module's manifest (possibly synthesized defaults).
    pub manifest: ModuleManifest,
    /// The module directory.
    pub dir: PathBuf,
    /// Path of the module's config file. Guaranteed to exist at scan time.
    pub config_path: PathBuf,
}

/// Manifest-derived presentation record for CLI and UI surfaces.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModuleInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub order: i64,
    pub config_path: PathBuf,
    pub dir: PathBuf,
    pub ui_id: Option<String>,
}

/// Discover modules under `root`.
///
/// A module is a subdirectory containing its declared config file
/// (`config.yaml` unless the manifest says otherwise) whose manifest does
/// not set `enabled: false`. Hidden directories are skipped. The result
/// is ordered by `(manifest.order, id)` ascending.
pub fn discover(root: &Path) -> Vec<ModuleRecord> {
    let Ok(entries) = std::fs::read_dir(root) else {
        debug!(root = %root.display(), "modules root missing or unreadable, no modules");
        return Vec::new();
    };

    let mut records: Vec<ModuleRecord> = Vec::new();
    for entry in entries.flatten() {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let Some(id) = dir.file_name().and_then(|n| n.to_str()).map(String::from) else {
            continue;
        };
        if id.starts_with('.') {
            continue;
        }

        let manifest = ModuleManifest::load_or_default(&dir, &id);
        if !manifest.enabled {
            debug!(module = %id, "module disabled by manifest");
            continue;
        }
        let config_path = dir.join(&manifest.config_file);
        if !config_path.is_file() {
            debug!(module = %id, config = %config_path.display(),
                "module has no config file, skipping");
            continue;
        }
        records.push(ModuleRecord {
            id,
            manifest,
            dir,
            config_path,
        });
    }

    records.sort_by(|a, b| {
        (a.manifest.order, a.id.as_str()).cmp(&(b.manifest.order, b.id.as_str()))
    });
    records
}

/// Ordered presentation info for every discovered module.
pub fn module_infos(root: &Path) -> Vec<ModuleInfo> {
    discover(root)
        .into_iter()
        .map(|record| ModuleInfo {
            name: record.manifest.display_name().to_string(),
            version: record.manifest.resolved_version(),
            description: record.manifest.description.clone(),
            order: record.manifest.order,
            ui_id: record.manifest.ui_id.clone(),
            id: record.id,
            config_path: record.config_path,
            dir: record.dir,
        })
        .collect()
}

/// Resolve a module id (directory name or `ui_id`) to its help entry file.
///
/// Returns `docs_path/help_entry` under the module directory if that file
/// exists, otherwise `None`.
pub fn resolve_help_path(root: &Path, module_id: &str) -> Option<PathBuf> {
    let record = discover(root).into_iter().find(|record| {
        record.id == module_id || record.manifest.ui_id.as_deref() == Some(module_id)
    })?;
    let entry = record
        .dir
        .join(&record.manifest.docs_path)
        .join(&record.manifest.help_entry);
    entry.is_file().then_some(entry)
}
