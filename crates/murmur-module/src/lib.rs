//! # murmur-module
//!
//! Module manifests and on-disk discovery for the murmur host.
//!
//! A module is a subdirectory under the modules root that carries a config
//! file (`config.yaml` by default) and, optionally, a `module.yaml`
//! manifest controlling identity, ordering, and enablement. Discovery
//! pairs each candidate directory with its manifest, filters disabled or
//! config-less modules, and returns a deterministic ordered list.
//!
//! This crate performs filesystem reads only; it knows nothing about the
//! host, the pipeline, or module registration.

pub mod discovery;
pub mod error;
pub mod manifest;

pub use discovery::{discover, module_infos, resolve_help_path, ModuleInfo, ModuleRecord};
pub use error::{ModuleError, Result};
pub use manifest::{ModuleManifest, DEFAULT_CONFIG_FILENAME, MANIFEST_FILENAME};
