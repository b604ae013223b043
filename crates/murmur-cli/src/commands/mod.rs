//! CLI command implementations for `murmur`.
//!
//! Each subcommand is implemented in its own module:
//!
//! - [`start`] -- Full host startup and serve loop.
//! - [`modules_cmd`] -- Discovered-module listing.
//! - [`config_cmd`] -- Resolved-configuration dump.

pub mod config_cmd;
pub mod modules_cmd;
pub mod start;

use std::path::PathBuf;

use murmur_core::{load_merged_config, LoadOptions, CONFIG_ENV_VAR};
use murmur_module::{discover, ModuleRecord};
use murmur_types::HostConfig;

/// Resolved host paths shared by all subcommands.
pub struct HostOptions {
    pub modules_root: PathBuf,
    pub root_config_path: PathBuf,
    pub user_config_path: Option<PathBuf>,
}

/// Root config path: CLI flag, then `MURMUR_CONFIG`, then `config.yaml`.
pub fn resolve_root_config(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.yaml"))
}

/// Discover modules and build the merged host configuration.
pub fn load_host(options: &HostOptions) -> anyhow::Result<(Vec<ModuleRecord>, HostConfig)> {
    let records = discover(&options.modules_root);
    let load = LoadOptions {
        module_config_paths: records.iter().map(|r| r.config_path.clone()).collect(),
        root_config_path: options.root_config_path.clone(),
        user_config_path: options.user_config_path.clone(),
    };
    let config = load_merged_config(&load)?;
    Ok((records, config))
}
