//! # murmur-types
//!
//! Core configuration types for the murmur voice-assistant host.
//!
//! This crate is the foundation of the dependency graph -- every other
//! murmur crate depends on it. It contains:
//!
//! - **[`config`]** -- [`HostConfig`], the wrapper around the merged
//!   configuration tree, with typed section access.
//! - **[`server`]** -- [`ModuleServerConfig`], the uniform per-module
//!   server-mode configuration namespace.

pub mod config;
pub mod server;

pub use config::HostConfig;
pub use server::{
    DiscoveryBackend, ModuleServerConfig, DEFAULT_FAILURE_THRESHOLD, DEFAULT_RECOVERY_TIMEOUT_SEC,
};
