//! # murmur-core
//!
//! Startup machinery for the murmur host:
//!
//! - **[`merge`]** -- recursive configuration merge (later sources win,
//!   arrays replaced).
//! - **[`config`]** -- merged config loading: module configs in discovery
//!   order, then root config, then optional user overrides.
//! - **[`pipeline`]** -- the shared processing pipeline handle and the
//!   speech component seams modules plug into.
//! - **[`context`]** -- the registration context shared by all modules
//!   across both phases.
//! - **[`registry`]** -- module capability registry and the two-phase
//!   registration coordinator.
//!
//! Discovery and config merge run once at startup, single-threaded,
//! before any concurrent activity. Registration runs in a fixed module
//! order so later modules may rely on state set by earlier ones.

pub mod config;
pub mod context;
pub mod merge;
pub mod pipeline;
pub mod registry;

pub use config::{load_merged_config, ConfigError, LoadOptions, CONFIG_ENV_VAR};
pub use context::{Broadcast, RegistrationContext};
pub use pipeline::{
    AudioCapture, Pipeline, RetrievalService, SpeechComponents, SttEngine, TtsEngine, WebHandler,
};
pub use registry::{Coordinator, ModuleCapabilities, ModuleHooks, ModuleSet, PipelineAttach, SpeechProvider};
