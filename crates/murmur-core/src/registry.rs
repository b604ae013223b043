//! Module capability registry and the two-phase registration coordinator.
//!
//! In-process modules are compiled into the host; discovery decides which
//! of them participate and in what order, and the [`ModuleSet`] maps a
//! discovered directory id to the typed capabilities that module
//! implements. A module may provide:
//!
//! - a generic [`ModuleHooks::register`] hook, invoked once per phase, or
//! - direct typed constructors ([`SpeechProvider`], [`PipelineAttach`]),
//!   used only when the generic hook is absent.
//!
//! The coordinator invokes every module exactly twice per startup, in the
//! same `(order, id)` sequence both times: once before the pipeline
//! exists and once after. A failing module is logged and skipped; the
//! host proceeds without its contribution.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use murmur_module::{ModuleError, ModuleRecord};
use murmur_types::HostConfig;

use crate::context::RegistrationContext;
use crate::pipeline::{Pipeline, SpeechComponents};

/// Generic two-phase registration hook.
///
/// Called in both phases with the shared context; implementations
/// discriminate the phase solely via `ctx.pipeline_present()`.
pub trait ModuleHooks: Send + Sync {
    fn register(&self, ctx: &mut RegistrationContext) -> Result<(), ModuleError>;
}

/// Direct constructor for the speech component bundle (phase-1 fallback).
pub trait SpeechProvider: Send + Sync {
    fn build_speech(&self, config: &HostConfig) -> Result<SpeechComponents, ModuleError>;
}

/// Direct pipeline attachment (phase-2 fallback).
pub trait PipelineAttach: Send + Sync {
    fn attach(&self, pipeline: &Pipeline, ctx: &RegistrationContext) -> Result<(), ModuleError>;
}

/// The capabilities one module implements. All optional; a module with
/// none is a valid no-op participant.
#[derive(Clone, Default)]
pub struct ModuleCapabilities {
    /// Generic hook; takes precedence over the direct constructors.
    pub hook: Option<Arc<dyn ModuleHooks>>,
    /// Phase-1 fallback when no hook is present.
    pub speech: Option<Arc<dyn SpeechProvider>>,
    /// Phase-2 fallback when no hook is present.
    pub attach: Option<Arc<dyn PipelineAttach>>,
}

impl ModuleCapabilities {
    /// Capabilities consisting of only the generic hook.
    pub fn hook(hook: impl ModuleHooks + 'static) -> Self {
        Self {
            hook: Some(Arc::new(hook)),
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for ModuleCapabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleCapabilities")
            .field("hook", &self.hook.is_some())
            .field("speech", &self.speech.is_some())
            .field("attach", &self.attach.is_some())
            .finish()
    }
}

/// Registry mapping module directory ids to capabilities.
#[derive(Default)]
pub struct ModuleSet {
    capabilities: HashMap<String, ModuleCapabilities>,
}

impl ModuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register capabilities for a module id. Last insert wins.
    pub fn insert(&mut self, id: impl Into<String>, capabilities: ModuleCapabilities) {
        self.capabilities.insert(id.into(), capabilities);
    }

    /// Capabilities for an id; unknown ids get the no-op default.
    pub fn get(&self, id: &str) -> ModuleCapabilities {
        self.capabilities.get(id).cloned().unwrap_or_default()
    }
}

/// Drives the two-phase registration handshake.
pub struct Coordinator {
    modules: Vec<(ModuleRecord, ModuleCapabilities)>,
}

impl Coordinator {
    /// Pair discovered records (already ordered) with their capabilities.
    pub fn new(records: Vec<ModuleRecord>, set: &ModuleSet) -> Self {
        let modules = records
            .into_iter()
            .map(|record| {
                let capabilities = set.get(&record.id);
                (record, capabilities)
            })
            .collect();
        Self { modules }
    }

    /// The ordered module ids this coordinator will drive.
    pub fn module_ids(&self) -> Vec<&str> {
        self.modules.iter().map(|(r, _)| r.id.as_str()).collect()
    }

    /// Run the full startup handshake.
    ///
    /// Phase 1 collects pipeline inputs; the pipeline is then built from
    /// whatever the phase populated (no-op speech components otherwise)
    /// and installed into the context; phase 2 lets modules attach to it.
    /// Returns the constructed pipeline.
    pub fn run_startup(&self, ctx: &mut RegistrationContext) -> Arc<Pipeline> {
        self.run_phase(ctx);

        let speech = ctx.speech.clone().unwrap_or_default();
        let pipeline = Arc::new(Pipeline::new(speech));
        ctx.pipeline = Some(Arc::clone(&pipeline));

        // Carry any phase-1 retrieval contribution onto the pipeline
        // before phase 2 runs, so later modules can see it there.
        if let Some(retrieval) = ctx.retrieval.clone() {
            pipeline.set_retrieval(retrieval);
        }

        self.run_phase(ctx);
        pipeline
    }

    /// Invoke every module once, in order, isolating failures.
    fn run_phase(&self, ctx: &mut RegistrationContext) {
        let phase = if ctx.pipeline_present() { 2 } else { 1 };
        for (record, capabilities) in &self.modules {
            match Self::invoke(record, capabilities, ctx) {
                Ok(()) => {
                    debug!(module = %record.id, phase, "module registered");
                }
                Err(err) => {
                    warn!(module = %record.id, phase, error = %err,
                        "module registration failed, continuing without it");
                }
            }
        }
    }

    /// One module, one phase. Generic hook first; direct constructors
    /// only when the hook is absent.
    fn invoke(
        record: &ModuleRecord,
        capabilities: &ModuleCapabilities,
        ctx: &mut RegistrationContext,
    ) -> Result<(), ModuleError> {
        if let Some(hook) = &capabilities.hook {
            return hook.register(ctx);
        }

        match &ctx.pipeline {
            None => {
                if let Some(provider) = &capabilities.speech {
                    if ctx.speech.is_some() {
                        warn!(module = %record.id,
                            "speech components already provided by an earlier module, skipping");
                        return Ok(());
                    }
                    ctx.speech = Some(provider.build_speech(&ctx.config)?);
                }
            }
            Some(pipeline) => {
                if let Some(attach) = &capabilities.attach {
                    let pipeline = Arc::clone(pipeline);
                    attach.attach(&pipeline, ctx)?;
                }
            }
        }
        Ok(())
    }
}
