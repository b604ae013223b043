//! The shared registration context.
//!
//! One [`RegistrationContext`] is created by the host and passed to every
//! module in both registration phases. Slots are explicitly named
//! optional fields rather than a generic map, so "pipeline present" is a
//! real `Option` and the compiler can see which slots exist. Modules may
//! read any slot and write only the slots they own.

use std::sync::Arc;

use murmur_types::HostConfig;

use crate::pipeline::{Pipeline, RetrievalService, SpeechComponents};

/// Callable modules use to push events to connected UI surfaces.
pub type Broadcast = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// Mutable state shared by all modules across both registration phases.
///
/// The `pipeline` slot is the phase discriminator: absent in phase 1,
/// present in phase 2. Modules must not infer the phase any other way.
pub struct RegistrationContext {
    /// The merged process-wide configuration. Always present.
    pub config: Arc<HostConfig>,

    /// Event broadcast to UI surfaces, when the host has one.
    pub broadcast: Option<Broadcast>,

    /// Speech component bundle. Written by a speech module in phase 1;
    /// consumed by the host when constructing the pipeline.
    pub speech: Option<SpeechComponents>,

    /// Retrieval backend. Written by a retrieval module.
    pub retrieval: Option<Arc<dyn RetrievalService>>,

    /// The shared pipeline. Absent in phase 1, present in phase 2.
    pub pipeline: Option<Arc<Pipeline>>,
}

impl RegistrationContext {
    /// A fresh phase-1 context (no pipeline slot).
    pub fn new(config: Arc<HostConfig>) -> Self {
        Self {
            config,
            broadcast: None,
            speech: None,
            retrieval: None,
            pipeline: None,
        }
    }

    /// Whether the pipeline exists yet, i.e. whether this is phase 2.
    pub fn pipeline_present(&self) -> bool {
        self.pipeline.is_some()
    }
}

impl std::fmt::Debug for RegistrationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationContext")
            .field("broadcast", &self.broadcast.is_some())
            .field("speech", &self.speech.is_some())
            .field("retrieval", &self.retrieval.is_some())
            .field("pipeline", &self.pipeline.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_phase_one() {
        let ctx = RegistrationContext::new(Arc::new(HostConfig::default()));
        assert!(!ctx.pipeline_present());
        assert!(ctx.speech.is_none());
        assert!(ctx.retrieval.is_none());
        assert!(ctx.broadcast.is_none());
    }

    #[test]
    fn installing_pipeline_flips_phase() {
        let mut ctx = RegistrationContext::new(Arc::new(HostConfig::default()));
        ctx.pipeline = Some(Arc::new(Pipeline::default()));
        assert!(ctx.pipeline_present());
    }
}
