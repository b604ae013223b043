//! The shared processing pipeline handle.
//!
//! The pipeline's internals (capture loop, prompt construction, playback)
//! live elsewhere; this module defines the seams modules plug into: the
//! speech component bundle supplied in phase 1 and the attachment points
//! (`set_retrieval`, `set_web_handler`) used in phase 2. Built-in no-op
//! components stand in when no module provides real ones.

use std::sync::Arc;

use parking_lot::Mutex;

/// Microphone-side audio source.
pub trait AudioCapture: Send + Sync {
    /// Begin producing audio.
    fn start(&self) -> Result<(), String>;
    /// Stop producing audio.
    fn stop(&self);
    /// Read the next PCM chunk, or `None` when nothing is buffered.
    fn read_chunk(&self) -> Option<Vec<u8>>;
}

/// Speech-to-text engine.
pub trait SttEngine: Send + Sync {
    /// Transcribe one utterance of PCM audio.
    fn transcribe(&self, audio: &[u8]) -> String;
}

/// Text-to-speech engine.
pub trait TtsEngine: Send + Sync {
    /// Speak the given text.
    fn speak(&self, text: &str);
    /// Interrupt playback.
    fn stop(&self);
}

/// Retrieval backend attached by a retrieval module in phase 2.
pub trait RetrievalService: Send + Sync {
    /// Return context passages for a query, best first.
    fn retrieve(&self, query: &str, top_k: usize) -> Vec<String>;
}

/// Handler for web/browse utterances; returns the message to speak, or
/// `None` when the utterance was not a web command.
pub type WebHandler = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// The speech component bundle a speech module populates in phase 1.
#[derive(Clone)]
pub struct SpeechComponents {
    pub capture: Arc<dyn AudioCapture>,
    pub stt: Arc<dyn SttEngine>,
    pub tts: Arc<dyn TtsEngine>,
}

impl Default for SpeechComponents {
    fn default() -> Self {
        Self {
            capture: Arc::new(NullCapture),
            stt: Arc::new(NullStt),
            tts: Arc::new(NullTts),
        }
    }
}

impl std::fmt::Debug for SpeechComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechComponents").finish_non_exhaustive()
    }
}

/// No-op capture used when no speech module is installed.
struct NullCapture;

impl AudioCapture for NullCapture {
    fn start(&self) -> Result<(), String> {
        Ok(())
    }
    fn stop(&self) {}
    fn read_chunk(&self) -> Option<Vec<u8>> {
        None
    }
}

/// No-op STT: every utterance transcribes to the empty string.
struct NullStt;

impl SttEngine for NullStt {
    fn transcribe(&self, _audio: &[u8]) -> String {
        String::new()
    }
}

/// No-op TTS: text is dropped.
struct NullTts;

impl TtsEngine for NullTts {
    fn speak(&self, _text: &str) {}
    fn stop(&self) {}
}

/// The shared downstream object modules attach to in phase 2.
///
/// Constructed by the host between the registration phases from whatever
/// phase-1 slots were populated. Attachment points use interior
/// mutability because the pipeline is shared as `Arc<Pipeline>` by the
/// time phase 2 runs.
pub struct Pipeline {
    speech: SpeechComponents,
    retrieval: Mutex<Option<Arc<dyn RetrievalService>>>,
    web_handler: Mutex<Option<WebHandler>>,
}

impl Pipeline {
    /// Build a pipeline around the given speech components.
    pub fn new(speech: SpeechComponents) -> Self {
        Self {
            speech,
            retrieval: Mutex::new(None),
            web_handler: Mutex::new(None),
        }
    }

    /// The speech component bundle.
    pub fn speech(&self) -> &SpeechComponents {
        &self.speech
    }

    /// Attach a retrieval backend (phase 2).
    pub fn set_retrieval(&self, retrieval: Arc<dyn RetrievalService>) {
        *self.retrieval.lock() = Some(retrieval);
    }

    /// The attached retrieval backend, if any.
    pub fn retrieval(&self) -> Option<Arc<dyn RetrievalService>> {
        self.retrieval.lock().clone()
    }

    /// Attach a web-command handler (phase 2).
    pub fn set_web_handler(&self, handler: WebHandler) {
        *self.web_handler.lock() = Some(handler);
    }

    /// The attached web-command handler, if any.
    pub fn web_handler(&self) -> Option<WebHandler> {
        self.web_handler.lock().clone()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(SpeechComponents::default())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("retrieval_attached", &self.retrieval.lock().is_some())
            .field("web_handler_attached", &self.web_handler.lock().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_speech_defaults() {
        let speech = SpeechComponents::default();
        assert!(speech.capture.start().is_ok());
        assert!(speech.capture.read_chunk().is_none());
        assert_eq!(speech.stt.transcribe(b"audio"), "");
        speech.tts.speak("ignored");
        speech.tts.stop();
        speech.capture.stop();
    }

    #[test]
    fn attachment_points_start_empty() {
        let pipeline = Pipeline::default();
        assert!(pipeline.retrieval().is_none());
        assert!(pipeline.web_handler().is_none());
    }

    #[test]
    fn set_and_read_retrieval() {
        struct Fixed;
        impl RetrievalService for Fixed {
            fn retrieve(&self, query: &str, top_k: usize) -> Vec<String> {
                vec![format!("{query}:{top_k}")]
            }
        }

        let pipeline = Pipeline::default();
        pipeline.set_retrieval(Arc::new(Fixed));
        let hits = pipeline.retrieval().unwrap().retrieve("cats", 3);
        assert_eq!(hits, ["cats:3"]);
    }

    #[test]
    fn set_and_read_web_handler() {
        let pipeline = Pipeline::default();
        pipeline.set_web_handler(Arc::new(|utterance: &str| {
            utterance.starts_with("search").then(|| "searching".to_string())
        }));

        let handler = pipeline.web_handler().unwrap();
        assert_eq!(handler("search for cats").as_deref(), Some("searching"));
        assert!(handler("hello").is_none());
    }
}
