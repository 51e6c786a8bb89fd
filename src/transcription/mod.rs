//! Speech-to-text: the opaque capability plus the sentinel policy around it

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::error::Result;

pub mod whisper;

pub use whisper::WhisperTranscriber;

/// Substituted when the capability returns nothing but whitespace
pub const NO_SPEECH_DETECTED: &str = "No speech detected.";

/// Substituted for a clip whose transcription raised an error
pub const CLIP_TRANSCRIPTION_FAILED: &str = "Transcription failed.";

/// Substituted for the full-video transcript when transcription raised an error
pub const FULL_TRANSCRIPTION_FAILED: &str = "Full video transcription failed.";

/// Opaque `transcribe(audio) -> text` capability
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String>;
}

/// Result of one transcription attempt, before sentinel substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptOutcome {
    Speech(String),
    NoSpeech,
    Failed(String),
}

impl TranscriptOutcome {
    /// Text to persist, using `failure_sentinel` for the error case
    pub fn into_text(self, failure_sentinel: &str) -> String {
        match self {
            TranscriptOutcome::Speech(text) => text,
            TranscriptOutcome::NoSpeech => NO_SPEECH_DETECTED.to_string(),
            TranscriptOutcome::Failed(_) => failure_sentinel.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TranscriptOutcome::Failed(_))
    }
}

/// Wraps a `SpeechToText` engine and never lets its errors escape
#[derive(Clone)]
pub struct Transcriber {
    engine: Arc<dyn SpeechToText>,
}

impl Transcriber {
    pub fn new(engine: Arc<dyn SpeechToText>) -> Self {
        Self { engine }
    }

    pub async fn transcribe(&self, audio: &Path) -> TranscriptOutcome {
        match self.engine.transcribe(audio).await {
            Ok(text) if text.trim().is_empty() => TranscriptOutcome::NoSpeech,
            Ok(text) => TranscriptOutcome::Speech(text.trim().to_string()),
            Err(e) => {
                warn!("⚠️ Transcription failed for {}: {}", audio.display(), e);
                TranscriptOutcome::Failed(e.to_string())
            }
        }
    }
}
