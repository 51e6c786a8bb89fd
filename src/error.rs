use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by pipeline stages and the stores they write to
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Download failed: {} not found.", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("Could not read media {}: {reason}", path.display())]
    Probe { path: PathBuf, reason: String },

    #[error("No audio track in {}", path.display())]
    NoAudioTrack { path: PathBuf },

    #[error("Clip encoding failed for {}: {reason}", output.display())]
    Encode { output: PathBuf, reason: String },

    #[error("Audio extraction failed for {}: {reason}", media.display())]
    AudioExtraction { media: PathBuf, reason: String },

    #[error("Transcription failed for {}: {reason}", audio.display())]
    Transcription { audio: PathBuf, reason: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Whether this failure ends the run when raised by its stage.
    ///
    /// Acquisition and probing failures are fatal. Everything after them
    /// degrades to a sentinel or a skipped clip.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Download { .. }
                | PipelineError::MissingArtifact { .. }
                | PipelineError::Probe { .. }
                | PipelineError::NoAudioTrack { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
