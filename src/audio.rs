use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Pulls the audio track out of a media file into a WAV for transcription
#[async_trait]
pub trait AudioExtraction: Send + Sync {
    async fn extract_audio(&self, media: &Path, output: &Path) -> Result<PathBuf>;
}

/// FFmpeg-backed audio extractor
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    ffmpeg: String,
    /// Sample rate for transcription (Whisper expects 16kHz)
    pub target_sample_rate: u32,
}

impl AudioExtractor {
    pub fn new() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            target_sample_rate: 16000,
        }
    }

    pub fn with_binary(mut self, ffmpeg: impl Into<String>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.target_sample_rate = sample_rate;
        self
    }

    /// WAV path that sits next to a media file
    pub fn audio_path_for(media: &Path) -> PathBuf {
        media.with_extension("wav")
    }
}

impl Default for AudioExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioExtraction for AudioExtractor {
    async fn extract_audio(&self, media: &Path, output: &Path) -> Result<PathBuf> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        debug!("🎵 Extracting audio: {} -> {}", media.display(), output.display());

        let sample_rate = self.target_sample_rate.to_string();
        let result = Command::new(&self.ffmpeg)
            .args(["-y", "-v", "error", "-i"])
            .arg(media)
            .args([
                "-vn", // No video stream
                "-acodec", "pcm_s16le", // 16-bit PCM
                "-ar", &sample_rate,
                "-ac", "1", // Mono
                "-f", "wav",
            ])
            .arg(output)
            .output()
            .await
            .map_err(|e| PipelineError::AudioExtraction {
                media: media.to_path_buf(),
                reason: format!("failed to run {}: {}", self.ffmpeg, e),
            })?;

        if !result.status.success() {
            return Err(PipelineError::AudioExtraction {
                media: media.to_path_buf(),
                reason: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        info!("✅ Audio extracted: {}", output.display());
        Ok(output.to_path_buf())
    }
}
