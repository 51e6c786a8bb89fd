use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::ranges::TimeRange;

/// What probing learns about a downloaded video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub duration: Duration,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub audio_streams: Vec<AudioStreamInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStreamInfo {
    pub index: usize,
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u32,
}

impl MediaInfo {
    /// Duration in whole seconds, truncated
    pub fn total_duration(&self) -> u64 {
        self.duration.as_secs()
    }

    pub fn has_audio(&self) -> bool {
        !self.audio_streams.is_empty()
    }
}

/// Opens local media and reports duration and audio presence
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<MediaInfo>;
}

/// Writes the sub-media for one time window to a new file
#[async_trait]
pub trait ClipEncoder: Send + Sync {
    async fn encode_clip(&self, source: &Path, range: TimeRange, output: &Path) -> Result<()>;
}

/// FFmpeg-backed prober and clip encoder
#[derive(Debug, Clone)]
pub struct VideoProcessor {
    ffprobe: String,
    ffmpeg: String,
    video_codec: String,
    audio_codec: String,
}

impl VideoProcessor {
    pub fn new() -> Self {
        Self {
            ffprobe: "ffprobe".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }

    pub fn with_binaries(mut self, ffprobe: impl Into<String>, ffmpeg: impl Into<String>) -> Self {
        self.ffprobe = ffprobe.into();
        self.ffmpeg = ffmpeg.into();
        self
    }

    pub fn with_codecs(mut self, video_codec: impl Into<String>, audio_codec: impl Into<String>) -> Self {
        self.video_codec = video_codec.into();
        self.audio_codec = audio_codec.into();
        self
    }
}

impl Default for VideoProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaProber for VideoProcessor {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .await
            .map_err(|e| PipelineError::Probe {
                path: path.to_path_buf(),
                reason: format!("failed to run {}: {}", self.ffprobe, e),
            })?;

        if !output.status.success() {
            return Err(PipelineError::Probe {
                path: path.to_path_buf(),
                reason: format!("ffprobe exited with {}", output.status),
            });
        }

        let ffprobe_data: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| PipelineError::Probe {
                path: path.to_path_buf(),
                reason: format!("unreadable ffprobe output: {}", e),
            })?;

        let info = parse_ffprobe_output(path, &ffprobe_data)?;

        info!("📹 Analyzed video: {} ({}x{}, {:.1}s, {} audio stream(s))",
              path.display(),
              info.width,
              info.height,
              info.duration.as_secs_f64(),
              info.audio_streams.len());

        Ok(info)
    }
}

#[async_trait]
impl ClipEncoder for VideoProcessor {
    async fn encode_clip(&self, source: &Path, range: TimeRange, output: &Path) -> Result<()> {
        let start = format!("{:.3}", range.start);
        let duration = format!("{:.3}", range.duration());

        debug!("✂️  Encoding {} [{}s +{}s] -> {}", source.display(), start, duration, output.display());

        let result = Command::new(&self.ffmpeg)
            .args(["-y", "-v", "error", "-ss", &start, "-i"])
            .arg(source)
            .args(["-t", &duration, "-c:v", &self.video_codec, "-c:a", &self.audio_codec])
            .arg(output)
            .output()
            .await
            .map_err(|e| PipelineError::Encode {
                output: output.to_path_buf(),
                reason: format!("failed to run {}: {}", self.ffmpeg, e),
            })?;

        if !result.status.success() {
            return Err(PipelineError::Encode {
                output: output.to_path_buf(),
                reason: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Build a `MediaInfo` from `ffprobe -show_format -show_streams` JSON
pub fn parse_ffprobe_output(path: &Path, ffprobe_data: &serde_json::Value) -> Result<MediaInfo> {
    let format = &ffprobe_data["format"];
    let streams = ffprobe_data["streams"]
        .as_array()
        .ok_or_else(|| PipelineError::Probe {
            path: path.to_path_buf(),
            reason: "no streams reported".to_string(),
        })?;

    let duration_seconds: f64 = format["duration"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| PipelineError::Probe {
            path: path.to_path_buf(),
            reason: "missing or invalid duration".to_string(),
        })?;

    let duration = Duration::try_from_secs_f64(duration_seconds).map_err(|_| PipelineError::Probe {
        path: path.to_path_buf(),
        reason: "invalid duration".to_string(),
    })?;

    let video_stream = streams.iter().find(|s| s["codec_type"] == "video");

    let audio_streams = streams
        .iter()
        .filter(|s| s["codec_type"] == "audio")
        .enumerate()
        .map(|(index, stream)| AudioStreamInfo {
            index,
            codec: stream["codec_name"].as_str().unwrap_or("unknown").to_string(),
            sample_rate: stream["sample_rate"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(44100),
            channels: stream["channels"].as_u64().unwrap_or(2) as u32,
        })
        .collect();

    Ok(MediaInfo {
        path: path.to_path_buf(),
        duration,
        width: video_stream.and_then(|s| s["width"].as_u64()).unwrap_or(0) as u32,
        height: video_stream.and_then(|s| s["height"].as_u64()).unwrap_or(0) as u32,
        format: format["format_name"].as_str().unwrap_or("unknown").to_string(),
        audio_streams,
    })
}
