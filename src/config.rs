use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the video pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where downloads, clips and records live
    pub storage: StorageConfig,

    /// Media download settings
    pub acquisition: AcquisitionConfig,

    /// FFmpeg settings for probing, cutting and audio extraction
    pub media: MediaConfig,

    /// Speech-to-text settings
    pub transcription: TranscriptionConfig,

    /// Segmentation defaults and concurrency
    pub pipeline: PipelineConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base media directory
    pub media_root: PathBuf,

    /// Downloaded videos, relative to `media_root`
    pub downloads_dir: String,

    /// Clip artifacts, relative to `media_root`
    pub clips_dir: String,

    /// Video records and logs, relative to `media_root`
    pub store_dir: String,
}

impl StorageConfig {
    pub fn downloads_path(&self) -> PathBuf {
        self.media_root.join(&self.downloads_dir)
    }

    pub fn clips_path(&self) -> PathBuf {
        self.media_root.join(&self.clips_dir)
    }

    pub fn store_path(&self) -> PathBuf {
        self.media_root.join(&self.store_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// yt-dlp executable
    pub ytdlp_command: String,

    /// yt-dlp format selector
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub ffmpeg_command: String,
    pub ffprobe_command: String,

    /// Video codec for clip artifacts
    pub video_codec: String,

    /// Audio codec for clip artifacts
    pub audio_codec: String,

    /// Sample rate of extracted audio
    pub target_sample_rate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhisperBackend {
    /// Use whisper.cpp if installed, otherwise openai-whisper
    Auto,
    Cpp,
    Python,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub backend: WhisperBackend,

    /// Whisper model name
    pub model: String,

    /// ggml model file for whisper.cpp (defaults to `models/ggml-<model>.bin`)
    pub model_path: Option<PathBuf>,

    /// Language hint, auto-detect when unset
    pub language: Option<String>,

    /// whisper.cpp executable
    pub cpp_command: String,

    /// openai-whisper executable
    pub python_command: String,

    /// Threads for whisper.cpp
    pub threads: u32,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            backend: WhisperBackend::Auto,
            model: "base".to_string(),
            model_path: None,
            language: None,
            cpp_command: "whisper-cli".to_string(),
            python_command: "whisper".to_string(),
            threads: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Clip length used when a submission does not give one
    pub default_clip_length: u64,

    /// Pipelines allowed to run at once
    pub max_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter used when RUST_LOG is unset
    pub level: String,
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        let config_paths = [
            "video-ai.toml",
            "config/video-ai.toml",
            "/etc/video-ai/config.toml",
        ];

        for path in &config_paths {
            if let Ok(config_str) = std::fs::read_to_string(path) {
                match toml::from_str(&config_str) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load a specific TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config {}: {}", path, e))?;
        Ok(toml::from_str(&config_str)?)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("VIDEO_AI_MEDIA_ROOT") {
            config.storage.media_root = PathBuf::from(root);
        }

        if let Ok(workers) = std::env::var("VIDEO_AI_WORKERS") {
            config.pipeline.max_workers = workers
                .parse()
                .map_err(|_| anyhow!("VIDEO_AI_WORKERS must be a number, got {}", workers))?;
        }

        if let Ok(clip_length) = std::env::var("VIDEO_AI_CLIP_LENGTH") {
            config.pipeline.default_clip_length = clip_length
                .parse()
                .map_err(|_| anyhow!("VIDEO_AI_CLIP_LENGTH must be a number, got {}", clip_length))?;
        }

        if let Ok(model) = std::env::var("VIDEO_AI_WHISPER_MODEL") {
            config.transcription.model = model;
        }

        if let Ok(level) = std::env::var("VIDEO_AI_LOG_LEVEL") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &str) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_workers == 0 {
            return Err(anyhow!("max_workers must be greater than 0"));
        }

        if self.pipeline.default_clip_length == 0 {
            return Err(anyhow!("default_clip_length must be greater than 0"));
        }

        if self.media.target_sample_rate == 0 {
            return Err(anyhow!("target_sample_rate must be greater than 0"));
        }

        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Video AI Configuration:\n\
            - Media root: {}\n\
            - Workers: {}\n\
            - Default clip length: {}s\n\
            - Whisper: {:?} ({})\n\
            - Clip codecs: {}/{}",
            self.storage.media_root.display(),
            self.pipeline.max_workers,
            self.pipeline.default_clip_length,
            self.transcription.backend,
            self.transcription.model,
            self.media.video_codec,
            self.media.audio_codec
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                media_root: PathBuf::from("./media"),
                downloads_dir: "downloads".to_string(),
                clips_dir: "clips".to_string(),
                store_dir: "store".to_string(),
            },
            acquisition: AcquisitionConfig {
                ytdlp_command: "yt-dlp".to_string(),
                format: "best".to_string(),
            },
            media: MediaConfig {
                ffmpeg_command: "ffmpeg".to_string(),
                ffprobe_command: "ffprobe".to_string(),
                video_codec: "libx264".to_string(),
                audio_codec: "aac".to_string(),
                target_sample_rate: 16000, // Optimal for Whisper
            },
            transcription: TranscriptionConfig::default(),
            pipeline: PipelineConfig {
                default_clip_length: 30,
                max_workers: num_cpus::get().clamp(1, 4),
            },
            logging: LoggingConfig {
                level: "video_ai=info,warn".to_string(),
            },
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_media_root(mut self, root: PathBuf) -> Self {
        self.config.storage.media_root = root;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.pipeline.max_workers = workers;
        self
    }

    pub fn with_clip_length(mut self, seconds: u64) -> Self {
        self.config.pipeline.default_clip_length = seconds;
        self
    }

    pub fn with_whisper(mut self, backend: WhisperBackend, model: impl Into<String>) -> Self {
        self.config.transcription.backend = backend;
        self.config.transcription.model = model.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pipeline.default_clip_length, 30);
        assert_eq!(config.media.target_sample_rate, 16000);
        assert_eq!(config.transcription.model, "base");
        assert!(config.pipeline.max_workers >= 1);
        assert_eq!(config.storage.clips_path(), PathBuf::from("./media/clips"));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_workers(8)
            .with_clip_length(45)
            .with_media_root(PathBuf::from("/data"))
            .with_whisper(WhisperBackend::Python, "small")
            .build();

        assert_eq!(config.pipeline.max_workers, 8);
        assert_eq!(config.pipeline.default_clip_length, 45);
        assert_eq!(config.storage.downloads_path(), PathBuf::from("/data/downloads"));
        assert_eq!(config.transcription.backend, WhisperBackend::Python);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
        assert!(ConfigBuilder::new().with_workers(0).build().validate().is_err());
        assert!(ConfigBuilder::new().with_clip_length(0).build().validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ConfigBuilder::new().with_clip_length(12).build();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.pipeline.default_clip_length, 12);
        assert_eq!(parsed.transcription.backend, WhisperBackend::Auto);
    }
}
