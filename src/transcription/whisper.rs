use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::SpeechToText;
use crate::config::{TranscriptionConfig, WhisperBackend};
use crate::error::{PipelineError, Result};

/// Speech-to-text through a Whisper command line backend
#[derive(Debug, Clone)]
pub struct WhisperTranscriber {
    config: TranscriptionConfig,
}

impl WhisperTranscriber {
    pub fn new(config: TranscriptionConfig) -> Self {
        Self { config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Pick the backend to run, probing the PATH when configured as `Auto`
    async fn resolve_backend(&self) -> Option<WhisperBackend> {
        match self.config.backend {
            WhisperBackend::Auto => {
                // whisper.cpp first, it is much faster on CPU
                if check_command_available(&self.config.cpp_command).await {
                    Some(WhisperBackend::Cpp)
                } else if check_command_available(&self.config.python_command).await {
                    Some(WhisperBackend::Python)
                } else {
                    None
                }
            }
            backend => Some(backend),
        }
    }

    fn build_command(&self, backend: WhisperBackend, audio: &Path, work_dir: &Path) -> Command {
        match backend {
            WhisperBackend::Cpp => {
                let stem = audio.file_stem().unwrap_or_default();
                let mut cmd = Command::new(&self.config.cpp_command);
                cmd.arg("-f").arg(audio)
                    .arg("-oj")
                    .arg("-of").arg(work_dir.join(stem))
                    .arg("-t").arg(self.config.threads.to_string())
                    .arg("-m").arg(self.cpp_model_path());
                if let Some(language) = &self.config.language {
                    cmd.arg("-l").arg(language);
                }
                cmd
            }
            _ => {
                let mut cmd = Command::new(&self.config.python_command);
                cmd.arg(audio)
                    .arg("--model").arg(&self.config.model)
                    .arg("--output_dir").arg(work_dir)
                    .arg("--output_format").arg("json")
                    .arg("--verbose").arg("False")
                    .arg("--fp16").arg("False");
                if let Some(language) = &self.config.language {
                    cmd.arg("--language").arg(language);
                }
                cmd
            }
        }
    }

    fn cpp_model_path(&self) -> PathBuf {
        self.config
            .model_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("models/ggml-{}.bin", self.config.model)))
    }

    fn work_dir_for(audio: &Path) -> PathBuf {
        let stem = audio.file_stem().unwrap_or_default().to_string_lossy();
        audio
            .parent()
            .unwrap_or(Path::new("."))
            .join(format!("whisper_{}", stem))
    }
}

#[async_trait]
impl SpeechToText for WhisperTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let failure = |reason: String| PipelineError::Transcription {
            audio: audio.to_path_buf(),
            reason,
        };

        let backend = self
            .resolve_backend()
            .await
            .ok_or_else(|| failure("no Whisper backend found, install whisper.cpp or openai-whisper".to_string()))?;

        let work_dir = Self::work_dir_for(audio);
        tokio::fs::create_dir_all(&work_dir).await?;

        info!("🎤 Transcribing {} with {:?} backend ({} model)",
              audio.display(), backend, self.config.model);

        let mut cmd = self.build_command(backend, audio, &work_dir);
        debug!("Executing command: {:?}", cmd);

        let result = match cmd.output().await {
            Ok(output) if output.status.success() => read_whisper_json(&work_dir).await.map_err(failure),
            Ok(output) => Err(failure(format!(
                "whisper exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) => Err(failure(format!("failed to spawn whisper: {}", e))),
        };

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            warn!("Failed to remove whisper work dir {}: {}", work_dir.display(), e);
        }

        result
    }
}

async fn read_whisper_json(work_dir: &Path) -> std::result::Result<String, String> {
    let mut entries = tokio::fs::read_dir(work_dir)
        .await
        .map_err(|e| format!("cannot read {}: {}", work_dir.display(), e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| format!("cannot list {}: {}", work_dir.display(), e))?
    {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "json") {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            return extract_text(&content);
        }
    }

    Err(format!("no JSON output found in {}", work_dir.display()))
}

/// Pull the transcript text out of either Whisper JSON layout
pub fn extract_text(json_content: &str) -> std::result::Result<String, String> {
    let output: WhisperOutput = serde_json::from_str(json_content)
        .map_err(|e| format!("failed to parse whisper JSON: {}", e))?;

    // whisper.cpp layout
    if !output.transcription.is_empty() {
        return Ok(join_segments(output.transcription.iter().map(|s| s.text.as_str())));
    }

    // openai-whisper layout
    Ok(output
        .text
        .unwrap_or_else(|| join_segments(output.segments.iter().map(|s| s.text.as_str()))))
}

fn join_segments<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    texts
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check if a command is available
async fn check_command_available(cmd_name: &str) -> bool {
    Command::new(cmd_name)
        .arg("--help")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    transcription: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_python_layout() {
        let json = r#"{"text": " Hello world.", "segments": [{"id": 0, "text": " Hello world."}], "language": "en"}"#;
        assert_eq!(extract_text(json).unwrap(), " Hello world.");
    }

    #[test]
    fn test_extract_cpp_layout() {
        let json = r#"{
            "result": {"language": "en"},
            "transcription": [
                {"timestamps": {"from": "00:00:00,000", "to": "00:00:02,000"}, "text": " Hello"},
                {"timestamps": {"from": "00:00:02,000", "to": "00:00:04,000"}, "text": " world "}
            ]
        }"#;
        assert_eq!(extract_text(json).unwrap(), "Hello world");
    }

    #[test]
    fn test_extract_segments_without_text() {
        let json = r#"{"segments": [{"text": "one"}, {"text": "  "}, {"text": "two"}]}"#;
        assert_eq!(extract_text(json).unwrap(), "one two");
    }

    #[test]
    fn test_extract_empty_output() {
        assert_eq!(extract_text(r#"{"text": ""}"#).unwrap(), "");
        assert!(extract_text("not json").is_err());
    }

    #[test]
    fn test_read_whisper_json_finds_output() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), "ignored").unwrap();
        std::fs::write(temp_dir.path().join("a.json"), r#"{"text": "found"}"#).unwrap();

        let text = tokio_test::block_on(read_whisper_json(temp_dir.path())).unwrap();
        assert_eq!(text, "found");
    }

    #[test]
    fn test_read_whisper_json_without_output() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let err = tokio_test::block_on(read_whisper_json(temp_dir.path())).unwrap_err();
        assert!(err.starts_with("no JSON output found"));

        let missing = temp_dir.path().join("gone");
        let err = tokio_test::block_on(read_whisper_json(&missing)).unwrap_err();
        assert!(err.starts_with("cannot read"));
    }

    #[test]
    fn test_work_dir_next_to_audio() {
        assert_eq!(
            WhisperTranscriber::work_dir_for(Path::new("media/clips/a_clip_0s.wav")),
            PathBuf::from("media/clips/whisper_a_clip_0s")
        );
    }

    #[test]
    fn test_missing_backend_is_transcription_error() {
        let mut config = TranscriptionConfig::default();
        config.backend = WhisperBackend::Python;
        config.python_command = "no-such-whisper-binary".to_string();
        let temp_dir = tempfile::TempDir::new().unwrap();
        let audio = temp_dir.path().join("a.wav");

        tokio_test::block_on(async {
            let err = WhisperTranscriber::new(config).transcribe(&audio).await.unwrap_err();
            assert!(matches!(err, PipelineError::Transcription { .. }));
        });
        assert!(!temp_dir.path().join("whisper_a").exists());
    }
}
