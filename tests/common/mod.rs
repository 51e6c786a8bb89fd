#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use video_ai::audio::AudioExtraction;
use video_ai::config::StorageConfig;
use video_ai::error::{PipelineError, Result};
use video_ai::models::{ProcessedVideo, Video};
use video_ai::ranges::TimeRange;
use video_ai::store::{LogSink, MemoryStore, VideoStore};
use video_ai::transcription::SpeechToText;
use video_ai::video::{AudioStreamInfo, ClipEncoder, MediaInfo, MediaProber};
use video_ai::{PipelineServices, VideoPipeline};

/// Writes a placeholder file, or fails for URLs containing "unreachable"
pub struct FakeFetcher;

#[async_trait]
impl video_ai::acquire::MediaFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        if url.contains("unreachable") {
            return Err(PipelineError::Download {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        tokio::fs::write(destination, b"video").await?;
        Ok(())
    }
}

/// Reports a duration per video id (file stem), with an optional silent set
pub struct FakeProber {
    pub default_duration: f64,
    pub durations: HashMap<String, f64>,
    pub silent: HashSet<String>,
}

impl FakeProber {
    pub fn new(default_duration: f64) -> Self {
        Self {
            default_duration,
            durations: HashMap::new(),
            silent: HashSet::new(),
        }
    }
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let stem = path.file_stem().unwrap().to_string_lossy().to_string();
        let duration = self.durations.get(&stem).copied().unwrap_or(self.default_duration);
        let audio_streams = if self.silent.contains(&stem) {
            Vec::new()
        } else {
            vec![AudioStreamInfo {
                index: 0,
                codec: "aac".to_string(),
                sample_rate: 44100,
                channels: 2,
            }]
        };

        Ok(MediaInfo {
            path: path.to_path_buf(),
            duration: Duration::from_secs_f64(duration),
            width: 1280,
            height: 720,
            format: "mp4".to_string(),
            audio_streams,
        })
    }
}

/// Writes clip files, failing for output names listed in `fail_names`
#[derive(Default)]
pub struct FakeEncoder {
    pub fail_names: HashSet<String>,
    pub encoded: Mutex<Vec<String>>,
}

#[async_trait]
impl ClipEncoder for FakeEncoder {
    async fn encode_clip(&self, _source: &Path, _range: TimeRange, output: &Path) -> Result<()> {
        let name = output.file_name().unwrap().to_string_lossy().to_string();
        if self.fail_names.contains(&name) {
            return Err(PipelineError::Encode {
                output: output.to_path_buf(),
                reason: "encoder crashed".to_string(),
            });
        }
        tokio::fs::write(output, b"clip").await?;
        self.encoded.lock().unwrap().push(name);
        Ok(())
    }
}

/// Writes placeholder WAVs, failing for media stems listed in `failing`
#[derive(Default)]
pub struct FakeAudio {
    pub failing: HashSet<String>,
}

#[async_trait]
impl AudioExtraction for FakeAudio {
    async fn extract_audio(&self, media: &Path, output: &Path) -> Result<PathBuf> {
        let stem = media.file_stem().unwrap().to_string_lossy().to_string();
        if self.failing.contains(&stem) {
            return Err(PipelineError::AudioExtraction {
                media: media.to_path_buf(),
                reason: "no decodable audio".to_string(),
            });
        }
        tokio::fs::write(output, b"wav").await?;
        Ok(output.to_path_buf())
    }
}

/// Transcribes "speech from <stem>", or empty/error for listed stems
#[derive(Default)]
pub struct FakeSpeech {
    pub empty: HashSet<String>,
    pub failing: HashSet<String>,
}

#[async_trait]
impl SpeechToText for FakeSpeech {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let stem = audio.file_stem().unwrap().to_string_lossy().to_string();
        if self.failing.contains(&stem) {
            return Err(PipelineError::Transcription {
                audio: audio.to_path_buf(),
                reason: "model crashed".to_string(),
            });
        }
        if self.empty.contains(&stem) {
            return Ok("   ".to_string());
        }
        Ok(format!("speech from {}", stem))
    }
}

/// Memory store whose aggregate write always fails
#[derive(Default)]
pub struct BrokenStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl VideoStore for BrokenStore {
    async fn insert(&self, video: Video) -> Result<()> {
        self.inner.insert(video).await
    }

    async fn get(&self, video_id: &str) -> Result<Option<Video>> {
        self.inner.get(video_id).await
    }

    async fn complete(&self, _video_id: &str, _result: ProcessedVideo) -> Result<()> {
        Err(PipelineError::Store("disk full".to_string()))
    }
}

/// Speech engine that records how many calls run at once
#[derive(Default)]
pub struct SlowSpeech {
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
}

#[async_trait]
impl SpeechToText for SlowSpeech {
    async fn transcribe(&self, _audio: &Path) -> Result<String> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok("words".to_string())
    }
}

pub struct Harness {
    pub temp_dir: TempDir,
    pub storage: StorageConfig,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            media_root: temp_dir.path().to_path_buf(),
            downloads_dir: "downloads".to_string(),
            clips_dir: "clips".to_string(),
            store_dir: "store".to_string(),
        };
        Self {
            temp_dir,
            storage,
            store: Arc::new(MemoryStore::new()),
        }
    }

    pub fn services(
        &self,
        prober: FakeProber,
        encoder: Arc<FakeEncoder>,
        speech: Arc<dyn SpeechToText>,
    ) -> PipelineServices {
        PipelineServices {
            store: self.store.clone(),
            logs: self.store.clone(),
            fetcher: Arc::new(FakeFetcher),
            prober: Arc::new(prober),
            encoder,
            audio: Arc::new(FakeAudio::default()),
            speech,
        }
    }

    pub fn pipeline(&self, prober: FakeProber, speech: FakeSpeech) -> VideoPipeline {
        VideoPipeline::new(
            self.services(prober, Arc::new(FakeEncoder::default()), Arc::new(speech)),
            &self.storage,
        )
    }

    pub fn pipeline_with_audio(&self, prober: FakeProber, audio: FakeAudio) -> VideoPipeline {
        let mut services = self.services(
            prober,
            Arc::new(FakeEncoder::default()),
            Arc::new(FakeSpeech::default()),
        );
        let audio: Arc<dyn AudioExtraction> = Arc::new(audio);
        services.audio = audio;
        VideoPipeline::new(services, &self.storage)
    }

    pub async fn insert(&self, video_id: &str, url: &str) {
        self.store.insert(Video::pending(video_id, url)).await.unwrap();
    }

    pub async fn messages(&self, video_id: &str) -> Vec<String> {
        self.store
            .entries(video_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect()
    }
}
