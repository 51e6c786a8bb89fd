use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::acquire::{Acquirer, MediaFetcher, YtDlpFetcher};
use crate::audio::{AudioExtraction, AudioExtractor};
use crate::config::{Config, StorageConfig};
use crate::error::{PipelineError, Result};
use crate::models::{Clip, LogEntry, PipelineOptions, ProcessedVideo, SubmitRequest, Video, VideoResults};
use crate::ranges::{normalize_ranges, TimeRange};
use crate::segment::{ClipLibrary, SegmentationMode, Segmenter};
use crate::store::{LogSink, VideoLog, VideoStore};
use crate::transcription::{
    SpeechToText, TranscriptOutcome, Transcriber, WhisperTranscriber, FULL_TRANSCRIPTION_FAILED,
};
use crate::video::{ClipEncoder, MediaProber, VideoProcessor};

/// Stages of one pipeline run, strictly ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Pending,
    Acquiring,
    Probing,
    TranscribingFull,
    Segmenting,
    Aggregating,
    Processed,
    Failed,
}

/// Outcome of a single pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub video_id: String,
    pub final_stage: PipelineStage,
    pub stages_completed: Vec<PipelineStage>,
    pub clips_produced: usize,
    pub error: Option<String>,
    pub processing_time: Duration,
}

impl PipelineReport {
    pub fn is_processed(&self) -> bool {
        self.final_stage == PipelineStage::Processed
    }
}

/// Capabilities and stores a pipeline is built from
#[derive(Clone)]
pub struct PipelineServices {
    pub store: Arc<dyn VideoStore>,
    pub logs: Arc<dyn LogSink>,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub prober: Arc<dyn MediaProber>,
    pub encoder: Arc<dyn ClipEncoder>,
    pub audio: Arc<dyn AudioExtraction>,
    pub speech: Arc<dyn SpeechToText>,
}

impl PipelineServices {
    /// External tools (yt-dlp, ffmpeg, whisper) as configured
    pub fn from_config(config: &Config, store: Arc<dyn VideoStore>, logs: Arc<dyn LogSink>) -> Self {
        let video_processor = Arc::new(
            VideoProcessor::new()
                .with_binaries(&config.media.ffprobe_command, &config.media.ffmpeg_command)
                .with_codecs(&config.media.video_codec, &config.media.audio_codec),
        );

        Self {
            store,
            logs,
            fetcher: Arc::new(YtDlpFetcher::new(
                &config.acquisition.ytdlp_command,
                &config.acquisition.format,
            )),
            prober: video_processor.clone(),
            encoder: video_processor,
            audio: Arc::new(
                AudioExtractor::new()
                    .with_binary(&config.media.ffmpeg_command)
                    .with_sample_rate(config.media.target_sample_rate),
            ),
            speech: Arc::new(WhisperTranscriber::new(config.transcription.clone())),
        }
    }
}

/// Tracks stage progress while a run moves forward
struct StageTracker {
    video_id: String,
    current: PipelineStage,
    completed: Vec<PipelineStage>,
    started: Instant,
}

impl StageTracker {
    fn new(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            current: PipelineStage::Pending,
            completed: Vec::new(),
            started: Instant::now(),
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        if self.current != PipelineStage::Pending {
            self.completed.push(self.current);
        }
        debug!(video_id = %self.video_id, "➡️  {:?}", stage);
        self.current = stage;
    }

    fn fail(self, error: impl ToString) -> PipelineReport {
        PipelineReport {
            video_id: self.video_id,
            final_stage: PipelineStage::Failed,
            stages_completed: self.completed,
            clips_produced: 0,
            error: Some(error.to_string()),
            processing_time: self.started.elapsed(),
        }
    }

    fn finish(mut self, clips_produced: usize) -> PipelineReport {
        self.enter(PipelineStage::Processed);
        PipelineReport {
            video_id: self.video_id,
            final_stage: PipelineStage::Processed,
            stages_completed: self.completed,
            clips_produced,
            error: None,
            processing_time: self.started.elapsed(),
        }
    }
}

/// Orchestrates one video from download to the aggregate write.
///
/// Acquisition and probing failures end the run with the record left at
/// `pending`. Every later failure degrades to a sentinel or a skipped clip.
pub struct VideoPipeline {
    store: Arc<dyn VideoStore>,
    logs: Arc<dyn LogSink>,
    prober: Arc<dyn MediaProber>,
    audio: Arc<dyn AudioExtraction>,
    acquirer: Acquirer,
    transcriber: Transcriber,
    segmenter: Segmenter,
    library: ClipLibrary,
}

impl VideoPipeline {
    pub fn new(services: PipelineServices, storage: &StorageConfig) -> Self {
        let transcriber = Transcriber::new(services.speech);
        let library = ClipLibrary::new(storage.clips_path());

        Self {
            acquirer: Acquirer::new(services.fetcher, storage.downloads_path()),
            segmenter: Segmenter::new(
                services.encoder,
                services.audio.clone(),
                transcriber.clone(),
                library.clone(),
            ),
            store: services.store,
            logs: services.logs,
            prober: services.prober,
            audio: services.audio,
            transcriber,
            library,
        }
    }

    /// Pipeline backed by the configured external tools
    pub fn from_config(config: &Config, store: Arc<dyn VideoStore>, logs: Arc<dyn LogSink>) -> Self {
        Self::new(PipelineServices::from_config(config, store, logs), &config.storage)
    }

    pub fn store(&self) -> &Arc<dyn VideoStore> {
        &self.store
    }

    pub fn logs(&self) -> &Arc<dyn LogSink> {
        &self.logs
    }

    pub fn library(&self) -> &ClipLibrary {
        &self.library
    }

    /// Run every stage for one video. Never returns an error: the report
    /// carries the final stage and the reason a run stopped early.
    pub async fn run(&self, video_id: &str, options: &PipelineOptions) -> PipelineReport {
        let log = VideoLog::new(self.logs.clone(), video_id);
        let mut tracker = StageTracker::new(video_id);

        let video = match self.store.get(video_id).await {
            Ok(Some(video)) => video,
            Ok(None) => {
                log.log("Error: Video not found in database.").await;
                return tracker.fail("video not found");
            }
            Err(e) => {
                log.log(format!("Error: Video not found in database. ({})", e)).await;
                return tracker.fail(e);
            }
        };

        // Acquisition
        tracker.enter(PipelineStage::Acquiring);
        log.log(format!("Starting download for {}", video.url)).await;
        let media_path = match self.acquirer.acquire(&video.url, video_id).await {
            Ok(path) => path,
            Err(e) => {
                log.log(format!("Error downloading video: {}", e)).await;
                return tracker.fail(e);
            }
        };
        log.log("Download complete.").await;

        // Probing
        tracker.enter(PipelineStage::Probing);
        log.log("Loading video...").await;
        let media = match self.prober.probe(&media_path).await {
            Ok(media) => media,
            Err(e) => {
                log.log(format!("Error loading video: {}", e)).await;
                return tracker.fail(e);
            }
        };
        if !media.has_audio() {
            log.log("Error: No audio detected in the video.").await;
            return tracker.fail(PipelineError::NoAudioTrack { path: media_path });
        }
        let total_duration = media.total_duration();

        // Full transcript
        tracker.enter(PipelineStage::TranscribingFull);
        let full_transcription = self.transcribe_full(&media_path, &log).await;

        // Segmentation
        tracker.enter(PipelineStage::Segmenting);
        log.log("Generating video clips...").await;
        let mode = segmentation_mode(options, total_duration);
        let highlight_clips = self
            .segmenter
            .segment(&media_path, &mode, total_duration, &log)
            .await;

        // Aggregate write
        tracker.enter(PipelineStage::Aggregating);
        let clips_produced = highlight_clips.len();
        let result = ProcessedVideo {
            total_duration,
            full_transcription,
            highlight_clips,
        };
        if let Err(e) = self.store.complete(video_id, result).await {
            log.log(format!("Error saving processed data: {}", e)).await;
            return tracker.fail(e);
        }

        log.log("Processing complete.").await;
        tracker.finish(clips_produced)
    }

    async fn transcribe_full(&self, media_path: &Path, log: &VideoLog) -> String {
        log.log("Extracting full audio for transcription...").await;
        let audio_path = AudioExtractor::audio_path_for(media_path);
        let audio_path = match self.audio.extract_audio(media_path, &audio_path).await {
            Ok(path) => path,
            Err(e) => {
                log.log(format!("Error transcribing full video: {}", e)).await;
                return FULL_TRANSCRIPTION_FAILED.to_string();
            }
        };

        log.log("Transcribing full video audio...").await;
        let outcome = self.transcriber.transcribe(&audio_path).await;
        match &outcome {
            TranscriptOutcome::Failed(reason) => {
                log.log(format!("Error transcribing full video: {}", reason)).await;
            }
            TranscriptOutcome::NoSpeech => {
                log.log("Warning: Full video transcript is empty.").await;
                log.log("Full video transcription complete.").await;
            }
            TranscriptOutcome::Speech(_) => {
                log.log("Full video transcription complete.").await;
            }
        }
        outcome.into_text(FULL_TRANSCRIPTION_FAILED)
    }
}

/// Custom ranges win over fixed windows; ranges are clamped to the probed duration
fn segmentation_mode(options: &PipelineOptions, total_duration: u64) -> SegmentationMode {
    match &options.clip_ranges {
        Some(ranges) if !ranges.is_empty() => {
            SegmentationMode::Custom(normalize_ranges(ranges, total_duration as f64))
        }
        _ => SegmentationMode::Fixed {
            clip_length: options.clip_length,
        },
    }
}

/// A submission accepted by the dispatcher
pub struct Submission {
    pub video_id: String,
    pub handle: JoinHandle<PipelineReport>,
}

/// Bounded worker pool running pipelines as independent tasks
#[derive(Clone)]
pub struct PipelineDispatcher {
    pipeline: Arc<VideoPipeline>,
    permits: Arc<Semaphore>,
    max_workers: usize,
    default_clip_length: u64,
}

impl PipelineDispatcher {
    pub fn new(pipeline: VideoPipeline, max_workers: usize, default_clip_length: u64) -> Self {
        let max_workers = max_workers.max(1);
        info!("🔧 Initializing PipelineDispatcher with {} workers", max_workers);

        Self {
            pipeline: Arc::new(pipeline),
            permits: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            default_clip_length,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn VideoStore>, logs: Arc<dyn LogSink>) -> Self {
        Self::new(
            VideoPipeline::from_config(config, store, logs),
            config.pipeline.max_workers,
            config.pipeline.default_clip_length,
        )
    }

    /// Queue a pipeline run for an existing record. The returned handle can
    /// be dropped; the run continues regardless.
    pub fn submit(&self, video_id: impl Into<String>, options: PipelineOptions) -> JoinHandle<PipelineReport> {
        let video_id = video_id.into();
        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(video_id = %video_id, "Worker pool closed: {}", e);
                    return StageTracker::new(&video_id).fail(e);
                }
            };

            info!(video_id = %video_id, "📹 Pipeline started");
            let run = {
                let video_id = video_id.clone();
                tokio::spawn(async move { pipeline.run(&video_id, &options).await })
            };

            match run.await {
                Ok(report) => {
                    if report.is_processed() {
                        info!(video_id = %video_id, "✅ Completed with {} clip(s) in {:.2}s",
                              report.clips_produced, report.processing_time.as_secs_f64());
                    } else {
                        warn!(video_id = %video_id, "❌ Failed: {}",
                              report.error.as_deref().unwrap_or("Unknown error"));
                    }
                    report
                }
                Err(e) => {
                    error!(video_id = %video_id, "Pipeline task aborted: {}", e);
                    StageTracker::new(&video_id).fail(e)
                }
            }
        })
    }

    /// Validate a request, create its pending record and queue the run
    pub async fn submit_video(&self, request: &SubmitRequest) -> Result<Submission> {
        let (url, options) = request.validate(self.default_clip_length)?;
        let video_id = Uuid::new_v4().to_string();

        self.pipeline
            .store()
            .insert(Video::pending(&video_id, url))
            .await?;

        let handle = self.submit(video_id.clone(), options);
        Ok(Submission { video_id, handle })
    }

    pub async fn get_video(&self, video_id: &str) -> Result<Option<Video>> {
        self.pipeline.store().get(video_id).await
    }

    pub async fn logs_for(&self, video_id: &str) -> Result<Vec<LogEntry>> {
        self.pipeline.logs().entries(video_id).await
    }

    pub async fn clips_for(&self, video_id: &str) -> Result<Option<Vec<Clip>>> {
        self.pipeline.store().clips(video_id).await
    }

    pub async fn results(&self, video_id: &str) -> Result<Option<VideoResults>> {
        Ok(self.get_video(video_id).await?.map(VideoResults::from))
    }

    pub async fn clip_path(&self, clip_name: &str) -> Option<PathBuf> {
        self.pipeline.library().resolve(clip_name).await
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            max_workers: self.max_workers,
            available_permits: self.permits.available_permits(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStats {
    pub max_workers: usize,
    pub available_permits: usize,
}

/// Convenience for callers holding raw `[start, end]` pairs
pub fn ranges_from_pairs(pairs: &[[f64; 2]]) -> Vec<TimeRange> {
    pairs.iter().map(|[start, end]| TimeRange::new(*start, *end)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_ranges_are_normalized() {
        let options = PipelineOptions::with_ranges(30, ranges_from_pairs(&[[80.0, 120.0], [100.0, 110.0]]));
        match segmentation_mode(&options, 95) {
            SegmentationMode::Custom(ranges) => {
                assert_eq!(ranges[0], TimeRange::new(80.0, 95.0));
                assert_eq!(ranges[1], TimeRange::new(95.0, 95.0));
            }
            other => panic!("unexpected mode {:?}", other),
        }
    }

    #[test]
    fn test_no_ranges_means_fixed_windows() {
        assert_eq!(
            segmentation_mode(&PipelineOptions::fixed(20), 95),
            SegmentationMode::Fixed { clip_length: 20 }
        );
    }

    #[test]
    fn test_tracker_records_completed_stages() {
        let mut tracker = StageTracker::new("v");
        tracker.enter(PipelineStage::Acquiring);
        tracker.enter(PipelineStage::Probing);
        let report = tracker.fail("no audio");

        assert_eq!(report.final_stage, PipelineStage::Failed);
        assert_eq!(report.stages_completed, vec![PipelineStage::Acquiring]);
        assert_eq!(report.error.as_deref(), Some("no audio"));
        assert!(!report.is_processed());
    }

    #[test]
    fn test_tracker_finish() {
        let mut tracker = StageTracker::new("v");
        for stage in [
            PipelineStage::Acquiring,
            PipelineStage::Probing,
            PipelineStage::TranscribingFull,
            PipelineStage::Segmenting,
            PipelineStage::Aggregating,
        ] {
            tracker.enter(stage);
        }
        let report = tracker.finish(4);
        assert!(report.is_processed());
        assert_eq!(report.clips_produced, 4);
        assert_eq!(report.stages_completed.len(), 5);
    }
}
