//! Segmentation: cut a video into clips and transcribe each one

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::audio::{AudioExtraction, AudioExtractor};
use crate::models::Clip;
use crate::ranges::{fixed_windows, TimeRange};
use crate::store::VideoLog;
use crate::transcription::{TranscriptOutcome, Transcriber, CLIP_TRANSCRIPTION_FAILED};
use crate::video::ClipEncoder;

/// How a run splits its video, chosen by whether the caller sent ranges
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationMode {
    /// Consecutive windows of `clip_length` seconds
    Fixed { clip_length: u64 },
    /// Already-normalized ranges, one clip per entry in input order
    Custom(Vec<TimeRange>),
}

/// One planned clip
#[derive(Debug, Clone, PartialEq)]
pub struct ClipWindow {
    pub range: TimeRange,
    pub file_name: String,
}

/// Render seconds for file names: whole values without a fraction
fn seconds_label(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Deterministic clip file name for a window
pub fn clip_file_name(video_id: &str, range: TimeRange, mode: &SegmentationMode) -> String {
    match mode {
        SegmentationMode::Fixed { .. } => {
            format!("{}_clip_{}s.mp4", video_id, seconds_label(range.start))
        }
        SegmentationMode::Custom(_) => format!(
            "{}_clip_{}s_{}s.mp4",
            video_id,
            seconds_label(range.start),
            seconds_label(range.end)
        ),
    }
}

/// Windows a run will produce, in generation order
pub fn plan_windows(video_id: &str, mode: &SegmentationMode, total_duration: u64) -> Vec<ClipWindow> {
    let ranges = match mode {
        SegmentationMode::Fixed { clip_length } => fixed_windows(*clip_length, total_duration),
        SegmentationMode::Custom(ranges) => ranges.clone(),
    };

    ranges
        .into_iter()
        .map(|range| ClipWindow {
            range,
            file_name: clip_file_name(video_id, range, mode),
        })
        .collect()
}

/// Resolves clip artifacts by file name inside the clips directory
#[derive(Debug, Clone)]
pub struct ClipLibrary {
    clips_dir: PathBuf,
}

impl ClipLibrary {
    pub fn new(clips_dir: PathBuf) -> Self {
        Self { clips_dir }
    }

    pub fn clips_dir(&self) -> &Path {
        &self.clips_dir
    }

    /// Path of an existing clip, `None` when absent or the name is not a plain file name
    pub async fn resolve(&self, clip_name: &str) -> Option<PathBuf> {
        let plain = !clip_name.is_empty()
            && !clip_name.contains(|c: char| c == '/' || c == '\\')
            && clip_name != "."
            && clip_name != "..";
        if !plain {
            return None;
        }

        let path = self.clips_dir.join(clip_name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }
}

/// Produces clip artifacts and their transcripts
#[derive(Clone)]
pub struct Segmenter {
    encoder: Arc<dyn ClipEncoder>,
    audio: Arc<dyn AudioExtraction>,
    transcriber: Transcriber,
    library: ClipLibrary,
}

impl Segmenter {
    pub fn new(
        encoder: Arc<dyn ClipEncoder>,
        audio: Arc<dyn AudioExtraction>,
        transcriber: Transcriber,
        library: ClipLibrary,
    ) -> Self {
        Self {
            encoder,
            audio,
            transcriber,
            library,
        }
    }

    /// Cut, extract and transcribe every planned window.
    ///
    /// A window whose encode or audio extraction fails is logged and left
    /// out; the remaining windows still run. Zero-length custom ranges are
    /// skipped with a log entry.
    pub async fn segment(
        &self,
        source: &Path,
        mode: &SegmentationMode,
        total_duration: u64,
        log: &VideoLog,
    ) -> Vec<Clip> {
        let windows = plan_windows(log.video_id(), mode, total_duration);
        let mut clips = Vec::with_capacity(windows.len());

        if let Err(e) = tokio::fs::create_dir_all(self.library.clips_dir()).await {
            log.log(format!("Error generating clips: {}", e)).await;
            return clips;
        }

        info!("✂️ Segmenting {} into {} window(s)", source.display(), windows.len());

        for window in windows {
            if window.range.is_empty() {
                log.log(format!(
                    "Skipping zero-length clip range [{}, {}].",
                    window.range.start, window.range.end
                ))
                .await;
                continue;
            }

            if let Some(clip) = self.produce_clip(source, &window, log).await {
                clips.push(clip);
            }
        }

        debug!("Segmentation produced {} clip(s)", clips.len());
        clips
    }

    async fn produce_clip(&self, source: &Path, window: &ClipWindow, log: &VideoLog) -> Option<Clip> {
        let clip_path = self.library.clips_dir().join(&window.file_name);

        if let Err(e) = self.encoder.encode_clip(source, window.range, &clip_path).await {
            log.log(format!("Error generating clip {}: {}", window.file_name, e)).await;
            return None;
        }

        let audio_path = AudioExtractor::audio_path_for(&clip_path);
        let audio_path = match self.audio.extract_audio(&clip_path, &audio_path).await {
            Ok(path) => path,
            Err(e) => {
                log.log(format!("Error extracting audio for clip {}: {}", window.file_name, e)).await;
                return None;
            }
        };

        log.log(format!("Transcribing clip {}...", window.file_name)).await;
        let outcome = self.transcriber.transcribe(&audio_path).await;
        if let TranscriptOutcome::Failed(reason) = &outcome {
            log.log(format!("Error transcribing clip {}: {}", window.file_name, reason)).await;
        }
        let transcript = outcome.into_text(CLIP_TRANSCRIPTION_FAILED);

        log.log(format!("Clip saved: {}", window.file_name)).await;
        log.log(format!("Clip Transcript: {}", transcript)).await;

        Some(Clip {
            clip: window.file_name.clone(),
            start_time: window.range.start,
            end_time: window.range.end,
            transcript,
        })
    }
}
