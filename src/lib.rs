//! Video AI - download, transcribe and clip videos
//!
//! Pipeline: acquire (yt-dlp) → probe (ffprobe) → full transcript (Whisper)
//! → segment into clips (ffmpeg) → per-clip transcripts → aggregate write.

pub mod acquire;
pub mod audio;
pub mod config;
pub mod error;
pub mod models;
pub mod processing;
pub mod ranges;
pub mod segment;
pub mod store;
pub mod transcription;
pub mod video;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{PipelineError, Result};
pub use crate::models::{Clip, LogEntry, PipelineOptions, SubmitRequest, Video, VideoResults, VideoStatus};
pub use crate::processing::{PipelineDispatcher, PipelineReport, PipelineServices, PipelineStage, VideoPipeline};
pub use crate::ranges::{fixed_windows, normalize_ranges, TimeRange};
pub use crate::segment::{ClipLibrary, SegmentationMode};
pub use crate::store::{FileStore, LogSink, MemoryStore, VideoStore};
pub use crate::transcription::{SpeechToText, Transcriber, WhisperTranscriber};
