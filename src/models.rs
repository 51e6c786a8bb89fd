use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PipelineError;
use crate::ranges::TimeRange;

/// Lifecycle status persisted on a video record.
///
/// Only `pending` and `processed` are ever written. A run that aborts leaves
/// the record at `pending`, so absence of `processed` is the failure signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Processed,
}

/// Persisted record for one submitted video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Opaque unique identity (UUID v4)
    pub video_id: String,

    /// Source reference supplied by the submitter
    pub url: String,

    pub status: VideoStatus,

    pub created_at: DateTime<Utc>,

    /// Whole seconds, populated by the aggregate write
    pub total_duration: Option<u64>,

    /// Full transcript or one of the transcription sentinels
    pub full_transcription: Option<String>,

    /// Clips in the order they were generated
    #[serde(default)]
    pub highlight_clips: Vec<Clip>,
}

impl Video {
    /// New record in the state it has right after submission
    pub fn pending(video_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            url: url.into(),
            status: VideoStatus::Pending,
            created_at: Utc::now(),
            total_duration: None,
            full_transcription: None,
            highlight_clips: Vec::new(),
        }
    }

    pub fn is_processed(&self) -> bool {
        self.status == VideoStatus::Processed
    }
}

/// One transcribed segment of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    /// File name of the clip artifact inside the clips directory
    pub clip: String,
    pub start_time: f64,
    pub end_time: f64,
    pub transcript: String,
}

/// Append-only audit entry for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub video_id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(video_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Everything the aggregate write publishes in one go
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedVideo {
    pub total_duration: u64,
    pub full_transcription: String,
    pub highlight_clips: Vec<Clip>,
}

/// Submission payload as received from a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub url: Option<String>,

    /// Accepts `30`, `30.0` or `"30"`; fractional seconds are truncated
    #[serde(default, deserialize_with = "deserialize_clip_length")]
    pub clip_length: Option<i64>,

    /// `[start, end]` pairs in seconds, numbers or numeric strings
    #[serde(default, deserialize_with = "deserialize_clip_ranges")]
    pub clip_ranges: Option<Vec<[f64; 2]>>,
}

/// A number as loosely typed clients send it
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

fn deserialize_clip_length<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value: Option<LooseNumber> = Option::deserialize(deserializer)?;
    value
        .map(|number| match number {
            LooseNumber::Int(len) => Ok(len),
            LooseNumber::Float(len) if len.is_finite() => Ok(len.trunc() as i64),
            LooseNumber::Float(len) => Err(D::Error::custom(format!("invalid clip length {}", len))),
            LooseNumber::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| D::Error::custom(format!("invalid clip length {:?}", text))),
        })
        .transpose()
}

fn deserialize_clip_ranges<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<[f64; 2]>>, D::Error> {
    let value: Option<Vec<[LooseNumber; 2]>> = Option::deserialize(deserializer)?;
    let seconds = |number: LooseNumber| match number {
        LooseNumber::Int(n) => Ok(n as f64),
        LooseNumber::Float(n) => Ok(n),
        LooseNumber::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("invalid range bound {:?}", text))),
    };
    value
        .map(|pairs| {
            pairs
                .into_iter()
                .map(|[start, end]| -> Result<[f64; 2], D::Error> { Ok([seconds(start)?, seconds(end)?]) })
                .collect()
        })
        .transpose()
}

/// Validated per-run options handed to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    pub clip_length: u64,

    /// `Some` selects custom-range segmentation
    pub clip_ranges: Option<Vec<TimeRange>>,
}

impl PipelineOptions {
    pub fn fixed(clip_length: u64) -> Self {
        Self {
            clip_length,
            clip_ranges: None,
        }
    }

    pub fn with_ranges(clip_length: u64, ranges: Vec<TimeRange>) -> Self {
        Self {
            clip_length,
            clip_ranges: if ranges.is_empty() { None } else { Some(ranges) },
        }
    }
}

impl SubmitRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_clip_length(mut self, clip_length: i64) -> Self {
        self.clip_length = Some(clip_length);
        self
    }

    pub fn with_ranges(mut self, ranges: Vec<[f64; 2]>) -> Self {
        self.clip_ranges = Some(ranges);
        self
    }

    /// Validate the request before any pipeline stage runs.
    ///
    /// Returns the source URL and the options for the run. An empty range
    /// list is treated the same as no ranges at all.
    pub fn validate(&self, default_clip_length: u64) -> Result<(String, PipelineOptions), PipelineError> {
        let url = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| PipelineError::InvalidRequest("Missing video URL".to_string()))?;

        url::Url::parse(url)
            .map_err(|e| PipelineError::InvalidRequest(format!("Invalid video URL {}: {}", url, e)))?;

        let clip_length = match self.clip_length {
            None => default_clip_length,
            Some(len) if len > 0 => len as u64,
            Some(len) => {
                return Err(PipelineError::InvalidRequest(format!(
                    "Invalid clip length {}: must be a positive number of seconds",
                    len
                )))
            }
        };

        let mut ranges = Vec::new();
        for [start, end] in self.clip_ranges.iter().flatten().copied() {
            if !start.is_finite() || !end.is_finite() {
                return Err(PipelineError::InvalidRequest(
                    "Clip ranges must contain valid numbers.".to_string(),
                ));
            }
            if start >= end || start < 0.0 {
                return Err(PipelineError::InvalidRequest(format!(
                    "Invalid range [{}, {}]. Start must be less than end and non-negative.",
                    start, end
                )));
            }
            ranges.push(TimeRange::new(start, end));
        }

        Ok((url.to_string(), PipelineOptions::with_ranges(clip_length, ranges)))
    }
}

/// Read-side view combining the record with display fallbacks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoResults {
    pub video_id: String,
    pub total_duration: Option<u64>,
    pub transcript: String,

    /// No summarizer runs, so this is always the fallback
    pub summary: String,
    pub highlight_clips: Vec<Clip>,
}

impl From<Video> for VideoResults {
    fn from(video: Video) -> Self {
        Self {
            video_id: video.video_id,
            total_duration: video.total_duration,
            transcript: video
                .full_transcription
                .unwrap_or_else(|| "Not available".to_string()),
            summary: "Not available".to_string(),
            highlight_clips: video.highlight_clips,
        }
    }
}
