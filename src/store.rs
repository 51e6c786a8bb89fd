//! Video records and the per-video processing log
//!
//! Two backends: `MemoryStore` for tests and embedding, and `FileStore`,
//! which keeps one JSON document per video and one JSON-lines log per
//! video so writers for different ids never share a file.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::models::{Clip, LogEntry, ProcessedVideo, Video, VideoStatus};

/// Persistent store of video records
#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn insert(&self, video: Video) -> Result<()>;

    async fn get(&self, video_id: &str) -> Result<Option<Video>>;

    /// The aggregate write: publish every result field and mark the record
    /// processed in one step. Fails without touching the record when it
    /// does not exist.
    async fn complete(&self, video_id: &str, result: ProcessedVideo) -> Result<()>;

    /// Clips of a video, `None` when the record is absent or not processed
    async fn clips(&self, video_id: &str) -> Result<Option<Vec<Clip>>> {
        Ok(self
            .get(video_id)
            .await?
            .filter(Video::is_processed)
            .map(|video| video.highlight_clips))
    }
}

/// Append-only event log keyed by video id
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn append(&self, entry: LogEntry) -> Result<()>;

    /// All entries for a video ordered by timestamp
    async fn entries(&self, video_id: &str) -> Result<Vec<LogEntry>>;
}

fn apply_result(video: &mut Video, result: ProcessedVideo) {
    video.total_duration = Some(result.total_duration);
    video.full_transcription = Some(result.full_transcription);
    video.highlight_clips = result.highlight_clips;
    video.status = VideoStatus::Processed;
}

/// Handle one pipeline run uses to write its own log trail
#[derive(Clone)]
pub struct VideoLog {
    sink: Arc<dyn LogSink>,
    video_id: String,
}

impl VideoLog {
    pub fn new(sink: Arc<dyn LogSink>, video_id: impl Into<String>) -> Self {
        Self {
            sink,
            video_id: video_id.into(),
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    /// Append a message and mirror it to tracing. A sink failure is
    /// reported but never interrupts the run.
    pub async fn log(&self, message: impl Into<String>) {
        let entry = LogEntry::new(&self.video_id, message);
        info!(video_id = %self.video_id, "{}", entry.message);

        if let Err(e) = self.sink.append(entry).await {
            warn!(video_id = %self.video_id, "Failed to persist log entry: {}", e);
        }
    }
}

/// In-memory store for records and logs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    videos: Arc<RwLock<HashMap<String, Video>>>,
    logs: Arc<RwLock<HashMap<String, Vec<LogEntry>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn insert(&self, video: Video) -> Result<()> {
        self.videos.write().await.insert(video.video_id.clone(), video);
        Ok(())
    }

    async fn get(&self, video_id: &str) -> Result<Option<Video>> {
        Ok(self.videos.read().await.get(video_id).cloned())
    }

    async fn complete(&self, video_id: &str, result: ProcessedVideo) -> Result<()> {
        let mut videos = self.videos.write().await;
        let video = videos
            .get_mut(video_id)
            .ok_or_else(|| PipelineError::Store(format!("video {} not found", video_id)))?;
        apply_result(video, result);
        Ok(())
    }
}

#[async_trait]
impl LogSink for MemoryStore {
    async fn append(&self, entry: LogEntry) -> Result<()> {
        self.logs
            .write()
            .await
            .entry(entry.video_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn entries(&self, video_id: &str) -> Result<Vec<LogEntry>> {
        let mut entries = self.logs.read().await.get(video_id).cloned().unwrap_or_default();
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }
}

/// Directory-backed store: `videos/<id>.json` and `logs/<id>.jsonl`
#[derive(Debug, Clone)]
pub struct FileStore {
    videos_dir: PathBuf,
    logs_dir: PathBuf,
    cache: Arc<RwLock<HashMap<String, Video>>>,
}

impl FileStore {
    /// Open (or create) a store rooted at `state_dir`, loading existing records
    pub async fn open(state_dir: impl AsRef<Path>) -> Result<Self> {
        let state_dir = state_dir.as_ref();
        let store = Self {
            videos_dir: state_dir.join("videos"),
            logs_dir: state_dir.join("logs"),
            cache: Arc::new(RwLock::new(HashMap::new())),
        };

        fs::create_dir_all(&store.videos_dir).await?;
        fs::create_dir_all(&store.logs_dir).await?;
        store.load_existing().await?;

        let cached = store.cache.read().await.len();
        info!("📊 Store opened at {} with {} video record(s)", state_dir.display(), cached);

        Ok(store)
    }

    async fn load_existing(&self) -> Result<()> {
        let mut entries = fs::read_dir(&self.videos_dir).await?;
        let mut cache = self.cache.write().await;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                match read_video(&path).await {
                    Ok(video) => {
                        cache.insert(video.video_id.clone(), video);
                    }
                    Err(e) => warn!("Failed to load video record {}: {}", path.display(), e),
                }
            }
        }

        Ok(())
    }

    fn video_path(&self, video_id: &str) -> Result<PathBuf> {
        Ok(self.videos_dir.join(format!("{}.json", checked_id(video_id)?)))
    }

    fn log_path(&self, video_id: &str) -> Result<PathBuf> {
        Ok(self.logs_dir.join(format!("{}.jsonl", checked_id(video_id)?)))
    }

    /// Write through a temp file and rename so readers never see half a record
    async fn write_video(&self, video: &Video) -> Result<()> {
        let path = self.video_path(&video.video_id)?;
        let tmp_path = path.with_extension("json.tmp");

        fs::write(&tmp_path, serde_json::to_vec_pretty(video)?).await?;
        fs::rename(&tmp_path, &path).await?;

        debug!("💾 Saved video record {}", path.display());
        Ok(())
    }
}

async fn read_video(path: &Path) -> Result<Video> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

// Ids become file names
fn checked_id(video_id: &str) -> Result<&str> {
    let valid = !video_id.is_empty()
        && video_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(video_id)
    } else {
        Err(PipelineError::Store(format!("invalid video id: {:?}", video_id)))
    }
}

#[async_trait]
impl VideoStore for FileStore {
    async fn insert(&self, video: Video) -> Result<()> {
        self.write_video(&video).await?;
        self.cache.write().await.insert(video.video_id.clone(), video);
        Ok(())
    }

    async fn get(&self, video_id: &str) -> Result<Option<Video>> {
        if checked_id(video_id).is_err() {
            return Ok(None);
        }
        Ok(self.cache.read().await.get(video_id).cloned())
    }

    async fn complete(&self, video_id: &str, result: ProcessedVideo) -> Result<()> {
        let mut video = self
            .get(video_id)
            .await?
            .ok_or_else(|| PipelineError::Store(format!("video {} not found", video_id)))?;
        apply_result(&mut video, result);

        // Disk first: the cache only reflects what was durably written
        self.write_video(&video).await?;
        self.cache.write().await.insert(video_id.to_string(), video);
        Ok(())
    }
}

#[async_trait]
impl LogSink for FileStore {
    async fn append(&self, entry: LogEntry) -> Result<()> {
        let path = self.log_path(&entry.video_id)?;
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn entries(&self, video_id: &str) -> Result<Vec<LogEntry>> {
        let path = match self.log_path(video_id) {
            Ok(path) => path,
            Err(_) => return Ok(Vec::new()),
        };

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<LogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping corrupt log line in {}: {}", path.display(), e),
            }
        }
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }
}
