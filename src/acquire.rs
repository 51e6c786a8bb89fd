//! Media acquisition: materialize a remote video at a path keyed by its id

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Something that can fetch a source reference into a local file
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Downloads through the `yt-dlp` command line tool
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary: String,
    format: String,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            format: format.into(),
        }
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new("yt-dlp", "best")
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        debug!("⬇️  {} -> {}", url, destination.display());

        let output = Command::new(&self.binary)
            .arg(url)
            .arg("-f")
            .arg(&self.format)
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--force-overwrites")
            .arg("-o")
            .arg(destination)
            .output()
            .await
            .map_err(|e| PipelineError::Download {
                url: url.to_string(),
                reason: format!("failed to run {}: {}", self.binary, e),
            })?;

        if !output.status.success() {
            return Err(PipelineError::Download {
                url: url.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Places downloads under one directory at `<video_id>.mp4`
#[derive(Clone)]
pub struct Acquirer {
    fetcher: Arc<dyn MediaFetcher>,
    downloads_dir: PathBuf,
}

impl Acquirer {
    pub fn new(fetcher: Arc<dyn MediaFetcher>, downloads_dir: PathBuf) -> Self {
        Self {
            fetcher,
            downloads_dir,
        }
    }

    /// Deterministic artifact path for a video id
    pub fn artifact_path(&self, video_id: &str) -> PathBuf {
        self.downloads_dir.join(format!("{}.mp4", video_id))
    }

    /// Fetch the source and confirm the artifact actually exists on disk
    pub async fn acquire(&self, url: &str, video_id: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.downloads_dir).await?;

        let path = self.artifact_path(video_id);
        self.fetcher.fetch(url, &path).await?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(PipelineError::MissingArtifact { path });
        }

        info!("📥 Downloaded {} to {}", url, path.display());
        Ok(path)
    }
}
