//! API request handlers

use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

use super::models::{ApiError, ClipsResponse, LogsResponse, SubmitResponse};
use crate::models::{SubmitRequest, Video, VideoResults};
use crate::processing::PipelineDispatcher;

pub type HandlerResult<T> = std::result::Result<T, ApiError>;

/// Handle health check requests
pub async fn health_check(dispatcher: &PipelineDispatcher) -> Value {
    let stats = dispatcher.stats();
    serde_json::json!({
        "status": "healthy",
        "service": "video-ai",
        "version": env!("CARGO_PKG_VERSION"),
        "workers": stats.max_workers,
        "idle_workers": stats.available_permits,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

/// Parse a raw submission body, validate it and start processing
pub async fn submit_video(dispatcher: &PipelineDispatcher, body: &[u8]) -> HandlerResult<SubmitResponse> {
    let request: SubmitRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON format: {}", e)))?;

    let submission = dispatcher.submit_video(&request).await?;
    info!("📨 Accepted video {}", submission.video_id);

    // Fire and forget: the handle is dropped, the run keeps going
    Ok(SubmitResponse {
        video_id: submission.video_id,
        message: "Processing started in background".to_string(),
    })
}

pub async fn get_status(dispatcher: &PipelineDispatcher, video_id: &str) -> HandlerResult<Video> {
    dispatcher
        .get_video(video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))
}

pub async fn get_logs(dispatcher: &PipelineDispatcher, video_id: &str) -> HandlerResult<LogsResponse> {
    let logs = dispatcher.logs_for(video_id).await?;
    if logs.is_empty() {
        return Err(ApiError::NotFound("No logs found for this video".to_string()));
    }
    Ok(LogsResponse { logs })
}

pub async fn list_clips(dispatcher: &PipelineDispatcher, video_id: &str) -> HandlerResult<ClipsResponse> {
    dispatcher
        .clips_for(video_id)
        .await?
        .map(|clips| ClipsResponse { clips })
        .ok_or_else(|| ApiError::NotFound("No clips found for this video".to_string()))
}

pub async fn clip_file(dispatcher: &PipelineDispatcher, clip_name: &str) -> HandlerResult<PathBuf> {
    dispatcher
        .clip_path(clip_name)
        .await
        .ok_or_else(|| ApiError::NotFound("Clip not found".to_string()))
}

pub async fn get_video_results(dispatcher: &PipelineDispatcher, video_id: &str) -> HandlerResult<VideoResults> {
    dispatcher
        .results(video_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Video not found".to_string()))
}
