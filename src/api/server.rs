//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    body::{Body, Bytes},
    extract::{Path, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower::{ServiceBuilder, ServiceExt};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeFile,
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::handlers;
use super::models::ApiError;
use crate::processing::PipelineDispatcher;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: PipelineDispatcher,
}

/// Routes plus middleware, without binding a socket
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(welcome_handler))
        .route("/health", get(health_handler))
        .route("/submit/", post(submit_handler))
        .route("/status/:id", get(status_handler))
        .route("/logs/:id", get(logs_handler))
        .route("/clips/:id", get(clips_handler))
        .route("/download/:clip_name", get(download_handler))
        .route("/video-results/:id", get(video_results_handler))
        .fallback(not_found_response)
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(dispatcher: PipelineDispatcher, port: u16) -> Result<()> {
    let app = build_router(AppState { dispatcher });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("🌐 API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn respond<T: serde::Serialize>(result: handlers::HandlerResult<T>) -> Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            if e.status().is_server_error() {
                warn!("API error: {}", e.message());
            }
            e.into_response()
        }
    }
}

async fn welcome_handler() -> impl IntoResponse {
    Json(serde_json::json!({"message": "Welcome to Video AI API"}))
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(handlers::health_check(&state.dispatcher).await)
}

async fn submit_handler(State(state): State<AppState>, body: Bytes) -> Response {
    respond(handlers::submit_video(&state.dispatcher, &body).await)
}

async fn status_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(handlers::get_status(&state.dispatcher, &id).await)
}

async fn logs_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(handlers::get_logs(&state.dispatcher, &id).await)
}

async fn clips_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(handlers::list_clips(&state.dispatcher, &id).await)
}

async fn video_results_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(handlers::get_video_results(&state.dispatcher, &id).await)
}

/// Stream a clip artifact as an attachment
async fn download_handler(
    State(state): State<AppState>,
    Path(clip_name): Path<String>,
    request: Request,
) -> Response {
    let path = match handlers::clip_file(&state.dispatcher, &clip_name).await {
        Ok(path) => path,
        Err(e) => return e.into_response(),
    };

    let mut response = match ServeFile::new(&path).oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    };
    match HeaderValue::from_str(&format!("attachment; filename=\"{}\"", clip_name)) {
        Ok(value) => {
            response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
        }
        Err(e) => warn!("Cannot build Content-Disposition for {}: {}", clip_name, e),
    }
    response
}

async fn not_found_response() -> Response {
    ApiError::NotFound("Not found".to_string()).into_response()
}
