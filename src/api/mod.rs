//! HTTP surface for submitting videos and reading their results

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::info;

use crate::processing::PipelineDispatcher;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::{build_router, AppState};

/// API Server for handling REST requests
pub struct ApiServer {
    dispatcher: PipelineDispatcher,
    port: u16,
}

impl ApiServer {
    pub fn new(dispatcher: PipelineDispatcher, port: u16) -> Self {
        Self { dispatcher, port }
    }

    /// Start the API server in the background
    pub fn start_background(self) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.start().await })
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on port {}", self.port);
        server::start_http_server(self.dispatcher, self.port).await
    }
}
