use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use video_ai::{Config, FileStore, PipelineDispatcher, SubmitRequest};

#[derive(Parser)]
#[command(name = "video-ai")]
#[command(version, author = "TigreRoll")]
#[command(about = "Download, transcribe and clip videos")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (otherwise searched in the usual locations)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one video through the pipeline in the foreground
    Process {
        /// Source video URL
        url: String,
        /// Fixed clip length in seconds
        #[arg(long)]
        clip_length: Option<i64>,
        /// Custom clip range as START:END seconds, repeatable
        #[arg(long = "range", value_name = "START:END")]
        ranges: Vec<String>,
    },
    /// Print the processing log of a video
    Logs {
        /// Video id
        video_id: String,
    },
    /// Start the HTTP API
    #[cfg(feature = "api")]
    Serve {
        #[arg(short, long, default_value_t = 8000)]
        port: u16,
    },
}

fn parse_range(value: &str) -> Result<[f64; 2]> {
    let (start, end) = value
        .split_once(':')
        .ok_or_else(|| anyhow!("range must look like START:END, got {}", value))?;
    Ok([
        start.trim().parse().with_context(|| format!("bad range start in {}", value))?,
        end.trim().parse().with_context(|| format!("bad range end in {}", value))?,
    ])
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load().unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };

    // Initialize logging
    let default_filter = if cli.verbose {
        "video_ai=debug,info".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    config.validate()?;
    info!("🚀 Video AI starting...");
    info!("{}", config.summary());

    let store = Arc::new(FileStore::open(config.storage.store_path()).await?);
    let dispatcher = PipelineDispatcher::from_config(&config, store.clone(), store);

    match cli.command {
        Commands::Process { url, clip_length, ranges } => {
            let mut request = SubmitRequest::new(url);
            request.clip_length = clip_length;
            if !ranges.is_empty() {
                let pairs = ranges.iter().map(|r| parse_range(r)).collect::<Result<Vec<_>>>()?;
                request = request.with_ranges(pairs);
            }

            let submission = dispatcher.submit_video(&request).await?;
            info!("📹 Processing video {}", submission.video_id);

            let report = submission.handle.await?;
            if report.is_processed() {
                info!("🎉 Processing completed in {:.2}s with {} clip(s)",
                      report.processing_time.as_secs_f64(), report.clips_produced);
            } else {
                warn!("❌ Processing failed: {}", report.error.as_deref().unwrap_or("Unknown error"));
            }

            let video = dispatcher
                .get_video(&submission.video_id)
                .await?
                .ok_or_else(|| anyhow!("video {} disappeared from the store", submission.video_id))?;
            println!("{}", serde_json::to_string_pretty(&video)?);
        }
        Commands::Logs { video_id } => {
            let entries = dispatcher.logs_for(&video_id).await?;
            if entries.is_empty() {
                warn!("No logs found for video {}", video_id);
            }
            for entry in entries {
                println!("[{}] {}", entry.timestamp.to_rfc3339(), entry.message);
            }
        }
        #[cfg(feature = "api")]
        Commands::Serve { port } => {
            video_ai::api::ApiServer::new(dispatcher, port).start().await?;
        }
    }

    Ok(())
}
