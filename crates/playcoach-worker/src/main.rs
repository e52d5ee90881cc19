//! Batch worker binary: analyze every new video in the configured directory.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use playcoach_gemini::{GeminiClient, GeminiConfig};
use playcoach_ledger::Ledger;
use playcoach_worker::{discover_videos, init_tracing, VideoProcessor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    init_tracing("playcoach=info");

    info!("Starting playcoach-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let api_key = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            error!("GEMINI_API_KEY not set");
            std::process::exit(1);
        }
    };

    let client = match GeminiClient::new(GeminiConfig::from_env(), api_key) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create Gemini client: {}", e);
            std::process::exit(1);
        }
    };

    let ledger = match Ledger::open(&config.ledger_path).await {
        Ok(l) => Arc::new(l),
        Err(e) => {
            error!("Failed to open ledger: {}", e);
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            warn!("Received shutdown signal, cancelling run");
            cancel.cancel();
        });
    }
    if let Some(deadline) = config.run_deadline {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!(deadline_secs = deadline.as_secs(), "Run deadline reached, cancelling run");
            cancel.cancel();
        });
    }

    let videos = match discover_videos(&config.video_dir).await {
        Ok(v) => v,
        Err(e) => {
            error!("Failed to list videos: {}", e);
            std::process::exit(1);
        }
    };
    info!(count = videos.len(), dir = %config.video_dir.display(), "Found videos");

    let processor = VideoProcessor::new(Arc::new(client), ledger, config);
    let prompt = match processor.default_prompt() {
        Ok(p) => p,
        Err(e) => {
            error!("Invalid prompt configuration: {}", e);
            std::process::exit(1);
        }
    };

    match processor.run(&videos, &prompt, &cancel).await {
        Ok(summary) => info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            not_started = summary.not_started,
            "Worker finished"
        ),
        Err(e) => {
            error!("Run aborted: {}", e);
            std::process::exit(1);
        }
    }
}
