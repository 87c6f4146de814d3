//! Video analysis worker binary.

use std::path::PathBuf;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use puffscan_worker::{Executor, ScanConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("puffscan=info".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting puffscan-worker");

    let Some(video_path) = std::env::args().nth(1).map(PathBuf::from) else {
        error!("Usage: puffscan-worker <video-path>");
        std::process::exit(2);
    };

    let config = ScanConfig::from_env();
    info!(
        models = ?config.models,
        work_dir = %config.work_dir,
        "Worker config loaded"
    );

    let executor = Executor::new(config);
    match executor.run(&video_path).await {
        Ok(report_path) => {
            info!(report = %report_path.display(), "Worker finished");
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            std::process::exit(1);
        }
    }
}
