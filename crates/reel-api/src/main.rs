//! Montage API server binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reel_media::{FfmpegRenderer, FfprobeDuration};
use reel_worker::{
    purge_directory, GeminiClient, GeminiConfig, MontageBackends, MontageManager, WorkerConfig,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_api::{create_router, metrics, ApiConfig, AppState};

/// How long in-flight renders get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+).
    // Fails only if another provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();

    init_tracing()?;

    info!("Starting reel-api");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    let gemini_config = GeminiConfig::from_env();
    info!(
        "API config: host={}, port={}, output_dir={}",
        config.host,
        config.port,
        worker_config.output_dir.display()
    );

    // Anything left in the output directory belongs to runs from a previous process
    match purge_directory(&worker_config.output_dir).await {
        Ok(0) => {}
        Ok(n) => info!("Purged {} stale montage files", n),
        Err(e) => warn!("Failed to purge output directory: {}", e),
    }

    let analysis = GeminiClient::new(gemini_config).context("creating analysis client")?;
    let renderer =
        FfmpegRenderer::default().with_timeout(worker_config.render_timeout.as_secs());
    let backends = MontageBackends {
        analysis: Arc::new(analysis),
        renderer: Arc::new(renderer),
        probe: Arc::new(FfprobeDuration),
    };
    let manager = MontageManager::new(worker_config, backends).context("creating run manager")?;

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("installing metrics recorder")?)
    } else {
        None
    };

    let state = AppState::new(config.clone(), manager.clone());
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_address()))?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if !manager.drain(DRAIN_TIMEOUT).await {
        warn!(
            active_runs = manager.active_runs(),
            "Shutting down with montage runs still rendering"
        );
    }
    manager.shutdown();

    info!("Server shutdown complete");
    Ok(())
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("reel=info".parse()?);

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

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
