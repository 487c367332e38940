//! NewsCheck Server
//!
//! Serves Fake/Real predictions with an abstain flag and topical tag, plus
//! term-level explanations from an independent TF-IDF pipeline.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use newscheck_server::{create_router, AppState, Cli, ServerConfig};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    info!("Starting NewsCheck server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Artifacts: {:?}", config.artifacts_dir);
    info!("Prediction log: {:?}", config.prediction_log);
    info!(
        "Abstain threshold: {}, top_k: {}, device: {}",
        config.abstain_threshold, config.top_k, config.device
    );

    // Initialize metrics
    let metrics_handle = init_metrics()?;

    let preload = config.preload;
    let state = AppState::new(config, Some(metrics_handle))?;

    if preload {
        info!("Preloading model stacks...");
        let cache = state.cache.clone();
        let report = tokio::task::spawn_blocking(move || cache.preload()).await?;
        if report.all_loaded() {
            info!("Model stacks ready");
        } else {
            warn!("Some model stacks failed to load; they will be retried on first use");
        }
    }

    let addr: SocketAddr = format!("{}:{}", cli.listen, cli.port).parse()?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            warn!("Shutdown signal received, stopping server...");
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("newscheck=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("newscheck=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    newscheck_telemetry::metrics::describe_metrics();

    info!("Metrics exporter initialized");
    Ok(handle)
}
