//! Model Portal - Main Entry Point
//!
//! Loads the model artifacts, opens the portal database and serves the
//! prediction forms and portal pages over HTTP.

use anyhow::{Context, Result};
use model_portal::{
    auth,
    config::AppConfig,
    metrics::MetricsReporter,
    models::inference::InferenceEngine,
    server::{self, AppState},
    store::Store,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("model_portal={}", config.logging.level).parse()?);
    if config.logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Model Portal");
    info!(address = %config.server.address, "Configuration loaded successfully");

    // Load every model before accepting traffic
    let engine = InferenceEngine::new(&config.models).context("Failed to load models")?;
    info!(models = ?engine.model_names(), "Inference engine initialized");

    let store = Store::open(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path))?;
    if auth::ensure_admin(&store, &config.auth)? {
        info!(username = %config.auth.admin_username, "Default administrator created");
    }

    let address = config.server.address;
    let report_interval = config.metrics.report_interval_secs;
    let state = AppState::new(config, engine, store);

    if report_interval > 0 {
        let reporter = MetricsReporter::new(state.metrics.clone(), report_interval);
        tokio::spawn(reporter.start());
    }

    if state.config.auth.session_idle_secs > 0 {
        tokio::spawn(server::session::sweep_idle_sessions(state.clone()));
    }

    let metrics = state.metrics.clone();
    server::run(state, address).await?;

    info!("Portal shutting down...");
    metrics.print_summary();

    Ok(())
}
