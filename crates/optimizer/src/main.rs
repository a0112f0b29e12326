//! Cloud optimizer daemon
//!
//! Wires the file-backed store, the exported telemetry and the HTTP pricing
//! provider into the optimization controller, refreshes on an interval and
//! serves the view over HTTP.

use anyhow::Result;
use cloud_optimizer::{api, config::OptimizerSettings};
use optimize_lib::{
    health::HealthRegistry,
    observability::StructuredLogger,
    pricing::HttpPricingProvider,
    sources::{FileTelemetrySource, JsonCollectionStore},
    Collaborators, OptimizationController,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const OPTIMIZER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting cloud-optimizer");

    let settings = OptimizerSettings::load()?;
    info!(
        data_dir = %settings.data_dir.display(),
        api_port = settings.api_port,
        refresh_interval_secs = settings.refresh_interval_secs,
        "Optimizer configured"
    );

    let store = Arc::new(JsonCollectionStore::new(settings.store_dir()));
    let telemetry = Arc::new(FileTelemetrySource::new(settings.telemetry_dir()));
    let pricing = Arc::new(HttpPricingProvider::new(settings.pricing_config())?);

    let health_registry = HealthRegistry::new();
    health_registry.register_defaults().await;

    let logger = StructuredLogger::new("optimizer");
    logger.log_startup(OPTIMIZER_VERSION);

    let controller = Arc::new(
        OptimizationController::new(Collaborators {
            config_store: store.clone(),
            accounts: telemetry.clone(),
            telemetry,
            pricing,
            snapshots: store,
        })
        .with_health(health_registry),
    );

    let config = controller.init_config().await;
    info!(
        pricing_region = %config.pricing_region(),
        group_by = ?config.group_by,
        "Config loaded"
    );

    let (shutdown_tx, _) = broadcast::channel(1);
    let cycle_handle = tokio::spawn(
        Arc::clone(&controller).run_periodic(settings.refresh_interval(), shutdown_tx.subscribe()),
    );

    let app_state = Arc::new(api::AppState::new(Arc::clone(&controller)));
    let api_handle = tokio::spawn(api::serve(settings.api_port, app_state));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            logger.log_shutdown("SIGINT received");
        }
        result = api_handle => {
            match result {
                Ok(Err(e)) => error!(error = %e, "API server failed"),
                Err(e) => error!(error = %e, "API server task panicked"),
                Ok(Ok(())) => {}
            }
            logger.log_shutdown("API server stopped");
        }
    }

    let _ = shutdown_tx.send(());
    cycle_handle.await?;
    info!("Shutting down");

    Ok(())
}
