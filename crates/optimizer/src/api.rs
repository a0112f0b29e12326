//! HTTP API: health checks, Prometheus metrics and the optimization view

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use optimize_lib::{
    health::{ComponentStatus, HealthRegistry},
    ConfigUpdate, OptimizationController, Trigger,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<OptimizationController>,
}

impl AppState {
    pub fn new(controller: Arc<OptimizationController>) -> Self {
        Self { controller }
    }

    fn health_registry(&self) -> &HealthRegistry {
        self.controller.health()
    }
}

/// Body of a config update
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdateRequest {
    pub update: ConfigUpdate,
    pub trigger: Trigger,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegionRequest {
    pub region: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry().health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry().readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn get_view(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.controller.view())
}

/// Start a fetch cycle without waiting for it
async fn refresh(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let controller = Arc::clone(&state.controller);
    tokio::spawn(async move {
        let outcome = controller.run_cycle().await;
        info!(outcome = ?outcome, "Requested fetch cycle finished");
    });

    StatusCode::ACCEPTED
}

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.controller.config().await)
}

async fn put_config(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ConfigUpdateRequest>,
) -> impl IntoResponse {
    let config = state
        .controller
        .update_config(request.update, request.trigger)
        .await;
    Json(config)
}

async fn put_region(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegionRequest>,
) -> Response {
    let region = request.region.trim();
    if region.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "region must not be empty");
    }

    match state.controller.change_region(region).await {
        Ok(()) => (StatusCode::OK, Json(state.controller.config().await)).into_response(),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

async fn get_snapshots(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.controller.list_snapshots().await)
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/view", get(get_view))
        .route("/api/v1/refresh", post(refresh))
        .route("/api/v1/config", get(get_config).put(put_config))
        .route("/api/v1/region", put(put_region))
        .route("/api/v1/snapshots", get(get_snapshots))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
