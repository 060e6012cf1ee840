//! HTTP control surface over one orchestrator run.
//!
//! POST /agent/start  -> 200 {status, pid} | 409 if already running
//! POST /agent/stop   -> 200 | 400 if not running
//! GET  /agent/status -> current status record
//! GET  /events       -> full audit log as a JSON array
//! GET  /health       -> liveness probe

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use lexloop_core::{Error, GatewayConfig};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::control::ControlPlane;

pub struct GatewayState {
    pub control: Arc<ControlPlane>,
}

pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/agent/start", post(start_handler))
        .route("/agent/stop", post(stop_handler))
        .route("/agent/status", get(status_handler))
        .route("/events", get(events_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

pub async fn serve(config: &GatewayConfig, state: Arc<GatewayState>) -> anyhow::Result<()> {
    let app = router(state);
    let bind_addr: SocketAddr = format!("{}:{}", config.bind.to_addr(), config.port).parse()?;

    info!("Lexloop gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn error_response(err: Error) -> (StatusCode, Json<serde_json::Value>) {
    let (code, detail) = match err {
        Error::ControlConflict { code, message } => (
            StatusCode::from_u16(code).unwrap_or(StatusCode::CONFLICT),
            message,
        ),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    };
    (code, Json(serde_json::json!({ "detail": detail })))
}

async fn start_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    match state.control.start().await {
        Ok(record) => Json(serde_json::json!({
            "status": "started",
            "pid": record.pid,
        }))
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn stop_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    match state.control.stop().await {
        Ok(_) => Json(serde_json::json!({ "status": "stopped" })).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn status_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    match state.control.status().await {
        Ok(record) => Json(record).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn events_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    match state.control.events().read_all().await {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
