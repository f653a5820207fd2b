//! Service info and health check endpoints

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::converter::ToolAvailability;
use crate::state::AppState;

pub const SERVICE_NAME: &str = "Universal Document Converter API";

#[derive(Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub uptime: f64,
    pub started_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime: f64,
    pub supported: ToolAvailability,
}

/// GET /
pub async fn service_info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.uptime(),
        started_at: state.started_at(),
    })
}

/// GET|HEAD /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        uptime: state.uptime(),
        supported: state.pipeline().converters().availability().await,
    })
}
