//! Health check endpoints

use axum::{extract::State, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Current status of the service
    pub status: String,
    /// Version of the service
    pub version: String,
}

impl HealthResponse {
    fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Readiness plus the loan policy in effect
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    #[serde(flatten)]
    pub health: HealthResponse,
    pub daily_penalty_rate: Decimal,
    /// Absent when the overdue scanner is disabled
    pub overdue_scan_interval_secs: Option<u64>,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::new("healthy"))
}

/// Readiness check endpoint (queries every store)
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Storage unreachable", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(
    State(state): State<crate::AppState>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let (status, health) = match state.services.stats.get_stats().await {
        Ok(_) => (StatusCode::OK, HealthResponse::new("ready")),
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, HealthResponse::new("unavailable"))
        }
    };

    let loans = &state.config.loans;
    (
        status,
        Json(ReadinessResponse {
            health,
            daily_penalty_rate: loans.daily_penalty_rate,
            overdue_scan_interval_secs: loans
                .overdue_scan_enabled
                .then_some(loans.overdue_scan_interval_secs),
        }),
    )
}
