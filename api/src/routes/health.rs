use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
    pub model_loaded: bool,
    pub models_available: Vec<String>,
    pub store_connected: bool,
    pub db_connection: String,
    pub uptime_seconds: u64,
    pub requests_processed: u64,
    pub average_response_time_ms: u64,
    pub judgment_failures: u64,
    pub validation_errors: u64,
    pub audit_write_failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<String>>,
}

/// Health check endpoint — verifies the store and the judgment model
///
/// An unreachable store is a hard 503 (decisions cannot be audited); an
/// unavailable judgment model only degrades the status, since the service
/// still answers with conservative rejections.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is operational", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    let readiness = state.judge.readiness().await;

    let mut issues = Vec::new();
    if !db_ok {
        issues.push("store: unreachable".to_string());
    }
    if !readiness.available {
        issues.push("judgment model: unavailable (decisions degrade to rejection)".to_string());
    }

    let status = if issues.is_empty() { "healthy" } else { "degraded" };
    let http_status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model: state.model.clone(),
            model_loaded: readiness.available,
            models_available: readiness.models_loaded,
            store_connected: db_ok,
            db_connection: if db_ok { "connected" } else { "degraded" }.to_string(),
            uptime_seconds: state.metrics.uptime_seconds(),
            requests_processed: state.metrics.requests_processed(),
            average_response_time_ms: state.metrics.average_response_time_ms(),
            judgment_failures: state.metrics.judgment_failures(),
            validation_errors: state.metrics.validation_errors(),
            audit_write_failures: state.metrics.audit_write_failures(),
            issues: (!issues.is_empty()).then_some(issues),
        }),
    )
}
