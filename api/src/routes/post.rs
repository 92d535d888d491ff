use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::{Json, Router, routing::post};

use vigil_core::decision::DecisionResponse;
use vigil_core::error::ApiError;
use vigil_core::proposal::{PostProposal, Proposal};

use crate::auth::ApiKeyAuth;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::routes::{audit_data, run_approval};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/approve/post", post(approve_post))
}

fn validate(req: &PostProposal) -> Result<(), AppError> {
    if req.proposed_caption.trim().is_empty() {
        return Err(AppError::Validation {
            message: "proposed_caption must not be empty".to_string(),
            field: Some("proposed_caption".to_string()),
            received: Some(serde_json::Value::String(req.proposed_caption.clone())),
            docs_hint: Some("Provide the caption the automation wants to schedule.".to_string()),
        });
    }
    if !(0.0..=1.0).contains(&req.engagement_prediction) {
        return Err(AppError::Validation {
            message: format!(
                "engagement_prediction must be within [0, 1], got {}",
                req.engagement_prediction
            ),
            field: Some("engagement_prediction".to_string()),
            received: Some(serde_json::json!(req.engagement_prediction)),
            docs_hint: None,
        });
    }
    Ok(())
}

/// Approve or reject a proposed post caption
///
/// Hard rules run first and are final: hashtag count and caption length
/// over the configured maximums reject without spending a judgment call.
#[utoipa::path(
    post,
    path = "/approve/post",
    request_body = PostProposal,
    responses(
        (status = 200, description = "Decision made", body = DecisionResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError)
    ),
    security(("api_key" = [])),
    tag = "approvals"
)]
pub async fn approve_post(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    AppJson(req): AppJson<PostProposal>,
) -> Result<impl IntoResponse, AppError> {
    validate(&req).inspect_err(|_| state.metrics.track_validation_error())?;

    let proposal = Proposal::Post(req);
    let decision = run_approval(&state, &proposal, Some(addr.ip().to_string())).await;
    let Proposal::Post(req) = &proposal else {
        unreachable!()
    };

    let response = DecisionResponse {
        approved: decision.approved,
        modifications: decision.modifications.clone(),
        quality_score: decision.quality_score_out_of_ten(),
        confidence: None,
        decision_reasoning: decision.reasoning.clone(),
        needs_escalation: None,
        escalation_reason: None,
        suggested_team: None,
        sentiment: None,
        engagement_prediction: Some(
            decision
                .engagement_prediction
                .unwrap_or(req.engagement_prediction),
        ),
        brand_alignment_score: Some(decision.score),
        issues: decision.issues.clone(),
        recommendations: decision.recommendations.clone(),
        audit_data: audit_data(&decision),
    };

    Ok(Json(response))
}
