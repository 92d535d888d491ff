use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::{Json, Router, routing::post};

use vigil_core::decision::DecisionResponse;
use vigil_core::error::ApiError;
use vigil_core::proposal::{DmReplyProposal, Proposal};

use crate::auth::ApiKeyAuth;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::routes::{audit_data, run_approval};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/approve/dm-reply", post(approve_dm_reply))
}

fn validate(req: &DmReplyProposal) -> Result<(), AppError> {
    if req.proposed_reply.trim().is_empty() {
        return Err(AppError::Validation {
            message: "proposed_reply must not be empty".to_string(),
            field: Some("proposed_reply".to_string()),
            received: Some(serde_json::Value::String(req.proposed_reply.clone())),
            docs_hint: Some("Provide the reply text the automation wants to send.".to_string()),
        });
    }
    if let Some(history) = &req.customer_history {
        if history.lifetime_value < 0.0 {
            return Err(AppError::Validation {
                message: format!(
                    "customer_history.lifetime_value must not be negative, got {}",
                    history.lifetime_value
                ),
                field: Some("customer_history.lifetime_value".to_string()),
                received: Some(serde_json::json!(history.lifetime_value)),
                docs_hint: None,
            });
        }
        if history.previous_interactions < 0 {
            return Err(AppError::Validation {
                message: format!(
                    "customer_history.previous_interactions must not be negative, got {}",
                    history.previous_interactions
                ),
                field: Some("customer_history.previous_interactions".to_string()),
                received: Some(serde_json::json!(history.previous_interactions)),
                docs_hint: None,
            });
        }
    }
    Ok(())
}

/// Approve, reject, or escalate a proposed DM reply
///
/// DM replies are escalation-eligible: VIP customers, negative complaint
/// or refund intents, and expired messaging windows are routed to human
/// review regardless of reply quality.
#[utoipa::path(
    post,
    path = "/approve/dm-reply",
    request_body = DmReplyProposal,
    responses(
        (status = 200, description = "Decision made", body = DecisionResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError)
    ),
    security(("api_key" = [])),
    tag = "approvals"
)]
pub async fn approve_dm_reply(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    AppJson(req): AppJson<DmReplyProposal>,
) -> Result<impl IntoResponse, AppError> {
    validate(&req).inspect_err(|_| state.metrics.track_validation_error())?;

    let proposal = Proposal::DmReply(req);
    let decision = run_approval(&state, &proposal, Some(addr.ip().to_string())).await;

    let escalation = decision.escalation.clone();
    let response = DecisionResponse {
        approved: decision.approved,
        modifications: decision.modifications.clone(),
        quality_score: decision.quality_score_out_of_ten(),
        confidence: Some(decision.score),
        decision_reasoning: decision.reasoning.clone(),
        needs_escalation: Some(escalation.is_some()),
        escalation_reason: escalation.as_ref().map(|e| e.reason.clone()),
        suggested_team: escalation.map(|e| e.suggested_team),
        sentiment: None,
        engagement_prediction: None,
        brand_alignment_score: None,
        issues: decision.issues.clone(),
        recommendations: decision.recommendations.clone(),
        audit_data: audit_data(&decision),
    };

    Ok(Json(response))
}
