use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::response::IntoResponse;
use axum::{Json, Router, routing::post};

use vigil_core::decision::DecisionResponse;
use vigil_core::error::ApiError;
use vigil_core::proposal::{CommentReplyProposal, Proposal};

use crate::auth::ApiKeyAuth;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::routes::{audit_data, run_approval};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/approve/comment-reply", post(approve_comment_reply))
}

fn validate(req: &CommentReplyProposal) -> Result<(), AppError> {
    if req.proposed_reply.trim().is_empty() {
        return Err(AppError::Validation {
            message: "proposed_reply must not be empty".to_string(),
            field: Some("proposed_reply".to_string()),
            received: Some(serde_json::Value::String(req.proposed_reply.clone())),
            docs_hint: Some("Provide the reply text the automation wants to publish.".to_string()),
        });
    }
    if !(0.0..=1.0).contains(&req.confidence) {
        return Err(AppError::Validation {
            message: format!("confidence must be within [0, 1], got {}", req.confidence),
            field: Some("confidence".to_string()),
            received: Some(serde_json::json!(req.confidence)),
            docs_hint: None,
        });
    }
    Ok(())
}

/// Approve or reject a proposed comment reply
///
/// Always returns a structured decision with HTTP 200 for a valid,
/// authorized proposal: degraded context or judgment failures are
/// absorbed into a conservative rejection, never an error response.
#[utoipa::path(
    post,
    path = "/approve/comment-reply",
    request_body = CommentReplyProposal,
    responses(
        (status = 200, description = "Decision made", body = DecisionResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError)
    ),
    security(("api_key" = [])),
    tag = "approvals"
)]
pub async fn approve_comment_reply(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    AppJson(req): AppJson<CommentReplyProposal>,
) -> Result<impl IntoResponse, AppError> {
    validate(&req).inspect_err(|_| state.metrics.track_validation_error())?;

    let proposal = Proposal::CommentReply(req);
    let decision = run_approval(&state, &proposal, Some(addr.ip().to_string())).await;
    let Proposal::CommentReply(req) = &proposal else {
        unreachable!()
    };

    let response = DecisionResponse {
        approved: decision.approved,
        modifications: decision.modifications.clone(),
        quality_score: decision.quality_score_out_of_ten(),
        // Comment decisions echo the upstream classifier's confidence so
        // the workflow can route on its own signal.
        confidence: Some(req.confidence),
        decision_reasoning: decision.reasoning.clone(),
        needs_escalation: None,
        escalation_reason: None,
        suggested_team: None,
        sentiment: Some(req.sentiment.clone()),
        engagement_prediction: None,
        brand_alignment_score: None,
        issues: decision.issues.clone(),
        recommendations: decision.recommendations.clone(),
        audit_data: audit_data(&decision),
    };

    Ok(Json(response))
}
