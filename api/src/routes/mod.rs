pub mod comment;
pub mod dm;
pub mod health;
pub mod post;

use vigil_core::decision::{AuditData, Decision};
use vigil_core::proposal::Proposal;

use crate::audit::AuditRecord;
use crate::engine;
use crate::state::AppState;

/// Shared decision flow behind the three approval endpoints: gather
/// context, run the engine, write exactly one audit record, track the
/// rolling metrics. The audit write is best-effort relative to the
/// response; the decision itself is already final.
pub(crate) async fn run_approval(
    state: &AppState,
    proposal: &Proposal,
    client_ip: Option<String>,
) -> Decision {
    let context = state.gatherer.gather(proposal).await;
    let decision = state
        .engine
        .decide(proposal, &context, &state.metrics)
        .await;

    let details = engine::audit_details(proposal, &context, &decision);
    let record = AuditRecord::for_decision(proposal, &decision, details, client_ip);
    state.audit.write(record, &state.metrics).await;

    state.metrics.track_request(decision.latency_ms);
    decision
}

pub(crate) fn audit_data(decision: &Decision) -> AuditData {
    AuditData {
        analyzed_at: decision.analyzed_at,
        model: decision.model.clone(),
        factors: decision.factors.iter().map(|f| f.to_string()).collect(),
        rule_triggered: decision.rule_triggered.map(String::from),
    }
}
