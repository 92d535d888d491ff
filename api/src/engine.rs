//! The decision pipeline: hard rules, escalation policy, judgment call,
//! weighted scoring. One pass per proposal, states never revisited:
//! received -> rules_checked -> judged -> scored -> finalized.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use vigil_core::context::Context;
use vigil_core::decision::{Decision, Modifications};
use vigil_core::escalation::{self, Escalation};
use vigil_core::proposal::{Proposal, ProposalKind};
use vigil_core::rules::{self, RuleConfig};
use vigil_core::scoring;

use crate::judge::{self, Judge, JudgeError, JudgeVerdict, RawModifications};
use crate::metrics::Metrics;
use crate::prompts;

const JUDGMENT_UNAVAILABLE: &str =
    "Automated judgment unavailable - rejecting conservatively (judgment_unavailable)";

pub struct DecisionEngine {
    judge: Arc<dyn Judge>,
    /// Admission semaphore: the judgment collaborator is the scarce,
    /// latency-dominant resource, so concurrent calls are capped.
    judge_permits: Arc<Semaphore>,
    judge_timeout: Duration,
    model: String,
    rules: RuleConfig,
}

impl DecisionEngine {
    pub fn new(
        judge: Arc<dyn Judge>,
        max_concurrent: usize,
        judge_timeout: Duration,
        model: String,
        rules: RuleConfig,
    ) -> Self {
        Self {
            judge,
            judge_permits: Arc::new(Semaphore::new(max_concurrent)),
            judge_timeout,
            model,
            rules,
        }
    }

    /// Run one full decision cycle. Never fails: every internal failure
    /// mode degrades into a conservative, well-formed Decision.
    pub async fn decide(
        &self,
        proposal: &Proposal,
        context: &Context,
        metrics: &Metrics,
    ) -> Decision {
        let started = Instant::now();
        let analyzed_at = Utc::now();
        let kind = proposal.kind();

        let base = Decision {
            approved: false,
            modifications: None,
            suggested_modifications: None,
            score: 0.0,
            reasoning: String::new(),
            escalation: None,
            rule_triggered: None,
            issues: Vec::new(),
            recommendations: Vec::new(),
            judgment_failed: false,
            engagement_prediction: None,
            model: self.model.clone(),
            analyzed_at,
            latency_ms: 0,
            factors: kind.analysis_factors(),
        };

        // Deterministic rejection is cheaper than a judgment call and must
        // never be overridden by one.
        if let Some(violation) = rules::check_hard_rules(proposal, &self.rules) {
            return Decision {
                reasoning: violation.reasoning(),
                rule_triggered: Some(violation.rule),
                issues: violation.issues,
                recommendations: violation.recommendations,
                latency_ms: started.elapsed().as_millis() as u64,
                ..base
            };
        }

        if let Some(forced) = escalation::evaluate(proposal, context, &self.rules, analyzed_at) {
            return Decision {
                reasoning: forced.reason.clone(),
                escalation: Some(forced),
                rule_triggered: Some("forced_escalation"),
                latency_ms: started.elapsed().as_millis() as u64,
                ..base
            };
        }

        let verdict = match self.run_judgment(proposal, context).await {
            Ok(verdict) => verdict,
            Err(e) => {
                metrics.track_judgment_failure();
                tracing::warn!(kind = ?kind, error = %e, "judgment step degraded to rejection");
                return Decision {
                    reasoning: JUDGMENT_UNAVAILABLE.to_string(),
                    judgment_failed: true,
                    latency_ms: started.elapsed().as_millis() as u64,
                    ..base
                };
            }
        };

        let score = scoring::weighted_total(kind, &verdict.scores, verdict.quality_score);
        let threshold = scoring::approval_threshold(kind, &self.rules);
        if verdict.approved != (score >= threshold) {
            // The weighted threshold is authoritative; the model's own flag
            // is only a signal worth watching.
            tracing::debug!(
                model_approved = verdict.approved,
                score,
                threshold,
                "judgment self-assessment disagrees with weighted threshold"
            );
        }
        let suggestion = narrow_modifications(kind, verdict.modifications);
        let reasoning = if verdict.reasoning.is_empty() {
            "No reasoning provided".to_string()
        } else {
            verdict.reasoning
        };
        let engagement_prediction = match kind {
            ProposalKind::Post => verdict.engagement_prediction,
            _ => None,
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        // Judgment-reported risk is honored like any other escalation:
        // it overrides the score, and the suggestion is recorded in the
        // audit trail without being applied.
        if verdict.needs_escalation {
            return Decision {
                suggested_modifications: suggestion,
                score,
                reasoning: reasoning.clone(),
                escalation: Some(Escalation {
                    reason: reasoning,
                    suggested_team: "support".to_string(),
                }),
                engagement_prediction,
                latency_ms,
                ..base
            };
        }

        if score >= threshold {
            Decision {
                approved: true,
                modifications: suggestion,
                score,
                reasoning,
                engagement_prediction,
                latency_ms,
                ..base
            }
        } else {
            Decision {
                suggested_modifications: suggestion,
                score,
                reasoning,
                engagement_prediction,
                latency_ms,
                ..base
            }
        }
    }

    async fn run_judgment(
        &self,
        proposal: &Proposal,
        context: &Context,
    ) -> Result<JudgeVerdict, JudgeError> {
        let prompt = match proposal {
            Proposal::CommentReply(p) => prompts::render_comment_prompt(p, context),
            Proposal::DmReply(p) => prompts::render_dm_prompt(p, context),
            Proposal::Post(p) => prompts::render_post_prompt(p, context),
        };

        let _permit = self
            .judge_permits
            .acquire()
            .await
            .map_err(|_| JudgeError::Transport("admission semaphore closed".to_string()))?;

        let raw = tokio::time::timeout(
            self.judge_timeout,
            self.judge.complete(prompts::SYSTEM_PROMPT, &prompt),
        )
        .await
        .map_err(|_| JudgeError::Timeout(self.judge_timeout))??;

        judge::parse_verdict(&raw)
    }
}

/// Narrow the model's loosely shaped modification fields to the closed
/// variant for this kind, dropping anything empty.
fn narrow_modifications(
    kind: ProposalKind,
    raw: Option<RawModifications>,
) -> Option<Modifications> {
    let raw = raw?;
    let narrowed = match kind {
        ProposalKind::CommentReply | ProposalKind::DmReply => Modifications::Reply {
            reply_text: raw.reply_text,
        },
        ProposalKind::Post => Modifications::Post {
            caption: raw.caption,
            hashtags: raw.hashtags,
        },
    };
    (!narrowed.is_empty()).then_some(narrowed)
}

/// Details blob for the audit record of a finished cycle.
pub fn audit_details(
    proposal: &Proposal,
    context: &Context,
    decision: &Decision,
) -> serde_json::Map<String, serde_json::Value> {
    let mut details = serde_json::Map::new();
    let applied_or_suggested = decision
        .modifications
        .as_ref()
        .or(decision.suggested_modifications.as_ref());

    match proposal {
        Proposal::CommentReply(p) => {
            details.insert("proposed_reply".into(), p.proposed_reply.clone().into());
        }
        Proposal::DmReply(p) => {
            details.insert("proposed_reply".into(), p.proposed_reply.clone().into());
            if let Some(history) = &p.customer_history {
                details.insert("lifetime_value".into(), history.lifetime_value.into());
            }
        }
        Proposal::Post(p) => {
            let caption: String = p.proposed_caption.chars().take(200).collect();
            details.insert("proposed_caption".into(), caption.into());
        }
    }

    if let Some(replacement) = applied_or_suggested.and_then(|m| m.replacement_text()) {
        let key = match proposal {
            Proposal::Post(_) => "approved_caption",
            _ => "approved_reply",
        };
        let replacement: String = replacement.chars().take(200).collect();
        details.insert(key.into(), replacement.into());
    }
    if decision.suggested_modifications.is_some() {
        // Recorded but not applied, pending human review.
        details.insert("modification_applied".into(), false.into());
    }

    details.insert(
        "quality_score".into(),
        serde_json::json!(decision.quality_score_out_of_ten()),
    );
    details.insert("reasoning".into(), decision.reasoning.clone().into());
    details.insert("latency_ms".into(), decision.latency_ms.into());
    if let Some(rule) = decision.rule_triggered {
        details.insert("rule_triggered".into(), rule.into());
    }
    if !decision.issues.is_empty() {
        details.insert("issues".into(), serde_json::json!(decision.issues));
    }
    if let Some(escalation) = &decision.escalation {
        details.insert("needs_escalation".into(), true.into());
        details.insert("escalation_reason".into(), escalation.reason.clone().into());
    }
    if context.degraded {
        details.insert("context_degraded".into(), true.into());
    }

    details
}
