use serde::Serialize;
use utoipa::ToSchema;

use crate::context::Context;
use crate::proposal::Proposal;
use crate::rules::RuleConfig;

/// Forced routing of a proposal to human review. Overrides any automated
/// approval, including a passing weighted score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Escalation {
    pub reason: String,
    pub suggested_team: String,
}

/// Decide whether a proposal must be routed to a human. Pure function of
/// proposal + context so it is testable without the judgment step.
///
/// Triggers are evaluated in order; the first match wins. Only DM replies
/// are escalation-eligible: comments and posts fail closed through hard
/// rules and scoring instead of human routing.
pub fn evaluate(
    proposal: &Proposal,
    context: &Context,
    config: &RuleConfig,
    now: chrono::DateTime<chrono::Utc>,
) -> Option<Escalation> {
    let dm = match proposal {
        Proposal::DmReply(dm) => dm,
        _ => return None,
    };

    let negative = matches!(dm.sentiment.as_str(), "negative" | "angry");
    if negative && matches!(dm.detected_intent.as_str(), "complaint" | "refund") {
        return Some(Escalation {
            reason: format!(
                "Negative sentiment with {} intent - requires human support",
                dm.detected_intent
            ),
            suggested_team: "support".to_string(),
        });
    }

    let lifetime_value = dm
        .customer_history
        .as_ref()
        .map(|h| h.lifetime_value)
        .unwrap_or(0.0);
    if lifetime_value > config.vip_lifetime_value_threshold {
        return Some(Escalation {
            reason: format!(
                "VIP customer (lifetime value ${lifetime_value}) - requires human attention"
            ),
            suggested_team: "sales".to_string(),
        });
    }

    // The caller said the window is open but the store disagrees. Trusting
    // the stale flag would produce an unsendable reply, so a human decides.
    if let Some(thread) = &context.thread {
        if dm.within_window && thread.window_expired(now) {
            return Some(Escalation {
                reason: "Messaging window expired per conversation record - requires human review"
                    .to_string(),
                suggested_team: "support".to_string(),
            });
        }
    }

    if config.is_escalation_intent(&dm.detected_intent) {
        return Some(Escalation {
            reason: format!(
                "Intent '{}' requires human judgment",
                dm.detected_intent
            ),
            suggested_team: "support".to_string(),
        });
    }

    if matches!(dm.detected_intent.as_str(), "complex" | "ambiguous") {
        return Some(Escalation {
            reason: format!(
                "Intent '{}' is too ambiguous for automated reply",
                dm.detected_intent
            ),
            suggested_team: "support".to_string(),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DmThread;
    use crate::proposal::{CustomerHistory, DmReplyProposal};
    use chrono::{Duration, Utc};

    fn dm_proposal(sentiment: &str, intent: &str, lifetime_value: f64) -> Proposal {
        Proposal::DmReply(DmReplyProposal {
            message_id: "m1".to_string(),
            dm_text: "hello".to_string(),
            sender_username: "casey".to_string(),
            sender_id: "9001".to_string(),
            business_account_id: "acct-1".to_string(),
            proposed_reply: "hi there!".to_string(),
            detected_intent: intent.to_string(),
            sentiment: sentiment.to_string(),
            within_window: true,
            priority: "medium".to_string(),
            customer_history: Some(CustomerHistory {
                previous_interactions: 3,
                sentiment_history: "neutral".to_string(),
                lifetime_value,
            }),
        })
    }

    #[test]
    fn negative_complaint_routes_to_support() {
        let escalation = evaluate(
            &dm_proposal("negative", "complaint", 0.0),
            &Context::default(),
            &RuleConfig::default(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(escalation.suggested_team, "support");
        assert!(escalation.reason.contains("complaint"));
    }

    #[test]
    fn vip_lifetime_value_routes_to_sales() {
        let escalation = evaluate(
            &dm_proposal("neutral", "inquiry", 600.0),
            &Context::default(),
            &RuleConfig::default(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(escalation.suggested_team, "sales");
        assert!(escalation.reason.contains("VIP"));
    }

    #[test]
    fn vip_threshold_is_exclusive() {
        assert!(
            evaluate(
                &dm_proposal("neutral", "inquiry", 500.0),
                &Context::default(),
                &RuleConfig::default(),
                Utc::now(),
            )
            .is_none()
        );
    }

    #[test]
    fn negative_complaint_wins_over_vip() {
        // First matching trigger decides the routing team.
        let escalation = evaluate(
            &dm_proposal("angry", "refund", 900.0),
            &Context::default(),
            &RuleConfig::default(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(escalation.suggested_team, "support");
    }

    #[test]
    fn store_window_contradiction_escalates() {
        let now = Utc::now();
        let context = Context {
            thread: Some(DmThread {
                within_window: Some(false),
                window_expires_at: Some(now - Duration::hours(1)),
                ..Default::default()
            }),
            ..Default::default()
        };
        let escalation = evaluate(
            &dm_proposal("neutral", "inquiry", 0.0),
            &context,
            &RuleConfig::default(),
            now,
        )
        .unwrap();
        assert!(escalation.reason.contains("window expired"));
    }

    #[test]
    fn escalation_intents_require_human_judgment() {
        for intent in ["refund", "return", "legal", "complaint"] {
            let escalation = evaluate(
                &dm_proposal("neutral", intent, 0.0),
                &Context::default(),
                &RuleConfig::default(),
                Utc::now(),
            )
            .unwrap();
            assert_eq!(escalation.suggested_team, "support", "intent {intent}");
        }
    }

    #[test]
    fn complex_intent_escalates() {
        assert!(
            evaluate(
                &dm_proposal("neutral", "complex", 0.0),
                &Context::default(),
                &RuleConfig::default(),
                Utc::now(),
            )
            .is_some()
        );
    }

    #[test]
    fn routine_dm_does_not_escalate() {
        assert!(
            evaluate(
                &dm_proposal("positive", "inquiry", 120.0),
                &Context::default(),
                &RuleConfig::default(),
                Utc::now(),
            )
            .is_none()
        );
    }

    #[test]
    fn comments_and_posts_never_escalate() {
        use crate::proposal::{CommentReplyProposal, PostProposal};
        let comment = Proposal::CommentReply(CommentReplyProposal {
            comment_id: "c1".to_string(),
            comment_text: "refund me".to_string(),
            post_id: "p1".to_string(),
            business_account_id: "acct-1".to_string(),
            proposed_reply: "sorry to hear".to_string(),
            detected_intent: "refund".to_string(),
            sentiment: "negative".to_string(),
            confidence: 0.5,
            commenter_username: None,
        });
        let post = Proposal::Post(PostProposal {
            scheduled_post_id: "sp1".to_string(),
            asset: None,
            proposed_caption: "new drop".to_string(),
            business_account_id: "acct-1".to_string(),
            hashtags: vec![],
            hashtag_count: 0,
            caption_length: 0,
            engagement_prediction: 0.0,
            post_type: "general".to_string(),
            scheduled_time: String::new(),
        });
        let config = RuleConfig::default();
        assert!(evaluate(&comment, &Context::default(), &config, Utc::now()).is_none());
        assert!(evaluate(&post, &Context::default(), &config, Utc::now()).is_none());
    }
}
