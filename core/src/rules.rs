use serde::Serialize;

use crate::proposal::Proposal;

/// Deterministic limits and thresholds, loaded once at startup and carried
/// in application state. Kept together so operators tune one surface.
#[derive(Debug, Clone)]
pub struct RuleConfig {
    pub max_caption_length: usize,
    pub max_hashtag_count: usize,
    pub max_dm_reply_length: usize,
    pub vip_lifetime_value_threshold: f64,
    /// Intents that always require a human (complaint, refund, ...).
    pub escalation_intents: Vec<String>,
    pub comment_approval_threshold: f64,
    pub dm_approval_threshold: f64,
    pub post_approval_threshold: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            max_caption_length: 2200,
            max_hashtag_count: 10,
            max_dm_reply_length: 150,
            vip_lifetime_value_threshold: 500.0,
            escalation_intents: ["complaint", "refund", "return", "legal"]
                .into_iter()
                .map(String::from)
                .collect(),
            comment_approval_threshold: 0.75,
            dm_approval_threshold: 0.75,
            post_approval_threshold: 0.72,
        }
    }
}

impl RuleConfig {
    pub fn is_escalation_intent(&self, intent: &str) -> bool {
        self.escalation_intents.iter().any(|i| i == intent)
    }
}

/// A violated hard rule. Not an error: a deterministic, expected outcome
/// that rejects the proposal before any judgment call is spent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleViolation {
    /// Stable identifier recorded in the audit trail
    pub rule: &'static str,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl RuleViolation {
    pub fn reasoning(&self) -> String {
        format!("Hard rule violation: {}", self.issues.join("; "))
    }
}

/// Evaluate the per-kind hard rules. Pure function of the proposal and the
/// configured limits: identical input always yields the identical outcome.
/// Boundary values are inclusive: exactly at a maximum passes.
pub fn check_hard_rules(proposal: &Proposal, config: &RuleConfig) -> Option<RuleViolation> {
    match proposal {
        Proposal::CommentReply(_) => None,
        Proposal::DmReply(p) => {
            if !p.within_window {
                return Some(RuleViolation {
                    rule: "messaging_window_expired",
                    issues: vec![
                        "Cannot send DM - outside the platform messaging window. \
                         Customer must message first."
                            .to_string(),
                    ],
                    recommendations: vec![
                        "Wait for the customer's next inbound message before replying".to_string(),
                    ],
                });
            }
            let reply_length = p.proposed_reply.chars().count();
            if reply_length > config.max_dm_reply_length {
                return Some(RuleViolation {
                    rule: "dm_reply_too_long",
                    issues: vec![format!(
                        "Reply too long ({} chars, max {})",
                        reply_length, config.max_dm_reply_length
                    )],
                    recommendations: vec![format!(
                        "Shorten the reply to under {} characters",
                        config.max_dm_reply_length
                    )],
                });
            }
            None
        }
        Proposal::Post(p) => {
            let hashtag_count = p.effective_hashtag_count();
            let caption_length = p.effective_caption_length();

            let mut issues = Vec::new();
            let mut recommendations = Vec::new();

            if hashtag_count > config.max_hashtag_count {
                issues.push(format!(
                    "Too many hashtags ({}, max {})",
                    hashtag_count, config.max_hashtag_count
                ));
                recommendations.push(format!(
                    "Reduce hashtags to {} or fewer relevant tags",
                    config.max_hashtag_count
                ));
            }
            if caption_length > config.max_caption_length {
                issues.push(format!(
                    "Caption too long ({} chars, max {})",
                    caption_length, config.max_caption_length
                ));
                recommendations.push(format!(
                    "Shorten caption to under {} characters",
                    config.max_caption_length
                ));
            }

            if issues.is_empty() {
                None
            } else {
                Some(RuleViolation {
                    rule: "hard_rule_violation",
                    issues,
                    recommendations,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::{DmReplyProposal, PostProposal, Proposal};

    fn dm(proposed_reply: &str, within_window: bool) -> Proposal {
        Proposal::DmReply(DmReplyProposal {
            message_id: "m1".to_string(),
            dm_text: "when does my order ship?".to_string(),
            sender_username: "casey".to_string(),
            sender_id: "9001".to_string(),
            business_account_id: "acct-1".to_string(),
            proposed_reply: proposed_reply.to_string(),
            detected_intent: "inquiry".to_string(),
            sentiment: "neutral".to_string(),
            within_window,
            priority: "medium".to_string(),
            customer_history: None,
        })
    }

    fn post(caption: &str, hashtags: usize) -> Proposal {
        Proposal::Post(PostProposal {
            scheduled_post_id: "sp1".to_string(),
            asset: None,
            proposed_caption: caption.to_string(),
            business_account_id: "acct-1".to_string(),
            hashtags: (0..hashtags).map(|i| format!("tag{i}")).collect(),
            hashtag_count: 0,
            caption_length: 0,
            engagement_prediction: 0.0,
            post_type: "general".to_string(),
            scheduled_time: String::new(),
        })
    }

    #[test]
    fn dm_outside_window_is_rejected() {
        let violation = check_hard_rules(&dm("hi!", false), &RuleConfig::default()).unwrap();
        assert_eq!(violation.rule, "messaging_window_expired");
    }

    #[test]
    fn dm_reply_length_boundary_is_inclusive() {
        let config = RuleConfig::default();
        let at_limit = "x".repeat(config.max_dm_reply_length);
        assert!(check_hard_rules(&dm(&at_limit, true), &config).is_none());

        let over = "x".repeat(config.max_dm_reply_length + 1);
        let violation = check_hard_rules(&dm(&over, true), &config).unwrap();
        assert_eq!(violation.rule, "dm_reply_too_long");
    }

    #[test]
    fn caption_length_boundary_is_inclusive() {
        let config = RuleConfig::default();
        let at_limit = "x".repeat(config.max_caption_length);
        assert!(check_hard_rules(&post(&at_limit, 3), &config).is_none());

        let over = "x".repeat(config.max_caption_length + 1);
        assert!(check_hard_rules(&post(&over, 3), &config).is_some());
    }

    #[test]
    fn hashtag_count_boundary_is_inclusive() {
        let config = RuleConfig::default();
        assert!(check_hard_rules(&post("launch day", 10), &config).is_none());
        let violation = check_hard_rules(&post("launch day", 11), &config).unwrap();
        assert!(violation.issues[0].contains("Too many hashtags"));
    }

    #[test]
    fn post_collects_every_violated_rule() {
        let config = RuleConfig::default();
        let over = "x".repeat(config.max_caption_length + 5);
        let violation = check_hard_rules(&post(&over, 12), &config).unwrap();
        assert_eq!(violation.issues.len(), 2);
        assert_eq!(violation.recommendations.len(), 2);
        assert!(violation.reasoning().starts_with("Hard rule violation:"));
    }

    #[test]
    fn caller_supplied_counts_take_precedence() {
        let config = RuleConfig::default();
        let mut p = post("short caption", 2);
        if let Proposal::Post(inner) = &mut p {
            inner.hashtag_count = 11; // caller counted hidden hashtags in the asset
        }
        assert!(check_hard_rules(&p, &config).is_some());
    }

    #[test]
    fn identical_input_yields_identical_outcome() {
        let config = RuleConfig::default();
        let p = post(&"x".repeat(3000), 4);
        assert_eq!(
            check_hard_rules(&p, &config),
            check_hard_rules(&p, &config)
        );
    }

    #[test]
    fn comment_kind_has_no_hard_rules() {
        use crate::proposal::CommentReplyProposal;
        let p = Proposal::CommentReply(CommentReplyProposal {
            comment_id: "c1".to_string(),
            comment_text: "love this".to_string(),
            post_id: "p1".to_string(),
            business_account_id: "acct-1".to_string(),
            proposed_reply: "thanks!".to_string(),
            detected_intent: "general".to_string(),
            sentiment: "positive".to_string(),
            confidence: 0.9,
            commenter_username: None,
        });
        assert!(check_hard_rules(&p, &RuleConfig::default()).is_none());
    }
}
