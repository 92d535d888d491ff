use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::escalation::Escalation;

/// Structured replacement content suggested by the judgment step. Closed
/// per-kind variants instead of an open JSON map, so downstream handling
/// is exhaustively checkable.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Modifications {
    /// Replacement reply text for comment and DM kinds
    Reply { reply_text: Option<String> },
    /// Replacement caption and/or hashtags for the post kind
    Post {
        caption: Option<String>,
        hashtags: Option<Vec<String>>,
    },
}

impl Modifications {
    /// True when the variant carries no actual replacement content.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Reply { reply_text } => reply_text.is_none(),
            Self::Post { caption, hashtags } => caption.is_none() && hashtags.is_none(),
        }
    }

    /// The replacement text a caller would publish, if any.
    pub fn replacement_text(&self) -> Option<&str> {
        match self {
            Self::Reply { reply_text } => reply_text.as_deref(),
            Self::Post { caption, .. } => caption.as_deref(),
        }
    }
}

/// The terminal output of one decision cycle. Produced exactly once per
/// proposal and never revised after being logged.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub approved: bool,
    /// Replacement content applied to the response (approved cycles only)
    pub modifications: Option<Modifications>,
    /// A suggestion that was recorded but not applied, e.g. when escalation
    /// suppressed an otherwise-passing judgment
    pub suggested_modifications: Option<Modifications>,
    /// Weighted score normalized to [0, 1]; 0 for hard-rule rejections
    pub score: f64,
    pub reasoning: String,
    pub escalation: Option<Escalation>,
    /// Set when a deterministic rule decided the outcome
    pub rule_triggered: Option<&'static str>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    /// True when the judgment step failed (timeout, transport, parse) and
    /// the cycle degraded to safe rejection
    pub judgment_failed: bool,
    /// Post kind only: predicted engagement rate from the judgment step
    pub engagement_prediction: Option<f64>,
    pub model: String,
    pub analyzed_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub factors: &'static [&'static str],
}

impl Decision {
    /// Action outcome recorded in the audit trail.
    pub fn action(&self) -> &'static str {
        if self.judgment_failed {
            "error"
        } else if self.escalation.is_some() {
            "escalated"
        } else if self.approved {
            "approved"
        } else {
            "rejected"
        }
    }

    /// Quality score on the 0-10 scale used by the response surface.
    pub fn quality_score_out_of_ten(&self) -> f64 {
        self.score * 10.0
    }
}

/// Provenance block returned with every decision.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditData {
    pub analyzed_at: DateTime<Utc>,
    /// Judgment model identifier (or the configured model when the step
    /// was skipped or unavailable)
    pub model: String,
    pub factors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_triggered: Option<String>,
}

/// Wire response for all three approval endpoints. Kind-specific fields are
/// omitted when not applicable; a well-formed authorized proposal always
/// receives this shape with HTTP 200, whatever failed internally.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DecisionResponse {
    pub approved: bool,
    pub modifications: Option<Modifications>,
    /// 0-10 judgment quality score (0 for deterministic rejections)
    pub quality_score: f64,
    /// 0-1 confidence: the upstream classifier's for comments, the
    /// normalized quality score for DMs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub decision_reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_escalation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_team: Option<String>,
    /// Comment kind: sentiment echoed back for the workflow's router
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    /// Post kind only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_prediction: Option<f64>,
    /// Post kind only: normalized brand-alignment score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand_alignment_score: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    pub audit_data: AuditData,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision() -> Decision {
        Decision {
            approved: false,
            modifications: None,
            suggested_modifications: None,
            score: 0.0,
            reasoning: "test".to_string(),
            escalation: None,
            rule_triggered: None,
            issues: vec![],
            recommendations: vec![],
            judgment_failed: false,
            engagement_prediction: None,
            model: "test-model".to_string(),
            analyzed_at: Utc::now(),
            latency_ms: 0,
            factors: &[],
        }
    }

    #[test]
    fn action_reflects_terminal_state() {
        let mut d = decision();
        assert_eq!(d.action(), "rejected");

        d.approved = true;
        assert_eq!(d.action(), "approved");

        d.escalation = Some(Escalation {
            reason: "vip".to_string(),
            suggested_team: "sales".to_string(),
        });
        assert_eq!(d.action(), "escalated");

        d.judgment_failed = true;
        assert_eq!(d.action(), "error");
    }

    #[test]
    fn empty_modifications_are_detected() {
        assert!(Modifications::Reply { reply_text: None }.is_empty());
        assert!(
            Modifications::Post {
                caption: None,
                hashtags: None
            }
            .is_empty()
        );
        assert!(
            !Modifications::Reply {
                reply_text: Some("better text".to_string())
            }
            .is_empty()
        );
        assert!(
            !Modifications::Post {
                caption: None,
                hashtags: Some(vec!["launch".to_string()])
            }
            .is_empty()
        );
    }

    #[test]
    fn modifications_serialize_flat() {
        let m = Modifications::Reply {
            reply_text: Some("hi".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&m).unwrap(),
            serde_json::json!({"reply_text": "hi"})
        );

        let m = Modifications::Post {
            caption: Some("new caption".to_string()),
            hashtags: None,
        };
        assert_eq!(
            serde_json::to_value(&m).unwrap(),
            serde_json::json!({"caption": "new caption", "hashtags": null})
        );
    }

    #[test]
    fn score_surface_uses_ten_point_scale() {
        let mut d = decision();
        d.score = 0.81;
        assert!((d.quality_score_out_of_ten() - 8.1).abs() < 1e-9);
    }
}
