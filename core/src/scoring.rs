use std::collections::BTreeMap;

use crate::proposal::ProposalKind;
use crate::rules::RuleConfig;

/// Fixed per-kind criterion weights. Each set sums to 1.0; the judgment
/// step scores each criterion 0-10 and the weighted total is compared
/// against the kind's approval threshold.
pub fn criterion_weights(kind: ProposalKind) -> &'static [(&'static str, f64)] {
    match kind {
        ProposalKind::CommentReply => &[
            ("relevance", 0.25),
            ("brand_voice", 0.25),
            ("sentiment_alignment", 0.30),
            ("quality", 0.20),
        ],
        ProposalKind::DmReply => &[
            ("appropriateness", 0.35),
            ("personalization", 0.25),
            ("escalation_need", 0.25),
            ("format", 0.15),
        ],
        ProposalKind::Post => &[
            ("caption_quality", 0.30),
            ("brand_alignment", 0.25),
            ("hashtag_strategy", 0.20),
            ("engagement_potential", 0.15),
            ("compliance", 0.10),
        ],
    }
}

pub fn approval_threshold(kind: ProposalKind, config: &RuleConfig) -> f64 {
    match kind {
        ProposalKind::CommentReply => config.comment_approval_threshold,
        ProposalKind::DmReply => config.dm_approval_threshold,
        ProposalKind::Post => config.post_approval_threshold,
    }
}

/// Normalize a 0-10 judgment score to [0, 1], clamping out-of-range values
/// the model occasionally produces.
pub fn normalize(score_out_of_ten: f64) -> f64 {
    (score_out_of_ten / 10.0).clamp(0.0, 1.0)
}

/// Combine per-criterion sub-scores (0-10) into a weighted total in [0, 1].
///
/// A criterion the judgment omitted falls back to the overall quality score,
/// so a partially shaped response still yields a usable total and the
/// weights always sum to 1.0.
pub fn weighted_total(
    kind: ProposalKind,
    sub_scores: &BTreeMap<String, f64>,
    overall_quality: f64,
) -> f64 {
    let fallback = overall_quality.clamp(0.0, 10.0);
    let total: f64 = criterion_weights(kind)
        .iter()
        .map(|(criterion, weight)| {
            let raw = sub_scores
                .get(*criterion)
                .copied()
                .unwrap_or(fallback)
                .clamp(0.0, 10.0);
            weight * raw
        })
        .sum();
    normalize(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one_for_every_kind() {
        for kind in [
            ProposalKind::CommentReply,
            ProposalKind::DmReply,
            ProposalKind::Post,
        ] {
            let sum: f64 = criterion_weights(kind).iter().map(|(_, w)| w).sum();
            assert!((sum - 1.0).abs() < 1e-9, "{kind:?} weights sum to {sum}");
        }
    }

    #[test]
    fn weighted_total_combines_sub_scores() {
        let scores: BTreeMap<String, f64> = [
            ("relevance", 8.0),
            ("brand_voice", 8.0),
            ("sentiment_alignment", 9.0),
            ("quality", 7.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        // 0.25*8 + 0.25*8 + 0.30*9 + 0.20*7 = 8.1 -> 0.81
        let total = weighted_total(ProposalKind::CommentReply, &scores, 0.0);
        assert!((total - 0.81).abs() < 1e-9);
    }

    #[test]
    fn missing_criteria_fall_back_to_overall_quality() {
        let total = weighted_total(ProposalKind::DmReply, &BTreeMap::new(), 8.5);
        assert!((total - 0.85).abs() < 1e-9);
    }

    #[test]
    fn partial_sub_scores_blend_with_fallback() {
        let scores: BTreeMap<String, f64> =
            [("appropriateness".to_string(), 10.0)].into_iter().collect();
        // 0.35*10 + 0.65*6 = 7.4 -> 0.74
        let total = weighted_total(ProposalKind::DmReply, &scores, 6.0);
        assert!((total - 0.74).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        let scores: BTreeMap<String, f64> = [
            ("caption_quality", 42.0),
            ("brand_alignment", -3.0),
            ("hashtag_strategy", 10.0),
            ("engagement_potential", 10.0),
            ("compliance", 10.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        // 0.30*10 + 0.25*0 + 0.20*10 + 0.15*10 + 0.10*10 = 7.5 -> 0.75
        let total = weighted_total(ProposalKind::Post, &scores, 0.0);
        assert!((total - 0.75).abs() < 1e-9);
        assert!(normalize(17.0) <= 1.0);
        assert!(normalize(-2.0) >= 0.0);
    }

    #[test]
    fn thresholds_match_configuration() {
        let config = RuleConfig::default();
        assert_eq!(
            approval_threshold(ProposalKind::CommentReply, &config),
            0.75
        );
        assert_eq!(approval_threshold(ProposalKind::DmReply, &config), 0.75);
        assert_eq!(approval_threshold(ProposalKind::Post, &config), 0.72);
    }
}
