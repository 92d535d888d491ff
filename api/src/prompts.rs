//! Prompt templates for the judgment step, one per proposal kind.
//!
//! Each template renders the proposal plus whatever context survived the
//! gather phase, spells out the weighted criteria, and demands strict JSON
//! output with per-criterion sub-scores.

use vigil_core::context::Context;
use vigil_core::proposal::{CommentReplyProposal, DmReplyProposal, PostProposal};

pub const SYSTEM_PROMPT: &str = "You are a brand oversight agent reviewing proposed social-media \
actions before they are published.\nYour job is to analyze content and make safe decisions. \
Unsafe or off-brand content must be rejected.\nReturn ONLY valid JSON as specified - no markdown, \
no explanation text, no code blocks.";

/// Char-safe truncation for caller-supplied text interpolated into prompts.
fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn account_line(context: &Context) -> (String, String) {
    match &context.account {
        Some(account) => (account.username.clone(), account.account_type.clone()),
        None => ("unknown".to_string(), "business".to_string()),
    }
}

pub fn render_comment_prompt(proposal: &CommentReplyProposal, context: &Context) -> String {
    let (username, account_type) = account_line(context);
    let (caption, likes, comments, engagement_rate) = match &context.post {
        Some(post) => (
            truncate(&post.caption, 300),
            post.like_count,
            post.comments_count,
            post.engagement_rate,
        ),
        None => ("N/A".to_string(), 0, 0, 0.0),
    };

    format!(
        "You are reviewing a proposed reply to a public comment.\n\
         \n\
         BRAND CONTEXT:\n\
         - Account: {username}\n\
         - Account Type: {account_type}\n\
         \n\
         POST CONTEXT:\n\
         - Post ID: {post_id}\n\
         - Caption: \"{caption}\"\n\
         - Likes: {likes} | Comments: {comments}\n\
         - Engagement Rate: {engagement_rate}\n\
         \n\
         INCOMING COMMENT:\n\
         - Text: \"{comment_text}\"\n\
         - From: @{commenter}\n\
         - Detected Intent: {intent}\n\
         - Sentiment: {sentiment}\n\
         \n\
         PROPOSED REPLY (from automation):\n\
         \"{proposed_reply}\"\n\
         \n\
         EVALUATION CRITERIA (score each 0-10):\n\
         1. relevance (25%): Does the reply address the actual comment?\n\
         2. brand_voice (25%): Does it match a professional, friendly brand tone?\n\
         3. sentiment_alignment (30%): Does the reply tone match the comment's intent?\n\
         4. quality (20%): Is it well-written, appropriate length, and engaging?\n\
         \n\
         INSTRUCTIONS:\n\
         - Approve only replies whose weighted score clears the approval bar.\n\
         - If approving with modifications, provide an improved version.\n\
         - Keep replies under 200 characters.\n\
         \n\
         Example verdict:\n\
         {{\"approved\": true, \"modifications\": {{\"reply_text\": null}}, \"quality_score\": 8.5, \
         \"scores\": {{\"relevance\": 9, \"brand_voice\": 8, \"sentiment_alignment\": 9, \"quality\": 8}}, \
         \"reasoning\": \"Reply addresses the question with a clear CTA\"}}\n\
         \n\
         Respond with ONLY this JSON (no other text):\n\
         {{\"approved\": true|false, \"modifications\": {{\"reply_text\": \"improved reply or null\"}}, \
         \"quality_score\": 0.0, \"scores\": {{\"relevance\": 0, \"brand_voice\": 0, \
         \"sentiment_alignment\": 0, \"quality\": 0}}, \"reasoning\": \"brief explanation\"}}",
        post_id = proposal.post_id,
        comment_text = truncate(&proposal.comment_text, 500),
        commenter = proposal.commenter_username.as_deref().unwrap_or("unknown"),
        intent = proposal.detected_intent,
        sentiment = proposal.sentiment,
        proposed_reply = truncate(&proposal.proposed_reply, 500),
    )
}

pub fn render_dm_prompt(proposal: &DmReplyProposal, context: &Context) -> String {
    let (username, _) = account_line(context);
    let history = proposal.customer_history.clone().unwrap_or_default();

    let thread_lines = match &context.thread {
        Some(thread) if !thread.messages.is_empty() => thread
            .messages
            .iter()
            .map(|m| format!("  [{}] {}", m.direction, truncate(&m.text, 100)))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => "No previous DMs".to_string(),
    };

    format!(
        "You are reviewing a proposed direct-message reply to a customer.\n\
         \n\
         BRAND CONTEXT:\n\
         - Account: {username}\n\
         \n\
         CUSTOMER CONTEXT:\n\
         - Message: \"{dm_text}\"\n\
         - From: @{sender}\n\
         - Detected Intent: {intent}\n\
         - Sentiment: {sentiment}\n\
         - Priority: {priority}\n\
         - Within Messaging Window: {within_window}\n\
         - Previous Interactions: {previous_interactions}\n\
         - Customer Sentiment History: {sentiment_history}\n\
         - Lifetime Value: ${lifetime_value}\n\
         \n\
         DM HISTORY (recent):\n\
         {thread_lines}\n\
         \n\
         PROPOSED REPLY (from automation):\n\
         \"{proposed_reply}\"\n\
         \n\
         EVALUATION CRITERIA (score each 0-10):\n\
         1. appropriateness (35%): Does it handle the customer's actual request?\n\
         2. personalization (25%): Does it feel personal, not robotic?\n\
         3. escalation_need (25%): Should this go to a human instead?\n\
         4. format (15%): Short, clear, concise for mobile?\n\
         \n\
         INSTRUCTIONS:\n\
         - If the reply needs a human (complaint, refund, legal, high-value customer), \
           set needs_escalation to true and approved to false.\n\
         - If approving, optionally improve the reply. DM tone is warmer than comments.\n\
         \n\
         Example verdict (escalation):\n\
         {{\"approved\": false, \"modifications\": null, \"needs_escalation\": true, \
         \"quality_score\": 5.0, \"scores\": {{\"appropriateness\": 5, \"personalization\": 6, \
         \"escalation_need\": 2, \"format\": 7}}, \
         \"reasoning\": \"Refund request with negative sentiment requires human intervention\"}}\n\
         \n\
         Respond with ONLY this JSON:\n\
         {{\"approved\": true|false, \"modifications\": {{\"reply_text\": \"improved reply or null\"}}, \
         \"needs_escalation\": false, \"quality_score\": 0.0, \"scores\": {{\"appropriateness\": 0, \
         \"personalization\": 0, \"escalation_need\": 0, \"format\": 0}}, \
         \"reasoning\": \"brief explanation\"}}",
        dm_text = truncate(&proposal.dm_text, 500),
        sender = proposal.sender_username,
        intent = proposal.detected_intent,
        sentiment = proposal.sentiment,
        priority = proposal.priority,
        within_window = proposal.within_window,
        previous_interactions = history.previous_interactions,
        sentiment_history = history.sentiment_history,
        lifetime_value = history.lifetime_value,
        proposed_reply = truncate(&proposal.proposed_reply, 300),
    )
}

pub fn render_post_prompt(proposal: &PostProposal, context: &Context) -> String {
    let (username, account_type) = account_line(context);
    let performance = context.performance.clone().unwrap_or_default();
    let asset_tags = proposal
        .asset
        .as_ref()
        .map(|a| a.tags.join(", "))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "none".to_string());
    let hashtags = if proposal.hashtags.is_empty() {
        "none".to_string()
    } else {
        proposal.hashtags.join(", ")
    };

    format!(
        "You are reviewing a proposed post caption before it is scheduled.\n\
         \n\
         BRAND CONTEXT:\n\
         - Account: {username}\n\
         - Account Type: {account_type}\n\
         \n\
         POST DETAILS:\n\
         - Proposed Caption: \"{caption}\"\n\
         - Hashtags: {hashtags}\n\
         - Hashtag Count: {hashtag_count}\n\
         - Caption Length: {caption_length} chars\n\
         - Post Type: {post_type}\n\
         - Scheduled Time: {scheduled_time}\n\
         - Asset Tags: {asset_tags}\n\
         \n\
         PERFORMANCE BENCHMARKS (recent posts):\n\
         - Avg Likes: {avg_likes}\n\
         - Avg Comments: {avg_comments}\n\
         - Avg Engagement Rate: {avg_engagement_rate}\n\
         \n\
         EVALUATION CRITERIA (score each 0-10):\n\
         1. caption_quality (30%): Strong hook in first line? Clear body? Strong CTA?\n\
         2. brand_alignment (25%): Matches brand voice, values, audience?\n\
         3. hashtag_strategy (20%): Relevant, not spammy, mix of popular and niche?\n\
         4. engagement_potential (15%): Will it drive likes, comments, saves?\n\
         5. compliance (10%): Within length and hashtag limits? No prohibited content?\n\
         \n\
         INSTRUCTIONS:\n\
         - If approving with modifications, provide an improved caption and/or hashtags.\n\
         - Focus on making the hook (first 1-2 lines) compelling.\n\
         \n\
         Example verdict:\n\
         {{\"approved\": false, \"modifications\": null, \"quality_score\": 4.0, \
         \"scores\": {{\"caption_quality\": 3, \"brand_alignment\": 5, \"hashtag_strategy\": 3, \
         \"engagement_potential\": 4, \"compliance\": 8}}, \"engagement_prediction\": 0.015, \
         \"reasoning\": \"Caption lacks substance - no hook, no story, no CTA\"}}\n\
         \n\
         Respond with ONLY this JSON:\n\
         {{\"approved\": true|false, \"modifications\": {{\"caption\": \"improved caption or null\", \
         \"hashtags\": [\"list\", \"or\", \"null\"]}}, \"quality_score\": 0.0, \
         \"scores\": {{\"caption_quality\": 0, \"brand_alignment\": 0, \"hashtag_strategy\": 0, \
         \"engagement_potential\": 0, \"compliance\": 0}}, \"engagement_prediction\": 0.0, \
         \"reasoning\": \"brief explanation\"}}",
        caption = truncate(&proposal.proposed_caption, 2200),
        hashtag_count = proposal.effective_hashtag_count(),
        caption_length = proposal.effective_caption_length(),
        post_type = proposal.post_type,
        scheduled_time = if proposal.scheduled_time.is_empty() {
            "not scheduled"
        } else {
            proposal.scheduled_time.as_str()
        },
        avg_likes = performance.avg_likes,
        avg_comments = performance.avg_comments,
        avg_engagement_rate = performance.avg_engagement_rate,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::context::{AccountContext, PostContext};

    fn comment_proposal() -> CommentReplyProposal {
        CommentReplyProposal {
            comment_id: "17890".to_string(),
            comment_text: "Love this! Where can I buy it?".to_string(),
            post_id: "17895695668004550".to_string(),
            business_account_id: "acct-1".to_string(),
            proposed_reply: "Thanks! Check our website".to_string(),
            detected_intent: "purchase_inquiry".to_string(),
            sentiment: "positive".to_string(),
            confidence: 0.9,
            commenter_username: Some("jamie".to_string()),
        }
    }

    #[test]
    fn comment_prompt_includes_proposal_and_context() {
        let context = Context {
            post: Some(PostContext {
                caption: "Summer collection is live".to_string(),
                like_count: 230,
                comments_count: 45,
                share_count: 12,
                reach: 5000,
                media_type: "IMAGE".to_string(),
                engagement_rate: 0.055,
            }),
            account: Some(AccountContext {
                username: "acmebrand".to_string(),
                account_type: "BUSINESS".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };

        let prompt = render_comment_prompt(&comment_proposal(), &context);
        assert!(prompt.contains("Love this! Where can I buy it?"));
        assert!(prompt.contains("acmebrand"));
        assert!(prompt.contains("Summer collection is live"));
        assert!(prompt.contains("sentiment_alignment (30%)"));
        assert!(prompt.contains("Respond with ONLY this JSON"));
    }

    #[test]
    fn comment_prompt_degrades_without_context() {
        let prompt = render_comment_prompt(&comment_proposal(), &Context::default());
        assert!(prompt.contains("- Account: unknown"));
        assert!(prompt.contains("Caption: \"N/A\""));
    }

    #[test]
    fn long_caller_text_is_truncated() {
        let mut proposal = comment_proposal();
        proposal.comment_text = "x".repeat(2000);
        let prompt = render_comment_prompt(&proposal, &Context::default());
        assert!(!prompt.contains(&"x".repeat(501)));
    }

    #[test]
    fn dm_prompt_renders_thread_history() {
        use vigil_core::context::{DmMessage, DmThread};
        let proposal = DmReplyProposal {
            message_id: "m1".to_string(),
            dm_text: "when does my order ship?".to_string(),
            sender_username: "casey".to_string(),
            sender_id: "9001".to_string(),
            business_account_id: "acct-1".to_string(),
            proposed_reply: "It ships tomorrow!".to_string(),
            detected_intent: "inquiry".to_string(),
            sentiment: "neutral".to_string(),
            within_window: true,
            priority: "medium".to_string(),
            customer_history: None,
        };
        let context = Context {
            thread: Some(DmThread {
                messages: vec![DmMessage {
                    text: "hi, order #123 here".to_string(),
                    direction: "inbound".to_string(),
                    status: "delivered".to_string(),
                    sent_at: None,
                    message_type: "text".to_string(),
                }],
                ..Default::default()
            }),
            ..Default::default()
        };
        let prompt = render_dm_prompt(&proposal, &context);
        assert!(prompt.contains("[inbound] hi, order #123 here"));
        assert!(prompt.contains("appropriateness (35%)"));
    }

    #[test]
    fn post_prompt_uses_benchmarks_and_effective_counts() {
        use vigil_core::context::PostPerformance;
        let proposal = PostProposal {
            scheduled_post_id: "sp1".to_string(),
            asset: None,
            proposed_caption: "Stop scrolling.".to_string(),
            business_account_id: "acct-1".to_string(),
            hashtags: vec!["launch".to_string(), "newdrop".to_string()],
            hashtag_count: 0,
            caption_length: 0,
            engagement_prediction: 0.0,
            post_type: "feed".to_string(),
            scheduled_time: String::new(),
        };
        let context = Context {
            performance: Some(PostPerformance {
                avg_likes: 180.5,
                avg_comments: 22.0,
                avg_engagement_rate: 0.041,
                sample_size: 10,
            }),
            ..Default::default()
        };
        let prompt = render_post_prompt(&proposal, &context);
        assert!(prompt.contains("Hashtag Count: 2"));
        assert!(prompt.contains("Avg Likes: 180.5"));
        assert!(prompt.contains("not scheduled"));
    }
}
