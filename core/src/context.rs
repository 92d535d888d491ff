use serde::Serialize;

/// Read-only snapshot assembled per decision cycle. Every field is optional:
/// a failed or empty sub-fetch degrades the context instead of aborting the
/// cycle, and the decision engine must operate on whatever is present.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Context {
    pub post: Option<PostContext>,
    pub account: Option<AccountContext>,
    pub thread: Option<DmThread>,
    pub performance: Option<PostPerformance>,
    /// True when at least one sub-fetch failed or found no row.
    pub degraded: bool,
}

/// Engagement snapshot of the post a comment was left on.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostContext {
    pub caption: String,
    pub like_count: i64,
    pub comments_count: i64,
    pub share_count: i64,
    pub reach: i64,
    pub media_type: String,
    /// Derived, not stored: (likes + comments) / reach, 0 when reach is 0.
    pub engagement_rate: f64,
}

impl PostContext {
    pub fn compute_engagement_rate(like_count: i64, comments_count: i64, reach: i64) -> f64 {
        if reach > 0 {
            (like_count + comments_count) as f64 / reach as f64
        } else {
            0.0
        }
    }
}

/// Brand profile for the account a proposal belongs to. Fetched fresh per
/// request so concurrent decisions for different accounts never share state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountContext {
    pub username: String,
    pub display_name: String,
    pub account_type: String,
    pub followers_count: i64,
    pub biography: String,
    pub category: String,
}

/// One message in a DM conversation, most-recent-first.
#[derive(Debug, Clone, Serialize)]
pub struct DmMessage {
    pub text: String,
    /// "inbound" (from the customer) or "outbound" (from the business)
    pub direction: String,
    pub status: String,
    pub sent_at: Option<chrono::DateTime<chrono::Utc>>,
    pub message_type: String,
}

/// Conversation-level DM context: recent messages plus window metadata used
/// to verify the caller-supplied window flag against the store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DmThread {
    pub messages: Vec<DmMessage>,
    pub within_window: Option<bool>,
    pub window_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub conversation_status: String,
    pub message_count: i64,
    pub last_message_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl DmThread {
    /// True when the store says the messaging window has closed, regardless
    /// of what the caller claimed.
    pub fn window_expired(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match (self.within_window, self.window_expires_at) {
            (Some(false), _) => true,
            (_, Some(expires_at)) => expires_at <= now,
            _ => false,
        }
    }
}

/// Engagement benchmarks over the account's recent posts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostPerformance {
    pub avg_likes: f64,
    pub avg_comments: f64,
    pub avg_engagement_rate: f64,
    pub sample_size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn engagement_rate_guards_zero_reach() {
        assert_eq!(PostContext::compute_engagement_rate(120, 30, 0), 0.0);
        let rate = PostContext::compute_engagement_rate(120, 30, 1000);
        assert!((rate - 0.15).abs() < 1e-9);
    }

    #[test]
    fn window_expired_prefers_store_flag() {
        let thread = DmThread {
            within_window: Some(false),
            window_expires_at: Some(Utc::now() + Duration::hours(3)),
            ..Default::default()
        };
        assert!(thread.window_expired(Utc::now()));
    }

    #[test]
    fn window_expired_falls_back_to_expiry_timestamp() {
        let now = Utc::now();
        let open = DmThread {
            within_window: None,
            window_expires_at: Some(now + Duration::hours(1)),
            ..Default::default()
        };
        let closed = DmThread {
            within_window: None,
            window_expires_at: Some(now - Duration::minutes(1)),
            ..Default::default()
        };
        assert!(!open.window_expired(now));
        assert!(closed.window_expired(now));
    }

    #[test]
    fn window_unknown_is_not_expired() {
        assert!(!DmThread::default().window_expired(Utc::now()));
    }
}
