//! Read-side store adapter. All read column and table names live here.
//! The platform-sync schema has drifted before; when it drifts again only
//! this file changes.
//!
//! Every sub-fetch is independently fault-tolerant: a store error or a
//! missing row degrades the context instead of aborting the decision cycle.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use sqlx::PgPool;
use vigil_core::context::{
    AccountContext, Context, DmMessage, DmThread, PostContext, PostPerformance,
};
use vigil_core::proposal::Proposal;

const POST_CACHE_TTL: Duration = Duration::from_secs(30);
const ACCOUNT_CACHE_TTL: Duration = Duration::from_secs(60);
const DM_HISTORY_LIMIT: i64 = 5;
const PERFORMANCE_SAMPLE_LIMIT: i64 = 10;

/// Minimal per-process TTL cache. Entries expire on read; the map is
/// bounded by the small set of hot posts/accounts a deployment sees within
/// one TTL window.
struct TtlCache<V: Clone> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().ok()?;
        if let Some((stored_at, value)) = entries.get(key) {
            if stored_at.elapsed() < self.ttl {
                return Some(value.clone());
            }
        }
        entries.remove(key);
        None
    }

    fn insert(&self, key: String, value: V) {
        if let Ok(mut entries) = self.entries.lock() {
            let ttl = self.ttl;
            entries.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
            entries.insert(key, (Instant::now(), value));
        }
    }
}

pub struct ContextGatherer {
    db: PgPool,
    post_cache: TtlCache<PostContext>,
    account_cache: TtlCache<AccountContext>,
}

#[derive(sqlx::FromRow)]
struct PostRow {
    caption: Option<String>,
    like_count: Option<i64>,
    comments_count: Option<i64>,
    share_count: Option<i64>,
    reach: Option<i64>,
    media_type: Option<String>,
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    username: Option<String>,
    display_name: Option<String>,
    account_type: Option<String>,
    followers_count: Option<i64>,
    biography: Option<String>,
    category: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: uuid::Uuid,
    conversation_status: Option<String>,
    within_window: Option<bool>,
    window_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    message_count: Option<i64>,
    last_message_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    message_text: Option<String>,
    message_type: Option<String>,
    is_from_business: Option<bool>,
    sent_at: Option<chrono::DateTime<chrono::Utc>>,
    send_status: Option<String>,
}

#[derive(sqlx::FromRow)]
struct PerformanceRow {
    like_count: Option<i64>,
    comments_count: Option<i64>,
    reach: Option<i64>,
}

impl ContextGatherer {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            post_cache: TtlCache::new(POST_CACHE_TTL),
            account_cache: TtlCache::new(ACCOUNT_CACHE_TTL),
        }
    }

    /// Assemble the per-kind context snapshot. Sub-fetches fan out
    /// concurrently within this request and never fail the cycle.
    pub async fn gather(&self, proposal: &Proposal) -> Context {
        match proposal {
            Proposal::CommentReply(p) => {
                let (post, account) = tokio::join!(
                    self.post_context(&p.post_id),
                    self.account_context(&p.business_account_id),
                );
                let degraded = post.is_none() || account.is_none();
                Context {
                    post,
                    account,
                    degraded,
                    ..Default::default()
                }
            }
            Proposal::DmReply(p) => {
                let (account, thread) = tokio::join!(
                    self.account_context(&p.business_account_id),
                    self.dm_thread(&p.sender_id, &p.business_account_id),
                );
                let degraded = account.is_none() || thread.is_none();
                Context {
                    account,
                    thread,
                    degraded,
                    ..Default::default()
                }
            }
            Proposal::Post(p) => {
                let (account, performance) = tokio::join!(
                    self.account_context(&p.business_account_id),
                    self.recent_performance(&p.business_account_id),
                );
                let degraded = account.is_none() || performance.is_none();
                Context {
                    account,
                    performance,
                    degraded,
                    ..Default::default()
                }
            }
        }
    }

    async fn post_context(&self, post_id: &str) -> Option<PostContext> {
        if post_id.is_empty() {
            return None;
        }
        if let Some(cached) = self.post_cache.get(post_id) {
            return Some(cached);
        }

        let row = sqlx::query_as::<_, PostRow>(
            "SELECT caption, like_count, comments_count, share_count, reach, media_type \
             FROM media_posts WHERE media_id = $1 LIMIT 1",
        )
        .bind(post_id)
        .fetch_optional(&self.db)
        .await;

        match row {
            Ok(Some(row)) => {
                let like_count = row.like_count.unwrap_or(0);
                let comments_count = row.comments_count.unwrap_or(0);
                let reach = row.reach.unwrap_or(0);
                let context = PostContext {
                    caption: row.caption.unwrap_or_default(),
                    like_count,
                    comments_count,
                    share_count: row.share_count.unwrap_or(0),
                    reach,
                    media_type: row.media_type.unwrap_or_default(),
                    engagement_rate: PostContext::compute_engagement_rate(
                        like_count,
                        comments_count,
                        reach,
                    ),
                };
                self.post_cache.insert(post_id.to_string(), context.clone());
                Some(context)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(post_id, error = %e, "failed to fetch post context");
                None
            }
        }
    }

    async fn account_context(&self, business_account_id: &str) -> Option<AccountContext> {
        if business_account_id.is_empty() {
            return None;
        }
        if let Some(cached) = self.account_cache.get(business_account_id) {
            return Some(cached);
        }

        // id::text keeps non-UUID caller ids from failing the bind
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT username, display_name, account_type, followers_count, biography, category \
             FROM business_accounts WHERE id::text = $1 LIMIT 1",
        )
        .bind(business_account_id)
        .fetch_optional(&self.db)
        .await;

        match row {
            Ok(Some(row)) => {
                let context = AccountContext {
                    username: row.username.unwrap_or_default(),
                    display_name: row.display_name.unwrap_or_default(),
                    account_type: row.account_type.unwrap_or_default(),
                    followers_count: row.followers_count.unwrap_or(0),
                    biography: row.biography.unwrap_or_default(),
                    category: row.category.unwrap_or_default(),
                };
                self.account_cache
                    .insert(business_account_id.to_string(), context.clone());
                Some(context)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(business_account_id, error = %e, "failed to fetch account context");
                None
            }
        }
    }

    /// DM context is a two-table shape: conversation metadata first, then
    /// the most recent messages of that conversation.
    async fn dm_thread(&self, sender_id: &str, business_account_id: &str) -> Option<DmThread> {
        if sender_id.is_empty() {
            return None;
        }

        let conversation = sqlx::query_as::<_, ConversationRow>(
            "SELECT id, conversation_status, within_window, window_expires_at, \
                    message_count, last_message_at \
             FROM dm_conversations \
             WHERE business_account_id::text = $1 AND customer_platform_id = $2 \
             LIMIT 1",
        )
        .bind(business_account_id)
        .bind(sender_id)
        .fetch_optional(&self.db)
        .await;

        let conversation = match conversation {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(sender_id, error = %e, "failed to fetch DM conversation");
                return None;
            }
        };

        let messages = sqlx::query_as::<_, MessageRow>(
            "SELECT message_text, message_type, is_from_business, sent_at, send_status \
             FROM dm_messages \
             WHERE conversation_id = $1 \
             ORDER BY sent_at DESC \
             LIMIT $2",
        )
        .bind(conversation.id)
        .bind(DM_HISTORY_LIMIT)
        .fetch_all(&self.db)
        .await;

        let messages = match messages {
            Ok(rows) => rows
                .into_iter()
                .map(|m| DmMessage {
                    text: m.message_text.unwrap_or_default(),
                    direction: if m.is_from_business.unwrap_or(false) {
                        "outbound".to_string()
                    } else {
                        "inbound".to_string()
                    },
                    status: m.send_status.unwrap_or_else(|| "unknown".to_string()),
                    sent_at: m.sent_at,
                    message_type: m.message_type.unwrap_or_else(|| "text".to_string()),
                })
                .collect(),
            Err(e) => {
                tracing::warn!(sender_id, error = %e, "failed to fetch DM messages");
                Vec::new()
            }
        };

        Some(DmThread {
            messages,
            within_window: conversation.within_window,
            window_expires_at: conversation.window_expires_at,
            conversation_status: conversation.conversation_status.unwrap_or_default(),
            message_count: conversation.message_count.unwrap_or(0),
            last_message_at: conversation.last_message_at,
        })
    }

    /// Engagement benchmarks over the account's recent posts. The rate is
    /// computed per post and then averaged, matching how the dashboard
    /// reports it.
    async fn recent_performance(&self, business_account_id: &str) -> Option<PostPerformance> {
        if business_account_id.is_empty() {
            return None;
        }

        let rows = sqlx::query_as::<_, PerformanceRow>(
            "SELECT like_count, comments_count, reach \
             FROM media_posts \
             WHERE business_account_id::text = $1 \
             ORDER BY published_at DESC \
             LIMIT $2",
        )
        .bind(business_account_id)
        .bind(PERFORMANCE_SAMPLE_LIMIT)
        .fetch_all(&self.db)
        .await;

        let rows = match rows {
            Ok(rows) if !rows.is_empty() => rows,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!(business_account_id, error = %e, "failed to fetch post performance");
                return None;
            }
        };

        let count = rows.len() as f64;
        let mut total_likes = 0.0;
        let mut total_comments = 0.0;
        let mut total_rate = 0.0;
        for row in &rows {
            let likes = row.like_count.unwrap_or(0);
            let comments = row.comments_count.unwrap_or(0);
            total_likes += likes as f64;
            total_comments += comments as f64;
            total_rate +=
                PostContext::compute_engagement_rate(likes, comments, row.reach.unwrap_or(0));
        }

        Some(PostPerformance {
            avg_likes: total_likes / count,
            avg_comments: total_comments / count,
            avg_engagement_rate: total_rate / count,
            sample_size: rows.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_cache_returns_fresh_entries() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_secs(60));
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn ttl_cache_expires_entries() {
        let cache: TtlCache<i32> = TtlCache::new(Duration::from_millis(0));
        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("a"), None);
    }
}
