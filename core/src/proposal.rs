use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which kind of write action is awaiting approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    CommentReply,
    DmReply,
    Post,
}

impl ProposalKind {
    /// Event type written to the audit trail for this kind.
    pub fn event_type(self) -> &'static str {
        match self {
            Self::CommentReply => "comment_reply_approval",
            Self::DmReply => "dm_reply_approval",
            Self::Post => "post_approval",
        }
    }

    pub fn resource_type(self) -> &'static str {
        match self {
            Self::CommentReply => "comment",
            Self::DmReply => "dm",
            Self::Post => "post",
        }
    }

    /// Factors the judgment step is asked to evaluate for this kind.
    /// Recorded verbatim in `audit_data.factors`.
    pub fn analysis_factors(self) -> &'static [&'static str] {
        match self {
            Self::CommentReply => &["sentiment", "tone", "relevance", "brand_voice"],
            Self::DmReply => &[
                "appropriateness",
                "personalization",
                "escalation_need",
                "format",
            ],
            Self::Post => &[
                "caption_quality",
                "brand_alignment",
                "hashtag_strategy",
                "engagement_potential",
                "compliance",
            ],
        }
    }
}

fn default_intent() -> String {
    "general".to_string()
}

fn default_sentiment() -> String {
    "neutral".to_string()
}

fn default_confidence() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

fn default_priority() -> String {
    "medium".to_string()
}

fn default_post_type() -> String {
    "general".to_string()
}

/// A proposed reply to a public comment.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CommentReplyProposal {
    /// Platform-native comment id (not necessarily a UUID)
    pub comment_id: String,
    pub comment_text: String,
    /// Platform-native media id of the post the comment is on
    pub post_id: String,
    pub business_account_id: String,
    pub proposed_reply: String,
    #[serde(default = "default_intent")]
    pub detected_intent: String,
    #[serde(default = "default_sentiment")]
    pub sentiment: String,
    /// Upstream classifier confidence, [0, 1]
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub commenter_username: Option<String>,
}

/// Rolling customer relationship data supplied by the automation pipeline.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CustomerHistory {
    #[serde(default)]
    pub previous_interactions: i64,
    #[serde(default = "default_sentiment")]
    pub sentiment_history: String,
    #[serde(default)]
    pub lifetime_value: f64,
}

impl Default for CustomerHistory {
    fn default() -> Self {
        Self {
            previous_interactions: 0,
            sentiment_history: default_sentiment(),
            lifetime_value: 0.0,
        }
    }
}

/// A proposed direct-message reply.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DmReplyProposal {
    /// Platform-native message id
    pub message_id: String,
    pub dm_text: String,
    pub sender_username: String,
    /// Platform-native sender id
    pub sender_id: String,
    pub business_account_id: String,
    pub proposed_reply: String,
    #[serde(default = "default_intent")]
    pub detected_intent: String,
    #[serde(default = "default_sentiment")]
    pub sentiment: String,
    /// Whether the platform messaging window is still open, per the caller
    #[serde(default = "default_true")]
    pub within_window: bool,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default)]
    pub customer_history: Option<CustomerHistory>,
}

/// Media asset attached to a proposed post.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AssetDescriptor {
    #[serde(default)]
    pub public_id: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A proposed post caption with hashtags and scheduling metadata.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PostProposal {
    #[serde(default)]
    pub scheduled_post_id: String,
    #[serde(default)]
    pub asset: Option<AssetDescriptor>,
    pub proposed_caption: String,
    pub business_account_id: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    /// Caller-supplied count; 0 means "derive from hashtags"
    #[serde(default)]
    pub hashtag_count: usize,
    /// Caller-supplied length; 0 means "derive from proposed_caption"
    #[serde(default)]
    pub caption_length: usize,
    #[serde(default)]
    pub engagement_prediction: f64,
    #[serde(default = "default_post_type")]
    pub post_type: String,
    #[serde(default)]
    pub scheduled_time: String,
}

impl PostProposal {
    /// Effective hashtag count: the caller's figure, or the list length.
    pub fn effective_hashtag_count(&self) -> usize {
        if self.hashtag_count > 0 {
            self.hashtag_count
        } else {
            self.hashtags.len()
        }
    }

    /// Effective caption length: the caller's figure, or the caption's.
    pub fn effective_caption_length(&self) -> usize {
        if self.caption_length > 0 {
            self.caption_length
        } else {
            self.proposed_caption.chars().count()
        }
    }
}

/// A validated inbound proposal, owned by exactly one decision cycle.
#[derive(Debug, Clone)]
pub enum Proposal {
    CommentReply(CommentReplyProposal),
    DmReply(DmReplyProposal),
    Post(PostProposal),
}

impl Proposal {
    pub fn kind(&self) -> ProposalKind {
        match self {
            Self::CommentReply(_) => ProposalKind::CommentReply,
            Self::DmReply(_) => ProposalKind::DmReply,
            Self::Post(_) => ProposalKind::Post,
        }
    }

    /// Platform-native id of the resource being acted on.
    pub fn resource_id(&self) -> &str {
        match self {
            Self::CommentReply(p) => &p.comment_id,
            Self::DmReply(p) => &p.message_id,
            Self::Post(p) => &p.scheduled_post_id,
        }
    }

    pub fn business_account_id(&self) -> &str {
        match self {
            Self::CommentReply(p) => &p.business_account_id,
            Self::DmReply(p) => &p.business_account_id,
            Self::Post(p) => &p.business_account_id,
        }
    }

    /// The text that would be published if this proposal is approved.
    pub fn proposed_text(&self) -> &str {
        match self {
            Self::CommentReply(p) => &p.proposed_reply,
            Self::DmReply(p) => &p.proposed_reply,
            Self::Post(p) => &p.proposed_caption,
        }
    }
}
