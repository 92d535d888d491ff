use std::time::Duration;

use vigil_core::rules::RuleConfig;

/// Service configuration, read from the environment once at startup.
/// Rule values ride in `AppState` from here on; nothing in the decision
/// path reads process globals.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Shared secret for the `x-api-key` header. When unset, auth is
    /// skipped (dev mode).
    pub api_key: Option<String>,
    pub judge_url: String,
    pub judge_model: String,
    /// Hard timeout on a single judgment call
    pub judge_timeout: Duration,
    /// Cap on simultaneous judgment calls across all requests
    pub judge_max_concurrent: usize,
    /// End-to-end request timeout, kept above the judgment timeout so the
    /// degraded-rejection path can still answer the caller
    pub request_timeout: Duration,
    pub db_max_connections: u32,
    pub rules: RuleConfig,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = RuleConfig::default();
        let rules = RuleConfig {
            max_caption_length: env_parse("MAX_CAPTION_LENGTH", defaults.max_caption_length),
            max_hashtag_count: env_parse("MAX_HASHTAG_COUNT", defaults.max_hashtag_count),
            max_dm_reply_length: env_parse("MAX_DM_REPLY_LENGTH", defaults.max_dm_reply_length),
            vip_lifetime_value_threshold: env_parse(
                "VIP_LIFETIME_VALUE_THRESHOLD",
                defaults.vip_lifetime_value_threshold,
            ),
            escalation_intents: defaults.escalation_intents,
            comment_approval_threshold: env_parse(
                "COMMENT_APPROVAL_THRESHOLD",
                defaults.comment_approval_threshold,
            ),
            dm_approval_threshold: env_parse(
                "DM_APPROVAL_THRESHOLD",
                defaults.dm_approval_threshold,
            ),
            post_approval_threshold: env_parse(
                "POST_APPROVAL_THRESHOLD",
                defaults.post_approval_threshold,
            ),
        };

        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env_parse("PORT", 3000),
            api_key: std::env::var("AGENT_API_KEY").ok().filter(|k| !k.is_empty()),
            judge_url: std::env::var("JUDGE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            judge_model: std::env::var("JUDGE_MODEL")
                .unwrap_or_else(|_| "nemotron:8b-q5_K_M".to_string()),
            judge_timeout: Duration::from_secs(env_parse("JUDGE_TIMEOUT_SECS", 9)),
            judge_max_concurrent: env_parse("JUDGE_MAX_CONCURRENT", 4),
            request_timeout: Duration::from_secs(env_parse("REQUEST_TIMEOUT_SECS", 15)),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", 20),
            rules,
        }
    }
}
