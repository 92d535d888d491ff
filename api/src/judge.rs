use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure modes of the judgment collaborator. None of these surface to the
/// caller: the engine degrades every one of them to a safe rejection.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judgment call timed out after {0:?}")]
    Timeout(Duration),
    #[error("judgment transport failed: {0}")]
    Transport(String),
    #[error("judgment output could not be parsed as a verdict")]
    Unparseable,
}

/// Readiness snapshot for the health endpoint.
#[derive(Debug, Clone, Default)]
pub struct JudgeReadiness {
    pub available: bool,
    pub models_loaded: Vec<String>,
}

/// The black-box judgment collaborator: takes a rendered prompt, returns
/// text expected to parse as a [`JudgeVerdict`]. Dyn-compatible so the
/// engine can be exercised with a mock.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, JudgeError>;

    async fn readiness(&self) -> JudgeReadiness;
}

/// Structured fields expected from the judgment step. Every field defaults
/// so a partially shaped response still produces a usable verdict; a
/// response that is not JSON at all is a [`JudgeError::Unparseable`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JudgeVerdict {
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub modifications: Option<RawModifications>,
    #[serde(default)]
    pub needs_escalation: bool,
    /// Overall quality on the 0-10 scale
    #[serde(default)]
    pub quality_score: f64,
    /// Per-criterion sub-scores (0-10), keyed by criterion name
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub engagement_prediction: Option<f64>,
}

/// Modification fields as the model emits them, before the engine narrows
/// them to the proposal kind's variant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawModifications {
    #[serde(default)]
    pub reply_text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub hashtags: Option<Vec<String>>,
}

/// Parse a raw completion into a verdict. Tries a direct JSON parse, then a
/// fenced ```json block, then the outermost brace span. Never evaluates the
/// text any other way.
pub fn parse_verdict(raw: &str) -> Result<JudgeVerdict, JudgeError> {
    let cleaned = raw.trim();

    if let Ok(verdict) = serde_json::from_str(cleaned) {
        return Ok(verdict);
    }

    if let Some(candidate) = extract_fenced_json(cleaned) {
        if let Ok(verdict) = serde_json::from_str(candidate) {
            return Ok(verdict);
        }
    }

    if let Some(candidate) = extract_brace_span(cleaned) {
        if let Ok(verdict) = serde_json::from_str(candidate) {
            return Ok(verdict);
        }
    }

    let preview: String = cleaned.chars().take(200).collect();
    tracing::warn!(preview, "judgment response did not parse as JSON");
    Err(JudgeError::Unparseable)
}

fn extract_fenced_json(text: &str) -> Option<&str> {
    let start = text.find("```json").map(|i| i + "```json".len()).or_else(|| {
        text.find("```").map(|i| i + "```".len())
    })?;
    let rest = &text[start..];
    let end = rest.find("```")?;
    let candidate = rest[..end].trim();
    (!candidate.is_empty()).then_some(candidate)
}

fn extract_brace_span(text: &str) -> Option<&str> {
    let open = text.find('{')?;
    let close = text.rfind('}')?;
    (close > open).then(|| &text[open..=close])
}

// --- HTTP judge against an Ollama-style chat endpoint ---

pub struct HttpJudge {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    #[serde(default)]
    name: String,
}

impl HttpJudge {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .connect_timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn call_once(&self, system_prompt: &str, prompt: &str) -> Result<String, JudgeError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        };

        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| JudgeError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JudgeError::Transport(format!(
                "judgment endpoint returned {}",
                response.status()
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::Transport(e.to_string()))?;
        Ok(chat.message.content)
    }
}

#[async_trait]
impl Judge for HttpJudge {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, JudgeError> {
        match self.call_once(system_prompt, prompt).await {
            Ok(text) => Ok(text),
            Err(first) => {
                // One retry on transport failure; a second failure degrades.
                tracing::warn!(error = %first, "judgment call failed, retrying once");
                self.call_once(system_prompt, prompt).await
            }
        }
    }

    async fn readiness(&self) -> JudgeReadiness {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let models = response
                    .json::<TagsResponse>()
                    .await
                    .map(|t| t.models.into_iter().map(|m| m.name).collect())
                    .unwrap_or_default();
                JudgeReadiness {
                    available: true,
                    models_loaded: models,
                }
            }
            _ => JudgeReadiness::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let verdict = parse_verdict(
            r#"{"approved": true, "quality_score": 8.5, "reasoning": "solid reply"}"#,
        )
        .unwrap();
        assert!(verdict.approved);
        assert_eq!(verdict.quality_score, 8.5);
        assert_eq!(verdict.reasoning, "solid reply");
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "Here is my analysis:\n```json\n{\"approved\": false, \"quality_score\": 4.0, \"reasoning\": \"off brand\"}\n```\nDone.";
        let verdict = parse_verdict(raw).unwrap();
        assert!(!verdict.approved);
        assert_eq!(verdict.quality_score, 4.0);
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let raw = "Sure! {\"approved\": true, \"quality_score\": 9.1, \"reasoning\": \"great\"} hope that helps";
        let verdict = parse_verdict(raw).unwrap();
        assert!(verdict.approved);
    }

    #[test]
    fn missing_fields_default() {
        let verdict = parse_verdict(r#"{"approved": true}"#).unwrap();
        assert!(verdict.approved);
        assert_eq!(verdict.quality_score, 0.0);
        assert!(verdict.scores.is_empty());
        assert!(verdict.modifications.is_none());
        assert!(!verdict.needs_escalation);
    }

    #[test]
    fn sub_scores_and_modifications_deserialize() {
        let verdict = parse_verdict(
            r#"{
                "approved": true,
                "modifications": {"reply_text": "Hi! Standard shipping is 3-5 business days."},
                "quality_score": 7.8,
                "scores": {"relevance": 8, "brand_voice": 7.5},
                "reasoning": "improved warmth"
            }"#,
        )
        .unwrap();
        assert_eq!(
            verdict.modifications.unwrap().reply_text.as_deref(),
            Some("Hi! Standard shipping is 3-5 business days.")
        );
        assert_eq!(verdict.scores["relevance"], 8.0);
    }

    #[test]
    fn garbage_is_unparseable() {
        assert!(matches!(
            parse_verdict("I think this reply looks fine to me!"),
            Err(JudgeError::Unparseable)
        ));
        assert!(matches!(parse_verdict(""), Err(JudgeError::Unparseable)));
        assert!(matches!(
            parse_verdict("{not json at all]"),
            Err(JudgeError::Unparseable)
        ));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let judge = HttpJudge::new(
            "http://ollama:11434/",
            "nemotron:8b-q5_K_M",
            Duration::from_secs(9),
        );
        assert_eq!(judge.base_url, "http://ollama:11434");
        assert_eq!(judge.model(), "nemotron:8b-q5_K_M");
    }
}
