//! Gemini (Generative Language API) のRESTクライアント
//!
//! 会話履歴はクライアント側で保持し、毎回 `generateContent` に全履歴を送る。

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::{ChatModel, Conversation, ConversationHistory, ModelError, Role, SafetySetting, Turn};
use crate::config::Config;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Part {
    #[serde(default)]
    pub(crate) text: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) role: Option<Role>,
    #[serde(default)]
    pub(crate) parts: Vec<Part>,
}

impl From<&Turn> for Content {
    fn from(turn: &Turn) -> Self {
        Content {
            role: Some(turn.role),
            parts: vec![Part { text: Some(turn.text.clone()) }],
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct GenerateContentRequest<'a> {
    pub(crate) contents: Vec<Content>,

    #[serde(rename = "safetySettings")]
    pub(crate) safety_settings: &'a [SafetySetting],
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Candidate {
    #[serde(default)]
    pub(crate) content: Option<Content>,

    #[serde(rename = "finishReason")]
    #[serde(default)]
    pub(crate) finish_reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct PromptFeedback {
    #[serde(rename = "blockReason")]
    #[serde(default)]
    pub(crate) block_reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub(crate) candidates: Vec<Candidate>,

    #[serde(rename = "promptFeedback")]
    #[serde(default)]
    pub(crate) prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    /// 最初の候補のテキストパートを連結して返す
    pub(crate) fn into_text(self) -> Result<String, ModelError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(match self.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => ModelError::Blocked(reason),
                None => ModelError::EmptyReply,
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if !text.trim().is_empty() {
            return Ok(text);
        }
        match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST")) => {
                Err(ModelError::Blocked(reason.to_string()))
            }
            _ => Err(ModelError::EmptyReply),
        }
    }
}

/// 接続設定を共有する部分（全会話で使い回す）
#[derive(Debug)]
struct Endpoint {
    client: reqwest::Client,
    url: String,
    safety_settings: Vec<SafetySetting>,
}

/// Gemini モデル
#[derive(Debug, Clone)]
pub struct GeminiModel {
    endpoint: Arc<Endpoint>,
}

impl GeminiModel {
    pub fn new(config: &Config) -> Result<Self, ModelError> {
        Self::with_safety_settings(config, SafetySetting::permissive())
    }

    pub fn with_safety_settings(
        config: &Config,
        safety_settings: Vec<SafetySetting>,
    ) -> Result<Self, ModelError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        let key = header::HeaderValue::from_str(&config.api_key)
            .map_err(|e| ModelError::Other(format!("invalid API key header: {e}")))?;
        headers.insert("x-goog-api-key", key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        let url = format!("{}/models/{}:generateContent", config.base_url, config.model);
        info!(target: "gemini", model = %config.model, "Gemini model initialized");

        Ok(Self {
            endpoint: Arc::new(Endpoint { client, url, safety_settings }),
        })
    }

    /// 具体型のまま会話を作る（履歴を直接見たい場合）
    pub fn conversation(&self) -> GeminiConversation {
        GeminiConversation {
            endpoint: Arc::clone(&self.endpoint),
            history: ConversationHistory::new(),
        }
    }
}

impl ChatModel for GeminiModel {
    fn start_conversation(&self) -> Box<dyn Conversation> {
        Box::new(self.conversation())
    }
}

/// Gemini との1本の会話
#[derive(Debug)]
pub struct GeminiConversation {
    endpoint: Arc<Endpoint>,
    history: ConversationHistory,
}

impl GeminiConversation {
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }
}

#[async_trait]
impl Conversation for GeminiConversation {
    fn seed(&mut self, turns: &[Turn]) {
        self.history.extend_from_slice(turns);
    }

    #[instrument(name = "gemini_send", skip(self, text), fields(text_len = text.len()))]
    async fn send(&mut self, text: &str) -> Result<String, ModelError> {
        let pending = Turn::user(text);
        let contents = self
            .history
            .as_slice()
            .iter()
            .chain(std::iter::once(&pending))
            .map(Content::from)
            .collect();
        let req = GenerateContentRequest {
            contents,
            safety_settings: &self.endpoint.safety_settings,
        };

        let resp = self.endpoint.client.post(&self.endpoint.url).json(&req).send().await?;
        debug!(target: "gemini", history_len = self.history.len(), "request sent");
        let status = resp.status();
        let body = resp.text().await?;
        debug!(target: "gemini", status = status.as_u16(), body_len = body.len(), "generateContent response");

        if !status.is_success() {
            return Err(ModelError::Status { status: status.as_u16(), body });
        }
        let reply = serde_json::from_str::<GenerateContentResponse>(&body)?.into_text()?;

        // 成功した場合のみ履歴を確定する
        self.history.push(pending);
        self.history.add_model(&reply);
        Ok(reply)
    }
}
