use serde::{Deserialize, Serialize};

use crate::narrator::NarratorReply;

/// POST /chat のリクエスト
///
/// `player_id` がなければクッキーセッションのIDを使う。本文は `text` でも `message` でもよい。
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(alias = "message")]
    pub text: String,
}

/// POST /chat のレスポンス
///
/// `response` は `text` と同じ内容（旧クライアント互換）。
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub text: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<String>>,
}

impl From<NarratorReply> for ChatResponse {
    fn from(reply: NarratorReply) -> Self {
        Self {
            response: reply.text.clone(),
            text: reply.text,
            actions: reply.actions,
        }
    }
}

/// GET / のレスポンス
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
