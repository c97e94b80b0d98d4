//! 外部の生成モデルとの境界
//!
//! ゲートウェイ側はモデルを `ChatModel` / `Conversation` の2つのトレイト越しにしか扱わない。
//! 本番では `GeminiModel`、テストではスクリプト化したダブルを差し込む。

pub mod gemini;
pub mod history;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use gemini::{GeminiConversation, GeminiModel};
pub use history::ConversationHistory;

/// 発話者
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// 会話の1ターン
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

/// コンテンツ安全性の設定（カテゴリとしきい値の組）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

impl SafetySetting {
    pub fn new(category: &str, threshold: &str) -> Self {
        Self {
            category: category.to_string(),
            threshold: threshold.to_string(),
        }
    }

    /// ナラティブを自由に書かせるため、全カテゴリを BLOCK_NONE にした既定セット
    pub fn permissive() -> Vec<Self> {
        [
            "HARM_CATEGORY_HARASSMENT",
            "HARM_CATEGORY_HATE_SPEECH",
            "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            "HARM_CATEGORY_DANGEROUS_CONTENT",
        ]
        .into_iter()
        .map(|c| Self::new(c, "BLOCK_NONE"))
        .collect()
    }
}

/// モデル呼び出しの失敗
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("prompt blocked: {0}")]
    Blocked(String),
    #[error("model returned no text")]
    EmptyReply,
    #[error("could not decode model response: {0}")]
    Decode(#[from] serde_json::Error),
    /// テストダブルや将来のバックエンド用の汎用エラー
    #[error("{0}")]
    Other(String),
}

/// 外部モデル：新しい会話ハンドルを作る能力だけを持つ
pub trait ChatModel: Send + Sync {
    fn start_conversation(&self) -> Box<dyn Conversation>;
}

/// 進行中の会話ハンドル
#[async_trait]
pub trait Conversation: Send {
    /// 台本どおりのターンを履歴に積む（ネットワーク呼び出しなし）
    fn seed(&mut self, turns: &[Turn]);

    /// ユーザー発話を送り、モデルの返答テキストを得る。
    ///
    /// 失敗時は履歴を変更しない。
    async fn send(&mut self, text: &str) -> Result<String, ModelError>;
}
