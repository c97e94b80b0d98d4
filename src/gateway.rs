//! NarratorGateway
//!
//! プレイヤーの入力を会話に流し込み、語り手の返答を返すビジネスロジック層。
//! HTTP層から独立しているので、テストではモデルをダブルに差し替えて使う。

use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::model::{ChatModel, Conversation, Turn};
use crate::narrator::{self, NarratorReply};
use crate::registry::ConversationRegistry;

/// ゲートウェイの挙動設定
#[derive(Debug, Clone)]
pub struct GatewayOptions {
    /// 応答末尾のアクションリストを抽出するか
    pub extract_actions: bool,
    /// 新しい会話に積む台本ターン
    pub seed_turns: Vec<Turn>,
    /// モデル呼び出し失敗時に返す文
    pub fallback: String,
}

impl GatewayOptions {
    pub fn new(extract_actions: bool) -> Self {
        Self {
            extract_actions,
            seed_turns: narrator::seed_turns(extract_actions),
            fallback: narrator::FALLBACK_NARRATIVE.to_string(),
        }
    }
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self::new(true)
    }
}

/// 語り手ゲートウェイ
pub struct NarratorGateway {
    model: Arc<dyn ChatModel>,
    registry: ConversationRegistry,
    options: GatewayOptions,
}

impl NarratorGateway {
    pub fn new(model: Arc<dyn ChatModel>, registry: ConversationRegistry, options: GatewayOptions) -> Self {
        Self { model, registry, options }
    }

    pub fn registry(&self) -> &ConversationRegistry {
        &self.registry
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    fn new_conversation(&self) -> Box<dyn Conversation> {
        let mut conversation = self.model.start_conversation();
        conversation.seed(&self.options.seed_turns);
        conversation
    }

    /// プレイヤーのメッセージを処理して語り手の返答を返す
    ///
    /// モデル呼び出しが失敗しても呼び出し元にはエラーを返さず、固定のフォールバック文を返す。
    /// 失敗した場合もリトライはしない。
    #[instrument(name = "handle_message", skip(self, text), fields(text_len = text.len()))]
    pub async fn handle_message(&self, player_id: &str, text: &str) -> NarratorReply {
        let (conversation, created) = self
            .registry
            .get_or_create(player_id, || self.new_conversation());
        if created {
            info!(target: "narrator", player_id, "new session started");
        }

        // 同じプレイヤーの会話は1つずつ順番に進める
        let mut conversation = conversation.lock().await;
        match conversation.send(text).await {
            Ok(raw) => {
                info!(target: "narrator", player_id, reply_len = raw.len(), "narrator replied");
                if self.options.extract_actions {
                    narrator::extract_actions(&raw)
                } else {
                    NarratorReply::narrative(raw)
                }
            }
            Err(e) => {
                error!(target: "narrator", player_id, error = %e, "model call failed");
                NarratorReply::narrative(self.options.fallback.clone())
            }
        }
    }
}
