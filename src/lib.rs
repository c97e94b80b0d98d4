//! narrator_gateway
//!
//! プレイヤーの入力を生成モデル（Gemini）に中継し、プレイヤーごとの会話スレッドを保ちながら
//! 語り手の返答をクライアントに返す小さなバックエンド。

pub mod config;
pub mod gateway;
pub mod model;
pub mod narrator;
pub mod registry;
pub mod server;

pub use config::{Config, ConfigError};
pub use gateway::{GatewayOptions, NarratorGateway};
pub use narrator::{extract_actions, NarratorReply};
pub use registry::{ConversationRegistry, RetentionPolicy};
pub use server::{build_router, serve, AppState};

// Ensure .env is loaded for tests before anything else runs in the test process.
#[cfg(test)]
#[ctor::ctor]
fn load_dotenv_for_tests() {
    let _ = dotenvy::dotenv();
}
