//! アプリケーション設定と定数

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::registry::RetentionPolicy;

/// APIキーを保持する環境変数名
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// デフォルトのGeminiモデル
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

/// Generative Language API のベースURL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// デフォルトの待ち受けアドレス
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";

/// 設定読み込みエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// アプリケーション設定
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini APIキー（必須）
    pub api_key: String,
    /// Geminiモデル名
    pub model: String,
    /// APIのベースURL
    pub base_url: String,
    /// HTTPサーバーの待ち受けアドレス
    pub bind_addr: SocketAddr,
    /// モデル呼び出し1回あたりのタイムアウト
    pub request_timeout: Duration,
    /// 応答末尾のアクションリストを抽出するか
    pub extract_actions: bool,
    /// 会話レジストリの保持ポリシー
    pub retention: RetentionPolicy,
}

impl Config {
    /// プロセス環境変数から設定を読み込む
    ///
    /// `.env` は呼び出し側で `dotenvy::dotenv()` 済みであることを想定。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー検索関数から設定を組み立てる（テストでは環境変数を汚さずに使える）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 空文字は未設定扱い
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get(API_KEY_VAR).ok_or(ConfigError::MissingVar(API_KEY_VAR))?;
        let model = get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = get("GEMINI_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let mut bind_addr = parse_var::<SocketAddr>(
            "NARRATOR_BIND_ADDR",
            get("NARRATOR_BIND_ADDR").as_deref().unwrap_or(DEFAULT_BIND_ADDR),
        )?;
        // ホスティング環境が渡す PORT を優先
        if let Some(port) = get("PORT") {
            bind_addr.set_port(parse_var("PORT", &port)?);
        }

        let request_timeout = match get("NARRATOR_REQUEST_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_var("NARRATOR_REQUEST_TIMEOUT_SECS", &v)?),
            None => Duration::from_secs(60),
        };

        let extract_actions = match get("NARRATOR_EXTRACT_ACTIONS") {
            Some(v) => parse_bool("NARRATOR_EXTRACT_ACTIONS", &v)?,
            None => true,
        };

        // 0 は「無制限」
        let mut retention = RetentionPolicy::default();
        if let Some(v) = get("NARRATOR_MAX_SESSIONS") {
            let max: usize = parse_var("NARRATOR_MAX_SESSIONS", &v)?;
            retention.max_sessions = (max > 0).then_some(max);
        }
        if let Some(v) = get("NARRATOR_SESSION_TTL_SECS") {
            let secs: u64 = parse_var("NARRATOR_SESSION_TTL_SECS", &v)?;
            retention.idle_ttl = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(Self {
            api_key,
            model,
            base_url,
            bind_addr,
            request_timeout,
            extract_actions,
            retention,
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        }),
    }
}
