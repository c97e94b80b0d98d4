use color_eyre::{Report, Result};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use narrator_gateway::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // エラーハンドリングの初期化
    color_eyre::install()?;

    // Load .env (optional). This allows reading GEMINI_API_KEY from a local .env file.
    let _ = dotenvy::dotenv();

    // ログ: 標準出力 + 日次ローテーションのファイル
    let file_appender = rolling::daily("logs", "narrator.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,narrator_gateway=debug"));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // ファイルにANSIカラー不要
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    // APIキーがなければ起動しない
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(target: "narrator_gateway", error = %e, "Invalid configuration, refusing to start");
            return Err(Report::new(e).wrap_err("configuration error"));
        }
    };

    tracing::info!(target: "narrator_gateway", "Starting narrator gateway...");
    narrator_gateway::serve(config).await
}
