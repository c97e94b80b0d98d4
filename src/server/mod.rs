//! HTTPサーフェス（axum）

pub mod handlers;
pub mod models;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    routing::{get, post},
    Router,
};
use color_eyre::{eyre::WrapErr, Result};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{cookie::time, Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::gateway::{GatewayOptions, NarratorGateway};
use crate::model::GeminiModel;
use crate::registry::ConversationRegistry;

/// ハンドラ間で共有する状態
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<NarratorGateway>,
}

impl AppState {
    pub fn new(gateway: NarratorGateway) -> Self {
        Self { gateway: Arc::new(gateway) }
    }
}

/// ルーティングを組み立てる（バインドはしない）
pub fn build_router(state: AppState) -> Router {
    // セッションストアの設定
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_expiry(Expiry::OnInactivity(time::Duration::seconds(3600)));

    // どのオリジン・メソッド・ヘッダーも許可
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::status))
        .route("/chat", post(handlers::chat))
        .layer(session_layer)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 設定からゲートウェイを組み立ててサーバーを起動する
pub async fn serve(config: Config) -> Result<()> {
    let model = GeminiModel::new(&config).wrap_err("failed to initialize Gemini client")?;
    let registry = ConversationRegistry::new(config.retention);
    let gateway = NarratorGateway::new(
        Arc::new(model),
        registry,
        GatewayOptions::new(config.extract_actions),
    );
    let state = AppState::new(gateway);

    if let Some(ttl) = config.retention.idle_ttl {
        spawn_idle_sweeper(Arc::clone(&state.gateway), ttl);
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .wrap_err_with(|| format!("failed to bind {}", config.bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!(target: "narrator_gateway", model = %config.model, "Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(target: "narrator_gateway", "Server stopped");
    Ok(())
}

/// 一定間隔でアイドル会話を掃除する
fn spawn_idle_sweeper(gateway: Arc<NarratorGateway>, ttl: Duration) {
    let period = (ttl / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            gateway.registry().evict_idle(Instant::now());
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "narrator_gateway", error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
