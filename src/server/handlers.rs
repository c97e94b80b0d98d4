use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;

use super::models::{ChatRequest, ChatResponse, ErrorResponse, StatusResponse};
use super::AppState;
use crate::narrator::STATUS_MESSAGE;

const PLAYER_ID_KEY: &str = "player_id";

/// GET / - 死活確認
pub async fn status() -> Json<StatusResponse> {
    Json(StatusResponse { status: STATUS_MESSAGE })
}

/// POST /chat - プレイヤーの行動を語り手に送り、返答を取得
///
/// モデル側で失敗してもフォールバック文を 200 で返す。
#[axum::debug_handler]
pub async fn chat(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => {
            tracing::warn!(target: "web::chat", error = %rejection, "Rejected malformed chat request");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: rejection.body_text(),
                }),
            )
                .into_response();
        }
    };

    let player_id = match req.player_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => id,
        None => session_player_id(&session).await,
    };
    tracing::info!(target: "web::chat", player_id = %player_id, text_len = req.text.len(), "Received chat request");

    let reply = state.gateway.handle_message(&player_id, &req.text).await;
    Json(ChatResponse::from(reply)).into_response()
}

/// クッキーセッションに紐づくプレイヤーIDを取得（なければ発行して保存）
async fn session_player_id(session: &Session) -> String {
    if let Ok(Some(id)) = session.get::<String>(PLAYER_ID_KEY).await {
        return id;
    }

    let id = uuid::Uuid::new_v4().to_string();
    if let Err(e) = session.insert(PLAYER_ID_KEY, &id).await {
        // 保存できなくてもこのリクエストは一時IDで続行する
        tracing::warn!(target: "web::chat", error = %e, "Failed to store player id in session");
    }
    id
}
