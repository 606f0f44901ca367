//! 세션 endpoint.
//!
//! - `POST /auth/session` - 로그인, 토큰 발급
//! - `POST /auth/session/exchange` - 활성 거래소 전환
//! - `DELETE /auth/session` - 로그아웃

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use gateway_core::ExchangeId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ok, ApiResult};
use crate::session::{SessionAuth, SessionRecord};
use crate::state::AppState;

/// 세션 생성 요청.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub user_id: i64,
    /// 선호 활성 거래소. 연결 집합에 없으면 무시됩니다.
    #[serde(default)]
    pub exchange_id: Option<ExchangeId>,
}

/// 세션 응답.
///
/// 토큰은 발급 시점에만 응답에 포함되며, 로그에는 남지 않습니다.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub active_exchange: ExchangeId,
    pub linked_exchanges: Vec<ExchangeId>,
    pub expires_in: i64,
}

impl SessionResponse {
    fn issued(record: SessionRecord) -> Self {
        Self {
            expires_in: record.expires_in_secs(),
            active_exchange: record.active_exchange,
            linked_exchanges: record.linked_exchanges,
            token: Some(record.token),
        }
    }

    fn current(record: SessionRecord) -> Self {
        Self {
            token: None,
            ..Self::issued(record)
        }
    }
}

/// 거래소 전환 요청.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchExchangeRequest {
    pub exchange: ExchangeId,
}

/// 로그아웃 응답.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub deleted: bool,
}

/// POST /auth/session
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<SessionResponse> {
    let record = state
        .sessions
        .create(request.user_id, request.exchange_id)
        .await?;
    Ok(ok(SessionResponse::issued(record)))
}

/// POST /auth/session/exchange
async fn switch_exchange(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Json(request): Json<SwitchExchangeRequest>,
) -> ApiResult<SessionResponse> {
    let record = state
        .sessions
        .switch_exchange(&session.token, request.exchange)
        .await?;
    Ok(ok(SessionResponse::current(record)))
}

/// DELETE /auth/session
async fn delete_session(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
) -> ApiResult<LogoutResponse> {
    let deleted = state.sessions.delete(&session.token).await;
    Ok(ok(LogoutResponse { deleted }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(create_session).delete(delete_session))
        .route("/auth/session/exchange", post(switch_exchange))
}
