//! 자격증명 관리 endpoint.
//!
//! 시크릿은 요청 본문으로만 들어오고, 암호화된 형태로만 저장되며,
//! 어떤 응답/로그에도 다시 나타나지 않습니다.
//!
//! 지갑 서명 거래소는 두 슬롯의 의미가 다릅니다:
//! `apiKey` 자리에 지갑 개인키, `apiSecret` 자리에 지갑 주소가 들어갑니다.

use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use gateway_core::{CredentialKind, ExchangeId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ok, ApiResult};
use crate::session::SessionAuth;
use crate::state::AppState;

/// 자격증명 등록 요청.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCredentialRequest {
    pub user_id: i64,
    pub exchange: ExchangeId,
    /// API 키 (지갑 거래소는 개인키)
    pub api_key: String,
    /// API 시크릿 (지갑 거래소는 지갑 주소)
    pub api_secret: String,
}

/// 자격증명 등록/삭제 응답.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialResponse {
    pub exchange: ExchangeId,
    pub credential_kind: CredentialKind,
}

/// 연결된 거래소 목록 응답.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedExchangesResponse {
    pub exchanges: Vec<ExchangeId>,
}

/// POST /credentials
///
/// 세션 없이도 호출 가능합니다. 첫 거래소 연결은 로그인(세션 생성)의
/// 선행 조건이기 때문입니다.
async fn store_credential(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StoreCredentialRequest>,
) -> ApiResult<CredentialResponse> {
    state
        .credential_store
        .store(
            request.user_id,
            request.exchange,
            &request.api_key,
            &request.api_secret,
        )
        .await?;

    Ok(ok(CredentialResponse {
        exchange: request.exchange,
        credential_kind: request.exchange.credential_kind(),
    }))
}

/// GET /credentials
async fn list_credentials(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
) -> ApiResult<LinkedExchangesResponse> {
    let exchanges = state.credential_store.list_exchanges(session.user_id).await?;
    Ok(ok(LinkedExchangesResponse { exchanges }))
}

/// DELETE /credentials/{exchange}
async fn remove_credential(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Path(exchange): Path<ExchangeId>,
) -> ApiResult<CredentialResponse> {
    state
        .credential_store
        .remove(session.user_id, exchange)
        .await?;

    Ok(ok(CredentialResponse {
        exchange,
        credential_kind: exchange.credential_kind(),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/credentials", post(store_credential).get(list_credentials))
        .route("/credentials/{exchange}", delete(remove_credential))
}
