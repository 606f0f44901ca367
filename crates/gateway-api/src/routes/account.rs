//! 계좌 endpoint.
//!
//! - `GET /account` - 활성(또는 지정) 거래소 계좌 정보
//! - `GET /account/balances` - 연결된 전체 거래소 통합 잔고
//! - `POST /account/leverage` - 레버리지 설정
//! - `POST /account/margin-mode` - 마진 모드 설정 (기능 지원 여부 확인)

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::future::join_all;
use gateway_core::{AccountInfo, ExchangeId, MarginMode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ok, ApiError, ApiResult};
use crate::session::SessionAuth;
use crate::state::AppState;

/// 대상 거래소 쿼리 파라미터.
#[derive(Debug, Deserialize)]
pub struct ExchangeQuery {
    #[serde(default)]
    pub exchange: Option<ExchangeId>,
}

/// 거래소별 잔고 조회 결과.
///
/// 한 거래소의 실패가 다른 거래소의 결과를 가리지 않도록, 거래소별
/// 성공/실패를 구분해 보고합니다.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeBalance {
    pub exchange: ExchangeId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 레버리지 설정 요청.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLeverageRequest {
    #[serde(default)]
    pub exchange: Option<ExchangeId>,
    pub symbol: String,
    pub leverage: u32,
}

/// 마진 모드 설정 요청.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMarginModeRequest {
    #[serde(default)]
    pub exchange: Option<ExchangeId>,
    pub symbol: String,
    /// "CROSS" | "ISOLATED" (거래소별 표기 "CROSSED" 등도 접힘)
    pub mode: String,
}

/// 설정 변경 응답.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettingResponse {
    pub exchange: ExchangeId,
    pub symbol: String,
}

/// GET /account?exchange=
async fn get_account(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Query(query): Query<ExchangeQuery>,
) -> ApiResult<AccountInfo> {
    let (_, adapter) = state.adapter_for(&session, query.exchange).await?;
    let account = adapter.get_account().await?;
    Ok(ok(account))
}

/// 연결된 모든 거래소의 잔고를 동시에 수집합니다.
///
/// 거래소별 조회는 서로 독립이며, 실패는 해당 거래소 항목에만
/// 표시됩니다. 한 거래소의 실패가 다른 거래소의 결과를 지우지 않습니다.
async fn collect_balances(
    state: &Arc<AppState>,
    session: &crate::session::SessionRecord,
) -> Vec<ExchangeBalance> {
    let fetches = session.linked_exchanges.iter().map(|&exchange| {
        let state = state.clone();
        let user_id = session.user_id;
        async move {
            let result = async {
                let adapter = state.factory.create_adapter(user_id, exchange).await?;
                adapter.get_account().await
            }
            .await;

            match result {
                Ok(account) => ExchangeBalance {
                    exchange,
                    success: true,
                    account: Some(account),
                    error: None,
                },
                Err(e) => ExchangeBalance {
                    exchange,
                    success: false,
                    account: None,
                    error: Some(e.to_string()),
                },
            }
        }
    });

    join_all(fetches).await
}

/// GET /account/balances
async fn get_all_balances(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
) -> ApiResult<Vec<ExchangeBalance>> {
    Ok(ok(collect_balances(&state, &session).await))
}

/// POST /account/leverage
async fn set_leverage(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Json(request): Json<SetLeverageRequest>,
) -> ApiResult<AccountSettingResponse> {
    let (exchange, adapter) = state.adapter_for(&session, request.exchange).await?;
    adapter.set_leverage(&request.symbol, request.leverage).await?;
    Ok(ok(AccountSettingResponse {
        exchange,
        symbol: request.symbol,
    }))
}

/// POST /account/margin-mode
///
/// 마진 모드 변경은 선택 기능입니다. 지원하지 않는 거래소에는 호출하지
/// 않고 바로 거부합니다.
async fn set_margin_mode(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Json(request): Json<SetMarginModeRequest>,
) -> ApiResult<AccountSettingResponse> {
    let mode: MarginMode = request.mode.parse().map_err(ApiError::BadRequest)?;

    let (exchange, adapter) = state.adapter_for(&session, request.exchange).await?;
    if !adapter.capabilities().set_margin_mode {
        return Err(ApiError::BadRequest(format!(
            "{} 거래소는 마진 모드 변경을 지원하지 않습니다",
            exchange
        )));
    }

    adapter.set_margin_mode(&request.symbol, mode).await?;
    Ok(ok(AccountSettingResponse {
        exchange,
        symbol: request.symbol,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/account", get(get_account))
        .route("/account/balances", get(get_all_balances))
        .route("/account/leverage", post(set_leverage))
        .route("/account/margin-mode", post(set_margin_mode))
}
