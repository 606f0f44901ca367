//! 주문 endpoint.
//!
//! - `POST /order` - 단위 불문 주문 의도 제출 (정규화 엔진 경유)
//! - `DELETE /order/{orderId}` - 주문 취소
//! - `DELETE /orders` - 심볼 전체 주문 취소 (주문별 성공/실패 보고)
//! - `GET /orders` - 미체결 주문 조회
//! - `GET /orders/history` - 주문 내역 조회
//! - `GET /fills` - 체결 내역 조회

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use gateway_core::{
    CancelAllReport, ExchangeId, Fill, MarginMode, OrderIntent, OrderResult, OrderType, Side,
    Sizing,
};
use gateway_execution::NormalizationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ok, ApiResult};
use crate::session::SessionAuth;
use crate::state::AppState;

/// 주문 제출 요청.
///
/// 크기 지정 필드 네 개 중 정확히 하나만 설정해야 합니다.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub exchange: Option<ExchangeId>,
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(default)]
    pub base_quantity: Option<Decimal>,
    #[serde(default)]
    pub usd_notional: Option<Decimal>,
    #[serde(default)]
    pub percent_of_margin: Option<Decimal>,
    #[serde(default)]
    pub percent_from_entry: Option<Decimal>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub trigger_price: Option<Decimal>,
    #[serde(default)]
    pub reduce_only: bool,
    #[serde(default)]
    pub leverage: Option<u32>,
    #[serde(default)]
    pub margin_mode: Option<MarginMode>,
}

/// 주문/체결 조회 쿼리.
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub exchange: Option<ExchangeId>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// 취소 대상 쿼리. 거래소 API는 취소에 심볼을 요구합니다.
#[derive(Debug, Deserialize)]
pub struct CancelQuery {
    #[serde(default)]
    pub exchange: Option<ExchangeId>,
    pub symbol: String,
}

/// 주문 취소 응답.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderResponse {
    pub order_id: String,
    pub symbol: String,
}

/// POST /order
///
/// 요청의 크기 지정을 검증해 [`OrderIntent`]로 구성하고, 정규화 엔진이
/// 거래소 네이티브 파라미터로 변환한 뒤 제출합니다. 레버리지/마진 모드
/// 선호값이 있으면 주문 전에 먼저 적용합니다.
async fn place_order(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Json(request): Json<PlaceOrderRequest>,
) -> ApiResult<OrderResult> {
    let sizing = Sizing::from_options(
        request.base_quantity,
        request.usd_notional,
        request.percent_of_margin,
        request.percent_from_entry,
    )
    .map_err(NormalizationError::Intent)?;

    let intent = OrderIntent {
        symbol: request.symbol,
        side: request.side,
        order_type: request.order_type,
        sizing,
        price: request.price,
        trigger_price: request.trigger_price,
        reduce_only: request.reduce_only,
        leverage: request.leverage,
        margin_mode: request.margin_mode,
    };

    let (exchange, adapter) = state.adapter_for(&session, request.exchange).await?;

    if let Some(leverage) = intent.leverage {
        adapter.set_leverage(&intent.symbol, leverage).await?;
    }
    if let Some(mode) = intent.margin_mode {
        if adapter.capabilities().set_margin_mode {
            adapter.set_margin_mode(&intent.symbol, mode).await?;
        } else {
            warn!(exchange = %exchange, symbol = %intent.symbol, "마진 모드 변경 미지원, 선호값 무시");
        }
    }

    let params = state
        .normalizer
        .normalize(exchange, adapter.as_ref(), &intent)
        .await?;
    let result = adapter.place_order(&params).await?;

    info!(
        exchange = %exchange,
        symbol = %result.symbol,
        order_id = %result.order_id,
        "주문 제출 완료"
    );
    Ok(ok(result))
}

/// DELETE /order/{orderId}?exchange=&symbol=
async fn cancel_order(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Path(order_id): Path<String>,
    Query(query): Query<CancelQuery>,
) -> ApiResult<CancelOrderResponse> {
    let (_, adapter) = state.adapter_for(&session, query.exchange).await?;
    adapter.cancel_order(&order_id, &query.symbol).await?;
    Ok(ok(CancelOrderResponse {
        order_id,
        symbol: query.symbol,
    }))
}

/// DELETE /orders?exchange=&symbol=
///
/// N건 취소는 N번의 개별 취소 호출이며, 주문별 성공/실패를 그대로
/// 보고합니다.
async fn cancel_all_orders(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Query(query): Query<CancelQuery>,
) -> ApiResult<CancelAllReport> {
    let (_, adapter) = state.adapter_for(&session, query.exchange).await?;
    let report = adapter.cancel_all_orders(&query.symbol).await?;
    Ok(ok(report))
}

/// GET /orders?exchange=&symbol=
async fn get_open_orders(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Vec<OrderResult>> {
    let (_, adapter) = state.adapter_for(&session, query.exchange).await?;
    let orders = adapter.get_open_orders(query.symbol.as_deref()).await?;
    Ok(ok(orders))
}

/// GET /orders/history?exchange=&symbol=&limit=
async fn get_order_history(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Vec<OrderResult>> {
    let (_, adapter) = state.adapter_for(&session, query.exchange).await?;
    let orders = adapter
        .get_order_history(query.symbol.as_deref(), query.limit.unwrap_or(50))
        .await?;
    Ok(ok(orders))
}

/// GET /fills?exchange=&symbol=&limit=
async fn get_fills(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Vec<Fill>> {
    let (_, adapter) = state.adapter_for(&session, query.exchange).await?;
    let fills = adapter
        .get_fills(query.symbol.as_deref(), query.limit.unwrap_or(100))
        .await?;
    Ok(ok(fills))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/order", post(place_order))
        .route("/order/{order_id}", delete(cancel_order))
        .route("/orders", get(get_open_orders).delete(cancel_all_orders))
        .route("/orders/history", get(get_order_history))
        .route("/fills", get(get_fills))
}
