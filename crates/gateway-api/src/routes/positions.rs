//! 포지션 endpoint.
//!
//! - `GET /positions` - 열린 포지션 조회 (매번 거래소에서 새로 읽음)
//! - `POST /position/tp-sl` - 포지션 TP/SL 설정 (레그별 결과 보고)
//! - `POST /position/margin` - 격리 마진 추가/회수

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use gateway_core::{ExchangeId, MarginAdjustment, Position, TpslReport};
use gateway_execution::{place_position_tpsl, NormalizationError, TpslRequest, TpslTrigger};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ok, ApiError, ApiResult};
use crate::routes::account::ExchangeQuery;
use crate::session::SessionAuth;
use crate::state::AppState;

/// TP/SL 설정 요청.
///
/// 레그마다 절대 가격 또는 진입가 대비 퍼센트 중 하나로 지정합니다.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTpslRequest {
    #[serde(default)]
    pub exchange: Option<ExchangeId>,
    pub symbol: String,
    #[serde(default)]
    pub tp_price: Option<Decimal>,
    #[serde(default)]
    pub tp_percent: Option<Decimal>,
    #[serde(default)]
    pub sl_price: Option<Decimal>,
    #[serde(default)]
    pub sl_percent: Option<Decimal>,
}

fn leg_trigger(
    name: &str,
    price: Option<Decimal>,
    percent: Option<Decimal>,
) -> Result<Option<TpslTrigger>, ApiError> {
    match (price, percent) {
        (Some(_), Some(_)) => Err(ApiError::BadRequest(format!(
            "{} 레그는 가격과 퍼센트 중 하나만 지정할 수 있습니다",
            name
        ))),
        (Some(price), None) => Ok(Some(TpslTrigger::Price(price))),
        (None, Some(pct)) => Ok(Some(TpslTrigger::PercentFromEntry(pct))),
        (None, None) => Ok(None),
    }
}

/// 격리 마진 조정 요청.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustMarginRequest {
    #[serde(default)]
    pub exchange: Option<ExchangeId>,
    pub symbol: String,
    pub amount: Decimal,
    /// "ADD" | "REMOVE"
    #[serde(rename = "type")]
    pub adjustment: MarginAdjustment,
}

/// 마진 조정 응답.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustMarginResponse {
    pub exchange: ExchangeId,
    pub symbol: String,
    pub amount: Decimal,
    pub adjustment: MarginAdjustment,
}

/// GET /positions?exchange=
async fn get_positions(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Query(query): Query<ExchangeQuery>,
) -> ApiResult<Vec<Position>> {
    let (_, adapter) = state.adapter_for(&session, query.exchange).await?;
    let positions = adapter.get_positions().await?;
    Ok(ok(positions))
}

/// POST /position/tp-sl
///
/// 두 레그를 순차 제출하며, 부분 실패도 레그별로 그대로 보고합니다
/// (롤백 없음). 한 레그라도 접수되면 success = true 입니다.
async fn set_position_tpsl(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Json(request): Json<SetTpslRequest>,
) -> ApiResult<TpslReport> {
    let tpsl = TpslRequest {
        take_profit: leg_trigger("익절", request.tp_price, request.tp_percent)?,
        stop_loss: leg_trigger("손절", request.sl_price, request.sl_percent)?,
    };
    if tpsl.is_empty() {
        return Err(ApiError::BadRequest(
            "익절 또는 손절 레그를 하나 이상 지정해야 합니다".to_string(),
        ));
    }

    let (exchange, adapter) = state.adapter_for(&session, request.exchange).await?;

    let position = adapter
        .get_positions()
        .await?
        .into_iter()
        .find(|p| p.symbol == request.symbol)
        .ok_or_else(|| NormalizationError::PositionNotFound(request.symbol.clone()))?;

    let symbol_info = state.asset_cache.get_symbol(exchange, &request.symbol).await;

    let report =
        place_position_tpsl(adapter.as_ref(), &position, &tpsl, symbol_info.as_ref()).await?;

    if report.all_failed() {
        return Ok(Json(crate::error::Envelope {
            success: false,
            data: Some(report),
            error: Some("모든 TP/SL 레그가 거부되었습니다".to_string()),
        }));
    }
    Ok(ok(report))
}

/// POST /position/margin
async fn adjust_position_margin(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Json(request): Json<AdjustMarginRequest>,
) -> ApiResult<AdjustMarginResponse> {
    let (exchange, adapter) = state.adapter_for(&session, request.exchange).await?;
    adapter
        .update_position_margin(&request.symbol, request.amount, request.adjustment)
        .await?;

    Ok(ok(AdjustMarginResponse {
        exchange,
        symbol: request.symbol,
        amount: request.amount,
        adjustment: request.adjustment,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/positions", get(get_positions))
        .route("/position/tp-sl", post(set_position_tpsl))
        .route("/position/margin", post(adjust_position_margin))
}
