//! 현물 보유분 endpoint.
//!
//! 보유 자산별로 체결 내역에서 FIFO 비용 기준을 재구성하여 미실현
//! 손익을 붙입니다. 체결 내역에 보이지 않는 경로(입금 등)로 생긴
//! 보유분은 손익을 추정하지 않고 `basisKnown = false`로 표시됩니다.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use gateway_core::{ExchangeId, Side};
use gateway_execution::{CostBasisEngine, HoldingPnl, Trade};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::error::{ok, ApiError, ApiResult};
use crate::routes::account::ExchangeQuery;
use crate::session::SessionAuth;
use crate::state::AppState;

/// 체결 내역 조회 한도. FIFO 재구성에 충분한 범위입니다.
const FILL_HISTORY_LIMIT: u32 = 500;

/// 손익 계산에서 제외하는 견적/스테이블 자산.
const QUOTE_ASSETS: [&str; 4] = ["USDT", "USDC", "USD", "DAI"];

/// 현물 보유 항목.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotHolding {
    pub asset: String,
    pub free: Decimal,
    pub locked: Decimal,
    pub total: Decimal,
    /// 현재 가격 (시세를 얻지 못하면 None, 손익도 생략)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<HoldingPnl>,
}

/// GET /spot/holdings?exchange=
async fn get_spot_holdings(
    State(state): State<Arc<AppState>>,
    SessionAuth(session): SessionAuth,
    Query(query): Query<ExchangeQuery>,
) -> ApiResult<Vec<SpotHolding>> {
    let (exchange, adapter) = state.adapter_for(&session, query.exchange).await?;
    if !adapter.capabilities().spot_balances {
        return Err(ApiError::BadRequest(format!(
            "{} 거래소는 현물 잔고 조회를 지원하지 않습니다",
            exchange
        )));
    }

    let balances = adapter.get_spot_balances().await?;
    let mut holdings = Vec::new();

    for balance in balances {
        let total = balance.total();
        if total.is_zero() {
            continue;
        }

        // 견적 자산은 가격이 1이므로 손익 계산 대상이 아닙니다.
        if QUOTE_ASSETS.contains(&balance.asset.as_str()) {
            holdings.push(SpotHolding {
                asset: balance.asset,
                free: balance.free,
                locked: balance.locked,
                total,
                current_price: None,
                pnl: None,
            });
            continue;
        }

        let symbol = format!("{}USDT", balance.asset);
        let current_price = fresh_price(&state, exchange, adapter.as_ref(), &symbol).await;

        let pnl = match current_price {
            Some(price) => {
                let trades = asset_trades(adapter.as_ref(), &symbol).await;
                Some(CostBasisEngine::holding_pnl(&trades, total, price))
            }
            None => None,
        };

        holdings.push(SpotHolding {
            asset: balance.asset,
            free: balance.free,
            locked: balance.locked,
            total,
            current_price,
            pnl,
        });
    }

    Ok(ok(holdings))
}

/// 보유 자산의 체결 내역을 FIFO 원장 거래로 변환합니다.
/// 내역 조회 실패는 해당 자산의 비용 기준만 미상으로 만들고,
/// 전체 응답을 실패시키지 않습니다.
async fn asset_trades(
    adapter: &dyn gateway_exchange::ExchangeAdapter,
    symbol: &str,
) -> Vec<Trade> {
    match adapter.get_fills(Some(symbol), FILL_HISTORY_LIMIT).await {
        Ok(fills) => fills
            .into_iter()
            .map(|fill| Trade {
                is_buy: fill.side == Side::Buy,
                price: fill.price,
                quantity: fill.quantity,
                timestamp: fill.executed_at,
            })
            .collect(),
        Err(e) => {
            warn!(symbol, error = %e, "체결 내역 조회 실패, 비용 기준 미상 처리");
            Vec::new()
        }
    }
}

/// 시세 캐시 우선으로 현재 가격을 조회합니다.
async fn fresh_price(
    state: &AppState,
    exchange: ExchangeId,
    adapter: &dyn gateway_exchange::ExchangeAdapter,
    symbol: &str,
) -> Option<Decimal> {
    if let Some(ticker) = state.ticker_cache.get(exchange, symbol).await {
        return Some(ticker.price);
    }

    match adapter.get_ticker(symbol).await {
        Ok(ticker) => {
            let price = ticker.price;
            state.ticker_cache.insert(exchange, ticker).await;
            Some(price)
        }
        Err(e) => {
            warn!(symbol, error = %e, "시세 조회 실패, 손익 생략");
            None
        }
    }
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/spot/holdings", get(get_spot_holdings))
}
