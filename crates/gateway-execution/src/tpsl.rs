//! TP/SL 가격 합성 및 두 레그 제출.
//!
//! 진입가 대비 퍼센트에서 트리거 가격을 만드는 부호 규칙은 시스템 전체에서
//! 이 모듈의 단일 함수만 사용합니다. 호출 지점마다 재구현하면 부호가
//! 어긋나기 쉬운, 가장 실수하기 좋은 부분입니다.

use gateway_core::{
    LegOutcome, OrderParams, OrderType, Position, RoundMethod, Side, SymbolInfo, TpslReport,
};
use gateway_exchange::{ExchangeAdapter, ExchangeResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// 진입가와 청산 방향, 부호 있는 퍼센트에서 트리거 가격을 계산합니다.
///
/// 부호 규칙:
/// - 청산 방향이 SELL(현재 롱): `entry * (1 + pct/100)`
///   (+10% 익절 -> 진입가 위, -5% 손절 -> 진입가 아래)
/// - 청산 방향이 BUY(현재 숏): `entry * (1 - pct/100)`
///   (+10% 익절 -> 진입가 아래, -5% 손절 -> 진입가 위)
pub fn trigger_price_from_percent(
    entry_price: Decimal,
    closing_side: Side,
    percent: Decimal,
) -> Decimal {
    let ratio = percent / dec!(100);
    match closing_side {
        Side::Sell => entry_price * (Decimal::ONE + ratio),
        Side::Buy => entry_price * (Decimal::ONE - ratio),
    }
}

/// TP/SL 레그의 트리거 지정 방식.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TpslTrigger {
    /// 절대 트리거 가격
    Price(Decimal),
    /// 진입가 대비 부호 있는 퍼센트
    PercentFromEntry(Decimal),
}

/// 포지션 전체에 대한 TP/SL 설정 요청.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpslRequest {
    /// 익절 레그 (없으면 생략)
    pub take_profit: Option<TpslTrigger>,
    /// 손절 레그 (없으면 생략)
    pub stop_loss: Option<TpslTrigger>,
}

impl TpslRequest {
    pub fn is_empty(&self) -> bool {
        self.take_profit.is_none() && self.stop_loss.is_none()
    }
}

fn resolve_trigger(
    trigger: TpslTrigger,
    position: &Position,
    symbol_info: Option<&SymbolInfo>,
) -> Decimal {
    let price = match trigger {
        TpslTrigger::Price(price) => price,
        TpslTrigger::PercentFromEntry(pct) => {
            trigger_price_from_percent(position.entry_price, position.closing_side(), pct)
        }
    };

    match symbol_info {
        Some(info) => info.round_price(price, RoundMethod::Round),
        None => price,
    }
}

/// 전체 청산 TP/SL 주문 파라미터를 만듭니다.
///
/// 수량 필드는 비웁니다. 전체 청산 플래그와 수량을 함께 보내면
/// 거래소 검증 오류입니다.
fn close_position_params(
    position: &Position,
    order_type: OrderType,
    trigger_price: Decimal,
) -> OrderParams {
    OrderParams {
        symbol: position.symbol.clone(),
        side: position.closing_side(),
        order_type,
        quantity: None,
        price: None,
        trigger_price: Some(trigger_price),
        reduce_only: true,
        close_position: true,
    }
}

async fn submit_leg(
    adapter: &dyn ExchangeAdapter,
    position: &Position,
    order_type: OrderType,
    trigger_price: Decimal,
) -> LegOutcome {
    let params = close_position_params(position, order_type, trigger_price);
    match adapter.place_order(&params).await {
        Ok(result) => LegOutcome::Placed {
            order_id: result.order_id,
        },
        Err(e) => LegOutcome::Failed {
            message: e.to_string(),
        },
    }
}

/// 포지션에 TP/SL을 설정합니다.
///
/// 거래소에 원자적 멀티 주문 프리미티브가 없으므로 두 레그를 순차
/// 제출합니다. 한 레그가 실패해도 다른 레그를 롤백하지 않으며,
/// 양쪽 결과를 [`TpslReport`]로 구분해 보고합니다.
pub async fn place_position_tpsl(
    adapter: &dyn ExchangeAdapter,
    position: &Position,
    request: &TpslRequest,
    symbol_info: Option<&SymbolInfo>,
) -> ExchangeResult<TpslReport> {
    let mut report = TpslReport {
        take_profit: None,
        stop_loss: None,
    };

    if let Some(trigger) = request.take_profit {
        let price = resolve_trigger(trigger, position, symbol_info);
        info!(symbol = %position.symbol, %price, "익절 주문 제출");
        report.take_profit =
            Some(submit_leg(adapter, position, OrderType::TakeProfitMarket, price).await);
    }

    if let Some(trigger) = request.stop_loss {
        let price = resolve_trigger(trigger, position, symbol_info);
        info!(symbol = %position.symbol, %price, "손절 주문 제출");
        report.stop_loss = Some(submit_leg(adapter, position, OrderType::StopMarket, price).await);
    }

    if report.is_partial_failure() {
        warn!(symbol = %position.symbol, "TP/SL 부분 실패: 한 레그만 접수됨");
    }

    Ok(report)
}
