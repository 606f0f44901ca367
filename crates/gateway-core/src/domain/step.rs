//! 수량/가격 스텝 라운딩.
//!
//! 거래소는 심볼마다 고유한 수량 스텝과 가격 틱을 요구하며,
//! 스텝에 맞지 않는 값은 정밀도 위반으로 거부됩니다.

use crate::domain::SymbolInfo;
use rust_decimal::Decimal;

/// 라운딩 방법.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundMethod {
    /// 일반 반올림
    Round,
    /// 내림 (수량 라운딩 기본값 - 잔고 초과 방지)
    Floor,
    /// 올림
    Ceil,
}

/// 값을 스텝 크기의 배수로 라운딩합니다.
///
/// 스텝이 0이면 값을 그대로 반환합니다.
pub fn round_to_step(value: Decimal, step: Decimal, method: RoundMethod) -> Decimal {
    if step.is_zero() {
        return value;
    }

    let steps = value / step;
    let rounded = match method {
        RoundMethod::Round => steps.round(),
        RoundMethod::Floor => steps.floor(),
        RoundMethod::Ceil => steps.ceil(),
    };

    (rounded * step).normalize()
}

impl SymbolInfo {
    /// 수량을 이 심볼의 스텝 크기로 내림합니다.
    ///
    /// 수량은 항상 내림합니다. 올림하면 잔고나 포지션 크기를 초과할 수 있습니다.
    pub fn round_quantity(&self, quantity: Decimal) -> Decimal {
        round_to_step(quantity, self.quantity_step, RoundMethod::Floor)
    }

    /// 가격을 이 심볼의 틱 크기로 라운딩합니다.
    pub fn round_price(&self, price: Decimal, method: RoundMethod) -> Decimal {
        round_to_step(price, self.price_tick, method)
    }

    /// 수량이 스텝에 맞는지 검증합니다.
    pub fn is_valid_quantity(&self, quantity: Decimal) -> bool {
        self.quantity_step.is_zero() || (quantity % self.quantity_step).is_zero()
    }
}
