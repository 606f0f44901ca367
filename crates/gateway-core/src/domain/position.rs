//! 포지션 타입.
//!
//! 포지션은 파생 데이터입니다. 어떤 단일 기록자도 소유하지 않으며,
//! 읽을 때마다 거래소에서 새로 조회하고 요청 범위를 넘어 캐싱하지 않습니다.

use crate::domain::{MarginMode, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 정규화된 파생상품 포지션.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// 거래 심볼
    pub symbol: String,
    /// 부호 있는 포지션 크기 (양수 = 롱, 음수 = 숏)
    pub signed_size: Decimal,
    /// 평균 진입 가격
    pub entry_price: Decimal,
    /// 마크 가격
    pub mark_price: Decimal,
    /// 레버리지
    pub leverage: u32,
    /// 마진 모드
    pub margin_mode: MarginMode,
    /// 청산 가격 (거래소가 제공하지 않으면 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidation_price: Option<Decimal>,
    /// 미실현 손익
    pub unrealized_pnl: Decimal,
    /// 명목 가치 (|size| * mark_price)
    pub notional: Decimal,
}

impl Position {
    /// 포지션 방향.
    pub fn side(&self) -> Side {
        if self.signed_size >= Decimal::ZERO {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    /// 이 포지션을 청산하는 주문의 방향.
    pub fn closing_side(&self) -> Side {
        self.side().opposite()
    }

    /// 절대 수량.
    pub fn quantity(&self) -> Decimal {
        self.signed_size.abs()
    }

    pub fn is_long(&self) -> bool {
        self.signed_size > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.signed_size < Decimal::ZERO
    }
}
