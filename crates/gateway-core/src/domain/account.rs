//! 계좌 및 체결 타입.

use crate::domain::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 정규화된 파생상품 계좌 정보.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    /// 지갑 총 잔고 (USD)
    pub total_balance: Decimal,
    /// 주문에 사용 가능한 잔고 (USD)
    pub available_balance: Decimal,
    /// 포지션에 묶인 마진 (USD)
    pub margin_used: Decimal,
    /// 전체 미실현 손익 (USD)
    pub unrealized_pnl: Decimal,
}

/// 현물 자산 잔고.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotBalance {
    /// 자산 이름 (예: "BTC", "USDT")
    pub asset: String,
    /// 사용 가능한 잔고
    pub free: Decimal,
    /// 주문에 묶인 잔고
    pub locked: Decimal,
}

impl SpotBalance {
    /// 총 잔고 (사용 가능 + 묶인 잔고).
    pub fn total(&self) -> Decimal {
        self.free + self.locked
    }
}

/// 정규화된 체결 내역.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// 거래 심볼
    pub symbol: String,
    /// 체결 방향
    pub side: Side,
    /// 체결 가격
    pub price: Decimal,
    /// 체결 수량
    pub quantity: Decimal,
    /// 수수료
    pub fee: Decimal,
    /// 체결 시각
    pub executed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_spot_balance_total() {
        let balance = SpotBalance {
            asset: "BTC".to_string(),
            free: dec!(0.5),
            locked: dec!(0.1),
        };
        assert_eq!(balance.total(), dec!(0.6));
    }
}
