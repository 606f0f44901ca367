//! FIFO 비용 기준(Cost Basis) 손익 계산.
//!
//! 체결 내역 스트림에서 현물 보유분의 미실현 손익을 도출합니다.
//! 선입선출: 매도는 가장 오래된 매수 로트부터 소진하며, 로트 수량이
//! 매도 수량보다 크면 부분 소진합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// FIFO 원장의 거래 한 건.
#[derive(Debug, Clone)]
pub struct Trade {
    /// 매수 여부 (false = 매도)
    pub is_buy: bool,
    /// 체결 가격
    pub price: Decimal,
    /// 체결 수량
    pub quantity: Decimal,
    /// 체결 시각
    pub timestamp: DateTime<Utc>,
}

/// 매수 로트. 매도에 의해 오래된 것부터 소진됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotLot {
    /// 매수 가격
    pub price: Decimal,
    /// 남은 수량
    pub remaining_quantity: Decimal,
}

/// 보유분 손익 계산 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingPnl {
    /// 가중평균 매입가
    pub avg_cost: Decimal,
    /// 미실현 손익
    pub unrealized_pnl: Decimal,
    /// 미실현 손익률 (%)
    pub unrealized_pnl_pct: Decimal,
    /// 비용 기준을 알 수 있었는지 여부.
    ///
    /// false면 보유분이 이 원장에 보이는 거래가 아닌 경로(입금 등)로
    /// 생긴 것이며, 손익은 추정하지 않고 0으로 보고합니다.
    pub basis_known: bool,
}

impl HoldingPnl {
    fn unknown() -> Self {
        Self {
            avg_cost: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_pct: Decimal::ZERO,
            basis_known: false,
        }
    }
}

/// FIFO 비용 기준 엔진.
#[derive(Debug, Default)]
pub struct CostBasisEngine;

impl CostBasisEngine {
    /// 거래 내역에서 남은 매수 로트 큐를 구성합니다.
    ///
    /// 입력은 시간순이 아닐 수 있으며, 처리 전에 타임스탬프 오름차순으로
    /// 정렬합니다. 매수는 로트를 추가하고, 매도는 가장 오래된 로트부터
    /// 소진합니다. 원장에 없는 수량의 매도(입금분 매도 등)는 남은
    /// 초과분을 무시합니다.
    pub fn remaining_lots(trades: &[Trade]) -> VecDeque<SpotLot> {
        let mut sorted: Vec<&Trade> = trades.iter().collect();
        sorted.sort_by_key(|t| t.timestamp);

        let mut lots: VecDeque<SpotLot> = VecDeque::new();

        for trade in sorted {
            if trade.is_buy {
                lots.push_back(SpotLot {
                    price: trade.price,
                    remaining_quantity: trade.quantity,
                });
            } else {
                let mut remaining = trade.quantity;
                while remaining > Decimal::ZERO {
                    let Some(lot) = lots.front_mut() else {
                        // 원장 밖에서 취득한 수량의 매도. 추적 불가.
                        break;
                    };

                    let consumed = remaining.min(lot.remaining_quantity);
                    lot.remaining_quantity -= consumed;
                    remaining -= consumed;

                    if lot.remaining_quantity.is_zero() {
                        lots.pop_front();
                    }
                }
            }
        }

        lots
    }

    /// 현재 보유분의 미실현 손익을 계산합니다.
    ///
    /// 남은 로트 큐가 비어 있으면 (보유분이 거래가 아닌 입금 등으로 생긴
    /// 경우) 손익을 추정하지 않고 `basis_known = false`와 0을 보고합니다.
    pub fn holding_pnl(
        trades: &[Trade],
        holding_quantity: Decimal,
        current_price: Decimal,
    ) -> HoldingPnl {
        if holding_quantity.is_zero() {
            return HoldingPnl::unknown();
        }

        let lots = Self::remaining_lots(trades);
        let lot_quantity: Decimal = lots.iter().map(|l| l.remaining_quantity).sum();

        if lot_quantity.is_zero() {
            return HoldingPnl::unknown();
        }

        let lot_cost: Decimal = lots
            .iter()
            .map(|l| l.price * l.remaining_quantity)
            .sum();
        let avg_cost = lot_cost / lot_quantity;

        let cost_basis = holding_quantity * avg_cost;
        let unrealized_pnl = holding_quantity * current_price - cost_basis;
        let unrealized_pnl_pct = if cost_basis.is_zero() {
            Decimal::ZERO
        } else {
            unrealized_pnl / cost_basis * dec!(100)
        };

        HoldingPnl {
            avg_cost,
            unrealized_pnl,
            unrealized_pnl_pct,
            basis_known: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn trade(is_buy: bool, price: Decimal, quantity: Decimal, minutes_ago: i64) -> Trade {
        Trade {
            is_buy,
            price,
            quantity,
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_fifo_worked_example() {
        // buy 1@100, buy 1@120, sell 1@150 -> 남은 로트 1@120
        let trades = vec![
            trade(true, dec!(100), dec!(1), 30),
            trade(true, dec!(120), dec!(1), 20),
            trade(false, dec!(150), dec!(1), 10),
        ];

        let pnl = CostBasisEngine::holding_pnl(&trades, dec!(1), dec!(200));

        assert!(pnl.basis_known);
        assert_eq!(pnl.avg_cost, dec!(120));
        // (1*200) - (1*120) = 80
        assert_eq!(pnl.unrealized_pnl, dec!(80));
        // 80 / 120 * 100 ≈ 66.7%
        assert!(pnl.unrealized_pnl_pct > dec!(66.6) && pnl.unrealized_pnl_pct < dec!(66.7));
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        // 매도가 목록 앞에 있어도 타임스탬프 기준으로는 마지막
        let trades = vec![
            trade(false, dec!(150), dec!(1), 10),
            trade(true, dec!(120), dec!(1), 20),
            trade(true, dec!(100), dec!(1), 30),
        ];

        let lots = CostBasisEngine::remaining_lots(&trades);
        assert_eq!(
            lots,
            VecDeque::from([SpotLot {
                price: dec!(120),
                remaining_quantity: dec!(1),
            }])
        );
    }

    #[test]
    fn test_partial_lot_consumption() {
        // 2@100 매수 후 0.5 매도 -> 1.5@100 남음
        let trades = vec![
            trade(true, dec!(100), dec!(2), 30),
            trade(false, dec!(110), dec!(0.5), 10),
        ];

        let lots = CostBasisEngine::remaining_lots(&trades);
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].remaining_quantity, dec!(1.5));
    }

    #[test]
    fn test_sell_spans_multiple_lots() {
        let trades = vec![
            trade(true, dec!(100), dec!(1), 40),
            trade(true, dec!(110), dec!(1), 30),
            trade(true, dec!(120), dec!(1), 20),
            trade(false, dec!(130), dec!(1.5), 10),
        ];

        let lots = CostBasisEngine::remaining_lots(&trades);
        // 첫 로트 전체 + 두 번째 로트 절반 소진
        assert_eq!(lots.len(), 2);
        assert_eq!(lots[0].price, dec!(110));
        assert_eq!(lots[0].remaining_quantity, dec!(0.5));
        assert_eq!(lots[1].price, dec!(120));
    }

    #[test]
    fn test_transfer_holding_reports_zero() {
        // 거래 내역 없이 보유분만 존재 (입금). 추정하지 않음.
        let pnl = CostBasisEngine::holding_pnl(&[], dec!(2), dec!(50000));

        assert!(!pnl.basis_known);
        assert_eq!(pnl.unrealized_pnl, Decimal::ZERO);
        assert_eq!(pnl.avg_cost, Decimal::ZERO);
    }

    #[test]
    fn test_oversell_ignores_excess() {
        // 1 매수 후 3 매도 (2는 입금분). 로트만 소진하고 패닉 없음.
        let trades = vec![
            trade(true, dec!(100), dec!(1), 30),
            trade(false, dec!(150), dec!(3), 10),
        ];

        let lots = CostBasisEngine::remaining_lots(&trades);
        assert!(lots.is_empty());

        let pnl = CostBasisEngine::holding_pnl(&trades, dec!(1), dec!(200));
        assert!(!pnl.basis_known);
    }

    #[test]
    fn test_avg_cost_weighted_over_remaining_lots() {
        let trades = vec![
            trade(true, dec!(100), dec!(1), 30),
            trade(true, dec!(200), dec!(3), 20),
        ];

        let pnl = CostBasisEngine::holding_pnl(&trades, dec!(4), dec!(200));
        // (1*100 + 3*200) / 4 = 175
        assert_eq!(pnl.avg_cost, dec!(175));
        assert_eq!(pnl.unrealized_pnl, dec!(100));
    }

    proptest! {
        #[test]
        fn prop_remaining_lots_bounded_by_net_buys(
            ops in proptest::collection::vec(
                (any::<bool>(), 1u32..1000, 1u32..100),
                0..20,
            )
        ) {
            let base = Utc::now();
            let trades: Vec<Trade> = ops
                .iter()
                .enumerate()
                .map(|(i, (is_buy, price, quantity))| Trade {
                    is_buy: *is_buy,
                    price: Decimal::from(*price),
                    quantity: Decimal::from(*quantity),
                    timestamp: base + Duration::seconds(i as i64),
                })
                .collect();

            let lots = CostBasisEngine::remaining_lots(&trades);
            let remaining: Decimal = lots.iter().map(|l| l.remaining_quantity).sum();
            let buys: Decimal = trades.iter().filter(|t| t.is_buy).map(|t| t.quantity).sum();
            let sells: Decimal = trades.iter().filter(|t| !t.is_buy).map(|t| t.quantity).sum();

            // 남은 로트 합은 총 매수를 넘지 못하고, 매도가 로트 이상을
            // 소진할 수도 없습니다.
            prop_assert!(remaining >= Decimal::ZERO);
            prop_assert!(remaining <= buys);
            prop_assert!(remaining >= buys - sells);
            for lot in &lots {
                prop_assert!(lot.remaining_quantity > Decimal::ZERO);
            }
        }
    }
}
