//! # Gateway Execution
//!
//! 주문 정규화 엔진, TP/SL 가격 합성, FIFO 비용 기준 손익 계산을 제공합니다.
//!
//! 모든 진입점은 이 크레이트의 단일 구현을 거칩니다. 특히 TP/SL 부호
//! 규칙과 USD→수량 변환은 호출 지점마다 중복 구현하지 않습니다.

pub mod cost_basis;
pub mod normalize;
pub mod tpsl;

pub use cost_basis::{CostBasisEngine, HoldingPnl, SpotLot, Trade};
pub use normalize::{NormalizationError, OrderNormalizer};
pub use tpsl::{place_position_tpsl, trigger_price_from_percent, TpslRequest, TpslTrigger};
