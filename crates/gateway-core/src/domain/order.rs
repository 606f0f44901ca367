//! 주문 타입 및 정규화된 주문 의도.
//!
//! 이 모듈은 게이트웨이의 주문 관련 타입을 정의합니다:
//! - `Side` - 주문 방향 (매수/매도)
//! - `OrderType` - 주문 유형 (시장가, 지정가, 트리거 주문)
//! - `MarginMode` - 마진 모드 (교차/격리)
//! - `Sizing` - 단위 불문 주문 크기 지정 방식
//! - `OrderIntent` - 정규화 엔진의 입력
//! - `OrderParams` - 정규화 엔진의 출력 (어댑터가 받는 네이티브 파라미터)
//! - `OrderResult` - 거래소 응답의 정규화된 형태

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 주문 방향 (매수 또는 매도).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

impl Side {
    /// 반대 방향을 반환합니다.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// 주문 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 시장가 주문
    Market,
    /// 지정가 주문
    Limit,
    /// 손절 시장가 주문 (트리거 도달 시 시장가 체결)
    StopMarket,
    /// 손절 지정가 주문
    StopLimit,
    /// 익절 시장가 주문
    TakeProfitMarket,
    /// 익절 지정가 주문
    TakeProfitLimit,
}

impl OrderType {
    /// 트리거 가격이 필요한 주문인지 확인합니다.
    pub fn requires_trigger(&self) -> bool {
        matches!(
            self,
            OrderType::StopMarket
                | OrderType::StopLimit
                | OrderType::TakeProfitMarket
                | OrderType::TakeProfitLimit
        )
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::StopMarket => write!(f, "STOP_MARKET"),
            OrderType::StopLimit => write!(f, "STOP_LIMIT"),
            OrderType::TakeProfitMarket => write!(f, "TAKE_PROFIT_MARKET"),
            OrderType::TakeProfitLimit => write!(f, "TAKE_PROFIT_LIMIT"),
        }
    }
}

/// 마진 모드.
///
/// 거래소별 어휘("CROSSED", "cross", "isolated" 등)는 어댑터 경계에서
/// 이 두 값으로 접힙니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarginMode {
    /// 교차 마진 - 전체 포지션이 마진을 공유
    Cross,
    /// 격리 마진 - 포지션별로 마진이 분리
    Isolated,
}

impl std::str::FromStr for MarginMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CROSS" | "CROSSED" => Ok(MarginMode::Cross),
            "ISOLATED" => Ok(MarginMode::Isolated),
            _ => Err(format!("알 수 없는 마진 모드: {}", s)),
        }
    }
}

impl std::fmt::Display for MarginMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarginMode::Cross => write!(f, "CROSS"),
            MarginMode::Isolated => write!(f, "ISOLATED"),
        }
    }
}

/// 격리 마진 조정 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarginAdjustment {
    /// 마진 추가
    Add,
    /// 마진 회수
    Remove,
}

/// 단위 불문 주문 크기 지정 방식.
///
/// 정확히 하나의 방식만 지정할 수 있습니다. enum이므로 타입 수준에서
/// 보장되며, HTTP 요청의 선택 필드들은 [`Sizing::from_options`]로 검증됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sizing {
    /// 기초 자산 수량 (예: 0.002 BTC)
    BaseQuantity(Decimal),
    /// USD 명목 금액 (예: $100)
    UsdNotional(Decimal),
    /// 사용 가능 마진 대비 비율 (%)
    PercentOfMargin(Decimal),
    /// 진입가 대비 비율 (%) - TP/SL 전용
    PercentFromEntry(Decimal),
}

/// 주문 의도 구성 에러.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("주문 크기가 지정되지 않았습니다")]
    NoSizing,

    #[error("주문 크기 지정 방식이 {0}개입니다 (정확히 1개 필요)")]
    MultipleSizing(usize),

    #[error("{0} 주문에는 트리거 가격이 필요합니다")]
    MissingTriggerPrice(OrderType),

    #[error("지정가 주문에는 가격이 필요합니다")]
    MissingLimitPrice,
}

impl Sizing {
    /// HTTP 요청의 선택 필드들에서 크기 지정 방식을 구성합니다.
    ///
    /// 정확히 하나의 필드만 설정되어야 하며, 0개 또는 2개 이상이면
    /// `IntentError`를 반환합니다.
    pub fn from_options(
        base_quantity: Option<Decimal>,
        usd_notional: Option<Decimal>,
        percent_of_margin: Option<Decimal>,
        percent_from_entry: Option<Decimal>,
    ) -> Result<Self, IntentError> {
        let candidates: Vec<Sizing> = [
            base_quantity.map(Sizing::BaseQuantity),
            usd_notional.map(Sizing::UsdNotional),
            percent_of_margin.map(Sizing::PercentOfMargin),
            percent_from_entry.map(Sizing::PercentFromEntry),
        ]
        .into_iter()
        .flatten()
        .collect();

        match candidates.len() {
            0 => Err(IntentError::NoSizing),
            1 => Ok(candidates[0]),
            n => Err(IntentError::MultipleSizing(n)),
        }
    }
}

/// 단위 불문 주문 의도.
///
/// 정규화 엔진의 입력입니다. 어떤 거래소로 나갈지와 무관하게
/// 프런트엔드가 표현하는 그대로의 주문입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    /// 거래 심볼 (정규화된 형태, 예: "BTCUSDT")
    pub symbol: String,
    /// 주문 방향
    pub side: Side,
    /// 주문 유형
    pub order_type: OrderType,
    /// 크기 지정 방식 (정확히 하나)
    pub sizing: Sizing,
    /// 지정가 (지정가 주문에 필수)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// 트리거 가격 (트리거 주문용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<Decimal>,
    /// 포지션 축소 전용 여부
    #[serde(default)]
    pub reduce_only: bool,
    /// 주문 전 적용할 레버리지
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leverage: Option<u32>,
    /// 주문 전 적용할 마진 모드
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_mode: Option<MarginMode>,
}

impl OrderIntent {
    /// 크기 지정 외의 구조적 제약을 검증합니다.
    pub fn validate(&self) -> Result<(), IntentError> {
        if self.order_type == OrderType::Limit && self.price.is_none() {
            return Err(IntentError::MissingLimitPrice);
        }
        if self.order_type.requires_trigger()
            && self.trigger_price.is_none()
            && !matches!(self.sizing, Sizing::PercentFromEntry(_))
        {
            // PercentFromEntry는 정규화 단계에서 트리거 가격을 합성함
            return Err(IntentError::MissingTriggerPrice(self.order_type));
        }
        Ok(())
    }
}

/// 어댑터가 받는 네이티브 주문 파라미터.
///
/// 정규화 엔진의 출력으로, 수량은 이미 심볼의 스텝 크기로 라운딩되어 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderParams {
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    /// 기초 자산 수량. close_position이 true면 반드시 None
    /// (수량과 전체 청산 플래그를 함께 보내면 거래소 검증 오류).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<Decimal>,
    #[serde(default)]
    pub reduce_only: bool,
    /// 전체 포지션 청산 플래그 (거래소의 closePosition 상당)
    #[serde(default)]
    pub close_position: bool,
}

/// 주문 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Expired,
}

impl OrderState {
    /// 주문이 여전히 활성 상태인지 확인합니다.
    pub fn is_active(&self) -> bool {
        matches!(self, OrderState::New | OrderState::PartiallyFilled)
    }
}

/// 거래소 응답의 정규화된 주문 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    /// 거래소 주문 ID
    pub order_id: String,
    /// 거래 심볼
    pub symbol: String,
    /// 주문 방향
    pub side: Side,
    /// 주문 유형
    pub order_type: OrderType,
    /// 현재 상태
    pub state: OrderState,
    /// 주문 수량 (전체 청산 주문이면 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    /// 체결된 수량
    pub executed_quantity: Decimal,
    /// 지정가 (있는 경우)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// 평균 체결 가격 (체결이 있는 경우)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_price: Option<Decimal>,
    /// 축소 전용 여부
    #[serde(default)]
    pub reduce_only: bool,
    /// 주문 시각
    pub created_at: DateTime<Utc>,
}

/// TP/SL 단일 레그 제출 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LegOutcome {
    /// 주문 접수됨
    Placed { order_id: String },
    /// 거래소가 거부함 (원문 메시지 포함)
    Failed { message: String },
}

impl LegOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, LegOutcome::Placed { .. })
    }
}

/// TP/SL 두 레그 제출 보고.
///
/// 거래소에는 원자적 멀티 주문 프리미티브가 없으므로, 한 레그만 성공한
/// 경우에도 롤백하지 않고 양쪽 결과를 그대로 보고합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpslReport {
    /// 익절 레그 결과 (요청하지 않았으면 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit: Option<LegOutcome>,
    /// 손절 레그 결과 (요청하지 않았으면 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<LegOutcome>,
}

impl TpslReport {
    /// 한 레그만 성공했는지 확인합니다.
    pub fn is_partial_failure(&self) -> bool {
        let placed = self.placed_count();
        let requested = self.requested_count();
        placed > 0 && placed < requested
    }

    /// 요청한 모든 레그가 실패했는지 확인합니다.
    pub fn all_failed(&self) -> bool {
        self.requested_count() > 0 && self.placed_count() == 0
    }

    fn requested_count(&self) -> usize {
        self.take_profit.iter().count() + self.stop_loss.iter().count()
    }

    fn placed_count(&self) -> usize {
        [&self.take_profit, &self.stop_loss]
            .into_iter()
            .flatten()
            .filter(|leg| leg.is_placed())
            .count()
    }
}

/// 전체 주문 취소 보고.
///
/// 벌크 취소 엔드포인트가 없는 거래소에서는 주문별 개별 취소 호출을
/// 수행하며, 주문별 성공/실패를 그대로 보고합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelAllReport {
    /// 취소된 주문 ID 목록
    pub cancelled: Vec<String>,
    /// 취소 실패 (주문 ID, 사유)
    pub failed: Vec<(String, String)>,
}

impl CancelAllReport {
    pub fn total(&self) -> usize {
        self.cancelled.len() + self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sizing_exactly_one() {
        let sizing = Sizing::from_options(Some(dec!(0.5)), None, None, None).unwrap();
        assert_eq!(sizing, Sizing::BaseQuantity(dec!(0.5)));
    }

    #[test]
    fn test_sizing_none_rejected() {
        assert_eq!(
            Sizing::from_options(None, None, None, None),
            Err(IntentError::NoSizing)
        );
    }

    #[test]
    fn test_sizing_multiple_rejected() {
        assert_eq!(
            Sizing::from_options(Some(dec!(1)), Some(dec!(100)), None, None),
            Err(IntentError::MultipleSizing(2))
        );
        assert_eq!(
            Sizing::from_options(Some(dec!(1)), Some(dec!(100)), Some(dec!(50)), None),
            Err(IntentError::MultipleSizing(3))
        );
    }

    #[test]
    fn test_intent_limit_requires_price() {
        let intent = OrderIntent {
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            sizing: Sizing::BaseQuantity(dec!(1)),
            price: None,
            trigger_price: None,
            reduce_only: false,
            leverage: None,
            margin_mode: None,
        };
        assert_eq!(intent.validate(), Err(IntentError::MissingLimitPrice));
    }

    #[test]
    fn test_intent_trigger_synthesized_from_percent() {
        // PercentFromEntry는 트리거 가격이 없어도 정규화 단계에서 합성되므로 통과
        let intent = OrderIntent {
            symbol: "BTCUSDT".to_string(),
            side: Side::Sell,
            order_type: OrderType::TakeProfitMarket,
            sizing: Sizing::PercentFromEntry(dec!(10)),
            price: None,
            trigger_price: None,
            reduce_only: true,
            leverage: None,
            margin_mode: None,
        };
        assert!(intent.validate().is_ok());
    }

    #[test]
    fn test_tpsl_report_partial() {
        let report = TpslReport {
            take_profit: Some(LegOutcome::Placed {
                order_id: "1".to_string(),
            }),
            stop_loss: Some(LegOutcome::Failed {
                message: "insufficient margin".to_string(),
            }),
        };
        assert!(report.is_partial_failure());
        assert!(!report.all_failed());
    }

    #[test]
    fn test_tpsl_report_single_leg_success() {
        let report = TpslReport {
            take_profit: Some(LegOutcome::Placed {
                order_id: "1".to_string(),
            }),
            stop_loss: None,
        };
        assert!(!report.is_partial_failure());
        assert!(!report.all_failed());
    }

    #[test]
    fn test_margin_mode_folding() {
        assert_eq!("CROSSED".parse::<MarginMode>().unwrap(), MarginMode::Cross);
        assert_eq!("cross".parse::<MarginMode>().unwrap(), MarginMode::Cross);
        assert_eq!(
            "isolated".parse::<MarginMode>().unwrap(),
            MarginMode::Isolated
        );
        assert!("portfolio".parse::<MarginMode>().is_err());
    }
}
