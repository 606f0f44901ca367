//! 시장 데이터 타입.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 정규화된 24시간 시세.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticker {
    /// 거래 심볼
    pub symbol: String,
    /// 최근 체결 가격
    pub price: Decimal,
    /// 24시간 변동률 (%)
    pub change_24h_pct: Decimal,
    /// 24시간 고가
    pub high_24h: Decimal,
    /// 24시간 저가
    pub low_24h: Decimal,
    /// 24시간 거래량 (기초 자산)
    pub volume_24h: Decimal,
}

/// 심볼 거래 규칙 메타데이터.
///
/// 수량 스텝과 가격 틱은 거래소마다 다르며, 정규화 엔진이 주문 파라미터를
/// 라운딩할 때 사용합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// 거래 심볼
    pub symbol: String,
    /// 기초 자산 (예: "BTC")
    pub base_asset: String,
    /// 견적 자산 (예: "USDT")
    pub quote_asset: String,
    /// 수량 스텝 크기 (예: 0.001)
    pub quantity_step: Decimal,
    /// 가격 틱 크기 (예: 0.1)
    pub price_tick: Decimal,
    /// 최소 명목 금액 (거래소가 요구하는 경우)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_notional: Option<Decimal>,
}

/// 호가창 레벨.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookLevel {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// 호가창 스냅샷.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: String,
    /// 매수 호가 (가격 내림차순)
    pub bids: Vec<OrderBookLevel>,
    /// 매도 호가 (가격 오름차순)
    pub asks: Vec<OrderBookLevel>,
    pub fetched_at: DateTime<Utc>,
}

/// 캔들스틱.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// 캔들 타임프레임.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// 거래소 인터벌 문자열 반환 (Binance 호환 표기).
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            _ => Err(format!("지원하지 않는 타임프레임: {}", s)),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_roundtrip() {
        for tf in ["1m", "5m", "15m", "1h", "4h", "1d"] {
            assert_eq!(tf.parse::<Timeframe>().unwrap().as_str(), tf);
        }
        assert!("3w".parse::<Timeframe>().is_err());
    }
}
