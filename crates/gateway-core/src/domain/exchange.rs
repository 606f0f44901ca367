//! 거래소 식별자 및 자격증명 종류.

use serde::{Deserialize, Serialize};

/// 지원 거래소 식별자.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeId {
    /// Aster - API 키 기반 선물 거래소 (Binance 선물 호환 REST)
    Aster,
    /// Hyperliquid - 지갑 서명 기반 온체인 거래소
    Hyperliquid,
}

impl ExchangeId {
    /// 모든 지원 거래소 목록.
    pub const ALL: [ExchangeId; 2] = [ExchangeId::Aster, ExchangeId::Hyperliquid];

    /// 소문자 식별자 문자열 반환.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Aster => "aster",
            ExchangeId::Hyperliquid => "hyperliquid",
        }
    }

    /// 이 거래소가 요구하는 자격증명 종류.
    pub fn credential_kind(&self) -> CredentialKind {
        match self {
            ExchangeId::Aster => CredentialKind::ApiKey,
            ExchangeId::Hyperliquid => CredentialKind::Wallet,
        }
    }
}

impl std::fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExchangeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aster" => Ok(ExchangeId::Aster),
            "hyperliquid" => Ok(ExchangeId::Hyperliquid),
            _ => Err(format!("지원하지 않는 거래소: {}", s)),
        }
    }
}

/// 자격증명 종류.
///
/// 자격증명 저장소의 두 슬롯은 거래소 종류에 따라 의미가 다릅니다:
/// - `ApiKey`: (api key, api secret)
/// - `Wallet`: (지갑 개인키, 지갑 주소)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    ApiKey,
    Wallet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_id_parse() {
        assert_eq!("aster".parse::<ExchangeId>().unwrap(), ExchangeId::Aster);
        assert_eq!(
            "Hyperliquid".parse::<ExchangeId>().unwrap(),
            ExchangeId::Hyperliquid
        );
        assert!("mexc".parse::<ExchangeId>().is_err());
    }

    #[test]
    fn test_credential_kind() {
        assert_eq!(ExchangeId::Aster.credential_kind(), CredentialKind::ApiKey);
        assert_eq!(
            ExchangeId::Hyperliquid.credential_kind(),
            CredentialKind::Wallet
        );
    }
}
