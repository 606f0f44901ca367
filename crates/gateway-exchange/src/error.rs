//! 거래소 에러 타입.

use gateway_core::credential::CredentialError;
use thiserror::Error;

/// 거래소 관련 에러.
///
/// 모든 거래소별 에러 코드는 어댑터 경계에서 이 분류로 매핑됩니다.
/// 원시 HTTP 응답이 이 경계를 넘어 전파되지 않습니다.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 인증/권한 에러
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 요청 한도 초과. 거래소가 알려주면 재시도 대기 시간 포함
    #[error("Rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    /// IP 차단 (요청 한도 반복 위반)
    #[error("IP banned by exchange")]
    IpBanned { retry_after_secs: Option<u64> },

    /// 주문 거부됨. 거래소 메시지와 전송한 정규화 파라미터를 함께 보존
    #[error("Order rejected: {message}")]
    OrderRejected { message: String, params: String },

    /// 가격 의존 변환에 필요한 신선한 데이터를 얻지 못함
    #[error("Stale market data for {symbol}: no fresh price available")]
    StaleData { symbol: String },

    /// 자격증명 없음/복호화 실패
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// 이 거래소가 지원하지 않는 기능
    #[error("Not supported by this exchange: {0}")]
    NotSupported(String),

    /// 심볼을 찾을 수 없음
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// 주문을 찾을 수 없음
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 매핑되지 않은 거래소 API 에러
    #[error("API error {code}: {message}")]
    Api { code: i32, message: String },
}

impl ExchangeError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExchangeError::Network(_)
                | ExchangeError::RateLimited { .. }
                | ExchangeError::Timeout(_)
                | ExchangeError::StaleData { .. }
        )
    }

    /// 권장 재시도 대기 시간(초) 반환.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            ExchangeError::RateLimited { retry_after_secs } => retry_after_secs.or(Some(60)),
            ExchangeError::IpBanned { retry_after_secs } => *retry_after_secs,
            ExchangeError::Network(_) => Some(1),
            ExchangeError::Timeout(_) => Some(1),
            _ => None,
        }
    }

    /// 재시도하면 안 되는 치명적 에러인지 확인.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExchangeError::Unauthorized(_)
                | ExchangeError::OrderRejected { .. }
                | ExchangeError::Credential(_)
                | ExchangeError::IpBanned { .. }
        )
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExchangeError::Timeout(err.to_string())
        } else if err.is_connect() {
            ExchangeError::Network(err.to_string())
        } else {
            ExchangeError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(err: serde_json::Error) -> Self {
        ExchangeError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ExchangeError::RateLimited { retry_after_secs: None }.is_retryable());
        assert!(ExchangeError::Network("refused".into()).is_retryable());
        assert!(!ExchangeError::Unauthorized("bad key".into()).is_retryable());
        assert!(!ExchangeError::OrderRejected {
            message: "margin".into(),
            params: "{}".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_rate_limit_retry_hint() {
        let err = ExchangeError::RateLimited { retry_after_secs: Some(30) };
        assert_eq!(err.retry_after_secs(), Some(30));

        let err = ExchangeError::RateLimited { retry_after_secs: None };
        assert_eq!(err.retry_after_secs(), Some(60));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(ExchangeError::IpBanned { retry_after_secs: None }.is_fatal());
        assert!(!ExchangeError::Timeout("slow".into()).is_fatal());
    }
}
