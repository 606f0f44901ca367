//! API 에러 및 공통 응답 봉투.
//!
//! 모든 엔드포인트는 `{success, data?, error?}` 형태의 봉투로 응답합니다.
//! 내부 에러 분류는 여기서 HTTP 상태 코드로 접히며, 원시 거래소 응답이나
//! 암호문 내용은 절대 응답 본문에 노출되지 않습니다.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gateway_core::credential::CredentialError;
use gateway_exchange::ExchangeError;
use gateway_execution::NormalizationError;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::session::SessionError;

/// 공통 응답 봉투.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// 요청 성공 여부
    pub success: bool,
    /// 성공 시 페이로드
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// 실패 시 사람이 읽을 수 있는 에러 메시지
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// 성공 봉투 생성 헬퍼.
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope::ok(data))
}

/// API 핸들러 Result 타입.
pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// HTTP 경계에서의 에러 분류.
///
/// 모든 에러는 단일 요청 범위 안에서 회복됩니다. 한 거래소 호출의 실패가
/// 세션이나 자격증명 상태를 오염시키지 않습니다.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 세션 토큰 문제 (401/400)
    #[error(transparent)]
    Session(#[from] SessionError),

    /// 자격증명 없음/복호화 실패
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// 거래소 호출 실패
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// 주문 정규화 실패
    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    /// 요청 형식 오류
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    /// HTTP 상태 코드와 응답 메시지로 접습니다.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Session(e) => (e.status_code(), e.to_string()),
            ApiError::Credential(e) => credential_status(e),
            ApiError::Exchange(e) => exchange_status(e),
            ApiError::Normalization(e) => normalization_status(e),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

fn credential_status(e: &CredentialError) -> (StatusCode, String) {
    match e {
        CredentialError::NotFound { exchange, .. } => (
            StatusCode::NOT_FOUND,
            format!("거래소 연결이 필요합니다: {} 자격증명이 없습니다", exchange),
        ),
        // 암호문 내용이나 복호화 상세는 응답에 싣지 않습니다.
        CredentialError::Crypto(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "자격증명을 복호화할 수 없습니다. 거래소를 다시 연결하세요".to_string(),
        ),
        CredentialError::Storage(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "자격증명 저장소 오류".to_string(),
        ),
    }
}

fn exchange_status(e: &ExchangeError) -> (StatusCode, String) {
    match e {
        ExchangeError::RateLimited { .. } | ExchangeError::IpBanned { .. } => {
            let hint = e
                .retry_after_secs()
                .map(|s| format!(" ({}초 후 재시도)", s))
                .unwrap_or_default();
            (StatusCode::TOO_MANY_REQUESTS, format!("{}{}", e, hint))
        }
        ExchangeError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, e.to_string()),
        ExchangeError::OrderRejected { .. } | ExchangeError::NotSupported(_) => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        ExchangeError::SymbolNotFound(_) | ExchangeError::OrderNotFound(_) => {
            (StatusCode::NOT_FOUND, e.to_string())
        }
        ExchangeError::StaleData { .. } => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        ExchangeError::Credential(e) => credential_status(e),
        ExchangeError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, e.to_string()),
        ExchangeError::Network(_)
        | ExchangeError::Parse(_)
        | ExchangeError::Api { .. } => (StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

fn normalization_status(e: &NormalizationError) -> (StatusCode, String) {
    match e {
        NormalizationError::Intent(_) | NormalizationError::QuantityBelowStep { .. } => {
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        NormalizationError::SymbolNotFound(_) | NormalizationError::PositionNotFound(_) => {
            (StatusCode::NOT_FOUND, e.to_string())
        }
        NormalizationError::StaleData { .. } => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        NormalizationError::Exchange(e) => exchange_status(e),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            warn!(%status, error = %self, "요청 처리 실패");
        }
        (status, Json(Envelope::<()>::failure(message))).into_response()
    }
}
