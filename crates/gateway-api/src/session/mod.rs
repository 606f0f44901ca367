//! 세션 관리자.
//!
//! 불투명한 고엔트로피 토큰을 발급하여 사용자를 연결된 거래소 집합과
//! 하나의 활성 거래소에 바인딩합니다. 토큰 검증은 모든 상태 변경 HTTP
//! 작업의 유일한 인가 관문이며, 어댑터 생성보다 먼저 실행됩니다.
//!
//! 세션은 절대 타임스탬프로 만료됩니다. 만료된 세션은 조회 시 부재로
//! 취급하고 그 자리에서 제거합니다(lazy eviction). 백그라운드 정리는
//! 정확성이 아닌 메모리 위생용입니다.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, StatusCode};
use chrono::{DateTime, Duration, Utc};
use gateway_core::credential::CredentialError;
use gateway_core::{CredentialStore, ExchangeId};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// 세션 관련 에러.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Authorization 헤더 없음/형식 오류
    #[error("인증 토큰이 없습니다")]
    MissingToken,

    /// 알 수 없거나 만료된 토큰
    #[error("유효하지 않거나 만료된 세션입니다")]
    InvalidToken,

    /// 저장된 자격증명이 하나도 없는 사용자의 로그인 시도
    #[error("연결된 거래소가 없습니다. 먼저 거래소 자격증명을 등록하세요")]
    NoLinkedExchanges,

    /// 세션의 연결 집합에 없는 거래소로 전환 시도
    #[error("세션에 연결되지 않은 거래소입니다: {exchange}")]
    NotLinked { exchange: ExchangeId },

    /// 세션 생성 후 자격증명이 삭제된 거래소로 전환 시도
    #[error("자격증명이 더 이상 존재하지 않습니다: {exchange}")]
    CredentialRevoked { exchange: ExchangeId },

    /// 자격증명 저장소 접근 실패
    #[error("자격증명 저장소 오류")]
    Store(String),
}

impl SessionError {
    /// 이 에러에 해당하는 HTTP 상태 코드.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::MissingToken | SessionError::InvalidToken => StatusCode::UNAUTHORIZED,
            SessionError::NoLinkedExchanges
            | SessionError::NotLinked { .. }
            | SessionError::CredentialRevoked { .. } => StatusCode::BAD_REQUEST,
            SessionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 세션 레코드.
///
/// 불변식: `active_exchange ∈ linked_exchanges`. 거래소 전환은
/// `active_exchange`만 바꾸며 연결 집합에서 제거하지 않습니다.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// 불투명 토큰 (64자 hex)
    pub token: String,
    /// 사용자 ID
    pub user_id: i64,
    /// 자격증명이 저장된 거래소 집합 (비어 있지 않음)
    pub linked_exchanges: Vec<ExchangeId>,
    /// 현재 활성 거래소
    pub active_exchange: ExchangeId,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 만료 시각
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// 만료까지 남은 시간(초).
    pub fn expires_in_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// 세션 관리자.
pub struct SessionManager {
    credential_store: Arc<dyn CredentialStore>,
    sessions: RwLock<HashMap<String, SessionRecord>>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(credential_store: Arc<dyn CredentialStore>, ttl: Duration) -> Self {
        Self {
            credential_store,
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// 사용자의 세션을 생성합니다.
    ///
    /// 자격증명이 저장된 거래소를 열거하여 연결 집합을 만들고,
    /// `preferred`가 그 집합에 있으면 활성 거래소로, 아니면 첫 거래소를
    /// 활성으로 둡니다. 연결된 거래소가 없으면 실패합니다.
    pub async fn create(
        &self,
        user_id: i64,
        preferred: Option<ExchangeId>,
    ) -> Result<SessionRecord, SessionError> {
        let linked = self
            .credential_store
            .list_exchanges(user_id)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))?;

        let Some(first) = linked.first().copied() else {
            return Err(SessionError::NoLinkedExchanges);
        };

        let active = preferred.filter(|e| linked.contains(e)).unwrap_or(first);

        let now = Utc::now();
        let record = SessionRecord {
            token: generate_token(),
            user_id,
            linked_exchanges: linked,
            active_exchange: active,
            created_at: now,
            expires_at: now + self.ttl,
        };

        self.sessions
            .write()
            .await
            .insert(record.token.clone(), record.clone());
        info!(user_id, active = %active, linked = record.linked_exchanges.len(), "세션 생성");
        Ok(record)
    }

    /// 토큰으로 세션을 조회합니다. 만료된 세션은 부재로 취급하고
    /// 그 자리에서 제거합니다.
    pub async fn get(&self, token: &str) -> Option<SessionRecord> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                Some(record) if !record.is_expired() => return Some(record.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // 만료된 항목 제거 (읽기 락 해제 후)
        self.sessions.write().await.remove(token);
        None
    }

    /// 활성 거래소를 전환합니다.
    ///
    /// 대상 거래소가 연결 집합에 있어야 하고, 자격증명 저장소에서도
    /// 여전히 존재해야 합니다(세션 생성 후 폐기된 자격증명으로는 전환
    /// 불가). 어느 검증이든 실패하면 `active_exchange`는 변경되지 않습니다.
    pub async fn switch_exchange(
        &self,
        token: &str,
        exchange: ExchangeId,
    ) -> Result<SessionRecord, SessionError> {
        let record = self.get(token).await.ok_or(SessionError::InvalidToken)?;

        if !record.linked_exchanges.contains(&exchange) {
            return Err(SessionError::NotLinked { exchange });
        }

        // 인메모리 세션이 아니라 저장소 기준으로 재검증합니다.
        let still_linked = self
            .credential_store
            .list_exchanges(record.user_id)
            .await
            .map_err(|e| match e {
                CredentialError::Storage(msg) => SessionError::Store(msg),
                _ => SessionError::Store(e.to_string()),
            })?
            .contains(&exchange);

        if !still_linked {
            return Err(SessionError::CredentialRevoked { exchange });
        }

        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(token).ok_or(SessionError::InvalidToken)?;
        entry.active_exchange = exchange;
        debug!(user_id = entry.user_id, active = %exchange, "활성 거래소 전환");
        Ok(entry.clone())
    }

    /// 세션을 삭제합니다. 존재했으면 true를 반환합니다.
    pub async fn delete(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// 만료된 세션을 일괄 제거합니다. 메모리 위생용 백그라운드 작업에서
    /// 호출합니다.
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired());
        before - sessions.len()
    }
}

/// 32바이트 난수 토큰을 hex로 인코딩합니다.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// 베어러 토큰 인증 extractor.
///
/// `Authorization: Bearer <token>` 헤더를 검증하고 세션 레코드를
/// 핸들러에 주입합니다. 헤더 부재/무효 토큰은 401로 거부됩니다.
pub struct SessionAuth(pub SessionRecord);

impl FromRequestParts<Arc<AppState>> for SessionAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(SessionError::MissingToken)?;

        let record = state
            .sessions
            .get(token)
            .await
            .ok_or(SessionError::InvalidToken)?;

        Ok(SessionAuth(record))
    }
}
