//! 모든 핸들러에서 공유되는 애플리케이션 상태.

use chrono::{DateTime, Duration, Utc};
use gateway_core::{CredentialStore, ExchangeId};
use gateway_exchange::{AdapterFactory, AssetCache, ExchangeAdapter, TickerCache};
use gateway_execution::OrderNormalizer;
use std::sync::Arc;

use crate::error::ApiError;
use crate::session::{SessionError, SessionManager, SessionRecord};

/// 애플리케이션 공유 상태.
///
/// `Arc`로 래핑되어 Axum의 State extractor를 통해 핸들러에 주입됩니다.
/// 요청 간 공유되는 가변 상태는 세션 맵과 시장 데이터 캐시뿐입니다.
pub struct AppState {
    /// 자격증명 저장소 (암호화된 블롭만 저장)
    pub credential_store: Arc<dyn CredentialStore>,

    /// 거래소 어댑터 팩토리 (어댑터는 요청 간 캐싱하지 않음)
    pub factory: AdapterFactory,

    /// 세션 관리자
    pub sessions: SessionManager,

    /// 시세 캐시 (TTL 30초)
    pub ticker_cache: Arc<TickerCache>,

    /// 심볼 메타데이터 캐시 (TTL 10분)
    pub asset_cache: Arc<AssetCache>,

    /// 주문 정규화 엔진
    pub normalizer: OrderNormalizer,

    /// 서버 시작 시각 (업타임 계산용)
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(credential_store: Arc<dyn CredentialStore>, session_ttl: Duration) -> Self {
        let ticker_cache = Arc::new(TickerCache::default());
        let asset_cache = Arc::new(AssetCache::default());

        Self {
            factory: AdapterFactory::new(credential_store.clone()),
            sessions: SessionManager::new(credential_store.clone(), session_ttl),
            normalizer: OrderNormalizer::new(ticker_cache.clone(), asset_cache.clone()),
            credential_store,
            ticker_cache,
            asset_cache,
            started_at: Utc::now(),
        }
    }

    /// 요청이 대상으로 하는 거래소를 결정합니다.
    ///
    /// `?exchange=` 파라미터가 있으면 그 거래소(세션에 연결되어 있어야 함),
    /// 없으면 세션의 활성 거래소입니다.
    pub fn resolve_exchange(
        &self,
        session: &SessionRecord,
        requested: Option<ExchangeId>,
    ) -> Result<ExchangeId, ApiError> {
        match requested {
            Some(exchange) if session.linked_exchanges.contains(&exchange) => Ok(exchange),
            Some(exchange) => Err(SessionError::NotLinked { exchange }.into()),
            None => Ok(session.active_exchange),
        }
    }

    /// 세션 기준으로 인증된 어댑터를 생성합니다.
    pub async fn adapter_for(
        &self,
        session: &SessionRecord,
        requested: Option<ExchangeId>,
    ) -> Result<(ExchangeId, Arc<dyn ExchangeAdapter>), ApiError> {
        let exchange = self.resolve_exchange(session, requested)?;
        let adapter = self.factory.create_adapter(session.user_id, exchange).await?;
        Ok((exchange, adapter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::credential::MemoryCredentialStore;
    use gateway_core::CredentialCipher;

    async fn state_with_session() -> (AppState, SessionRecord) {
        let cipher = Arc::new(CredentialCipher::new("test-master-secret").unwrap());
        let store = Arc::new(MemoryCredentialStore::new(cipher));
        store
            .store(1, ExchangeId::Aster, "key", "secret")
            .await
            .unwrap();

        let state = AppState::new(store, Duration::hours(24));
        let session = state.sessions.create(1, None).await.unwrap();
        (state, session)
    }

    #[tokio::test]
    async fn test_resolve_defaults_to_active_exchange() {
        let (state, session) = state_with_session().await;
        let exchange = state.resolve_exchange(&session, None).unwrap();
        assert_eq!(exchange, ExchangeId::Aster);
    }

    #[tokio::test]
    async fn test_resolve_rejects_unlinked_override() {
        let (state, session) = state_with_session().await;
        let err = state
            .resolve_exchange(&session, Some(ExchangeId::Hyperliquid))
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Session(SessionError::NotLinked { .. })
        ));
    }
}
