//! 어댑터 팩토리.
//!
//! (userId, exchangeId)를 인증된 어댑터 인스턴스로 해석합니다.
//! 어댑터는 요청 간에 캐싱하지 않습니다. 호출마다의 작은 생성 비용을
//! 지불하는 대신, 자격증명 교체가 즉시 반영됩니다.

use gateway_core::{CredentialStore, ExchangeId};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::debug;

use crate::connector::{AsterAdapter, AsterConfig, HyperliquidAdapter, HyperliquidConfig};
use crate::traits::{ExchangeAdapter, ExchangeResult};

/// 거래소 어댑터 팩토리.
pub struct AdapterFactory {
    credential_store: Arc<dyn CredentialStore>,
}

impl AdapterFactory {
    pub fn new(credential_store: Arc<dyn CredentialStore>) -> Self {
        Self { credential_store }
    }

    /// 저장된 자격증명으로 인증된 어댑터를 생성합니다.
    ///
    /// 복호화된 자격증명은 이 호출 범위 안에서만 메모리에 존재합니다.
    /// 자격증명이 없으면 `CredentialError::NotFound`가 전파됩니다.
    pub async fn create_adapter(
        &self,
        user_id: i64,
        exchange: ExchangeId,
    ) -> ExchangeResult<Arc<dyn ExchangeAdapter>> {
        let creds = self.credential_store.load(user_id, exchange).await?;
        debug!(user_id, exchange = %exchange, "인증 어댑터 생성");

        let adapter: Arc<dyn ExchangeAdapter> = match exchange {
            ExchangeId::Aster => Arc::new(AsterAdapter::new(AsterConfig::new(
                creds.api_key.expose_secret(),
                creds.api_secret.expose_secret(),
            ))?),
            // 지갑 거래소는 슬롯 A = 개인키, 슬롯 B = 지갑 주소
            ExchangeId::Hyperliquid => Arc::new(HyperliquidAdapter::new(HyperliquidConfig::new(
                creds.api_key.expose_secret(),
                creds.api_secret.expose_secret(),
            ))?),
        };

        Ok(adapter)
    }

    /// 시장 데이터 전용 비인증 어댑터를 생성합니다.
    pub fn create_public_adapter(
        &self,
        exchange: ExchangeId,
    ) -> ExchangeResult<Arc<dyn ExchangeAdapter>> {
        let adapter: Arc<dyn ExchangeAdapter> = match exchange {
            ExchangeId::Aster => Arc::new(AsterAdapter::new(AsterConfig::public())?),
            ExchangeId::Hyperliquid => {
                Arc::new(HyperliquidAdapter::new(HyperliquidConfig::public())?)
            }
        };
        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExchangeError;
    use gateway_core::credential::{CredentialError, MemoryCredentialStore};
    use gateway_core::CredentialCipher;

    fn factory_with_store() -> (AdapterFactory, Arc<MemoryCredentialStore>) {
        let cipher = Arc::new(CredentialCipher::new("test-master-secret").unwrap());
        let store = Arc::new(MemoryCredentialStore::new(cipher));
        (AdapterFactory::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_missing_credentials_fail() {
        let (factory, _) = factory_with_store();
        let err = factory
            .create_adapter(1, ExchangeId::Aster)
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ExchangeError::Credential(CredentialError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_adapter_created_from_stored_credentials() {
        let (factory, store) = factory_with_store();
        store
            .store(1, ExchangeId::Aster, "key", "secret")
            .await
            .unwrap();

        let adapter = factory.create_adapter(1, ExchangeId::Aster).await.unwrap();
        assert_eq!(adapter.name(), "aster");
    }

    #[tokio::test]
    async fn test_credential_rotation_takes_effect() {
        // 어댑터를 캐싱하지 않으므로 교체 후 첫 생성부터 새 자격증명 사용
        let (factory, store) = factory_with_store();
        store
            .store(
                1,
                ExchangeId::Hyperliquid,
                "0x0123456789012345678901234567890123456789012345678901234567890123",
                "0xwallet",
            )
            .await
            .unwrap();

        let adapter = factory
            .create_adapter(1, ExchangeId::Hyperliquid)
            .await
            .unwrap();
        assert_eq!(adapter.name(), "hyperliquid");

        // 유효하지 않은 키로 교체하면 다음 생성이 실패해야 함
        store
            .store(1, ExchangeId::Hyperliquid, "not-a-key", "0xwallet")
            .await
            .unwrap();
        assert!(factory
            .create_adapter(1, ExchangeId::Hyperliquid)
            .await
            .is_err());
    }

    #[test]
    fn test_public_adapter_needs_no_credentials() {
        let (factory, _) = factory_with_store();
        let adapter = factory.create_public_adapter(ExchangeId::Aster).unwrap();
        assert_eq!(adapter.name(), "aster");
    }
}
