//! 자격증명 저장소 계약.
//!
//! API 키와 시크릿은 저장 시 항상 암호화되며, 어댑터 생성 시점에만
//! 복호화됩니다. 복호화된 자격증명은 로그나 응답 본문에 절대 노출되지 않습니다.

use crate::crypto::CryptoError;
use crate::domain::ExchangeId;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::crypto::CredentialCipher;

/// 자격증명 관련 에러.
#[derive(Error, Debug)]
pub enum CredentialError {
    /// 해당 사용자/거래소 조합의 자격증명 없음
    #[error("자격증명을 찾을 수 없습니다: user={user_id}, exchange={exchange}")]
    NotFound { user_id: i64, exchange: ExchangeId },

    /// 암호화/복호화 실패
    #[error("자격증명 암호화 오류: {0}")]
    Crypto(#[from] CryptoError),

    /// 저장소 접근 실패
    #[error("자격증명 저장소 오류: {0}")]
    Storage(String),
}

/// 복호화된 자격증명 쌍.
///
/// `Debug` 출력에서 시크릿을 가립니다. 직렬화를 구현하지 않으므로
/// 응답 본문에 실수로 포함될 수 없습니다.
pub struct DecryptedCredentials {
    /// API 키 또는 지갑 주소
    pub api_key: SecretString,
    /// API 시크릿 또는 지갑 개인키
    pub api_secret: SecretString,
}

impl DecryptedCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            api_secret: SecretString::from(api_secret.into()),
        }
    }
}

impl std::fmt::Debug for DecryptedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedCredentials")
            .field("api_key", &"***")
            .field("api_secret", &"***")
            .finish()
    }
}

/// 자격증명 저장소 계약.
///
/// 구현체는 암호화된 블롭만 저장해야 하며, `load`는 복호화된
/// 자격증명을 반환합니다. 복호화 실패는 평문 폴백 없이 에러로
/// 전파됩니다 (fail-closed).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// 자격증명을 암호화하여 저장합니다. 기존 항목은 덮어씁니다.
    async fn store(
        &self,
        user_id: i64,
        exchange: ExchangeId,
        api_key: &str,
        api_secret: &str,
    ) -> Result<(), CredentialError>;

    /// 자격증명을 복호화하여 반환합니다.
    async fn load(
        &self,
        user_id: i64,
        exchange: ExchangeId,
    ) -> Result<DecryptedCredentials, CredentialError>;

    /// 사용자가 자격증명을 등록한 거래소 목록을 반환합니다.
    async fn list_exchanges(&self, user_id: i64) -> Result<Vec<ExchangeId>, CredentialError>;

    /// 자격증명을 삭제합니다. 없으면 `NotFound`를 반환합니다.
    async fn remove(&self, user_id: i64, exchange: ExchangeId) -> Result<(), CredentialError>;
}

/// 인메모리 자격증명 저장소.
///
/// 테스트 및 데이터베이스 없는 단일 프로세스 배포용. 암호화된 블롭을
/// 저장하므로 영속 구현체와 동일한 암호화 경로를 거칩니다.
pub struct MemoryCredentialStore {
    cipher: Arc<CredentialCipher>,
    entries: RwLock<HashMap<(i64, ExchangeId), StoredEntry>>,
}

struct StoredEntry {
    encrypted_key: String,
    encrypted_secret: String,
}

impl MemoryCredentialStore {
    pub fn new(cipher: Arc<CredentialCipher>) -> Self {
        Self {
            cipher,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn store(
        &self,
        user_id: i64,
        exchange: ExchangeId,
        api_key: &str,
        api_secret: &str,
    ) -> Result<(), CredentialError> {
        let entry = StoredEntry {
            encrypted_key: self.cipher.encrypt(api_key)?,
            encrypted_secret: self.cipher.encrypt(api_secret)?,
        };

        self.entries.write().await.insert((user_id, exchange), entry);
        tracing::info!(user_id, exchange = %exchange, "자격증명 저장 완료");
        Ok(())
    }

    async fn load(
        &self,
        user_id: i64,
        exchange: ExchangeId,
    ) -> Result<DecryptedCredentials, CredentialError> {
        let entries = self.entries.read().await;
        let entry = entries
            .get(&(user_id, exchange))
            .ok_or(CredentialError::NotFound { user_id, exchange })?;

        Ok(DecryptedCredentials::new(
            self.cipher.decrypt(&entry.encrypted_key)?,
            self.cipher.decrypt(&entry.encrypted_secret)?,
        ))
    }

    async fn list_exchanges(&self, user_id: i64) -> Result<Vec<ExchangeId>, CredentialError> {
        let entries = self.entries.read().await;
        let mut exchanges: Vec<ExchangeId> = entries
            .keys()
            .filter(|(uid, _)| *uid == user_id)
            .map(|(_, exchange)| *exchange)
            .collect();
        exchanges.sort_by_key(|e| e.as_str());
        Ok(exchanges)
    }

    async fn remove(&self, user_id: i64, exchange: ExchangeId) -> Result<(), CredentialError> {
        let removed = self.entries.write().await.remove(&(user_id, exchange));
        if removed.is_none() {
            return Err(CredentialError::NotFound { user_id, exchange });
        }
        tracing::info!(user_id, exchange = %exchange, "자격증명 삭제 완료");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryCredentialStore {
        let cipher = Arc::new(CredentialCipher::new("test-master-secret").unwrap());
        MemoryCredentialStore::new(cipher)
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let store = store();
        store
            .store(1, ExchangeId::Aster, "my-key", "my-secret")
            .await
            .unwrap();

        let creds = store.load(1, ExchangeId::Aster).await.unwrap();
        assert_eq!(creds.api_key.expose_secret(), "my-key");
        assert_eq!(creds.api_secret.expose_secret(), "my-secret");
    }

    #[tokio::test]
    async fn test_load_missing_returns_not_found() {
        let store = store();
        let err = store.load(1, ExchangeId::Hyperliquid).await.unwrap_err();
        assert!(matches!(err, CredentialError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_store_overwrites_existing() {
        let store = store();
        store.store(1, ExchangeId::Aster, "old-key", "old-secret").await.unwrap();
        store.store(1, ExchangeId::Aster, "new-key", "new-secret").await.unwrap();

        let creds = store.load(1, ExchangeId::Aster).await.unwrap();
        assert_eq!(creds.api_key.expose_secret(), "new-key");
    }

    #[tokio::test]
    async fn test_list_exchanges_scoped_to_user() {
        let store = store();
        store.store(1, ExchangeId::Aster, "k1", "s1").await.unwrap();
        store.store(1, ExchangeId::Hyperliquid, "k2", "s2").await.unwrap();
        store.store(2, ExchangeId::Aster, "k3", "s3").await.unwrap();

        let exchanges = store.list_exchanges(1).await.unwrap();
        assert_eq!(exchanges, vec![ExchangeId::Aster, ExchangeId::Hyperliquid]);

        let exchanges = store.list_exchanges(3).await.unwrap();
        assert!(exchanges.is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let store = store();
        store.store(1, ExchangeId::Aster, "k", "s").await.unwrap();
        store.remove(1, ExchangeId::Aster).await.unwrap();

        assert!(store.load(1, ExchangeId::Aster).await.is_err());
        assert!(matches!(
            store.remove(1, ExchangeId::Aster).await.unwrap_err(),
            CredentialError::NotFound { .. }
        ));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = DecryptedCredentials::new("visible-key", "visible-secret");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("visible-key"));
        assert!(!debug.contains("visible-secret"));
    }
}
