//! PostgreSQL 자격증명 저장소.
//!
//! (user_id, exchange) 조합당 한 행이며, 두 암호화 블롭만 저장합니다.
//! 평문 시크릿은 어떤 경로로도 영속 경계를 넘지 않습니다. 복호화는
//! `load` 호출 시점에만 일어나고, 실패하면 평문 폴백 없이 에러로
//! 전파됩니다.
//!
//! 기대하는 테이블 형태:
//!
//! ```sql
//! CREATE TABLE exchange_credentials (
//!     user_id          BIGINT      NOT NULL,
//!     exchange         TEXT        NOT NULL,
//!     encrypted_key    TEXT        NOT NULL,
//!     encrypted_secret TEXT        NOT NULL,
//!     updated_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     PRIMARY KEY (user_id, exchange)
//! );
//! ```

use async_trait::async_trait;
use gateway_core::credential::{CredentialError, CredentialStore, DecryptedCredentials};
use gateway_core::{CredentialCipher, ExchangeId};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

/// PostgreSQL 기반 자격증명 저장소.
pub struct PgCredentialStore {
    pool: PgPool,
    cipher: Arc<CredentialCipher>,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, cipher: Arc<CredentialCipher>) -> Self {
        Self { pool, cipher }
    }
}

fn storage_err(e: sqlx::Error) -> CredentialError {
    CredentialError::Storage(e.to_string())
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn store(
        &self,
        user_id: i64,
        exchange: ExchangeId,
        api_key: &str,
        api_secret: &str,
    ) -> Result<(), CredentialError> {
        let encrypted_key = self.cipher.encrypt(api_key)?;
        let encrypted_secret = self.cipher.encrypt(api_secret)?;

        sqlx::query(
            r#"
            INSERT INTO exchange_credentials (user_id, exchange, encrypted_key, encrypted_secret, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (user_id, exchange)
            DO UPDATE SET encrypted_key = $3, encrypted_secret = $4, updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(exchange.as_str())
        .bind(&encrypted_key)
        .bind(&encrypted_secret)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        info!(user_id, exchange = %exchange, "자격증명 저장 완료");
        Ok(())
    }

    async fn load(
        &self,
        user_id: i64,
        exchange: ExchangeId,
    ) -> Result<DecryptedCredentials, CredentialError> {
        let row: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT encrypted_key, encrypted_secret
            FROM exchange_credentials
            WHERE user_id = $1 AND exchange = $2
            "#,
        )
        .bind(user_id)
        .bind(exchange.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        let (encrypted_key, encrypted_secret) =
            row.ok_or(CredentialError::NotFound { user_id, exchange })?;

        Ok(DecryptedCredentials::new(
            self.cipher.decrypt(&encrypted_key)?,
            self.cipher.decrypt(&encrypted_secret)?,
        ))
    }

    async fn list_exchanges(&self, user_id: i64) -> Result<Vec<ExchangeId>, CredentialError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT exchange
            FROM exchange_credentials
            WHERE user_id = $1
            ORDER BY exchange
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        // 더 이상 지원하지 않는 거래소의 잔존 행은 건너뜁니다.
        Ok(rows
            .into_iter()
            .filter_map(|(name,)| match name.parse::<ExchangeId>() {
                Ok(exchange) => Some(exchange),
                Err(_) => {
                    warn!(user_id, exchange = %name, "알 수 없는 거래소 행 무시");
                    None
                }
            })
            .collect())
    }

    async fn remove(&self, user_id: i64, exchange: ExchangeId) -> Result<(), CredentialError> {
        let result = sqlx::query(
            r#"
            DELETE FROM exchange_credentials
            WHERE user_id = $1 AND exchange = $2
            "#,
        )
        .bind(user_id)
        .bind(exchange.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(CredentialError::NotFound { user_id, exchange });
        }

        info!(user_id, exchange = %exchange, "자격증명 삭제 완료");
        Ok(())
    }
}
