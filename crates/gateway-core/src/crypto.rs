//! # 자격증명 암호화 모듈
//!
//! AES-256-GCM을 사용한 거래소 자격증명 암호화/복호화 기능을 제공합니다.
//!
//! ## 보안 고려사항
//! - 마스터 시크릿은 환경변수에서 한 번만 로드되며, 키는 SHA-256 해시로 유도
//! - 암호문마다 고유한 salt(16바이트)와 IV(12바이트) 사용
//! - 복호화는 fail-closed: 태그 불일치나 형식 오류 시 절대 부분 평문을 반환하지 않음
//!
//! ## 암호문 레이아웃
//!
//! ```text
//! hex( salt(16) || iv(12) || tag(16) || ciphertext )
//! ```
//!
//! salt는 기존 저장 형식과의 호환을 위해 레이아웃에 포함되지만,
//! 키 자체는 프로세스당 한 번 유도된 고정 키입니다 (외부 키 관리 의존성 없음).
//!
//! 레거시 `iv:ciphertext` (AES-256-CBC, 비인증) 형식도 복호화만 지원하며,
//! 해당 경로를 탈 때 경고를 로깅합니다.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

type LegacyCbcDec = cbc::Decryptor<aes::Aes256>;

/// 암호화 에러.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// 태그 불일치, 길이 부족, hex 오류 등 모든 복호화 실패.
    ///
    /// 원인을 세분화하지 않습니다. 공격자에게 오라클을 제공하지 않기 위해
    /// 복호화 실패는 단일 에러로 접습니다.
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Master secret not configured")]
    MasterSecretNotConfigured,
}

/// AES-256-GCM IV 크기 (바이트).
pub const IV_SIZE: usize = 12;

/// salt 크기 (바이트).
pub const SALT_SIZE: usize = 16;

/// GCM 인증 태그 크기 (바이트).
pub const TAG_SIZE: usize = 16;

/// 레거시 CBC IV 크기 (바이트).
const LEGACY_IV_SIZE: usize = 16;

/// 자격증명 암호화 관리자.
///
/// 마스터 시크릿을 SHA-256으로 해시하여 256비트 키를 유도합니다.
/// 같은 마스터 시크릿은 항상 같은 키를 생성하므로,
/// 복호화 프로세스는 시크릿 하나만 알면 됩니다.
pub struct CredentialCipher {
    cipher: Aes256Gcm,
    /// 레거시 CBC 복호화용 원본 키 (동일하게 유도됨)
    key_bytes: [u8; 32],
}

impl CredentialCipher {
    /// 마스터 시크릿으로 암호화 관리자 생성.
    ///
    /// # Arguments
    /// * `master_secret` - 임의 길이의 마스터 시크릿 (환경변수에서 로드)
    pub fn new(master_secret: &str) -> Result<Self, CryptoError> {
        if master_secret.is_empty() {
            return Err(CryptoError::MasterSecretNotConfigured);
        }

        let key_bytes: [u8; 32] = Sha256::digest(master_secret.as_bytes()).into();
        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        Ok(Self { cipher, key_bytes })
    }

    /// 평문 암호화.
    ///
    /// # Returns
    /// `hex(salt || iv || tag || ciphertext)` 형태의 단일 문자열.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut salt = [0u8; SALT_SIZE];
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);

        let nonce = Nonce::from_slice(&iv);
        let sealed = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &salt,
                },
            )
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        // aes-gcm은 ciphertext || tag 순으로 반환하므로 레이아웃에 맞게 재배열
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_SIZE);

        let mut out = Vec::with_capacity(SALT_SIZE + IV_SIZE + TAG_SIZE + ciphertext.len());
        out.extend_from_slice(&salt);
        out.extend_from_slice(&iv);
        out.extend_from_slice(tag);
        out.extend_from_slice(ciphertext);

        Ok(hex::encode(out))
    }

    /// 암호문 복호화.
    ///
    /// 최신 `salt||iv||tag||cipher` 레이아웃과 레거시 `iv:ciphertext` 형식을
    /// 모두 지원합니다. 레거시 경로를 탈 때는 경고를 로깅합니다.
    ///
    /// # Errors
    /// 태그 불일치 또는 형식 오류 시 `CryptoError::DecryptionFailed`.
    /// 부분 평문은 절대 반환하지 않습니다.
    pub fn decrypt(&self, payload: &str) -> Result<String, CryptoError> {
        if let Some((iv_hex, cipher_hex)) = payload.split_once(':') {
            // 레거시 형식은 hex iv + hex ciphertext 두 조각으로 구성됨.
            // ':'가 포함된 최신 암호문은 존재하지 않음 (hex 인코딩이므로).
            return self.decrypt_legacy(iv_hex, cipher_hex);
        }

        let raw = hex::decode(payload)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid hex: {}", e)))?;

        if raw.len() < SALT_SIZE + IV_SIZE + TAG_SIZE {
            return Err(CryptoError::DecryptionFailed(format!(
                "payload too short: {} bytes",
                raw.len()
            )));
        }

        let (salt, rest) = raw.split_at(SALT_SIZE);
        let (iv, rest) = rest.split_at(IV_SIZE);
        let (tag, ciphertext) = rest.split_at(TAG_SIZE);

        // aead 입력은 ciphertext || tag 순서
        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        let nonce = Nonce::from_slice(iv);
        let plaintext = self
            .cipher
            .decrypt(
                nonce,
                Payload {
                    msg: &sealed,
                    aad: salt,
                },
            )
            .map_err(|_| CryptoError::DecryptionFailed("auth tag mismatch".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid utf-8: {}", e)))
    }

    /// 레거시 `iv:ciphertext` (AES-256-CBC) 복호화.
    ///
    /// 인증되지 않은 형식이므로 마이그레이션 전 데이터 읽기 전용으로만 사용합니다.
    fn decrypt_legacy(&self, iv_hex: &str, cipher_hex: &str) -> Result<String, CryptoError> {
        warn!("레거시 비인증 자격증명 형식 복호화: 재암호화가 필요합니다");

        let iv = hex::decode(iv_hex)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid legacy iv: {}", e)))?;
        if iv.len() != LEGACY_IV_SIZE {
            return Err(CryptoError::DecryptionFailed(format!(
                "invalid legacy iv length: {}",
                iv.len()
            )));
        }

        let ciphertext = hex::decode(cipher_hex)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid legacy cipher: {}", e)))?;

        let plaintext = LegacyCbcDec::new(&self.key_bytes.into(), iv.as_slice().into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed("legacy padding error".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid utf-8: {}", e)))
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 키 재료는 절대 출력하지 않음
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}
