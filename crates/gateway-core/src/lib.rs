//! # Gateway Core
//!
//! 멀티 거래소 트레이딩 게이트웨이의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 게이트웨이 전반에서 사용되는 기본 타입을 제공합니다:
//! - 정규화된 주문/포지션/시장 데이터 타입
//! - 거래소 식별자 및 자격증명 종류
//! - 자격증명 암호화 (AES-256-GCM + 레거시 형식 호환)
//! - 자격증명 저장소 계약
//! - 수량/가격 스텝 라운딩
//! - 설정 및 로깅 인프라

pub mod config;
pub mod credential;
pub mod crypto;
pub mod domain;
pub mod logging;

pub use config::*;
pub use credential::{
    CredentialError, CredentialStore, DecryptedCredentials, MemoryCredentialStore,
};
pub use crypto::{CredentialCipher, CryptoError};
pub use domain::*;
pub use logging::*;
