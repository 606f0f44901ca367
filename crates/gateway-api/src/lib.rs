//! # Gateway API
//!
//! 멀티 거래소 트레이딩 게이트웨이의 HTTP 표면입니다.
//!
//! - 세션 관리자: 불투명 베어러 토큰 발급/검증, 활성 거래소 전환
//! - 자격증명 영속화: PostgreSQL 저장소 (암호화된 블롭만 저장)
//! - 라우트 핸들러: 계좌/포지션/주문/시장 데이터 엔드포인트
//!
//! 모든 응답은 `{success, data?, error?}` 봉투를 공유합니다.

pub mod error;
pub mod repository;
pub mod routes;
pub mod session;
pub mod state;

pub use error::{ApiError, ApiResult, Envelope};
pub use session::{SessionAuth, SessionError, SessionManager, SessionRecord};
pub use state::AppState;
