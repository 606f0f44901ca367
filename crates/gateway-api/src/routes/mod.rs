//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크
//! - `/auth/session` - 세션 생성/삭제, 활성 거래소 전환
//! - `/credentials` - 거래소 자격증명 등록/삭제
//! - `/account` - 계좌 정보, 통합 잔고, 레버리지/마진 모드
//! - `/positions`, `/position/*` - 포지션 조회, TP/SL, 격리 마진 조정
//! - `/order`, `/orders`, `/fills` - 주문 제출/취소/조회, 체결 내역
//! - `/ticker`, `/assets`, `/orderbook`, `/ohlcv` - 시장 데이터 (공개)
//! - `/spot/holdings` - 현물 보유분 + FIFO 비용 기준 손익

pub mod account;
pub mod auth;
pub mod credentials;
pub mod health;
pub mod market;
pub mod orders;
pub mod positions;
pub mod spot;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(credentials::router())
        .merge(account::router())
        .merge(positions::router())
        .merge(orders::router())
        .merge(market::router())
        .merge(spot::router())
}
