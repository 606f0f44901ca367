//! # Gateway Exchange
//!
//! 거래소 어댑터 계약과 구현체, 어댑터 팩토리, 시장 데이터 캐시를 제공합니다.
//!
//! 모든 거래소별 특이사항(인증 방식, 필드 이름, 단위, 마진 모드 표기)은
//! 어댑터 경계 안에서 처리되며, 경계 밖으로는 정규화된 타입만 나갑니다.

pub mod cache;
pub mod connector;
pub mod error;
pub mod factory;
pub mod traits;

pub use cache::{AssetCache, TickerCache, ASSET_CACHE_TTL, TICKER_CACHE_TTL};
pub use connector::{AsterAdapter, AsterConfig, HyperliquidAdapter, HyperliquidConfig};
pub use error::ExchangeError;
pub use factory::AdapterFactory;
pub use traits::{AdapterCapabilities, ExchangeAdapter, ExchangeResult};
