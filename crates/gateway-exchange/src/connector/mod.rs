//! 거래소별 어댑터 구현.

pub mod aster;
pub mod hyperliquid;

pub use aster::{AsterAdapter, AsterConfig};
pub use hyperliquid::{HyperliquidAdapter, HyperliquidConfig};
