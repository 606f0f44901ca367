//! 게이트웨이 도메인 모델.
//!
//! 거래소별 페이로드의 필드명/단위 차이는 전부 어댑터 경계에서 흡수되며,
//! 이 모듈의 타입들만이 어댑터 경계를 넘을 수 있습니다.

pub mod account;
pub mod exchange;
pub mod market;
pub mod order;
pub mod position;
pub mod step;

pub use account::*;
pub use exchange::*;
pub use market::*;
pub use order::*;
pub use position::*;
pub use step::*;
