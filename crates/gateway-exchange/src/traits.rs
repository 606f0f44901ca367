//! 거래소 어댑터 trait 정의.

use async_trait::async_trait;
use gateway_core::{
    AccountInfo, CancelAllReport, Fill, Kline, MarginAdjustment, MarginMode, OrderBook,
    OrderParams, OrderResult, Position, SpotBalance, SymbolInfo, Ticker, Timeframe,
};
use rust_decimal::Decimal;

use crate::ExchangeError;

/// 거래소 작업을 위한 Result 타입.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// 어댑터가 지원하는 선택 기능.
///
/// 거래소마다 지원하지 않는 기능이 있으며, 호출자는 호출 전에 여기서
/// 기능 존재 여부를 확인할 수 있습니다. 지원하지 않는 기능을 호출하면
/// 어댑터는 `ExchangeError::NotSupported`를 반환합니다.
#[derive(Debug, Clone, Copy)]
pub struct AdapterCapabilities {
    /// 심볼별 마진 모드 변경 지원 여부
    pub set_margin_mode: bool,
    /// 격리 마진 수동 조정 지원 여부
    pub update_position_margin: bool,
    /// 현물 잔고 조회 지원 여부
    pub spot_balances: bool,
}

/// 통합 거래소 어댑터 인터페이스.
///
/// 구현체는 (a) 해당 거래소 방식으로 요청을 서명하고,
/// (b) 거래소 고유 필드/단위를 정규화된 타입으로 변환하며,
/// (c) 거래소 에러 코드를 [`ExchangeError`] 분류로 표면화합니다.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// 거래소 이름 반환.
    fn name(&self) -> &str;

    /// 이 어댑터가 지원하는 선택 기능.
    fn capabilities(&self) -> AdapterCapabilities;

    // === 계좌 작업 ===

    /// 파생상품 계좌 정보 조회.
    async fn get_account(&self) -> ExchangeResult<AccountInfo>;

    /// 현물 잔고 조회.
    async fn get_spot_balances(&self) -> ExchangeResult<Vec<SpotBalance>>;

    // === 포지션 작업 ===

    /// 열린 포지션 조회. 매 호출마다 거래소에서 새로 읽습니다.
    async fn get_positions(&self) -> ExchangeResult<Vec<Position>>;

    /// 레버리지 설정.
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()>;

    /// 마진 모드 설정.
    async fn set_margin_mode(&self, symbol: &str, mode: MarginMode) -> ExchangeResult<()>;

    /// 격리 포지션 마진 조정.
    async fn update_position_margin(
        &self,
        symbol: &str,
        amount: Decimal,
        adjustment: MarginAdjustment,
    ) -> ExchangeResult<()>;

    // === 주문 작업 ===

    /// 주문 제출. 파라미터는 이미 정규화 엔진이 라운딩한 상태입니다.
    async fn place_order(&self, params: &OrderParams) -> ExchangeResult<OrderResult>;

    /// 주문 취소.
    async fn cancel_order(&self, order_id: &str, symbol: &str) -> ExchangeResult<()>;

    /// 심볼의 모든 미체결 주문 취소. 주문별 성공/실패를 보고합니다.
    async fn cancel_all_orders(&self, symbol: &str) -> ExchangeResult<CancelAllReport>;

    /// 미체결 주문 조회.
    async fn get_open_orders(&self, symbol: Option<&str>) -> ExchangeResult<Vec<OrderResult>>;

    /// 주문 내역 조회.
    async fn get_order_history(
        &self,
        symbol: Option<&str>,
        limit: u32,
    ) -> ExchangeResult<Vec<OrderResult>>;

    /// 체결 내역 조회.
    async fn get_fills(&self, symbol: Option<&str>, limit: u32) -> ExchangeResult<Vec<Fill>>;

    // === 시장 데이터 (공개) ===

    /// 심볼의 24시간 시세 조회.
    async fn get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker>;

    /// 전체 시세 조회 (캐시 새로고침용).
    async fn get_all_tickers(&self) -> ExchangeResult<Vec<Ticker>>;

    /// 거래 가능한 심볼 메타데이터 조회.
    async fn get_assets(&self) -> ExchangeResult<Vec<SymbolInfo>>;

    /// 호가창 조회.
    async fn get_order_book(&self, symbol: &str, depth: u32) -> ExchangeResult<OrderBook>;

    /// 캔들스틱 조회.
    async fn get_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> ExchangeResult<Vec<Kline>>;
}
