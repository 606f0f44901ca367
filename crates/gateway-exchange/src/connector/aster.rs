//! Aster 거래소 어댑터.
//!
//! Binance 선물 호환 REST API를 사용합니다. 인증은 쿼리 문자열
//! HMAC-SHA256 서명 + `X-MBX-APIKEY` 헤더 방식입니다.

#![allow(dead_code)] // API 응답 필드 전체 매핑 (일부만 사용)

use crate::traits::{AdapterCapabilities, ExchangeAdapter, ExchangeResult};
use crate::ExchangeError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_core::{
    AccountInfo, CancelAllReport, Fill, Kline, MarginAdjustment, MarginMode, OrderBook,
    OrderBookLevel, OrderParams, OrderResult, OrderState, OrderType, Position, Side, SpotBalance,
    SymbolInfo, Ticker, Timeframe,
};
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// 설정
// ============================================================================

/// Aster 클라이언트 설정.
///
/// # 보안
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`)를 마스킹합니다.
#[derive(Clone)]
pub struct AsterConfig {
    /// API 키 (공개 어댑터는 비어 있음)
    pub api_key: SecretString,
    /// API 시크릿
    pub api_secret: SecretString,
    /// REST API 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 수신 윈도우 (밀리초)
    pub recv_window: u64,
}

impl fmt::Debug for AsterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsterConfig")
            .field("api_key", &"***REDACTED***")
            .field("api_secret", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("recv_window", &self.recv_window)
            .finish()
    }
}

impl AsterConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://fapi.asterdex.com";

    /// 인증된 설정 생성.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            api_secret: SecretString::from(api_secret.into()),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            recv_window: 5000,
        }
    }

    /// 시장 데이터 전용 비인증 설정 생성.
    pub fn public() -> Self {
        Self::new("", "")
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsterAccount {
    total_wallet_balance: String,
    available_balance: String,
    total_initial_margin: String,
    total_unrealized_profit: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsterSpotBalance {
    asset: String,
    free: String,
    locked: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsterPosition {
    symbol: String,
    position_amt: String,
    entry_price: String,
    mark_price: String,
    leverage: String,
    margin_type: String,
    liquidation_price: String,
    un_realized_profit: String,
    notional: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsterTicker {
    symbol: String,
    last_price: String,
    price_change_percent: String,
    high_price: String,
    low_price: String,
    volume: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsterExchangeInfo {
    symbols: Vec<AsterSymbol>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsterSymbol {
    symbol: String,
    base_asset: String,
    quote_asset: String,
    status: String,
    filters: Vec<AsterFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum AsterFilter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize { step_size: String },
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    PriceFilter { tick_size: String },
    #[serde(rename = "MIN_NOTIONAL", rename_all = "camelCase")]
    MinNotional { notional: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsterOrderBook {
    bids: Vec<[String; 2]>,
    asks: Vec<[String; 2]>,
}

#[derive(Debug, Deserialize)]
struct AsterKline(
    i64,    // 0: Open time
    String, // 1: Open
    String, // 2: High
    String, // 3: Low
    String, // 4: Close
    String, // 5: Volume
    i64,    // 6: Close time
    String, // 7: Quote asset volume
    i64,    // 8: Number of trades
    String, // 9: Taker buy base asset volume
    String, // 10: Taker buy quote asset volume
    String, // 11: Ignore
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsterOrder {
    order_id: i64,
    symbol: String,
    status: String,
    orig_qty: String,
    executed_qty: String,
    price: String,
    avg_price: Option<String>,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
    reduce_only: Option<bool>,
    close_position: Option<bool>,
    #[serde(default)]
    update_time: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AsterFill {
    symbol: String,
    side: String,
    price: String,
    qty: String,
    commission: String,
    time: i64,
}

#[derive(Debug, Deserialize)]
struct AsterError {
    code: i32,
    msg: String,
}

// ============================================================================
// Aster 어댑터
// ============================================================================

/// Aster 거래소 어댑터.
pub struct AsterAdapter {
    config: AsterConfig,
    client: Client,
}

impl AsterAdapter {
    /// 새 Aster 어댑터 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::Network`를 반환합니다.
    pub fn new(config: AsterConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 현재 타임스탬프(밀리초) 반환.
    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// HMAC-SHA256으로 쿼리 문자열 서명.
    fn sign(&self, query: &str) -> Result<String, ExchangeError> {
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.expose_secret().as_bytes())
            .map_err(|_| ExchangeError::Unauthorized("API 시크릿이 비어 있습니다".to_string()))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 파라미터에서 쿼리 문자열 생성.
    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// 공개 API 요청 (인증 불필요).
    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        let query = Self::build_query(params);
        let full_url = if query.is_empty() {
            url
        } else {
            format!("{}?{}", url, query)
        };

        debug!("GET {}", endpoint);
        let response = self.client.get(&full_url).send().await?;
        self.handle_response(response).await
    }

    /// 서명된 요청.
    async fn signed_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let url = format!("{}{}", self.config.base_url, endpoint);

        let mut all_params = params.to_vec();
        all_params.push(("timestamp", Self::timestamp_ms().to_string()));
        all_params.push(("recvWindow", self.config.recv_window.to_string()));

        let query = Self::build_query(&all_params);
        let signature = self.sign(&query)?;
        let full_url = format!("{}?{}&signature={}", url, query, signature);

        debug!("{} (signed) {}", method, endpoint);
        let response = self
            .client
            .request(method, &full_url)
            .header("X-MBX-APIKEY", self.config.api_key.expose_secret())
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn signed_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        self.signed_request(reqwest::Method::GET, endpoint, params).await
    }

    async fn signed_post<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        self.signed_request(reqwest::Method::POST, endpoint, params).await
    }

    async fn signed_delete<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> ExchangeResult<T> {
        self.signed_request(reqwest::Method::DELETE, endpoint, params).await
    }

    /// API 응답 처리.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> ExchangeResult<T> {
        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let body = response
            .text()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                error!("응답 파싱 실패: {} - Body: {}", e, body);
                ExchangeError::Parse(e.to_string())
            })
        } else if status.as_u16() == 429 {
            Err(ExchangeError::RateLimited { retry_after_secs: retry_after })
        } else if status.as_u16() == 418 {
            Err(ExchangeError::IpBanned { retry_after_secs: retry_after })
        } else if let Ok(err) = serde_json::from_str::<AsterError>(&body) {
            Err(Self::map_error_code(err.code, &err.msg, retry_after))
        } else {
            Err(ExchangeError::Api {
                code: status.as_u16() as i32,
                message: body,
            })
        }
    }

    /// 거래소 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(code: i32, msg: &str, retry_after: Option<u64>) -> ExchangeError {
        match code {
            -1002 | -2014 | -2015 => ExchangeError::Unauthorized(msg.to_string()),
            -1003 => ExchangeError::RateLimited { retry_after_secs: retry_after },
            -1121 => ExchangeError::SymbolNotFound(msg.to_string()),
            -2011 | -2013 => ExchangeError::OrderNotFound(msg.to_string()),
            -1013 | -1111 | -2010 | -2019 | -4164 => ExchangeError::OrderRejected {
                message: msg.to_string(),
                params: String::new(),
            },
            _ => ExchangeError::Api {
                code,
                message: msg.to_string(),
            },
        }
    }

    /// 문자열에서 Decimal 파싱.
    fn parse_decimal(s: &str) -> Decimal {
        s.parse().unwrap_or(Decimal::ZERO)
    }

    fn parse_side(s: &str) -> Side {
        if s.eq_ignore_ascii_case("SELL") {
            Side::Sell
        } else {
            Side::Buy
        }
    }

    fn parse_order_type(s: &str) -> OrderType {
        match s {
            "LIMIT" => OrderType::Limit,
            "STOP_MARKET" => OrderType::StopMarket,
            "STOP" => OrderType::StopLimit,
            "TAKE_PROFIT_MARKET" => OrderType::TakeProfitMarket,
            "TAKE_PROFIT" => OrderType::TakeProfitLimit,
            _ => OrderType::Market,
        }
    }

    fn order_type_str(order_type: OrderType) -> &'static str {
        match order_type {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::StopMarket => "STOP_MARKET",
            OrderType::StopLimit => "STOP",
            OrderType::TakeProfitMarket => "TAKE_PROFIT_MARKET",
            OrderType::TakeProfitLimit => "TAKE_PROFIT",
        }
    }

    fn parse_order_state(s: &str) -> OrderState {
        match s {
            "PARTIALLY_FILLED" => OrderState::PartiallyFilled,
            "FILLED" => OrderState::Filled,
            "CANCELED" => OrderState::Cancelled,
            "REJECTED" => OrderState::Rejected,
            "EXPIRED" => OrderState::Expired,
            _ => OrderState::New,
        }
    }

    /// 거래소 주문 응답을 정규화된 OrderResult로 변환.
    fn to_order_result(order: AsterOrder) -> OrderResult {
        let executed = Self::parse_decimal(&order.executed_qty);
        let avg_price = order
            .avg_price
            .as_deref()
            .map(Self::parse_decimal)
            .filter(|p| !p.is_zero());

        OrderResult {
            order_id: order.order_id.to_string(),
            symbol: order.symbol,
            side: Self::parse_side(&order.side),
            order_type: Self::parse_order_type(&order.order_type),
            state: Self::parse_order_state(&order.status),
            quantity: if order.close_position.unwrap_or(false) {
                None
            } else {
                Some(Self::parse_decimal(&order.orig_qty))
            },
            executed_quantity: executed,
            price: Some(Self::parse_decimal(&order.price)).filter(|p| !p.is_zero()),
            average_price: avg_price,
            reduce_only: order.reduce_only.unwrap_or(false),
            created_at: DateTime::from_timestamp_millis(order.update_time).unwrap_or_else(Utc::now),
        }
    }

    /// 주문 파라미터를 거래소 쿼리 파라미터로 변환.
    fn to_wire_params(params: &OrderParams) -> Vec<(&'static str, String)> {
        let mut wire = vec![
            ("symbol", params.symbol.clone()),
            ("side", params.side.to_string()),
            ("type", Self::order_type_str(params.order_type).to_string()),
        ];

        // 전체 청산 주문에는 수량을 보내지 않음. 함께 보내면 거래소 검증 오류.
        if params.close_position {
            wire.push(("closePosition", "true".to_string()));
        } else if let Some(quantity) = params.quantity {
            wire.push(("quantity", quantity.to_string()));
            if params.reduce_only {
                wire.push(("reduceOnly", "true".to_string()));
            }
        }

        if let Some(price) = params.price {
            wire.push(("price", price.to_string()));
            wire.push(("timeInForce", "GTC".to_string()));
        }
        if let Some(trigger) = params.trigger_price {
            wire.push(("stopPrice", trigger.to_string()));
        }

        wire
    }
}

#[async_trait]
impl ExchangeAdapter for AsterAdapter {
    fn name(&self) -> &str {
        "aster"
    }

    fn capabilities(&self) -> AdapterCapabilities {
        AdapterCapabilities {
            set_margin_mode: true,
            update_position_margin: true,
            spot_balances: true,
        }
    }

    async fn get_account(&self) -> ExchangeResult<AccountInfo> {
        let resp: AsterAccount = self.signed_get("/fapi/v2/account", &[]).await?;

        Ok(AccountInfo {
            total_balance: Self::parse_decimal(&resp.total_wallet_balance),
            available_balance: Self::parse_decimal(&resp.available_balance),
            margin_used: Self::parse_decimal(&resp.total_initial_margin),
            unrealized_pnl: Self::parse_decimal(&resp.total_unrealized_profit),
        })
    }

    async fn get_spot_balances(&self) -> ExchangeResult<Vec<SpotBalance>> {
        let resp: Vec<AsterSpotBalance> = self.signed_get("/api/v1/balances", &[]).await?;

        Ok(resp
            .into_iter()
            .map(|b| SpotBalance {
                asset: b.asset,
                free: Self::parse_decimal(&b.free),
                locked: Self::parse_decimal(&b.locked),
            })
            .filter(|b| !b.total().is_zero())
            .collect())
    }

    async fn get_positions(&self) -> ExchangeResult<Vec<Position>> {
        let resp: Vec<AsterPosition> = self.signed_get("/fapi/v2/positionRisk", &[]).await?;

        Ok(resp
            .into_iter()
            .filter(|p| !Self::parse_decimal(&p.position_amt).is_zero())
            .map(|p| {
                let signed_size = Self::parse_decimal(&p.position_amt);
                let margin_mode = p.margin_type.parse().unwrap_or(MarginMode::Cross);
                Position {
                    symbol: p.symbol,
                    signed_size,
                    entry_price: Self::parse_decimal(&p.entry_price),
                    mark_price: Self::parse_decimal(&p.mark_price),
                    leverage: p.leverage.parse().unwrap_or(1),
                    margin_mode,
                    liquidation_price: Some(Self::parse_decimal(&p.liquidation_price))
                        .filter(|p| !p.is_zero()),
                    unrealized_pnl: Self::parse_decimal(&p.un_realized_profit),
                    notional: Self::parse_decimal(&p.notional).abs(),
                }
            })
            .collect())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("leverage", leverage.to_string()),
        ];
        let _: serde_json::Value = self.signed_post("/fapi/v1/leverage", &params).await?;
        info!(symbol, leverage, "레버리지 설정 완료");
        Ok(())
    }

    async fn set_margin_mode(&self, symbol: &str, mode: MarginMode) -> ExchangeResult<()> {
        let margin_type = match mode {
            MarginMode::Cross => "CROSSED",
            MarginMode::Isolated => "ISOLATED",
        };
        let params = vec![
            ("symbol", symbol.to_string()),
            ("marginType", margin_type.to_string()),
        ];

        // -4046: 이미 해당 모드. 멱등 처리.
        match self
            .signed_post::<serde_json::Value>("/fapi/v1/marginType", &params)
            .await
        {
            Ok(_) => {
                info!(symbol, %mode, "마진 모드 설정 완료");
                Ok(())
            }
            Err(ExchangeError::Api { code: -4046, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn update_position_margin(
        &self,
        symbol: &str,
        amount: Decimal,
        adjustment: MarginAdjustment,
    ) -> ExchangeResult<()> {
        let adjust_type = match adjustment {
            MarginAdjustment::Add => "1",
            MarginAdjustment::Remove => "2",
        };
        let params = vec![
            ("symbol", symbol.to_string()),
            ("amount", amount.to_string()),
            ("type", adjust_type.to_string()),
        ];
        let _: serde_json::Value = self.signed_post("/fapi/v1/positionMargin", &params).await?;
        info!(symbol, %amount, ?adjustment, "격리 마진 조정 완료");
        Ok(())
    }

    async fn place_order(&self, params: &OrderParams) -> ExchangeResult<OrderResult> {
        let wire = Self::to_wire_params(params);

        info!(
            symbol = %params.symbol,
            side = %params.side,
            order_type = %params.order_type,
            close_position = params.close_position,
            "주문 제출"
        );

        let resp: AsterOrder = self
            .signed_post("/fapi/v1/order", &wire)
            .await
            .map_err(|e| match e {
                // 거부 사유에 전송한 정규화 파라미터를 함께 보존
                ExchangeError::OrderRejected { message, .. } => ExchangeError::OrderRejected {
                    message,
                    params: serde_json::to_string(params).unwrap_or_default(),
                },
                other => other,
            })?;

        info!(order_id = resp.order_id, "주문 접수 완료");
        Ok(Self::to_order_result(resp))
    }

    async fn cancel_order(&self, order_id: &str, symbol: &str) -> ExchangeResult<()> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        let _: AsterOrder = self.signed_delete("/fapi/v1/order", &params).await?;
        info!(order_id, symbol, "주문 취소 완료");
        Ok(())
    }

    async fn cancel_all_orders(&self, symbol: &str) -> ExchangeResult<CancelAllReport> {
        // 벌크 엔드포인트 대신 주문별 개별 취소로 주문 단위 성공/실패를 보고
        let open_orders = self.get_open_orders(Some(symbol)).await?;
        let mut report = CancelAllReport::default();

        for order in open_orders {
            match self.cancel_order(&order.order_id, symbol).await {
                Ok(()) => report.cancelled.push(order.order_id),
                Err(e) => report.failed.push((order.order_id, e.to_string())),
            }
        }

        info!(
            symbol,
            cancelled = report.cancelled.len(),
            failed = report.failed.len(),
            "전체 주문 취소 완료"
        );
        Ok(report)
    }

    async fn get_open_orders(&self, symbol: Option<&str>) -> ExchangeResult<Vec<OrderResult>> {
        let params: Vec<(&str, String)> = match symbol {
            Some(s) => vec![("symbol", s.to_string())],
            None => vec![],
        };
        let resp: Vec<AsterOrder> = self.signed_get("/fapi/v1/openOrders", &params).await?;
        Ok(resp.into_iter().map(Self::to_order_result).collect())
    }

    async fn get_order_history(
        &self,
        symbol: Option<&str>,
        limit: u32,
    ) -> ExchangeResult<Vec<OrderResult>> {
        let mut params = vec![("limit", limit.to_string())];
        if let Some(s) = symbol {
            params.push(("symbol", s.to_string()));
        }
        let resp: Vec<AsterOrder> = self.signed_get("/fapi/v1/allOrders", &params).await?;
        Ok(resp.into_iter().map(Self::to_order_result).collect())
    }

    async fn get_fills(&self, symbol: Option<&str>, limit: u32) -> ExchangeResult<Vec<Fill>> {
        let mut params = vec![("limit", limit.to_string())];
        if let Some(s) = symbol {
            params.push(("symbol", s.to_string()));
        }
        let resp: Vec<AsterFill> = self.signed_get("/fapi/v1/userTrades", &params).await?;

        Ok(resp
            .into_iter()
            .map(|f| Fill {
                symbol: f.symbol,
                side: Self::parse_side(&f.side),
                price: Self::parse_decimal(&f.price),
                quantity: Self::parse_decimal(&f.qty),
                fee: Self::parse_decimal(&f.commission),
                executed_at: DateTime::from_timestamp_millis(f.time).unwrap_or_else(Utc::now),
            })
            .collect())
    }

    async fn get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        let resp: AsterTicker = self
            .public_get("/fapi/v1/ticker/24hr", &[("symbol", symbol.to_string())])
            .await?;
        Ok(Self::to_ticker(resp))
    }

    async fn get_all_tickers(&self) -> ExchangeResult<Vec<Ticker>> {
        let resp: Vec<AsterTicker> = self.public_get("/fapi/v1/ticker/24hr", &[]).await?;
        Ok(resp.into_iter().map(Self::to_ticker).collect())
    }

    async fn get_assets(&self) -> ExchangeResult<Vec<SymbolInfo>> {
        let resp: AsterExchangeInfo = self.public_get("/fapi/v1/exchangeInfo", &[]).await?;

        Ok(resp
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING")
            .map(|s| {
                let mut quantity_step = Decimal::ZERO;
                let mut price_tick = Decimal::ZERO;
                let mut min_notional = None;

                for filter in &s.filters {
                    match filter {
                        AsterFilter::LotSize { step_size } => {
                            quantity_step = Self::parse_decimal(step_size);
                        }
                        AsterFilter::PriceFilter { tick_size } => {
                            price_tick = Self::parse_decimal(tick_size);
                        }
                        AsterFilter::MinNotional { notional } => {
                            min_notional = Some(Self::parse_decimal(notional));
                        }
                        AsterFilter::Other => {}
                    }
                }

                SymbolInfo {
                    symbol: s.symbol,
                    base_asset: s.base_asset,
                    quote_asset: s.quote_asset,
                    quantity_step,
                    price_tick,
                    min_notional,
                }
            })
            .collect())
    }

    async fn get_order_book(&self, symbol: &str, depth: u32) -> ExchangeResult<OrderBook> {
        let resp: AsterOrderBook = self
            .public_get(
                "/fapi/v1/depth",
                &[("symbol", symbol.to_string()), ("limit", depth.to_string())],
            )
            .await?;

        let parse_levels = |levels: Vec<[String; 2]>| {
            levels
                .into_iter()
                .map(|[price, qty]| OrderBookLevel {
                    price: Self::parse_decimal(&price),
                    quantity: Self::parse_decimal(&qty),
                })
                .collect()
        };

        Ok(OrderBook {
            symbol: symbol.to_string(),
            bids: parse_levels(resp.bids),
            asks: parse_levels(resp.asks),
            fetched_at: Utc::now(),
        })
    }

    async fn get_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> ExchangeResult<Vec<Kline>> {
        let resp: Vec<AsterKline> = self
            .public_get(
                "/fapi/v1/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", timeframe.as_str().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        Ok(resp
            .into_iter()
            .map(|k| Kline {
                open_time: DateTime::from_timestamp_millis(k.0).unwrap_or_else(Utc::now),
                open: Self::parse_decimal(&k.1),
                high: Self::parse_decimal(&k.2),
                low: Self::parse_decimal(&k.3),
                close: Self::parse_decimal(&k.4),
                volume: Self::parse_decimal(&k.5),
            })
            .collect())
    }
}

impl AsterAdapter {
    fn to_ticker(resp: AsterTicker) -> Ticker {
        Ticker {
            symbol: resp.symbol,
            price: Self::parse_decimal(&resp.last_price),
            change_24h_pct: Self::parse_decimal(&resp.price_change_percent),
            high_24h: Self::parse_decimal(&resp.high_price),
            low_24h: Self::parse_decimal(&resp.low_price),
            volume_24h: Self::parse_decimal(&resp.volume),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn adapter() -> AsterAdapter {
        AsterAdapter::new(AsterConfig::new(
            "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A",
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j",
        ))
        .expect("테스트용 어댑터 생성 실패")
    }

    #[test]
    fn test_sign() {
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        let signature = adapter().sign(query).unwrap();

        assert_eq!(
            signature,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_close_position_omits_quantity() {
        let params = OrderParams {
            symbol: "BTCUSDT".to_string(),
            side: Side::Sell,
            order_type: OrderType::TakeProfitMarket,
            quantity: None,
            price: None,
            trigger_price: Some(dec!(55000)),
            reduce_only: true,
            close_position: true,
        };

        let wire = AsterAdapter::to_wire_params(&params);
        assert!(wire.iter().any(|(k, v)| *k == "closePosition" && v == "true"));
        assert!(!wire.iter().any(|(k, _)| *k == "quantity"));
        assert!(!wire.iter().any(|(k, _)| *k == "reduceOnly"));
        assert!(wire.iter().any(|(k, v)| *k == "stopPrice" && v == "55000"));
    }

    #[test]
    fn test_quantity_order_wire_params() {
        let params = OrderParams {
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            quantity: Some(dec!(0.002)),
            price: Some(dec!(50000)),
            trigger_price: None,
            reduce_only: false,
            close_position: false,
        };

        let wire = AsterAdapter::to_wire_params(&params);
        assert!(wire.iter().any(|(k, v)| *k == "quantity" && v == "0.002"));
        assert!(wire.iter().any(|(k, v)| *k == "price" && v == "50000"));
        assert!(wire.iter().any(|(k, v)| *k == "timeInForce" && v == "GTC"));
    }

    #[test]
    fn test_error_code_mapping() {
        assert!(matches!(
            AsterAdapter::map_error_code(-1003, "Too many requests", Some(30)),
            ExchangeError::RateLimited { retry_after_secs: Some(30) }
        ));
        assert!(matches!(
            AsterAdapter::map_error_code(-2015, "Invalid API key", None),
            ExchangeError::Unauthorized(_)
        ));
        assert!(matches!(
            AsterAdapter::map_error_code(-2019, "Margin is insufficient", None),
            ExchangeError::OrderRejected { .. }
        ));
    }

    #[test]
    fn test_margin_type_folding() {
        assert_eq!("CROSSED".parse::<MarginMode>().unwrap(), MarginMode::Cross);
        assert_eq!("cross".parse::<MarginMode>().unwrap(), MarginMode::Cross);
    }

    #[test]
    fn test_order_state_parsing() {
        assert_eq!(AsterAdapter::parse_order_state("NEW"), OrderState::New);
        assert_eq!(AsterAdapter::parse_order_state("FILLED"), OrderState::Filled);
        assert_eq!(
            AsterAdapter::parse_order_state("CANCELED"),
            OrderState::Cancelled
        );
    }

    // ------------------------------------------------------------------
    // HTTP 동작 테스트 (mockito)
    // ------------------------------------------------------------------

    use mockito::Matcher;

    fn adapter_at(base_url: &str) -> AsterAdapter {
        AsterAdapter::new(AsterConfig::new("test-key", "test-secret").with_base_url(base_url))
            .expect("테스트용 어댑터 생성 실패")
    }

    #[tokio::test]
    async fn test_ticker_response_parsing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fapi/v1/ticker/24hr")
            .match_query(Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()))
            .with_status(200)
            .with_body(
                r#"{"symbol":"BTCUSDT","lastPrice":"50000.5","priceChangePercent":"2.1",
                    "highPrice":"51000","lowPrice":"49000","volume":"1234.5"}"#,
            )
            .create_async()
            .await;

        let ticker = adapter_at(&server.url()).get_ticker("BTCUSDT").await.unwrap();

        mock.assert_async().await;
        assert_eq!(ticker.price, dec!(50000.5));
        assert_eq!(ticker.change_24h_pct, dec!(2.1));
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fapi/v1/ticker/24hr")
            .match_query(Matcher::Any)
            .with_status(429)
            .with_header("Retry-After", "7")
            .with_body("")
            .create_async()
            .await;

        let err = adapter_at(&server.url())
            .get_ticker("BTCUSDT")
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(
            err,
            ExchangeError::RateLimited { retry_after_secs: Some(7) }
        ));
    }

    #[tokio::test]
    async fn test_ip_ban_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/fapi/v1/ticker/24hr")
            .match_query(Matcher::Any)
            .with_status(418)
            .with_body("")
            .create_async()
            .await;

        let err = adapter_at(&server.url())
            .get_ticker("BTCUSDT")
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::IpBanned { .. }));
    }

    #[tokio::test]
    async fn test_error_body_maps_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/fapi/v2/account")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"code":-2015,"msg":"Invalid API-key, IP, or permissions."}"#)
            .create_async()
            .await;

        let err = adapter_at(&server.url()).get_account().await.unwrap_err();

        assert!(matches!(err, ExchangeError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_rejected_order_keeps_sent_params() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/fapi/v1/order")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"code":-2019,"msg":"Margin is insufficient."}"#)
            .create_async()
            .await;

        let params = OrderParams {
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Market,
            quantity: Some(dec!(0.002)),
            price: None,
            trigger_price: None,
            reduce_only: false,
            close_position: false,
        };

        let err = adapter_at(&server.url()).place_order(&params).await.unwrap_err();

        match err {
            ExchangeError::OrderRejected { params, .. } => {
                assert!(params.contains("BTCUSDT"));
            }
            other => panic!("예상과 다른 에러: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_close_position_wire_omits_quantity() {
        let mut server = mockito::Server::new_async().await;

        // 수량이 포함된 요청은 도달하면 안 됨
        let quantity_mock = server
            .mock("POST", "/fapi/v1/order")
            .match_query(Matcher::Regex("quantity=".to_string()))
            .expect(0)
            .create_async()
            .await;

        let close_mock = server
            .mock("POST", "/fapi/v1/order")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("closePosition".into(), "true".into()),
                Matcher::UrlEncoded("stopPrice".into(), "55000".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"orderId":123,"symbol":"BTCUSDT","status":"NEW","origQty":"0",
                    "executedQty":"0","price":"0","avgPrice":"0","side":"SELL",
                    "type":"TAKE_PROFIT_MARKET","reduceOnly":true,"closePosition":true,
                    "updateTime":1700000000000}"#,
            )
            .create_async()
            .await;

        let params = OrderParams {
            symbol: "BTCUSDT".to_string(),
            side: Side::Sell,
            order_type: OrderType::TakeProfitMarket,
            quantity: None,
            price: None,
            trigger_price: Some(dec!(55000)),
            reduce_only: true,
            close_position: true,
        };

        let result = adapter_at(&server.url()).place_order(&params).await.unwrap();

        quantity_mock.assert_async().await;
        close_mock.assert_async().await;
        assert_eq!(result.order_id, "123");
        assert!(result.quantity.is_none());
    }
}
