//! Hyperliquid 거래소 어댑터.
//!
//! API 키 대신 지갑 서명을 사용하는 거래소입니다. 조회는 `POST /info`
//! (비서명), 상태 변경은 `POST /exchange` (secp256k1 서명) 엔드포인트를
//! 사용합니다. 자격증명 슬롯은 (개인키, 지갑 주소)로 재사용됩니다.

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
use k256::ecdsa::SigningKey;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use sha3::{Digest, Keccak256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info};

// ============================================================================
// 설정
// ============================================================================

/// Hyperliquid 클라이언트 설정.
///
/// # 보안
/// - `Debug` 구현은 개인키를 마스킹합니다. 지갑 주소는 공개 정보입니다.
#[derive(Clone)]
pub struct HyperliquidConfig {
    /// 서명용 지갑 개인키 (hex, 공개 어댑터는 비어 있음)
    pub private_key: SecretString,
    /// 지갑 주소 (조회 요청의 user 필드)
    pub address: String,
    /// REST API 기본 URL
    pub base_url: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl fmt::Debug for HyperliquidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperliquidConfig")
            .field("private_key", &"***REDACTED***")
            .field("address", &self.address)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl HyperliquidConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.hyperliquid.xyz";

    /// 인증된 설정 생성.
    pub fn new(private_key: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            private_key: SecretString::from(private_key.into()),
            address: address.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
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
struct HlClearinghouseState {
    margin_summary: HlMarginSummary,
    withdrawable: String,
    asset_positions: Vec<HlAssetPosition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HlMarginSummary {
    account_value: String,
    total_margin_used: String,
}

#[derive(Debug, Deserialize)]
struct HlAssetPosition {
    position: HlPosition,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HlPosition {
    coin: String,
    szi: String,
    entry_px: Option<String>,
    position_value: String,
    unrealized_pnl: String,
    liquidation_px: Option<String>,
    leverage: HlLeverage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HlLeverage {
    #[serde(rename = "type")]
    kind: String,
    value: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HlSpotBalances {
    balances: Vec<HlSpotBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HlSpotBalance {
    coin: String,
    total: String,
    hold: String,
}

#[derive(Debug, Deserialize)]
struct HlMeta {
    universe: Vec<HlAsset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HlAsset {
    name: String,
    sz_decimals: u32,
    #[serde(default)]
    max_leverage: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HlAssetCtx {
    mark_px: String,
    prev_day_px: String,
    day_ntl_vlm: String,
    #[serde(default)]
    mid_px: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HlL2Book {
    levels: [Vec<HlBookLevel>; 2],
}

#[derive(Debug, Deserialize)]
struct HlBookLevel {
    px: String,
    sz: String,
}

#[derive(Debug, Deserialize)]
struct HlCandle {
    t: i64,
    o: String,
    h: String,
    l: String,
    c: String,
    v: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HlOpenOrder {
    coin: String,
    oid: i64,
    side: String,
    limit_px: String,
    sz: String,
    #[serde(default)]
    orig_sz: Option<String>,
    timestamp: i64,
    #[serde(default)]
    reduce_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HlHistoricalOrder {
    order: HlOpenOrder,
    status: String,
    status_timestamp: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HlFill {
    coin: String,
    px: String,
    sz: String,
    side: String,
    time: i64,
    fee: String,
}

#[derive(Debug, Deserialize)]
struct HlActionResponse {
    status: String,
    #[serde(default)]
    response: Option<serde_json::Value>,
}

// ============================================================================
// Hyperliquid 어댑터
// ============================================================================

/// Hyperliquid 거래소 어댑터.
pub struct HyperliquidAdapter {
    config: HyperliquidConfig,
    client: Client,
}

impl HyperliquidAdapter {
    /// 새 Hyperliquid 어댑터 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하거나 개인키가 유효하지 않으면 에러를 반환합니다.
    pub fn new(config: HyperliquidConfig) -> Result<Self, ExchangeError> {
        // 개인키가 있으면 생성 시점에 검증. 주문 시점의 늦은 실패 방지.
        if !config.private_key.expose_secret().is_empty() {
            Self::parse_signing_key(config.private_key.expose_secret())?;
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { config, client })
    }

    fn parse_signing_key(private_key: &str) -> Result<SigningKey, ExchangeError> {
        let hex_key = private_key.trim_start_matches("0x");
        let bytes = hex::decode(hex_key)
            .map_err(|_| ExchangeError::Unauthorized("유효하지 않은 개인키 형식".to_string()))?;
        SigningKey::from_slice(&bytes)
            .map_err(|_| ExchangeError::Unauthorized("유효하지 않은 개인키".to_string()))
    }

    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    /// 정규화된 심볼을 Hyperliquid 코인 이름으로 변환.
    ///
    /// "BTCUSDT" / "BTCUSD" -> "BTC". 접미사가 없으면 그대로 사용합니다.
    fn to_coin(symbol: &str) -> String {
        for quote in ["USDT", "USDC", "USD"] {
            if let Some(base) = symbol.strip_suffix(quote) {
                if !base.is_empty() {
                    return base.to_string();
                }
            }
        }
        symbol.to_string()
    }

    /// 코인 이름을 정규화된 심볼로 변환.
    fn to_symbol(coin: &str) -> String {
        format!("{}USDT", coin)
    }

    /// 비서명 조회 요청.
    async fn info_request<T: for<'de> Deserialize<'de>>(
        &self,
        body: serde_json::Value,
    ) -> ExchangeResult<T> {
        let url = format!("{}/info", self.config.base_url);
        debug!("POST /info type={}", body["type"]);

        let response = self.client.post(&url).json(&body).send().await?;
        self.handle_response(response).await
    }

    /// 서명된 액션 요청.
    ///
    /// 액션 직렬화 + 논스를 Keccak-256으로 해시하고 secp256k1 복구 가능
    /// 서명(r, s, v)을 첨부합니다.
    async fn exchange_request(&self, action: serde_json::Value) -> ExchangeResult<HlActionResponse> {
        let signing_key = Self::parse_signing_key(self.config.private_key.expose_secret())?;
        let nonce = Self::timestamp_ms();

        let action_bytes = serde_json::to_vec(&action)?;
        let mut hasher = Keccak256::new();
        hasher.update(&action_bytes);
        hasher.update(nonce.to_be_bytes());
        let digest = hasher.finalize();

        let (signature, recovery_id) = signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| ExchangeError::Unauthorized(format!("서명 실패: {}", e)))?;

        let body = json!({
            "action": action,
            "nonce": nonce,
            "signature": {
                "r": format!("0x{}", hex::encode(signature.r().to_bytes())),
                "s": format!("0x{}", hex::encode(signature.s().to_bytes())),
                "v": 27 + recovery_id.to_byte(),
            },
        });

        let url = format!("{}/exchange", self.config.base_url);
        debug!("POST /exchange type={}", action["type"]);

        let response = self.client.post(&url).json(&body).send().await?;
        let result: HlActionResponse = self.handle_response(response).await?;

        if result.status != "ok" {
            return Err(ExchangeError::Api {
                code: 0,
                message: format!("action status: {}", result.status),
            });
        }
        Ok(result)
    }

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
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(ExchangeError::Unauthorized(body))
        } else {
            Err(ExchangeError::Api {
                code: status.as_u16() as i32,
                message: body,
            })
        }
    }

    /// 메타데이터에서 코인의 자산 인덱스를 찾습니다.
    async fn asset_index(&self, coin: &str) -> ExchangeResult<(usize, HlAsset)> {
        let meta: HlMeta = self.info_request(json!({ "type": "meta" })).await?;
        meta.universe
            .into_iter()
            .enumerate()
            .find(|(_, asset)| asset.name == coin)
            .ok_or_else(|| ExchangeError::SymbolNotFound(coin.to_string()))
    }

    fn parse_decimal(s: &str) -> Decimal {
        s.parse().unwrap_or(Decimal::ZERO)
    }

    /// "B"(bid) = 매수, "A"(ask) = 매도.
    fn parse_fill_side(s: &str) -> Side {
        if s == "A" {
            Side::Sell
        } else {
            Side::Buy
        }
    }

    /// 주문 제출 응답에서 주문 ID 또는 거부 사유를 추출.
    fn extract_order_status(
        response: &HlActionResponse,
        params: &OrderParams,
    ) -> ExchangeResult<(String, OrderState)> {
        let statuses = response
            .response
            .as_ref()
            .and_then(|r| r.pointer("/data/statuses"))
            .and_then(|s| s.as_array())
            .ok_or_else(|| ExchangeError::Parse("statuses 필드 없음".to_string()))?;

        let status = statuses
            .first()
            .ok_or_else(|| ExchangeError::Parse("빈 statuses".to_string()))?;

        if let Some(err) = status.get("error").and_then(|e| e.as_str()) {
            return Err(ExchangeError::OrderRejected {
                message: err.to_string(),
                params: serde_json::to_string(params).unwrap_or_default(),
            });
        }
        if let Some(oid) = status.pointer("/resting/oid").and_then(|o| o.as_i64()) {
            return Ok((oid.to_string(), OrderState::New));
        }
        if let Some(oid) = status.pointer("/filled/oid").and_then(|o| o.as_i64()) {
            return Ok((oid.to_string(), OrderState::Filled));
        }
        Err(ExchangeError::Parse(format!("알 수 없는 주문 상태: {}", status)))
    }

    fn open_order_to_result(order: HlOpenOrder) -> OrderResult {
        let quantity = order
            .orig_sz
            .as_deref()
            .map(Self::parse_decimal)
            .unwrap_or_else(|| Self::parse_decimal(&order.sz));

        OrderResult {
            order_id: order.oid.to_string(),
            symbol: Self::to_symbol(&order.coin),
            side: Self::parse_fill_side(&order.side),
            order_type: OrderType::Limit,
            state: OrderState::New,
            quantity: Some(quantity),
            executed_quantity: quantity - Self::parse_decimal(&order.sz),
            price: Some(Self::parse_decimal(&order.limit_px)),
            average_price: None,
            reduce_only: order.reduce_only,
            created_at: DateTime::from_timestamp_millis(order.timestamp).unwrap_or_else(Utc::now),
        }
    }

    fn historical_state(status: &str) -> OrderState {
        match status {
            "filled" => OrderState::Filled,
            "canceled" | "marginCanceled" => OrderState::Cancelled,
            "rejected" => OrderState::Rejected,
            "open" => OrderState::New,
            _ => OrderState::Expired,
        }
    }
}

#[async_trait]
impl ExchangeAdapter for HyperliquidAdapter {
    fn name(&self) -> &str {
        "hyperliquid"
    }

    fn capabilities(&self) -> AdapterCapabilities {
        // 마진 모드는 레버리지 설정에 묶여 있어 독립 변경을 지원하지 않음
        AdapterCapabilities {
            set_margin_mode: false,
            update_position_margin: true,
            spot_balances: true,
        }
    }

    async fn get_account(&self) -> ExchangeResult<AccountInfo> {
        let state: HlClearinghouseState = self
            .info_request(json!({
                "type": "clearinghouseState",
                "user": self.config.address,
            }))
            .await?;

        let unrealized_pnl = state
            .asset_positions
            .iter()
            .map(|p| Self::parse_decimal(&p.position.unrealized_pnl))
            .sum();

        Ok(AccountInfo {
            total_balance: Self::parse_decimal(&state.margin_summary.account_value),
            available_balance: Self::parse_decimal(&state.withdrawable),
            margin_used: Self::parse_decimal(&state.margin_summary.total_margin_used),
            unrealized_pnl,
        })
    }

    async fn get_spot_balances(&self) -> ExchangeResult<Vec<SpotBalance>> {
        let resp: HlSpotBalances = self
            .info_request(json!({
                "type": "spotClearinghouseState",
                "user": self.config.address,
            }))
            .await?;

        Ok(resp
            .balances
            .into_iter()
            .map(|b| {
                let total = Self::parse_decimal(&b.total);
                let hold = Self::parse_decimal(&b.hold);
                SpotBalance {
                    asset: b.coin,
                    free: total - hold,
                    locked: hold,
                }
            })
            .filter(|b| !b.total().is_zero())
            .collect())
    }

    async fn get_positions(&self) -> ExchangeResult<Vec<Position>> {
        let state: HlClearinghouseState = self
            .info_request(json!({
                "type": "clearinghouseState",
                "user": self.config.address,
            }))
            .await?;

        Ok(state
            .asset_positions
            .into_iter()
            .map(|p| p.position)
            .filter(|p| !Self::parse_decimal(&p.szi).is_zero())
            .map(|p| {
                let signed_size = Self::parse_decimal(&p.szi);
                let notional = Self::parse_decimal(&p.position_value).abs();
                let entry_price = p
                    .entry_px
                    .as_deref()
                    .map(Self::parse_decimal)
                    .unwrap_or(Decimal::ZERO);
                let mark_price = if signed_size.is_zero() {
                    Decimal::ZERO
                } else {
                    notional / signed_size.abs()
                };
                let margin_mode = if p.leverage.kind == "isolated" {
                    MarginMode::Isolated
                } else {
                    MarginMode::Cross
                };

                Position {
                    symbol: Self::to_symbol(&p.coin),
                    signed_size,
                    entry_price,
                    mark_price,
                    leverage: p.leverage.value,
                    margin_mode,
                    liquidation_price: p.liquidation_px.as_deref().map(Self::parse_decimal),
                    unrealized_pnl: Self::parse_decimal(&p.unrealized_pnl),
                    notional,
                }
            })
            .collect())
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> ExchangeResult<()> {
        let coin = Self::to_coin(symbol);
        let (asset, _) = self.asset_index(&coin).await?;

        self.exchange_request(json!({
            "type": "updateLeverage",
            "asset": asset,
            "isCross": true,
            "leverage": leverage,
        }))
        .await?;

        info!(symbol, leverage, "레버리지 설정 완료");
        Ok(())
    }

    async fn set_margin_mode(&self, _symbol: &str, _mode: MarginMode) -> ExchangeResult<()> {
        Err(ExchangeError::NotSupported(
            "Hyperliquid는 독립적인 마진 모드 변경을 지원하지 않습니다".to_string(),
        ))
    }

    async fn update_position_margin(
        &self,
        symbol: &str,
        amount: Decimal,
        adjustment: MarginAdjustment,
    ) -> ExchangeResult<()> {
        let coin = Self::to_coin(symbol);
        let (asset, _) = self.asset_index(&coin).await?;

        // USDC 6자리 정수 단위. 회수는 음수로 표현.
        let ntli = (amount * Decimal::from(1_000_000))
            .trunc()
            .to_string()
            .parse::<i64>()
            .map_err(|_| ExchangeError::Parse(format!("마진 금액 변환 실패: {}", amount)))?;
        let ntli = match adjustment {
            MarginAdjustment::Add => ntli,
            MarginAdjustment::Remove => -ntli,
        };

        self.exchange_request(json!({
            "type": "updateIsolatedMargin",
            "asset": asset,
            "isBuy": true,
            "ntli": ntli,
        }))
        .await?;

        info!(symbol, %amount, ?adjustment, "격리 마진 조정 완료");
        Ok(())
    }

    async fn place_order(&self, params: &OrderParams) -> ExchangeResult<OrderResult> {
        let coin = Self::to_coin(&params.symbol);
        let (asset, _) = self.asset_index(&coin).await?;

        let is_buy = params.side == Side::Buy;
        // 전체 청산 주문: 수량 생략이 불가능한 venue이므로 트리거 주문의
        // tpsl 그룹으로 표현하고 sz는 0으로 보냄 (venue가 포지션 전량으로 해석)
        let size = params
            .quantity
            .map(|q| q.to_string())
            .unwrap_or_else(|| "0".to_string());

        let order_kind = match params.order_type {
            OrderType::Limit => json!({ "limit": { "tif": "Gtc" } }),
            OrderType::Market => json!({ "limit": { "tif": "Ioc" } }),
            OrderType::TakeProfitMarket | OrderType::TakeProfitLimit => json!({
                "trigger": {
                    "isMarket": params.order_type == OrderType::TakeProfitMarket,
                    "triggerPx": params.trigger_price.map(|p| p.to_string()),
                    "tpsl": "tp",
                }
            }),
            OrderType::StopMarket | OrderType::StopLimit => json!({
                "trigger": {
                    "isMarket": params.order_type == OrderType::StopMarket,
                    "triggerPx": params.trigger_price.map(|p| p.to_string()),
                    "tpsl": "sl",
                }
            }),
        };

        let limit_px = params
            .price
            .or(params.trigger_price)
            .map(|p| p.to_string())
            .unwrap_or_else(|| "0".to_string());

        let action = json!({
            "type": "order",
            "orders": [{
                "a": asset,
                "b": is_buy,
                "p": limit_px,
                "s": size,
                "r": params.reduce_only || params.close_position,
                "t": order_kind,
            }],
            "grouping": "na",
        });

        info!(
            symbol = %params.symbol,
            side = %params.side,
            order_type = %params.order_type,
            close_position = params.close_position,
            "주문 제출"
        );

        let response = self.exchange_request(action).await?;
        let (order_id, state) = Self::extract_order_status(&response, params)?;

        info!(order_id, "주문 접수 완료");
        Ok(OrderResult {
            order_id,
            symbol: params.symbol.clone(),
            side: params.side,
            order_type: params.order_type,
            state,
            quantity: params.quantity,
            executed_quantity: Decimal::ZERO,
            price: params.price,
            average_price: None,
            reduce_only: params.reduce_only,
            created_at: Utc::now(),
        })
    }

    async fn cancel_order(&self, order_id: &str, symbol: &str) -> ExchangeResult<()> {
        let coin = Self::to_coin(symbol);
        let (asset, _) = self.asset_index(&coin).await?;
        let oid: i64 = order_id
            .parse()
            .map_err(|_| ExchangeError::OrderNotFound(order_id.to_string()))?;

        self.exchange_request(json!({
            "type": "cancel",
            "cancels": [{ "a": asset, "o": oid }],
        }))
        .await?;

        info!(order_id, symbol, "주문 취소 완료");
        Ok(())
    }

    async fn cancel_all_orders(&self, symbol: &str) -> ExchangeResult<CancelAllReport> {
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
        let resp: Vec<HlOpenOrder> = self
            .info_request(json!({
                "type": "openOrders",
                "user": self.config.address,
            }))
            .await?;

        let coin_filter = symbol.map(Self::to_coin);
        Ok(resp
            .into_iter()
            .filter(|o| coin_filter.as_deref().map_or(true, |c| o.coin == c))
            .map(Self::open_order_to_result)
            .collect())
    }

    async fn get_order_history(
        &self,
        symbol: Option<&str>,
        limit: u32,
    ) -> ExchangeResult<Vec<OrderResult>> {
        let resp: Vec<HlHistoricalOrder> = self
            .info_request(json!({
                "type": "historicalOrders",
                "user": self.config.address,
            }))
            .await?;

        let coin_filter = symbol.map(Self::to_coin);
        Ok(resp
            .into_iter()
            .filter(|o| coin_filter.as_deref().map_or(true, |c| o.order.coin == c))
            .take(limit as usize)
            .map(|o| {
                let state = Self::historical_state(&o.status);
                let mut result = Self::open_order_to_result(o.order);
                result.state = state;
                result
            })
            .collect())
    }

    async fn get_fills(&self, symbol: Option<&str>, limit: u32) -> ExchangeResult<Vec<Fill>> {
        let resp: Vec<HlFill> = self
            .info_request(json!({
                "type": "userFills",
                "user": self.config.address,
            }))
            .await?;

        let coin_filter = symbol.map(Self::to_coin);
        Ok(resp
            .into_iter()
            .filter(|f| coin_filter.as_deref().map_or(true, |c| f.coin == c))
            .take(limit as usize)
            .map(|f| Fill {
                symbol: Self::to_symbol(&f.coin),
                side: Self::parse_fill_side(&f.side),
                price: Self::parse_decimal(&f.px),
                quantity: Self::parse_decimal(&f.sz),
                fee: Self::parse_decimal(&f.fee),
                executed_at: DateTime::from_timestamp_millis(f.time).unwrap_or_else(Utc::now),
            })
            .collect())
    }

    async fn get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        let coin = Self::to_coin(symbol);
        let tickers = self.get_all_tickers().await?;
        tickers
            .into_iter()
            .find(|t| Self::to_coin(&t.symbol) == coin)
            .ok_or_else(|| ExchangeError::SymbolNotFound(symbol.to_string()))
    }

    async fn get_all_tickers(&self) -> ExchangeResult<Vec<Ticker>> {
        let resp: (HlMeta, Vec<HlAssetCtx>) = self
            .info_request(json!({ "type": "metaAndAssetCtxs" }))
            .await?;
        let (meta, ctxs) = resp;

        Ok(meta
            .universe
            .into_iter()
            .zip(ctxs)
            .map(|(asset, ctx)| {
                let mark = Self::parse_decimal(&ctx.mark_px);
                let prev = Self::parse_decimal(&ctx.prev_day_px);
                let change_pct = if prev.is_zero() {
                    Decimal::ZERO
                } else {
                    (mark - prev) / prev * Decimal::from(100)
                };

                Ticker {
                    symbol: Self::to_symbol(&asset.name),
                    price: mark,
                    change_24h_pct: change_pct,
                    // venue가 24시간 고가/저가를 제공하지 않음
                    high_24h: mark.max(prev),
                    low_24h: mark.min(prev),
                    volume_24h: Self::parse_decimal(&ctx.day_ntl_vlm),
                }
            })
            .collect())
    }

    async fn get_assets(&self) -> ExchangeResult<Vec<SymbolInfo>> {
        let meta: HlMeta = self.info_request(json!({ "type": "meta" })).await?;

        Ok(meta
            .universe
            .into_iter()
            .map(|asset| {
                // 수량 스텝은 10^-szDecimals. 가격 틱은 고정값이 없어 0 (라운딩 생략).
                let quantity_step = Decimal::new(1, asset.sz_decimals);
                SymbolInfo {
                    symbol: Self::to_symbol(&asset.name),
                    base_asset: asset.name,
                    quote_asset: "USDT".to_string(),
                    quantity_step,
                    price_tick: Decimal::ZERO,
                    min_notional: None,
                }
            })
            .collect())
    }

    async fn get_order_book(&self, symbol: &str, depth: u32) -> ExchangeResult<OrderBook> {
        let coin = Self::to_coin(symbol);
        let resp: HlL2Book = self
            .info_request(json!({ "type": "l2Book", "coin": coin }))
            .await?;

        let [bids, asks] = resp.levels;
        let parse_levels = |levels: Vec<HlBookLevel>| {
            levels
                .into_iter()
                .take(depth as usize)
                .map(|level| OrderBookLevel {
                    price: Self::parse_decimal(&level.px),
                    quantity: Self::parse_decimal(&level.sz),
                })
                .collect()
        };

        Ok(OrderBook {
            symbol: symbol.to_string(),
            bids: parse_levels(bids),
            asks: parse_levels(asks),
            fetched_at: Utc::now(),
        })
    }

    async fn get_klines(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> ExchangeResult<Vec<Kline>> {
        let coin = Self::to_coin(symbol);
        let interval_ms: i64 = match timeframe {
            Timeframe::M1 => 60_000,
            Timeframe::M5 => 300_000,
            Timeframe::M15 => 900_000,
            Timeframe::H1 => 3_600_000,
            Timeframe::H4 => 14_400_000,
            Timeframe::D1 => 86_400_000,
        };
        let end_time = Utc::now().timestamp_millis();
        let start_time = end_time - interval_ms * limit as i64;

        let resp: Vec<HlCandle> = self
            .info_request(json!({
                "type": "candleSnapshot",
                "req": {
                    "coin": coin,
                    "interval": timeframe.as_str(),
                    "startTime": start_time,
                    "endTime": end_time,
                },
            }))
            .await?;

        Ok(resp
            .into_iter()
            .map(|k| Kline {
                open_time: DateTime::from_timestamp_millis(k.t).unwrap_or_else(Utc::now),
                open: Self::parse_decimal(&k.o),
                high: Self::parse_decimal(&k.h),
                low: Self::parse_decimal(&k.l),
                close: Self::parse_decimal(&k.c),
                volume: Self::parse_decimal(&k.v),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_coin_mapping() {
        assert_eq!(HyperliquidAdapter::to_coin("BTCUSDT"), "BTC");
        assert_eq!(HyperliquidAdapter::to_coin("ETHUSD"), "ETH");
        assert_eq!(HyperliquidAdapter::to_coin("SOL"), "SOL");
        assert_eq!(HyperliquidAdapter::to_symbol("BTC"), "BTCUSDT");
    }

    #[test]
    fn test_invalid_private_key_rejected() {
        let config = HyperliquidConfig::new("not-hex", "0xabc");
        assert!(matches!(
            HyperliquidAdapter::new(config),
            Err(ExchangeError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_valid_private_key_accepted() {
        let config = HyperliquidConfig::new(
            "0x0123456789012345678901234567890123456789012345678901234567890123",
            "0xabc",
        );
        assert!(HyperliquidAdapter::new(config).is_ok());
    }

    #[test]
    fn test_fill_side_parsing() {
        assert_eq!(HyperliquidAdapter::parse_fill_side("B"), Side::Buy);
        assert_eq!(HyperliquidAdapter::parse_fill_side("A"), Side::Sell);
    }

    #[test]
    fn test_margin_mode_not_supported() {
        let adapter = HyperliquidAdapter::new(HyperliquidConfig::public()).unwrap();
        assert!(!adapter.capabilities().set_margin_mode);
    }

    #[test]
    fn test_historical_state_mapping() {
        assert_eq!(
            HyperliquidAdapter::historical_state("filled"),
            OrderState::Filled
        );
        assert_eq!(
            HyperliquidAdapter::historical_state("canceled"),
            OrderState::Cancelled
        );
        assert_eq!(HyperliquidAdapter::historical_state("open"), OrderState::New);
    }

    // ------------------------------------------------------------------
    // HTTP 동작 테스트 (mockito)
    // ------------------------------------------------------------------

    use rust_decimal_macros::dec;

    const TEST_PRIVATE_KEY: &str =
        "0x0123456789012345678901234567890123456789012345678901234567890123";

    fn adapter_at(base_url: &str) -> HyperliquidAdapter {
        HyperliquidAdapter::new(
            HyperliquidConfig::new(TEST_PRIVATE_KEY, "0xabc").with_base_url(base_url),
        )
        .expect("테스트용 어댑터 생성 실패")
    }

    const META_BODY: &str = r#"{"universe":[
        {"name":"BTC","szDecimals":3,"maxLeverage":50},
        {"name":"ETH","szDecimals":2,"maxLeverage":50}
    ]}"#;

    #[tokio::test]
    async fn test_assets_derive_step_from_sz_decimals() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/info")
            .with_status(200)
            .with_body(META_BODY)
            .create_async()
            .await;

        let assets = adapter_at(&server.url()).get_assets().await.unwrap();

        mock.assert_async().await;
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].symbol, "BTCUSDT");
        assert_eq!(assets[0].quantity_step, dec!(0.001));
        assert_eq!(assets[1].quantity_step, dec!(0.01));
    }

    #[tokio::test]
    async fn test_rate_limit_carries_retry_after() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/info")
            .with_status(429)
            .with_header("Retry-After", "12")
            .with_body("")
            .create_async()
            .await;

        let err = adapter_at(&server.url()).get_assets().await.unwrap_err();

        assert!(matches!(
            err,
            ExchangeError::RateLimited { retry_after_secs: Some(12) }
        ));
    }

    #[tokio::test]
    async fn test_forbidden_maps_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/info")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let err = adapter_at(&server.url()).get_assets().await.unwrap_err();

        assert!(matches!(err, ExchangeError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_order_status_error_maps_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/info")
            .with_status(200)
            .with_body(META_BODY)
            .create_async()
            .await;
        let exchange_mock = server
            .mock("POST", "/exchange")
            .with_status(200)
            .with_body(
                r#"{"status":"ok","response":{"type":"order",
                    "data":{"statuses":[{"error":"Insufficient margin"}]}}}"#,
            )
            .create_async()
            .await;

        let params = OrderParams {
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Market,
            quantity: Some(dec!(0.005)),
            price: None,
            trigger_price: None,
            reduce_only: false,
            close_position: false,
        };

        let err = adapter_at(&server.url()).place_order(&params).await.unwrap_err();

        exchange_mock.assert_async().await;
        match err {
            ExchangeError::OrderRejected { message, params } => {
                assert_eq!(message, "Insufficient margin");
                assert!(params.contains("BTCUSDT"));
            }
            other => panic!("예상과 다른 에러: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resting_order_id_extracted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/info")
            .with_status(200)
            .with_body(META_BODY)
            .create_async()
            .await;
        server
            .mock("POST", "/exchange")
            .with_status(200)
            .with_body(
                r#"{"status":"ok","response":{"type":"order",
                    "data":{"statuses":[{"resting":{"oid":77001}}]}}}"#,
            )
            .create_async()
            .await;

        let params = OrderParams {
            symbol: "ETHUSDT".to_string(),
            side: Side::Sell,
            order_type: OrderType::Limit,
            quantity: Some(dec!(0.5)),
            price: Some(dec!(3000)),
            trigger_price: None,
            reduce_only: false,
            close_position: false,
        };

        let result = adapter_at(&server.url()).place_order(&params).await.unwrap();

        assert_eq!(result.order_id, "77001");
        assert_eq!(result.state, OrderState::New);
    }
}
