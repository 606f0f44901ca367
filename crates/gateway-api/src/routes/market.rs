//! 시장 데이터 endpoint (공개, 인증 불필요).
//!
//! - `GET /ticker/{symbol}?exchange=` - 24시간 시세 (캐시 우선)
//! - `GET /assets?exchange=` - 거래 가능 심볼 메타데이터
//! - `GET /assets/search?q=&exchange=` - 심볼 검색
//! - `GET /orderbook/{symbol}?exchange=&depth=` - 호가창
//! - `GET /ohlcv/{symbol}?exchange=&tf=&limit=` - 캔들스틱

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Router;
use gateway_core::{ExchangeId, Kline, OrderBook, SymbolInfo, Ticker, Timeframe};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ok, ApiError, ApiResult};
use crate::state::AppState;

/// 공개 시장 데이터 라우트의 대상 거래소. 세션이 없으므로 명시해야 합니다.
#[derive(Debug, Deserialize)]
pub struct PublicExchangeQuery {
    pub exchange: ExchangeId,
}

/// 호가창 조회 쿼리.
#[derive(Debug, Deserialize)]
pub struct OrderBookQuery {
    pub exchange: ExchangeId,
    #[serde(default)]
    pub depth: Option<u32>,
}

/// 캔들 조회 쿼리.
#[derive(Debug, Deserialize)]
pub struct OhlcvQuery {
    pub exchange: ExchangeId,
    /// 타임프레임 표기 (1m/5m/15m/1h/4h/1d)
    #[serde(default)]
    pub tf: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// 심볼 검색 쿼리.
#[derive(Debug, Deserialize)]
pub struct AssetSearchQuery {
    pub q: String,
    /// 없으면 전체 거래소에서 검색
    #[serde(default)]
    pub exchange: Option<ExchangeId>,
}

/// 심볼 검색 결과 항목.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSearchHit {
    pub exchange: ExchangeId,
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
}

/// GET /ticker/{symbol}?exchange=
///
/// 캐시의 신선한 항목을 우선 사용하고, 미스(만료 포함)면 거래소에서
/// 새로 가져와 캐시를 채웁니다.
async fn get_ticker(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<PublicExchangeQuery>,
) -> ApiResult<Ticker> {
    if let Some(ticker) = state.ticker_cache.get(query.exchange, &symbol).await {
        return Ok(ok(ticker));
    }

    let adapter = state.factory.create_public_adapter(query.exchange)?;
    let ticker = adapter.get_ticker(&symbol).await?;
    state.ticker_cache.insert(query.exchange, ticker.clone()).await;
    Ok(ok(ticker))
}

/// 캐시에서 심볼 목록을 읽고, 미스면 거래소에서 가져와 채웁니다.
async fn cached_assets(
    state: &AppState,
    exchange: ExchangeId,
) -> Result<Vec<SymbolInfo>, ApiError> {
    if let Some(assets) = state.asset_cache.get(exchange).await {
        return Ok(assets);
    }

    let adapter = state.factory.create_public_adapter(exchange)?;
    let assets = adapter.get_assets().await?;
    state.asset_cache.replace(exchange, assets.clone()).await;
    Ok(assets)
}

/// GET /assets?exchange=
async fn get_assets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PublicExchangeQuery>,
) -> ApiResult<Vec<SymbolInfo>> {
    let assets = cached_assets(&state, query.exchange).await?;
    Ok(ok(assets))
}

/// GET /assets/search?q=&exchange=
///
/// 심볼 또는 기초 자산 이름에 대한 대소문자 무시 부분 일치 검색입니다.
async fn search_assets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AssetSearchQuery>,
) -> ApiResult<Vec<AssetSearchHit>> {
    let needle = query.q.trim().to_uppercase();
    if needle.is_empty() {
        return Err(ApiError::BadRequest("검색어가 비어 있습니다".to_string()));
    }

    let scope: Vec<ExchangeId> = match query.exchange {
        Some(exchange) => vec![exchange],
        None => ExchangeId::ALL.to_vec(),
    };

    let mut hits = Vec::new();
    for exchange in scope {
        let assets = cached_assets(&state, exchange).await?;
        hits.extend(
            assets
                .into_iter()
                .filter(|info| {
                    info.symbol.to_uppercase().contains(&needle)
                        || info.base_asset.to_uppercase().contains(&needle)
                })
                .map(|info| AssetSearchHit {
                    exchange,
                    symbol: info.symbol,
                    base_asset: info.base_asset,
                    quote_asset: info.quote_asset,
                }),
        );
    }
    hits.truncate(50);
    Ok(ok(hits))
}

/// GET /orderbook/{symbol}?exchange=&depth=
async fn get_order_book(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<OrderBookQuery>,
) -> ApiResult<OrderBook> {
    let adapter = state.factory.create_public_adapter(query.exchange)?;
    let book = adapter
        .get_order_book(&symbol, query.depth.unwrap_or(20))
        .await?;
    Ok(ok(book))
}

/// GET /ohlcv/{symbol}?exchange=&tf=&limit=
async fn get_ohlcv(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<OhlcvQuery>,
) -> ApiResult<Vec<Kline>> {
    let timeframe = match query.tf.as_deref() {
        Some(tf) => tf
            .parse::<Timeframe>()
            .map_err(ApiError::BadRequest)?,
        None => Timeframe::H1,
    };

    let adapter = state.factory.create_public_adapter(query.exchange)?;
    let klines = adapter
        .get_klines(&symbol, timeframe, query.limit.unwrap_or(100))
        .await?;
    Ok(ok(klines))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ticker/{symbol}", get(get_ticker))
        .route("/assets", get(get_assets))
        .route("/assets/search", get(search_assets))
        .route("/orderbook/{symbol}", get(get_order_book))
        .route("/ohlcv/{symbol}", get(get_ohlcv))
}
