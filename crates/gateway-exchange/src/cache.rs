//! 시장 데이터 인메모리 캐시.
//!
//! 거래소 요청 한도 보호를 위한 짧은 TTL 캐시입니다. 항목은 통째로
//! 교체되며 제자리에서 변경되지 않으므로, 약간 오래된 동시 읽기를
//! 허용하고 마지막 기록이 이깁니다.
//!
//! TTL을 넘긴 항목은 부재로 취급되며 절대 반환되지 않습니다.

use gateway_core::{ExchangeId, SymbolInfo, Ticker};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::traits::ExchangeAdapter;

/// 시세 캐시 TTL.
pub const TICKER_CACHE_TTL: Duration = Duration::from_secs(30);

/// 심볼 메타데이터 캐시 TTL. 거래 규칙은 자주 바뀌지 않습니다.
pub const ASSET_CACHE_TTL: Duration = Duration::from_secs(600);

struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// 거래소별 시세 캐시.
pub struct TickerCache {
    ttl: Duration,
    entries: RwLock<HashMap<(ExchangeId, String), CacheEntry<Ticker>>>,
}

impl Default for TickerCache {
    fn default() -> Self {
        Self::new(TICKER_CACHE_TTL)
    }
}

impl TickerCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 신선한 시세를 조회합니다. TTL을 넘긴 항목은 미스입니다.
    pub async fn get(&self, exchange: ExchangeId, symbol: &str) -> Option<Ticker> {
        let entries = self.entries.read().await;
        entries
            .get(&(exchange, symbol.to_string()))
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// 시세를 저장합니다. 기존 항목은 통째로 교체됩니다.
    pub async fn insert(&self, exchange: ExchangeId, ticker: Ticker) {
        let key = (exchange, ticker.symbol.clone());
        let entry = CacheEntry {
            value: ticker,
            fetched_at: Instant::now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// 한 거래소의 전체 시세를 교체합니다.
    pub async fn replace_all(&self, exchange: ExchangeId, tickers: Vec<Ticker>) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|(ex, _), _| *ex != exchange);
        for ticker in tickers {
            entries.insert(
                (exchange, ticker.symbol.clone()),
                CacheEntry {
                    value: ticker,
                    fetched_at: now,
                },
            );
        }
    }

    /// 만료된 항목을 제거합니다. 정확성이 아닌 메모리 위생용입니다.
    pub async fn evict_expired(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_fresh(self.ttl));
    }
}

/// 거래소별 심볼 메타데이터 캐시.
pub struct AssetCache {
    ttl: Duration,
    entries: RwLock<HashMap<ExchangeId, CacheEntry<Vec<SymbolInfo>>>>,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new(ASSET_CACHE_TTL)
    }
}

impl AssetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// 거래소의 신선한 심볼 목록을 조회합니다.
    pub async fn get(&self, exchange: ExchangeId) -> Option<Vec<SymbolInfo>> {
        let entries = self.entries.read().await;
        entries
            .get(&exchange)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.value.clone())
    }

    /// 심볼 하나의 메타데이터를 조회합니다.
    pub async fn get_symbol(&self, exchange: ExchangeId, symbol: &str) -> Option<SymbolInfo> {
        let entries = self.entries.read().await;
        entries
            .get(&exchange)
            .filter(|entry| entry.is_fresh(self.ttl))
            .and_then(|entry| entry.value.iter().find(|info| info.symbol == symbol).cloned())
    }

    /// 거래소의 심볼 목록을 통째로 교체합니다.
    pub async fn replace(&self, exchange: ExchangeId, assets: Vec<SymbolInfo>) {
        let entry = CacheEntry {
            value: assets,
            fetched_at: Instant::now(),
        };
        self.entries.write().await.insert(exchange, entry);
    }
}

/// 시세/심볼 메타데이터 새로고침 루프를 시작합니다.
///
/// 두 루프는 서로 독립적이며 요청 처리를 막지 않습니다. 한 거래소의
/// 새로고침 실패는 경고만 남기고 다음 주기에 다시 시도합니다.
pub fn spawn_refresh_tasks(
    ticker_cache: Arc<TickerCache>,
    asset_cache: Arc<AssetCache>,
    adapters: Vec<(ExchangeId, Arc<dyn ExchangeAdapter>)>,
    shutdown: CancellationToken,
) {
    let ticker_adapters = adapters.clone();
    let ticker_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICKER_CACHE_TTL / 2);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker_shutdown.cancelled() => {
                    debug!("시세 새로고침 루프 종료");
                    break;
                }
                _ = interval.tick() => {
                    for (exchange, adapter) in &ticker_adapters {
                        match adapter.get_all_tickers().await {
                            Ok(tickers) => {
                                debug!(exchange = %exchange, count = tickers.len(), "시세 캐시 갱신");
                                ticker_cache.replace_all(*exchange, tickers).await;
                            }
                            Err(e) => {
                                warn!(exchange = %exchange, error = %e, "시세 새로고침 실패");
                            }
                        }
                    }
                }
            }
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(ASSET_CACHE_TTL / 2);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("심볼 메타데이터 새로고침 루프 종료");
                    break;
                }
                _ = interval.tick() => {
                    for (exchange, adapter) in &adapters {
                        match adapter.get_assets().await {
                            Ok(assets) => {
                                debug!(exchange = %exchange, count = assets.len(), "심볼 메타데이터 갱신");
                                asset_cache.replace(*exchange, assets).await;
                            }
                            Err(e) => {
                                warn!(exchange = %exchange, error = %e, "심볼 메타데이터 새로고침 실패");
                            }
                        }
                    }
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ticker(symbol: &str) -> Ticker {
        Ticker {
            symbol: symbol.to_string(),
            price: dec!(50000),
            change_24h_pct: dec!(1.5),
            high_24h: dec!(51000),
            low_24h: dec!(49000),
            volume_24h: dec!(1234),
        }
    }

    #[tokio::test]
    async fn test_fresh_entry_served() {
        let cache = TickerCache::default();
        cache.insert(ExchangeId::Aster, ticker("BTCUSDT")).await;

        let hit = cache.get(ExchangeId::Aster, "BTCUSDT").await;
        assert_eq!(hit.map(|t| t.price), Some(dec!(50000)));
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        // TTL 0이면 저장 즉시 만료
        let cache = TickerCache::new(Duration::ZERO);
        cache.insert(ExchangeId::Aster, ticker("BTCUSDT")).await;

        assert!(cache.get(ExchangeId::Aster, "BTCUSDT").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = TickerCache::new(Duration::from_secs(30));
        cache.insert(ExchangeId::Aster, ticker("BTCUSDT")).await;

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.get(ExchangeId::Aster, "BTCUSDT").await.is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(ExchangeId::Aster, "BTCUSDT").await.is_none());
    }

    #[tokio::test]
    async fn test_exchanges_are_isolated() {
        let cache = TickerCache::default();
        cache.insert(ExchangeId::Aster, ticker("BTCUSDT")).await;

        assert!(cache.get(ExchangeId::Hyperliquid, "BTCUSDT").await.is_none());
    }

    #[tokio::test]
    async fn test_replace_all_drops_stale_symbols() {
        let cache = TickerCache::default();
        cache.insert(ExchangeId::Aster, ticker("ETHUSDT")).await;
        cache
            .replace_all(ExchangeId::Aster, vec![ticker("BTCUSDT")])
            .await;

        assert!(cache.get(ExchangeId::Aster, "BTCUSDT").await.is_some());
        assert!(cache.get(ExchangeId::Aster, "ETHUSDT").await.is_none());
    }

    #[tokio::test]
    async fn test_asset_cache_symbol_lookup() {
        let cache = AssetCache::default();
        cache
            .replace(
                ExchangeId::Aster,
                vec![SymbolInfo {
                    symbol: "BTCUSDT".to_string(),
                    base_asset: "BTC".to_string(),
                    quote_asset: "USDT".to_string(),
                    quantity_step: dec!(0.001),
                    price_tick: dec!(0.1),
                    min_notional: None,
                }],
            )
            .await;

        let info = cache.get_symbol(ExchangeId::Aster, "BTCUSDT").await;
        assert_eq!(info.map(|i| i.quantity_step), Some(dec!(0.001)));
        assert!(cache.get_symbol(ExchangeId::Aster, "DOGEUSDT").await.is_none());
    }
}
