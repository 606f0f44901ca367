//! 주문 정규화 엔진.
//!
//! 단위 불문 [`OrderIntent`]를 대상 거래소가 받는 네이티브
//! [`OrderParams`]로 변환합니다. USD→수량 변환과 TP/SL 가격 합성은
//! 모든 진입점이 이 엔진의 단일 구현을 거칩니다.

use gateway_core::{
    ExchangeId, IntentError, OrderIntent, OrderParams, Position, Sizing, SymbolInfo,
};
use gateway_exchange::{AssetCache, ExchangeAdapter, ExchangeError, TickerCache};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::tpsl::trigger_price_from_percent;

/// 정규화 에러.
#[derive(Debug, Error)]
pub enum NormalizationError {
    /// 주문 의도 자체가 잘못됨
    #[error("잘못된 주문 의도: {0}")]
    Intent(#[from] IntentError),

    /// 가격 의존 변환에 필요한 신선한 가격을 얻지 못함
    #[error("신선한 가격을 얻을 수 없습니다: {symbol}")]
    StaleData { symbol: String },

    /// 심볼 메타데이터 없음
    #[error("심볼을 찾을 수 없습니다: {0}")]
    SymbolNotFound(String),

    /// PercentFromEntry 크기 지정인데 해당 심볼의 포지션이 없음
    #[error("열린 포지션이 없습니다: {0}")]
    PositionNotFound(String),

    /// 스텝 라운딩 후 수량이 0이 됨
    #[error("{symbol} 주문 수량이 스텝 크기 미만입니다 (계산값 {computed})")]
    QuantityBelowStep { symbol: String, computed: Decimal },

    /// 거래소 호출 실패
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

/// 주문 정규화 엔진.
///
/// 가격은 시세 캐시에서 읽고, 캐시가 오래되었으면 거래소에서 새로
/// 가져옵니다. 만료된 캐시 항목을 조용히 쓰는 일은 없습니다.
pub struct OrderNormalizer {
    ticker_cache: Arc<TickerCache>,
    asset_cache: Arc<AssetCache>,
}

impl OrderNormalizer {
    pub fn new(ticker_cache: Arc<TickerCache>, asset_cache: Arc<AssetCache>) -> Self {
        Self {
            ticker_cache,
            asset_cache,
        }
    }

    /// 주문 의도를 거래소 네이티브 파라미터로 변환합니다.
    pub async fn normalize(
        &self,
        exchange: ExchangeId,
        adapter: &dyn ExchangeAdapter,
        intent: &OrderIntent,
    ) -> Result<OrderParams, NormalizationError> {
        intent.validate()?;

        let symbol_info = self.symbol_info(exchange, adapter, &intent.symbol).await?;

        match intent.sizing {
            Sizing::BaseQuantity(quantity) => {
                self.quantity_params(intent, &symbol_info, quantity)
            }
            Sizing::UsdNotional(notional) => {
                let price = self.fresh_price(exchange, adapter, &intent.symbol).await?;
                self.quantity_params(intent, &symbol_info, notional / price)
            }
            Sizing::PercentOfMargin(pct) => {
                // 사용 가능 잔고는 캐싱하지 않고 매번 새로 읽습니다.
                let account = adapter.get_account().await?;
                let notional = account.available_balance * pct / dec!(100);
                let price = self.fresh_price(exchange, adapter, &intent.symbol).await?;
                self.quantity_params(intent, &symbol_info, notional / price)
            }
            Sizing::PercentFromEntry(pct) => {
                self.percent_from_entry_params(adapter, intent, &symbol_info, pct)
                    .await
            }
        }
    }

    /// 수량 기반 주문 파라미터 구성. 수량은 항상 스텝으로 내림합니다.
    fn quantity_params(
        &self,
        intent: &OrderIntent,
        symbol_info: &SymbolInfo,
        raw_quantity: Decimal,
    ) -> Result<OrderParams, NormalizationError> {
        let quantity = symbol_info.round_quantity(raw_quantity);
        if quantity.is_zero() {
            return Err(NormalizationError::QuantityBelowStep {
                symbol: intent.symbol.clone(),
                computed: raw_quantity,
            });
        }

        debug!(
            symbol = %intent.symbol,
            %raw_quantity,
            %quantity,
            "수량 스텝 라운딩"
        );

        Ok(OrderParams {
            symbol: intent.symbol.clone(),
            side: intent.side,
            order_type: intent.order_type,
            quantity: Some(quantity),
            price: intent.price,
            trigger_price: intent.trigger_price,
            reduce_only: intent.reduce_only,
            close_position: false,
        })
    }

    /// 진입가 대비 퍼센트 크기 지정: 전체 청산 TP/SL 주문을 합성합니다.
    ///
    /// 트리거 가격은 포지션 진입가와 청산 방향에서 계산하며, 수량 필드는
    /// 비웁니다 (전체 청산 플래그와 수량을 함께 보내면 거래소 검증 오류).
    async fn percent_from_entry_params(
        &self,
        adapter: &dyn ExchangeAdapter,
        intent: &OrderIntent,
        symbol_info: &SymbolInfo,
        pct: Decimal,
    ) -> Result<OrderParams, NormalizationError> {
        let position = self.find_position(adapter, &intent.symbol).await?;

        let trigger = trigger_price_from_percent(position.entry_price, intent.side, pct);
        let trigger = symbol_info.round_price(trigger, gateway_core::RoundMethod::Round);

        Ok(OrderParams {
            symbol: intent.symbol.clone(),
            side: intent.side,
            order_type: intent.order_type,
            quantity: None,
            price: intent.price,
            trigger_price: Some(trigger),
            reduce_only: true,
            close_position: true,
        })
    }

    async fn find_position(
        &self,
        adapter: &dyn ExchangeAdapter,
        symbol: &str,
    ) -> Result<Position, NormalizationError> {
        let positions = adapter.get_positions().await?;
        positions
            .into_iter()
            .find(|p| p.symbol == symbol)
            .ok_or_else(|| NormalizationError::PositionNotFound(symbol.to_string()))
    }

    /// 신선한 가격을 얻습니다. 캐시 미스(만료 포함)면 거래소에서 새로
    /// 가져와 캐시를 채우고, 그것도 실패하면 `StaleData`로 실패합니다.
    async fn fresh_price(
        &self,
        exchange: ExchangeId,
        adapter: &dyn ExchangeAdapter,
        symbol: &str,
    ) -> Result<Decimal, NormalizationError> {
        if let Some(ticker) = self.ticker_cache.get(exchange, symbol).await {
            return Ok(ticker.price);
        }

        debug!(exchange = %exchange, symbol, "시세 캐시 미스, 거래소에서 재조회");
        let ticker = adapter
            .get_ticker(symbol)
            .await
            .map_err(|_| NormalizationError::StaleData {
                symbol: symbol.to_string(),
            })?;

        let price = ticker.price;
        if price.is_zero() {
            return Err(NormalizationError::StaleData {
                symbol: symbol.to_string(),
            });
        }

        self.ticker_cache.insert(exchange, ticker).await;
        Ok(price)
    }

    async fn symbol_info(
        &self,
        exchange: ExchangeId,
        adapter: &dyn ExchangeAdapter,
        symbol: &str,
    ) -> Result<SymbolInfo, NormalizationError> {
        if let Some(info) = self.asset_cache.get_symbol(exchange, symbol).await {
            return Ok(info);
        }

        let assets = adapter.get_assets().await?;
        self.asset_cache.replace(exchange, assets).await;

        self.asset_cache
            .get_symbol(exchange, symbol)
            .await
            .ok_or_else(|| NormalizationError::SymbolNotFound(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gateway_core::{
        AccountInfo, CancelAllReport, Fill, Kline, MarginAdjustment, MarginMode, OrderBook,
        OrderResult, OrderState, OrderType, Side, SpotBalance, Ticker, Timeframe,
    };
    use gateway_exchange::{AdapterCapabilities, ExchangeResult};
    use std::sync::Mutex;

    /// 테스트용 고정 응답 어댑터.
    struct FakeAdapter {
        price: Decimal,
        available_balance: Decimal,
        positions: Vec<Position>,
        ticker_calls: Mutex<u32>,
    }

    impl FakeAdapter {
        fn new(price: Decimal) -> Self {
            Self {
                price,
                available_balance: dec!(1000),
                positions: vec![],
                ticker_calls: Mutex::new(0),
            }
        }

        fn with_position(mut self, position: Position) -> Self {
            self.positions.push(position);
            self
        }
    }

    #[async_trait]
    impl ExchangeAdapter for FakeAdapter {
        fn name(&self) -> &str {
            "fake"
        }

        fn capabilities(&self) -> AdapterCapabilities {
            AdapterCapabilities {
                set_margin_mode: true,
                update_position_margin: true,
                spot_balances: true,
            }
        }

        async fn get_account(&self) -> ExchangeResult<AccountInfo> {
            Ok(AccountInfo {
                total_balance: self.available_balance,
                available_balance: self.available_balance,
                margin_used: Decimal::ZERO,
                unrealized_pnl: Decimal::ZERO,
            })
        }

        async fn get_spot_balances(&self) -> ExchangeResult<Vec<SpotBalance>> {
            Ok(vec![])
        }

        async fn get_positions(&self) -> ExchangeResult<Vec<Position>> {
            Ok(self.positions.clone())
        }

        async fn set_leverage(&self, _: &str, _: u32) -> ExchangeResult<()> {
            Ok(())
        }

        async fn set_margin_mode(&self, _: &str, _: MarginMode) -> ExchangeResult<()> {
            Ok(())
        }

        async fn update_position_margin(
            &self,
            _: &str,
            _: Decimal,
            _: MarginAdjustment,
        ) -> ExchangeResult<()> {
            Ok(())
        }

        async fn place_order(&self, params: &OrderParams) -> ExchangeResult<OrderResult> {
            Ok(OrderResult {
                order_id: "1".to_string(),
                symbol: params.symbol.clone(),
                side: params.side,
                order_type: params.order_type,
                state: OrderState::New,
                quantity: params.quantity,
                executed_quantity: Decimal::ZERO,
                price: params.price,
                average_price: None,
                reduce_only: params.reduce_only,
                created_at: chrono::Utc::now(),
            })
        }

        async fn cancel_order(&self, _: &str, _: &str) -> ExchangeResult<()> {
            Ok(())
        }

        async fn cancel_all_orders(&self, _: &str) -> ExchangeResult<CancelAllReport> {
            Ok(CancelAllReport::default())
        }

        async fn get_open_orders(&self, _: Option<&str>) -> ExchangeResult<Vec<OrderResult>> {
            Ok(vec![])
        }

        async fn get_order_history(
            &self,
            _: Option<&str>,
            _: u32,
        ) -> ExchangeResult<Vec<OrderResult>> {
            Ok(vec![])
        }

        async fn get_fills(&self, _: Option<&str>, _: u32) -> ExchangeResult<Vec<Fill>> {
            Ok(vec![])
        }

        async fn get_ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
            *self.ticker_calls.lock().unwrap() += 1;
            Ok(Ticker {
                symbol: symbol.to_string(),
                price: self.price,
                change_24h_pct: Decimal::ZERO,
                high_24h: self.price,
                low_24h: self.price,
                volume_24h: Decimal::ZERO,
            })
        }

        async fn get_all_tickers(&self) -> ExchangeResult<Vec<Ticker>> {
            Ok(vec![])
        }

        async fn get_assets(&self) -> ExchangeResult<Vec<SymbolInfo>> {
            Ok(vec![SymbolInfo {
                symbol: "BTCUSDT".to_string(),
                base_asset: "BTC".to_string(),
                quote_asset: "USDT".to_string(),
                quantity_step: dec!(0.001),
                price_tick: dec!(0.1),
                min_notional: None,
            }])
        }

        async fn get_order_book(&self, _: &str, _: u32) -> ExchangeResult<OrderBook> {
            Err(ExchangeError::NotSupported("test".to_string()))
        }

        async fn get_klines(
            &self,
            _: &str,
            _: Timeframe,
            _: u32,
        ) -> ExchangeResult<Vec<Kline>> {
            Ok(vec![])
        }
    }

    fn normalizer() -> OrderNormalizer {
        OrderNormalizer::new(
            Arc::new(TickerCache::default()),
            Arc::new(AssetCache::default()),
        )
    }

    fn intent(sizing: Sizing) -> OrderIntent {
        OrderIntent {
            symbol: "BTCUSDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Market,
            sizing,
            price: None,
            trigger_price: None,
            reduce_only: false,
            leverage: None,
            margin_mode: None,
        }
    }

    #[tokio::test]
    async fn test_usd_notional_sizing() {
        // $100 @ $50,000, 스텝 0.001 -> 0.002
        let adapter = FakeAdapter::new(dec!(50000));
        let params = normalizer()
            .normalize(
                ExchangeId::Aster,
                &adapter,
                &intent(Sizing::UsdNotional(dec!(100))),
            )
            .await
            .unwrap();

        assert_eq!(params.quantity, Some(dec!(0.002)));
        // 역변환이 한 스텝어치($50) 이내로 $100에 머무름
        let back = params.quantity.unwrap() * dec!(50000);
        assert!((back - dec!(100)).abs() <= dec!(0.001) * dec!(50000));
    }

    #[tokio::test]
    async fn test_base_quantity_rounds_down() {
        let adapter = FakeAdapter::new(dec!(50000));
        let params = normalizer()
            .normalize(
                ExchangeId::Aster,
                &adapter,
                &intent(Sizing::BaseQuantity(dec!(0.0025))),
            )
            .await
            .unwrap();

        assert_eq!(params.quantity, Some(dec!(0.002)));
    }

    #[tokio::test]
    async fn test_percent_of_margin_reduces_to_notional() {
        // 잔고 $1000의 50% = $500 @ $50,000 -> 0.01
        let adapter = FakeAdapter::new(dec!(50000));
        let params = normalizer()
            .normalize(
                ExchangeId::Aster,
                &adapter,
                &intent(Sizing::PercentOfMargin(dec!(50))),
            )
            .await
            .unwrap();

        assert_eq!(params.quantity, Some(dec!(0.01)));
    }

    #[tokio::test]
    async fn test_quantity_below_step_rejected() {
        // $10 @ $50,000 = 0.0002 -> 스텝 0.001 미만
        let adapter = FakeAdapter::new(dec!(50000));
        let err = normalizer()
            .normalize(
                ExchangeId::Aster,
                &adapter,
                &intent(Sizing::UsdNotional(dec!(10))),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, NormalizationError::QuantityBelowStep { .. }));
    }

    #[tokio::test]
    async fn test_cached_price_skips_exchange_call() {
        let adapter = FakeAdapter::new(dec!(50000));
        let ticker_cache = Arc::new(TickerCache::default());
        ticker_cache
            .insert(
                ExchangeId::Aster,
                Ticker {
                    symbol: "BTCUSDT".to_string(),
                    price: dec!(50000),
                    change_24h_pct: Decimal::ZERO,
                    high_24h: dec!(50000),
                    low_24h: dec!(50000),
                    volume_24h: Decimal::ZERO,
                },
            )
            .await;

        let normalizer = OrderNormalizer::new(ticker_cache, Arc::new(AssetCache::default()));
        normalizer
            .normalize(
                ExchangeId::Aster,
                &adapter,
                &intent(Sizing::UsdNotional(dec!(100))),
            )
            .await
            .unwrap();

        assert_eq!(*adapter.ticker_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_percent_from_entry_synthesizes_close_order() {
        let position = Position {
            symbol: "BTCUSDT".to_string(),
            signed_size: dec!(1),
            entry_price: dec!(100),
            mark_price: dec!(100),
            leverage: 10,
            margin_mode: MarginMode::Cross,
            liquidation_price: None,
            unrealized_pnl: Decimal::ZERO,
            notional: dec!(100),
        };
        let adapter = FakeAdapter::new(dec!(100)).with_position(position);

        let mut tp_intent = intent(Sizing::PercentFromEntry(dec!(10)));
        tp_intent.side = Side::Sell;
        tp_intent.order_type = OrderType::TakeProfitMarket;

        let params = normalizer()
            .normalize(ExchangeId::Aster, &adapter, &tp_intent)
            .await
            .unwrap();

        assert!(params.close_position);
        assert!(params.quantity.is_none());
        assert_eq!(params.trigger_price, Some(dec!(110)));
    }

    #[tokio::test]
    async fn test_percent_from_entry_without_position_fails() {
        let adapter = FakeAdapter::new(dec!(100));

        let mut tp_intent = intent(Sizing::PercentFromEntry(dec!(10)));
        tp_intent.order_type = OrderType::TakeProfitMarket;

        let err = normalizer()
            .normalize(ExchangeId::Aster, &adapter, &tp_intent)
            .await
            .unwrap_err();

        assert!(matches!(err, NormalizationError::PositionNotFound(_)));
    }
}
