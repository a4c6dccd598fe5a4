use crate::config::ExchangeConfig;
use crate::error::{ExchangeError, ExchangeResult};
use crate::models::*;
use crate::traits::ExchangeApi;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Markets loaded for one exchange, indexed by unified symbol and by exchange id.
#[derive(Debug, Clone)]
pub struct MarketCache {
    by_symbol: BTreeMap<String, Market>,
    symbol_by_id: HashMap<String, String>,
}

impl MarketCache {
    pub fn new(markets: Vec<Market>) -> Self {
        let mut by_symbol = BTreeMap::new();
        let mut symbol_by_id = HashMap::new();
        for market in markets {
            symbol_by_id.insert(market.id.clone(), market.symbol.clone());
            by_symbol.insert(market.symbol.clone(), market);
        }
        Self {
            by_symbol,
            symbol_by_id,
        }
    }

    /// Resolve a unified symbol, falling back to the exchange-specific id.
    pub fn get(&self, symbol: &str) -> Option<&Market> {
        self.by_symbol.get(symbol).or_else(|| {
            self.symbol_by_id
                .get(symbol)
                .and_then(|unified| self.by_symbol.get(unified))
        })
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.by_symbol.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

/// A configured client session for one exchange.
///
/// Wraps the exchange's [`ExchangeApi`] with a market cache. Loads are
/// serialized through the cache lock, so concurrent callers on the same
/// session trigger at most one network load. A failed load leaves the cache
/// empty and is retried by the next caller.
pub struct Exchange {
    api: Box<dyn ExchangeApi>,
    config: ExchangeConfig,
    markets: Mutex<Option<Arc<MarketCache>>>,
}

impl Exchange {
    pub fn new(api: Box<dyn ExchangeApi>, config: ExchangeConfig) -> Self {
        Self {
            api,
            config,
            markets: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        self.api.id()
    }

    pub fn name(&self) -> &str {
        self.api.name()
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Load markets, returning the cached set unless `reload` is set.
    pub async fn load_markets(&self, reload: bool) -> ExchangeResult<Arc<MarketCache>> {
        let mut cached = self.markets.lock().await;
        if !reload {
            if let Some(cache) = cached.as_ref() {
                return Ok(Arc::clone(cache));
            }
        }

        debug!(exchange = %self.id(), reload, "Loading markets");
        let markets = self.api.fetch_markets().await?;
        let cache = Arc::new(MarketCache::new(markets));
        info!(exchange = %self.id(), markets = cache.len(), "Markets loaded");
        *cached = Some(Arc::clone(&cache));
        Ok(cache)
    }

    /// Whether a successful market load is cached.
    pub async fn markets_loaded(&self) -> bool {
        self.markets.lock().await.is_some()
    }

    /// Resolve a symbol against the loaded markets.
    pub async fn market(&self, symbol: &str) -> ExchangeResult<Market> {
        let cache = self.load_markets(false).await?;
        cache
            .get(symbol)
            .cloned()
            .ok_or_else(|| ExchangeError::bad_symbol(self.id(), symbol))
    }

    /// Fetch markets straight from the exchange (bypasses the cache).
    pub async fn fetch_markets(&self) -> ExchangeResult<Vec<Market>> {
        self.api.fetch_markets().await
    }

    pub async fn fetch_currencies(&self) -> ExchangeResult<Currencies> {
        self.api.fetch_currencies().await
    }

    pub async fn fetch_ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        let market = self.market(symbol).await?;
        self.api.fetch_ticker(&market).await
    }
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange").field("id", &self.id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingApi {
        loads: Arc<AtomicUsize>,
        failures_left: AtomicUsize,
    }

    #[async_trait]
    impl ExchangeApi for CountingApi {
        fn id(&self) -> &str {
            "counting"
        }

        fn name(&self) -> &str {
            "Counting"
        }

        async fn fetch_markets(&self) -> ExchangeResult<Vec<Market>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(ExchangeError::Network("connection reset".to_string()));
            }
            Ok(vec![
                Market::spot("XBTUSD", "XBT", "USD", serde_json::Value::Null),
                Market::spot("ETHUSD", "ETH", "USD", serde_json::Value::Null),
            ])
        }

        async fn fetch_currencies(&self) -> ExchangeResult<Currencies> {
            Ok(Currencies::new())
        }

        async fn fetch_ticker(&self, market: &Market) -> ExchangeResult<Ticker> {
            let mut ticker = Ticker::new(&market.symbol, Utc::now(), serde_json::Value::Null);
            ticker.last = Some(dec!(42));
            Ok(ticker)
        }
    }

    /// Build a session whose api fails its first `failures` market loads.
    fn session(failures: usize) -> (Arc<Exchange>, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let api = CountingApi {
            loads: Arc::clone(&loads),
            failures_left: AtomicUsize::new(failures),
        };
        let config = ExchangeConfig::merged(&serde_json::json!({}), &serde_json::json!({}));
        (Arc::new(Exchange::new(Box::new(api), config)), loads)
    }

    #[tokio::test]
    async fn test_load_markets_is_cached() {
        let (exchange, api) = session(0);
        let first = exchange.load_markets(false).await.unwrap();
        let second = exchange.load_markets(false).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(api.load(Ordering::SeqCst), 1);

        exchange.load_markets(true).await.unwrap();
        assert_eq!(api.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let (exchange, api) = session(1);
        let err = exchange.load_markets(false).await.unwrap_err();
        assert_eq!(err, ExchangeError::Network("connection reset".to_string()));
        assert!(!exchange.markets_loaded().await);

        exchange.load_markets(false).await.unwrap();
        assert!(exchange.markets_loaded().await);
        assert_eq!(api.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_loads_hit_api_once() {
        let (exchange, api) = session(0);
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let exchange = Arc::clone(&exchange);
                tokio::spawn(async move { exchange.load_markets(false).await.map(|c| c.len()) })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 2);
        }
        assert_eq!(api.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_ticker_resolves_symbol_and_id() {
        let (exchange, _) = session(0);
        let ticker = exchange.fetch_ticker("BTC/USD").await.unwrap();
        assert_eq!(ticker.symbol, "BTC/USD");
        assert_eq!(ticker.last, Some(dec!(42)));

        let by_id = exchange.fetch_ticker("ETHUSD").await.unwrap();
        assert_eq!(by_id.symbol, "ETH/USD");
    }

    #[tokio::test]
    async fn test_fetch_ticker_unknown_symbol() {
        let (exchange, _) = session(0);
        let err = exchange.fetch_ticker("DOGE/EUR").await.unwrap_err();
        assert_eq!(err.to_string(), "counting does not have market symbol DOGE/EUR");
    }
}
