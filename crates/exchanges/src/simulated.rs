use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use xbridge_core::*;

use crate::parse::decimal;

/// Default description, deep-extended with the caller's config.
pub fn describe() -> Value {
    json!({
        "id": "simulated",
        "name": "Simulated Exchange",
        "timeout": DEFAULT_TIMEOUT_MS,
        "options": {
            "markets": ["BTC/USD", "ETH/USD", "ETH/BTC"],
            "prices": {
                "BTC/USD": "65000",
                "ETH/USD": "3200",
                "ETH/BTC": "0.05",
            },
            "errors": {},
            "latencyMs": 0,
        },
    })
}

/// Configuration for the simulated exchange.
///
/// Read from the `options` object of the merged exchange config.
#[derive(Debug, Clone)]
pub struct SimulatedExchangeConfig {
    /// Unified symbols to list.
    pub markets: Vec<String>,
    /// Last price per symbol. Unlisted symbols trade at 1.
    pub prices: BTreeMap<String, Decimal>,
    /// Operation name (`fetchMarkets`, `fetchCurrencies`, `fetchTicker`) to
    /// the message that operation fails with.
    pub errors: BTreeMap<String, String>,
    /// Artificial delay applied to every call.
    pub latency: Duration,
}

impl Default for SimulatedExchangeConfig {
    fn default() -> Self {
        Self::from_config(&ExchangeConfig::merged(&describe(), &json!({})))
    }
}

impl SimulatedExchangeConfig {
    pub fn from_config(config: &ExchangeConfig) -> Self {
        let markets = config
            .option("markets")
            .and_then(Value::as_array)
            .map(|symbols| {
                symbols
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|s| s.contains('/'))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let prices = config
            .option("prices")
            .and_then(Value::as_object)
            .map(|prices| {
                prices
                    .iter()
                    .filter_map(|(symbol, price)| decimal(price).map(|p| (symbol.clone(), p)))
                    .collect()
            })
            .unwrap_or_default();

        let errors = config
            .option("errors")
            .and_then(Value::as_object)
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|(op, msg)| msg.as_str().map(|m| (op.clone(), m.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        let latency = config
            .option("latencyMs")
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
            .unwrap_or_default();

        Self {
            markets,
            prices,
            errors,
            latency,
        }
    }
}

/// An in-memory exchange with deterministic data.
///
/// Serves fixed markets and prices, and fails any operation listed in the
/// config's `errors` with the configured message.
pub struct SimulatedExchange {
    config: SimulatedExchangeConfig,
}

impl SimulatedExchange {
    pub fn new(config: SimulatedExchangeConfig) -> Self {
        Self { config }
    }

    /// Apply latency, then fail if `operation` is configured to fail.
    async fn simulate(&self, operation: &str) -> ExchangeResult<()> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        match self.config.errors.get(operation) {
            Some(message) => Err(ExchangeError::Api(message.clone())),
            None => Ok(()),
        }
    }

    fn markets(&self) -> Vec<Market> {
        self.config
            .markets
            .iter()
            .filter_map(|symbol| {
                let (base, quote) = symbol.split_once('/')?;
                let id = format!("{}{}", base, quote);
                let mut market = Market::spot(&id, base, quote, json!({"symbol": id}));
                market.precision.amount = Some(Decimal::new(1, 8));
                market.precision.price = Some(Decimal::new(1, 2));
                market.limits.amount.min = Some(Decimal::new(1, 4));
                Some(market)
            })
            .collect()
    }

    fn price(&self, symbol: &str) -> Decimal {
        self.config
            .prices
            .get(symbol)
            .copied()
            .unwrap_or(Decimal::ONE)
    }
}

#[async_trait]
impl ExchangeApi for SimulatedExchange {
    fn id(&self) -> &str {
        "simulated"
    }

    fn name(&self) -> &str {
        "Simulated Exchange"
    }

    async fn fetch_markets(&self) -> ExchangeResult<Vec<Market>> {
        self.simulate("fetchMarkets").await?;
        Ok(self.markets())
    }

    async fn fetch_currencies(&self) -> ExchangeResult<Currencies> {
        self.simulate("fetchCurrencies").await?;
        let mut currencies = Currencies::new();
        for market in self.markets() {
            for code in [market.base, market.quote] {
                currencies.entry(code.clone()).or_insert_with(|| Currency {
                    id: code.clone(),
                    code: code.clone(),
                    name: Some(code.clone()),
                    active: true,
                    precision: Some(Decimal::new(1, 8)),
                    info: json!({"code": code}),
                });
            }
        }
        Ok(currencies)
    }

    async fn fetch_ticker(&self, market: &Market) -> ExchangeResult<Ticker> {
        self.simulate("fetchTicker").await?;
        let last = self.price(&market.symbol);
        let spread = last.checked_mul(Decimal::new(5, 4));

        // Derived prices that overflow are left out rather than failing the call.
        let mut ticker = Ticker::new(&market.symbol, Utc::now(), json!({"symbol": market.id}));
        ticker.last = Some(last);
        ticker.bid = spread.and_then(|s| last.checked_sub(s));
        ticker.ask = spread.and_then(|s| last.checked_add(s));
        ticker.bid_volume = Some(Decimal::ONE);
        ticker.ask_volume = Some(Decimal::ONE);
        ticker.open = last.checked_mul(Decimal::new(99, 2));
        ticker.high = last.checked_mul(Decimal::new(101, 2));
        ticker.low = last.checked_mul(Decimal::new(98, 2));
        ticker.base_volume = Some(Decimal::ONE_HUNDRED);
        ticker.quote_volume = last.checked_mul(Decimal::ONE_HUNDRED);
        Ok(ticker.derive_change())
    }
}
