use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use xbridge_core::{Exchange, ExchangeApi, ExchangeConfig, ExchangeError, ExchangeResult};

use crate::binance::{self, BinanceExchange};
use crate::kraken::{self, KrakenExchange};
use crate::luno::{self, LunoExchange};
use crate::simulated::{self, SimulatedExchange, SimulatedExchangeConfig};

/// Builds an exchange api from its merged config.
pub type Constructor = fn(&ExchangeConfig) -> ExchangeResult<Box<dyn ExchangeApi>>;

/// How to build one exchange: its default description and its constructor.
#[derive(Clone, Copy)]
pub struct ExchangeDescriptor {
    pub id: &'static str,
    pub describe: fn() -> Value,
    pub construct: Constructor,
}

/// Explicit mapping from exchange id to constructor.
#[derive(Clone)]
pub struct ExchangeFactory {
    descriptors: BTreeMap<&'static str, ExchangeDescriptor>,
}

impl ExchangeFactory {
    /// A factory that knows no exchanges.
    pub fn empty() -> Self {
        Self {
            descriptors: BTreeMap::new(),
        }
    }

    /// A factory with every built-in exchange registered.
    pub fn with_builtin() -> Self {
        let mut factory = Self::empty();
        factory.register(ExchangeDescriptor {
            id: "binance",
            describe: binance::describe,
            construct: |config| Ok(Box::new(BinanceExchange::new(config)?)),
        });
        factory.register(ExchangeDescriptor {
            id: "kraken",
            describe: kraken::describe,
            construct: |config| Ok(Box::new(KrakenExchange::new(config)?)),
        });
        factory.register(ExchangeDescriptor {
            id: "luno",
            describe: luno::describe,
            construct: |config| Ok(Box::new(LunoExchange::new(config)?)),
        });
        factory.register(ExchangeDescriptor {
            id: "simulated",
            describe: simulated::describe,
            construct: |config| {
                Ok(Box::new(SimulatedExchange::new(
                    SimulatedExchangeConfig::from_config(config),
                )))
            },
        });
        factory
    }

    /// Register (or replace) an exchange.
    pub fn register(&mut self, descriptor: ExchangeDescriptor) {
        self.descriptors.insert(descriptor.id, descriptor);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.descriptors.contains_key(id)
    }

    /// Known exchange ids, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        self.descriptors.keys().copied().collect()
    }

    /// Create a session for `name`, deep-extending its defaults with `overrides`.
    pub fn create(&self, name: &str, overrides: &Value) -> ExchangeResult<Exchange> {
        let descriptor = self
            .descriptors
            .get(name)
            .ok_or_else(|| ExchangeError::UnknownExchange(name.to_string()))?;

        let config = ExchangeConfig::merged(&(descriptor.describe)(), overrides);
        let api = (descriptor.construct)(&config)?;
        debug!(exchange = %descriptor.id, "Exchange constructed");
        Ok(Exchange::new(api, config))
    }
}

impl Default for ExchangeFactory {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_ids() {
        let factory = ExchangeFactory::default();
        assert_eq!(factory.ids(), vec!["binance", "kraken", "luno", "simulated"]);
        assert!(factory.contains("kraken"));
        assert!(!factory.contains("Kraken"));
    }

    #[test]
    fn test_unknown_exchange() {
        let factory = ExchangeFactory::default();
        let err = factory.create("mtgox", &json!({})).unwrap_err();
        assert_eq!(err, ExchangeError::UnknownExchange("mtgox".to_string()));
        assert!(ExchangeFactory::empty().create("kraken", &json!({})).is_err());
    }

    #[test]
    fn test_create_merges_defaults() {
        let factory = ExchangeFactory::default();
        let exchange = factory
            .create("kraken", &json!({"timeout": 1500, "urls": {"www": "https://www.kraken.com"}}))
            .unwrap();
        assert_eq!(exchange.id(), "kraken");
        assert_eq!(exchange.config().get_str("urls.api"), Some("https://api.kraken.com"));
        assert_eq!(exchange.config().get_str("urls.www"), Some("https://www.kraken.com"));
        assert_eq!(exchange.config().timeout().as_millis(), 1500);
    }

    #[test]
    fn test_constructor_failure_is_reported() {
        let factory = ExchangeFactory::default();
        let err = factory
            .create("binance", &json!({"urls": {"api": null}}))
            .unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_simulated_session_round_trip() {
        let factory = ExchangeFactory::default();
        let exchange = factory.create("simulated", &json!({})).unwrap();
        let ticker = exchange.fetch_ticker("ETH/USD").await.unwrap();
        assert_eq!(ticker.symbol, "ETH/USD");
        assert!(exchange.markets_loaded().await);
    }
}
