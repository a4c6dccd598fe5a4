use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use xbridge_core::*;

use crate::http::RestClient;
use crate::parse::*;

/// Default description, deep-extended with the caller's config.
pub fn describe() -> Value {
    json!({
        "id": "luno",
        "name": "Luno",
        "urls": {
            "api": "https://api.luno.com",
        },
        "timeout": DEFAULT_TIMEOUT_MS,
        "options": {},
    })
}

/// Luno public REST API.
pub struct LunoExchange {
    client: RestClient,
}

impl LunoExchange {
    pub fn new(config: &ExchangeConfig) -> ExchangeResult<Self> {
        Ok(Self {
            client: RestClient::new("luno", config, extract_error)?,
        })
    }

    async fn market_info(&self) -> ExchangeResult<Value> {
        self.client.get("/api/exchange/1/markets", &[]).await
    }
}

/// Luno error bodies look like `{"error": "...", "error_code": "ErrMarketNotFound"}`.
fn extract_error(body: &Value) -> Option<String> {
    let message = str_field(body, "error")?;
    match str_field(body, "error_code") {
        Some(code) => Some(format!("{}: {}", code, message)),
        None => Some(message.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct LunoMarket {
    market_id: String,
    #[serde(default)]
    trading_status: String,
    base_currency: String,
    counter_currency: String,
    min_volume: Option<String>,
    max_volume: Option<String>,
    volume_scale: Option<u64>,
    min_price: Option<String>,
    max_price: Option<String>,
    price_scale: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LunoMarkets {
    markets: Vec<Value>,
}

pub(crate) fn parse_markets(body: &Value) -> ExchangeResult<Vec<Market>> {
    let listing = LunoMarkets::deserialize(body)
        .map_err(|e| ExchangeError::BadResponse(format!("luno markets: {}", e)))?;

    let mut markets = Vec::with_capacity(listing.markets.len());
    for raw in listing.markets {
        let entry = LunoMarket::deserialize(&raw)
            .map_err(|e| ExchangeError::BadResponse(format!("luno market: {}", e)))?;
        let mut market = Market::spot(&entry.market_id, &entry.base_currency, &entry.counter_currency, raw.clone());
        market.active = entry.trading_status == "ACTIVE";
        market.precision.amount = entry.volume_scale.and_then(precision_from_digits);
        market.precision.price = entry.price_scale.and_then(precision_from_digits);
        market.limits.amount = MinMax {
            min: entry.min_volume.as_deref().and_then(decimal_str),
            max: entry.max_volume.as_deref().and_then(decimal_str),
        };
        market.limits.price = MinMax {
            min: entry.min_price.as_deref().and_then(decimal_str),
            max: entry.max_price.as_deref().and_then(decimal_str),
        };
        markets.push(market);
    }
    Ok(markets)
}

/// Luno has no currency listing endpoint; currencies come from market pairs.
pub(crate) fn currencies_from_markets(markets: &[Market]) -> Currencies {
    let mut currencies = Currencies::new();
    for market in markets {
        for (id, code) in [(&market.base_id, &market.base), (&market.quote_id, &market.quote)] {
            let currency = currencies.entry(code.clone()).or_insert_with(|| Currency {
                id: id.clone(),
                code: code.clone(),
                name: None,
                active: false,
                precision: None,
                info: json!({"currency": id}),
            });
            currency.active |= market.active;
        }
    }
    currencies
}

pub(crate) fn parse_ticker(market: &Market, raw: &Value) -> ExchangeResult<Ticker> {
    let timestamp = raw
        .get("timestamp")
        .and_then(Value::as_i64)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now);

    let mut ticker = Ticker::new(&market.symbol, timestamp, raw.clone());
    ticker.bid = decimal_field(raw, "bid");
    ticker.ask = decimal_field(raw, "ask");
    ticker.last = decimal_field(raw, "last_trade");
    ticker.base_volume = decimal_field(raw, "rolling_24_hour_volume");
    Ok(ticker.derive_change())
}

#[async_trait]
impl ExchangeApi for LunoExchange {
    fn id(&self) -> &str {
        "luno"
    }

    fn name(&self) -> &str {
        "Luno"
    }

    async fn fetch_markets(&self) -> ExchangeResult<Vec<Market>> {
        let body = self.market_info().await?;
        parse_markets(&body)
    }

    async fn fetch_currencies(&self) -> ExchangeResult<Currencies> {
        let body = self.market_info().await?;
        Ok(currencies_from_markets(&parse_markets(&body)?))
    }

    async fn fetch_ticker(&self, market: &Market) -> ExchangeResult<Ticker> {
        let body = self
            .client
            .get("/api/1/ticker", &[("pair", market.id.as_str())])
            .await?;
        parse_ticker(market, &body)
    }
}
