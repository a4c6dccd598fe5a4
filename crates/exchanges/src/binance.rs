use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use xbridge_core::*;

use crate::http::RestClient;
use crate::parse::*;

/// Default description, deep-extended with the caller's config.
pub fn describe() -> Value {
    json!({
        "id": "binance",
        "name": "Binance",
        "urls": {
            "api": "https://api.binance.com",
        },
        "timeout": DEFAULT_TIMEOUT_MS,
        "options": {},
    })
}

/// Binance spot public REST API.
///
/// Binance only lists currencies through a signed endpoint, so
/// `fetch_currencies` derives them from the assets of `exchangeInfo`.
pub struct BinanceExchange {
    client: RestClient,
}

impl BinanceExchange {
    pub fn new(config: &ExchangeConfig) -> ExchangeResult<Self> {
        Ok(Self {
            client: RestClient::new("binance", config, extract_error)?,
        })
    }

    async fn exchange_info(&self) -> ExchangeResult<Value> {
        self.client.get("/api/v3/exchangeInfo", &[]).await
    }
}

/// Binance error bodies look like `{"code": -1121, "msg": "Invalid symbol."}`.
fn extract_error(body: &Value) -> Option<String> {
    let code = body.get("code")?.as_i64()?;
    if code == 0 {
        return None;
    }
    let msg = str_field(body, "msg").unwrap_or("");
    Some(format!("{} {}", code, msg).trim_end().to_string())
}

fn symbols(body: &Value) -> ExchangeResult<&Vec<Value>> {
    body.get("symbols")
        .and_then(Value::as_array)
        .ok_or_else(|| ExchangeError::BadResponse("binance exchangeInfo has no symbols".to_string()))
}

fn filter<'a>(entry: &'a Value, filter_type: &str) -> Option<&'a Value> {
    entry
        .get("filters")?
        .as_array()?
        .iter()
        .find(|f| str_field(f, "filterType") == Some(filter_type))
}

pub(crate) fn parse_markets(body: &Value) -> ExchangeResult<Vec<Market>> {
    let entries = symbols(body)?;
    let mut markets = Vec::with_capacity(entries.len());
    for entry in entries {
        let (Some(id), Some(base_id), Some(quote_id)) = (
            str_field(entry, "symbol"),
            str_field(entry, "baseAsset"),
            str_field(entry, "quoteAsset"),
        ) else {
            continue;
        };

        let mut market = Market::spot(id, base_id, quote_id, entry.clone());
        market.active = str_field(entry, "status") == Some("TRADING");
        if let Some(price_filter) = filter(entry, "PRICE_FILTER") {
            market.precision.price = decimal_field(price_filter, "tickSize");
            market.limits.price = MinMax {
                min: decimal_field(price_filter, "minPrice"),
                max: decimal_field(price_filter, "maxPrice"),
            };
        }
        if let Some(lot_size) = filter(entry, "LOT_SIZE") {
            market.precision.amount = decimal_field(lot_size, "stepSize");
            market.limits.amount = MinMax {
                min: decimal_field(lot_size, "minQty"),
                max: decimal_field(lot_size, "maxQty"),
            };
        }
        markets.push(market);
    }
    Ok(markets)
}

pub(crate) fn parse_currencies(body: &Value) -> ExchangeResult<Currencies> {
    let mut currencies = Currencies::new();
    for entry in symbols(body)? {
        let trading = str_field(entry, "status") == Some("TRADING");
        for (asset_key, precision_key) in [
            ("baseAsset", "baseAssetPrecision"),
            ("quoteAsset", "quoteAssetPrecision"),
        ] {
            let Some(id) = str_field(entry, asset_key) else {
                continue;
            };
            let code = unify_currency_code(id);
            let currency = currencies.entry(code.clone()).or_insert_with(|| Currency {
                id: id.to_string(),
                code,
                name: None,
                active: false,
                precision: entry
                    .get(precision_key)
                    .and_then(Value::as_u64)
                    .and_then(precision_from_digits),
                info: json!({"asset": id}),
            });
            currency.active |= trading;
        }
    }
    Ok(currencies)
}

pub(crate) fn parse_ticker(market: &Market, raw: &Value) -> ExchangeResult<Ticker> {
    let close_time = raw
        .get("closeTime")
        .and_then(Value::as_i64)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now);

    let mut ticker = Ticker::new(&market.symbol, close_time, raw.clone());
    ticker.high = decimal_field(raw, "highPrice");
    ticker.low = decimal_field(raw, "lowPrice");
    ticker.bid = decimal_field(raw, "bidPrice");
    ticker.bid_volume = decimal_field(raw, "bidQty");
    ticker.ask = decimal_field(raw, "askPrice");
    ticker.ask_volume = decimal_field(raw, "askQty");
    ticker.vwap = decimal_field(raw, "weightedAvgPrice");
    ticker.open = decimal_field(raw, "openPrice");
    ticker.last = decimal_field(raw, "lastPrice");
    ticker.change = decimal_field(raw, "priceChange");
    ticker.percentage = decimal_field(raw, "priceChangePercent");
    ticker.base_volume = decimal_field(raw, "volume");
    ticker.quote_volume = decimal_field(raw, "quoteVolume");
    if ticker.last.is_none() {
        return Err(ExchangeError::BadResponse(format!(
            "binance ticker for {} has no lastPrice",
            market.id
        )));
    }
    Ok(ticker.derive_change())
}

#[async_trait]
impl ExchangeApi for BinanceExchange {
    fn id(&self) -> &str {
        "binance"
    }

    fn name(&self) -> &str {
        "Binance"
    }

    async fn fetch_markets(&self) -> ExchangeResult<Vec<Market>> {
        let body = self.exchange_info().await?;
        parse_markets(&body)
    }

    async fn fetch_currencies(&self) -> ExchangeResult<Currencies> {
        let body = self.exchange_info().await?;
        parse_currencies(&body)
    }

    async fn fetch_ticker(&self, market: &Market) -> ExchangeResult<Ticker> {
        let body = self
            .client
            .get("/api/v3/ticker/24hr", &[("symbol", market.id.as_str())])
            .await?;
        parse_ticker(market, &body)
    }
}
