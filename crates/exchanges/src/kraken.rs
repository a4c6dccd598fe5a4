use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use xbridge_core::*;

use crate::http::RestClient;
use crate::parse::*;

/// Default description, deep-extended with the caller's config.
pub fn describe() -> Value {
    json!({
        "id": "kraken",
        "name": "Kraken",
        "urls": {
            "api": "https://api.kraken.com",
        },
        "timeout": DEFAULT_TIMEOUT_MS,
        "options": {},
    })
}

/// Kraken spot public REST API.
pub struct KrakenExchange {
    client: RestClient,
}

impl KrakenExchange {
    pub fn new(config: &ExchangeConfig) -> ExchangeResult<Self> {
        Ok(Self {
            client: RestClient::new("kraken", config, extract_error)?,
        })
    }
}

/// Kraken wraps every response as `{"error": [...], "result": ...}`.
fn extract_error(body: &Value) -> Option<String> {
    let errors = body.get("error")?.as_array()?;
    if errors.is_empty() {
        return None;
    }
    let messages: Vec<&str> = errors.iter().filter_map(Value::as_str).collect();
    Some(messages.join(", "))
}

fn result(body: &Value) -> ExchangeResult<&serde_json::Map<String, Value>> {
    body.get("result")
        .and_then(Value::as_object)
        .ok_or_else(|| ExchangeError::BadResponse("kraken response has no result object".to_string()))
}

pub(crate) fn parse_markets(body: &Value) -> ExchangeResult<Vec<Market>> {
    let pairs = result(body)?;
    let mut markets = Vec::with_capacity(pairs.len());
    for (id, pair) in pairs {
        // Dark pool pairs share symbols with their lit counterparts.
        if id.ends_with(".d") {
            continue;
        }
        let (Some(base_id), Some(quote_id)) = (str_field(pair, "base"), str_field(pair, "quote")) else {
            continue;
        };

        let mut market = Market::spot(id, base_id, quote_id, pair.clone());
        market.active = str_field(pair, "status").map_or(true, |s| s == "online");
        market.precision.price = decimal_field(pair, "tick_size").or_else(|| {
            pair.get("pair_decimals")
                .and_then(Value::as_u64)
                .and_then(precision_from_digits)
        });
        market.precision.amount = pair
            .get("lot_decimals")
            .and_then(Value::as_u64)
            .and_then(precision_from_digits);
        market.limits.amount.min = decimal_field(pair, "ordermin");
        markets.push(market);
    }
    Ok(markets)
}

pub(crate) fn parse_currencies(body: &Value) -> ExchangeResult<Currencies> {
    let assets = result(body)?;
    let mut currencies = Currencies::new();
    for (id, asset) in assets {
        let code = unify_currency_code(str_field(asset, "altname").unwrap_or(id));
        currencies.insert(
            code.clone(),
            Currency {
                id: id.clone(),
                code,
                name: str_field(asset, "altname").map(str::to_string),
                active: str_field(asset, "status").map_or(true, |s| s == "enabled"),
                precision: asset
                    .get("decimals")
                    .and_then(Value::as_u64)
                    .and_then(precision_from_digits),
                info: asset.clone(),
            },
        );
    }
    Ok(currencies)
}

pub(crate) fn parse_ticker(market: &Market, body: &Value) -> ExchangeResult<Ticker> {
    let tickers = result(body)?;
    let raw = tickers
        .get(&market.id)
        .or_else(|| tickers.values().next())
        .ok_or_else(|| ExchangeError::BadResponse(format!("kraken returned no ticker for {}", market.id)))?;

    // Array fields hold [today, last 24 hours]; a/b hold [price, whole lot volume, lot volume].
    let mut ticker = Ticker::new(&market.symbol, Utc::now(), raw.clone());
    ticker.high = decimal_at(raw, "h", 1);
    ticker.low = decimal_at(raw, "l", 1);
    ticker.bid = decimal_at(raw, "b", 0);
    ticker.bid_volume = decimal_at(raw, "b", 2);
    ticker.ask = decimal_at(raw, "a", 0);
    ticker.ask_volume = decimal_at(raw, "a", 2);
    ticker.vwap = decimal_at(raw, "p", 1);
    ticker.open = decimal_field(raw, "o");
    ticker.last = decimal_at(raw, "c", 0);
    ticker.base_volume = decimal_at(raw, "v", 1);
    ticker.quote_volume = match (ticker.base_volume, ticker.vwap) {
        (Some(volume), Some(vwap)) => volume.checked_mul(vwap),
        _ => None,
    };
    Ok(ticker.derive_change())
}

#[async_trait]
impl ExchangeApi for KrakenExchange {
    fn id(&self) -> &str {
        "kraken"
    }

    fn name(&self) -> &str {
        "Kraken"
    }

    async fn fetch_markets(&self) -> ExchangeResult<Vec<Market>> {
        let body = self.client.get("/0/public/AssetPairs", &[]).await?;
        parse_markets(&body)
    }

    async fn fetch_currencies(&self) -> ExchangeResult<Currencies> {
        let body = self.client.get("/0/public/Assets", &[]).await?;
        parse_currencies(&body)
    }

    async fn fetch_ticker(&self, market: &Market) -> ExchangeResult<Ticker> {
        let body = self
            .client
            .get("/0/public/Ticker", &[("pair", market.id.as_str())])
            .await?;
        parse_ticker(market, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn asset_pairs() -> Value {
        json!({
            "error": [],
            "result": {
                "XXBTZUSD": {
                    "altname": "XBTUSD",
                    "wsname": "XBT/USD",
                    "base": "XXBT",
                    "quote": "ZUSD",
                    "pair_decimals": 1,
                    "lot_decimals": 8,
                    "ordermin": "0.0001",
                    "tick_size": "0.1",
                    "status": "online"
                },
                "XXBTZUSD.d": {
                    "altname": "XBTUSD.d",
                    "base": "XXBT",
                    "quote": "ZUSD",
                    "pair_decimals": 1,
                    "lot_decimals": 8
                },
                "XETHXXBT": {
                    "altname": "ETHXBT",
                    "base": "XETH",
                    "quote": "XXBT",
                    "pair_decimals": 5,
                    "lot_decimals": 8,
                    "ordermin": "0.002",
                    "status": "cancel_only"
                }
            }
        })
    }

    #[test]
    fn test_parse_markets() {
        let markets = parse_markets(&asset_pairs()).unwrap();
        assert_eq!(markets.len(), 2);

        let btc = markets.iter().find(|m| m.id == "XXBTZUSD").unwrap();
        assert_eq!(btc.symbol, "BTC/USD");
        assert!(btc.active);
        assert_eq!(btc.precision.price, Some(dec!(0.1)));
        assert_eq!(btc.precision.amount, Some(dec!(0.00000001)));
        assert_eq!(btc.limits.amount.min, Some(dec!(0.0001)));

        let eth = markets.iter().find(|m| m.id == "XETHXXBT").unwrap();
        assert_eq!(eth.symbol, "ETH/BTC");
        assert!(!eth.active);
        assert_eq!(eth.precision.price, Some(dec!(0.00001)));
    }

    #[test]
    fn test_parse_currencies() {
        let body = json!({
            "error": [],
            "result": {
                "XXBT": {"aclass": "currency", "altname": "XBT", "decimals": 10, "status": "enabled"},
                "ZUSD": {"aclass": "currency", "altname": "ZUSD", "decimals": 4, "status": "enabled"},
                "XXDG": {"aclass": "currency", "altname": "XDG", "decimals": 8, "status": "deposit_only"}
            }
        });
        let currencies = parse_currencies(&body).unwrap();
        assert_eq!(currencies.len(), 3);
        assert_eq!(currencies["BTC"].id, "XXBT");
        assert_eq!(currencies["BTC"].precision, Some(dec!(0.0000000001)));
        assert_eq!(currencies["USD"].id, "ZUSD");
        assert!(!currencies["DOGE"].active);
    }

    #[test]
    fn test_parse_ticker() {
        let markets = parse_markets(&asset_pairs()).unwrap();
        let market = markets.iter().find(|m| m.id == "XXBTZUSD").unwrap();
        let body = json!({
            "error": [],
            "result": {
                "XXBTZUSD": {
                    "a": ["30300.10000", "1", "1.000"],
                    "b": ["30300.00000", "1", "2.000"],
                    "c": ["30303.20000", "0.00067643"],
                    "v": ["4083.67001100", "4412.73601799"],
                    "p": ["30706.77771", "30000.00000"],
                    "t": [34619, 38907],
                    "l": ["29868.30000", "29800.00000"],
                    "h": ["31631.00000", "31700.00000"],
                    "o": "30502.80000"
                }
            }
        });
        let ticker = parse_ticker(market, &body).unwrap();
        assert_eq!(ticker.symbol, "BTC/USD");
        assert_eq!(ticker.bid, Some(dec!(30300)));
        assert_eq!(ticker.bid_volume, Some(dec!(2)));
        assert_eq!(ticker.ask, Some(dec!(30300.1)));
        assert_eq!(ticker.last, Some(dec!(30303.2)));
        assert_eq!(ticker.high, Some(dec!(31700)));
        assert_eq!(ticker.low, Some(dec!(29800)));
        assert_eq!(ticker.open, Some(dec!(30502.8)));
        assert_eq!(ticker.change, Some(dec!(-199.6)));
        assert_eq!(ticker.quote_volume, Some(dec!(4412.73601799) * dec!(30000)));
    }

    #[test]
    fn test_parse_ticker_overflowing_volume() {
        let markets = parse_markets(&asset_pairs()).unwrap();
        let market = markets.iter().find(|m| m.id == "XXBTZUSD").unwrap();
        let huge = Decimal::MAX.to_string();
        let body = json!({
            "error": [],
            "result": {
                "XXBTZUSD": {
                    "c": ["30303.2", "0.1"],
                    "v": [huge, huge],
                    "p": ["30000.0", "30000.0"],
                    "o": "30000.0"
                }
            }
        });
        let ticker = parse_ticker(market, &body).unwrap();
        assert_eq!(ticker.base_volume, Some(Decimal::MAX));
        assert_eq!(ticker.quote_volume, None);
        assert_eq!(ticker.change, Some(dec!(303.2)));
    }

    #[test]
    fn test_extract_error() {
        let body = json!({"error": ["EQuery:Unknown asset pair"]});
        assert_eq!(extract_error(&body), Some("EQuery:Unknown asset pair".to_string()));
        assert_eq!(extract_error(&json!({"error": [], "result": {}})), None);
    }

    #[test]
    fn test_missing_result() {
        assert!(matches!(
            parse_markets(&json!({"error": []})),
            Err(ExchangeError::BadResponse(_))
        ));
    }
}
