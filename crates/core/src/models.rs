use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// The kind of instrument a market trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketType {
    Spot,
    Swap,
    Future,
}

/// Inclusive lower/upper bound; either side may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinMax {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
}

/// Precision rules for a market.
///
/// Expressed as the smallest increment (e.g. `0.01`), not a digit count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPrecision {
    pub amount: Option<Decimal>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketLimits {
    pub amount: MinMax,
    pub price: MinMax,
}

/// A tradeable pair as listed by an exchange, keyed by its unified symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    /// Exchange-specific identifier (e.g. `XXBTZUSD`, `BTCUSDT`).
    pub id: String,
    /// Unified symbol in `BASE/QUOTE` form.
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub base_id: String,
    pub quote_id: String,
    pub active: bool,
    #[serde(rename = "type")]
    pub market_type: MarketType,
    pub precision: MarketPrecision,
    pub limits: MarketLimits,
    /// Raw exchange payload this market was parsed from.
    pub info: serde_json::Value,
}

impl Market {
    /// Build a spot market from exchange ids, unifying currency codes.
    pub fn spot(id: &str, base_id: &str, quote_id: &str, info: serde_json::Value) -> Self {
        let base = unify_currency_code(base_id);
        let quote = unify_currency_code(quote_id);
        Self {
            id: id.to_string(),
            symbol: format!("{}/{}", base, quote),
            base,
            quote,
            base_id: base_id.to_string(),
            quote_id: quote_id.to_string(),
            active: true,
            market_type: MarketType::Spot,
            precision: MarketPrecision::default(),
            limits: MarketLimits::default(),
            info,
        }
    }
}

// ---------------------------------------------------------------------------
// Currencies
// ---------------------------------------------------------------------------

/// A currency (asset) known to an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    /// Exchange-specific identifier (e.g. `XXBT`).
    pub id: String,
    /// Unified code (e.g. `BTC`).
    pub code: String,
    pub name: Option<String>,
    pub active: bool,
    /// Smallest representable amount.
    pub precision: Option<Decimal>,
    pub info: serde_json::Value,
}

/// Currencies keyed by unified code. Ordered so serialized output is stable.
pub type Currencies = BTreeMap<String, Currency>;

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// A 24h price statistics snapshot for one market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub datetime: DateTime<Utc>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub bid: Option<Decimal>,
    pub bid_volume: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub ask_volume: Option<Decimal>,
    pub vwap: Option<Decimal>,
    pub open: Option<Decimal>,
    pub close: Option<Decimal>,
    pub last: Option<Decimal>,
    pub change: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub base_volume: Option<Decimal>,
    pub quote_volume: Option<Decimal>,
    pub info: serde_json::Value,
}

impl Ticker {
    /// Create an empty ticker stamped at `datetime`.
    pub fn new(symbol: &str, datetime: DateTime<Utc>, info: serde_json::Value) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp: datetime.timestamp_millis(),
            datetime,
            high: None,
            low: None,
            bid: None,
            bid_volume: None,
            ask: None,
            ask_volume: None,
            vwap: None,
            open: None,
            close: None,
            last: None,
            change: None,
            percentage: None,
            base_volume: None,
            quote_volume: None,
            info,
        }
    }

    /// Fill in `change` and `percentage` from `open` and `last` when the
    /// exchange does not report them.
    pub fn derive_change(mut self) -> Self {
        // Values that would overflow stay `None`.
        if let (Some(open), Some(last)) = (self.open, self.last) {
            let change = last.checked_sub(open);
            if self.change.is_none() {
                self.change = change;
            }
            if self.percentage.is_none() && !open.is_zero() {
                self.percentage = change
                    .and_then(|c| c.checked_div(open))
                    .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
                    .map(|p| p.round_dp(8));
            }
        }
        if self.close.is_none() {
            self.close = self.last;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Currency codes
// ---------------------------------------------------------------------------

/// Map an exchange currency id to its unified code.
///
/// Kraken prefixes legacy assets with `X` (crypto) or `Z` (fiat), e.g. `XXBT`, `ZUSD`.
pub fn unify_currency_code(id: &str) -> String {
    let upper = id.to_uppercase();
    let stripped = if upper.len() == 4
        && (upper.starts_with('X') || upper.starts_with('Z'))
        && upper != "XTZ"
    {
        &upper[1..]
    } else {
        upper.as_str()
    };
    match stripped {
        "XBT" => "BTC".to_string(),
        "XDG" => "DOGE".to_string(),
        "BCC" => "BCH".to_string(),
        other => other.to_string(),
    }
}
