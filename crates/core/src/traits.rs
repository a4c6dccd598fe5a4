use crate::error::ExchangeResult;
use crate::models::*;
use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Exchange API Trait
// ---------------------------------------------------------------------------

/// Public market-data endpoints of a single exchange.
///
/// Implementations are stateless with respect to markets: caching and symbol
/// resolution live in [`crate::Exchange`], which wraps an `ExchangeApi`.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Lowercase exchange id (e.g. "kraken").
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Fetch every market listed by the exchange.
    async fn fetch_markets(&self) -> ExchangeResult<Vec<Market>>;

    /// Fetch every currency listed by the exchange, keyed by unified code.
    async fn fetch_currencies(&self) -> ExchangeResult<Currencies>;

    /// Fetch the 24h ticker for an already resolved market.
    async fn fetch_ticker(&self, market: &Market) -> ExchangeResult<Ticker>;
}
