/// Errors that can occur while talking to an exchange.
///
/// The `Display` text is what ends up in the gateway's error envelope, so
/// exchange-reported messages are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// The exchange answered with an error of its own.
    #[error("{0}")]
    Api(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
    #[error("Exchange not available: {0}")]
    Unavailable(String),
    #[error("Bad response: {0}")]
    BadResponse(String),
    #[error("{0}")]
    BadSymbol(String),
    #[error("Not supported: {0}")]
    NotSupported(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Unknown exchange: {0}")]
    UnknownExchange(String),
}

impl ExchangeError {
    /// Shorthand for a `BadSymbol` error in the usual wording.
    pub fn bad_symbol(exchange: &str, symbol: &str) -> Self {
        ExchangeError::BadSymbol(format!("{} does not have market symbol {}", exchange, symbol))
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
