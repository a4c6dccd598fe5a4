use xbridge_core::ExchangeError;

/// Message used for unknown handles. Callers match on this exact text.
pub const INVALID_HANDLE_MESSAGE: &str = "Invalid handle";

/// Errors surfaced by the gateway.
///
/// Every variant ends up as a `{"error": "<message>"}` envelope at the
/// boundary; see [`GatewayError::envelope`].
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid handle")]
    InvalidHandle,

    /// The markets-loaded precondition failed on a live session.
    #[error("Failed to load markets: {0}")]
    MarketsUnavailable(ExchangeError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// The task running the operation ended without producing a result.
    #[error("Operation aborted before completing")]
    Aborted,

    #[error("Blocking gateway call made from inside an async runtime")]
    Reentrant,

    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Render the wire error envelope.
    ///
    /// With `legacy` set, a markets-load failure is reported as an invalid
    /// handle, matching older callers.
    pub fn envelope(&self, legacy: bool) -> String {
        let message = match self {
            GatewayError::MarketsUnavailable(_) if legacy => INVALID_HANDLE_MESSAGE.to_string(),
            other => other.to_string(),
        };
        error_envelope(&message)
    }
}

/// `{"error": message}` with proper JSON escaping.
pub fn error_envelope(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

pub type GatewayResult<T> = Result<T, GatewayError>;
