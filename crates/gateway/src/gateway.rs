use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};
use xbridge_core::{parse_overrides, Exchange, ExchangeResult};
use xbridge_exchanges::ExchangeFactory;

use crate::blocking::BlockingExecutor;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::registry::{Handle, SessionRegistry, INVALID_HANDLE};

/// Synchronous, handle-based front end to the exchange clients.
///
/// Every fetch resolves the handle, makes sure the session's markets are
/// loaded, runs the operation on the gateway's runtime and blocks for the
/// result. Results come back as JSON strings; failures as
/// `{"error": "<message>"}`.
pub struct Gateway {
    config: GatewayConfig,
    factory: ExchangeFactory,
    registry: SessionRegistry<Exchange>,
    executor: BlockingExecutor,
}

impl Gateway {
    /// Gateway over the built-in exchanges.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        Self::with_factory(config, ExchangeFactory::default())
    }

    pub fn with_factory(config: GatewayConfig, factory: ExchangeFactory) -> GatewayResult<Self> {
        let executor = BlockingExecutor::new(&config)?;
        info!(
            exchanges = factory.ids().len(),
            legacy_errors = config.legacy_error_envelopes,
            "Gateway started"
        );
        Ok(Self {
            config,
            factory,
            registry: SessionRegistry::new(),
            executor,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Create a session and return its handle, or `0` on any failure.
    pub fn init_exchange(&self, name: &str, config: &str) -> Handle {
        match self.try_init_exchange(name, config) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(exchange = %name, error = %e, "Exchange init failed");
                INVALID_HANDLE
            }
        }
    }

    /// Like [`Gateway::init_exchange`], but reports why it failed.
    pub fn try_init_exchange(&self, name: &str, config: &str) -> GatewayResult<Handle> {
        let overrides = parse_overrides(config)?;
        let exchange = self.factory.create(name, &overrides)?;
        let handle = self.registry.register(exchange);
        info!(handle, exchange = %name, "Exchange session created");
        Ok(handle)
    }

    /// Drop a session. Returns whether the handle was live.
    pub fn close_exchange(&self, handle: Handle) -> bool {
        let closed = self.registry.remove(handle).is_some();
        if closed {
            info!(handle, "Exchange session closed");
        }
        closed
    }

    /// Whether `handle` refers to a live session.
    pub fn is_open(&self, handle: Handle) -> bool {
        self.registry.lookup(handle).is_some()
    }

    /// Drop every session, returning how many were live.
    pub fn shutdown(&self) -> usize {
        let closed = self.registry.clear();
        info!(sessions = closed, "Gateway sessions cleared");
        closed
    }

    /// Exchange ids accepted by `init_exchange`, as a JSON array.
    pub fn list_exchanges(&self) -> String {
        self.respond(Ok(self.factory.ids()))
    }

    // -----------------------------------------------------------------------
    // Market data
    // -----------------------------------------------------------------------

    pub fn fetch_markets(&self, handle: Handle) -> String {
        debug!(handle, "fetch_markets");
        let result = self.run(handle, |exchange| async move { exchange.fetch_markets().await });
        self.respond(result)
    }

    pub fn fetch_currencies(&self, handle: Handle) -> String {
        debug!(handle, "fetch_currencies");
        let result = self.run(handle, |exchange| async move { exchange.fetch_currencies().await });
        self.respond(result)
    }

    /// `symbol` is handed to the exchange as given.
    pub fn fetch_ticker(&self, handle: Handle, symbol: &str) -> String {
        debug!(handle, %symbol, "fetch_ticker");
        let symbol = symbol.to_string();
        let result = self.run(handle, |exchange| async move { exchange.fetch_ticker(&symbol).await });
        self.respond(result)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Resolve `handle` and load its markets. A failed load is not
    /// remembered; the next call tries again.
    fn ensure_markets_loaded(&self, handle: Handle) -> GatewayResult<Arc<Exchange>> {
        let exchange = self
            .registry
            .lookup(handle)
            .ok_or(GatewayError::InvalidHandle)?;

        let session = Arc::clone(&exchange);
        self.executor
            .block_on(async move { session.load_markets(false).await })?
            .map_err(GatewayError::MarketsUnavailable)?;
        Ok(exchange)
    }

    fn run<T, F, Fut>(&self, handle: Handle, operation: F) -> GatewayResult<T>
    where
        F: FnOnce(Arc<Exchange>) -> Fut,
        Fut: Future<Output = ExchangeResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let exchange = self.ensure_markets_loaded(handle)?;
        Ok(self.executor.block_on(operation(exchange))??)
    }

    fn respond<T: Serialize>(&self, result: GatewayResult<T>) -> String {
        match result.and_then(|value| serde_json::to_string(&value).map_err(GatewayError::from)) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Returning error envelope");
                e.envelope(self.config.legacy_error_envelopes)
            }
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .field("sessions", &self.registry.len())
            .finish()
    }
}
