use std::sync::OnceLock;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::Gateway;
use crate::registry::{Handle, INVALID_HANDLE};

/// Process-wide gateway behind the mobile bindings. Started on first use.
static GATEWAY: OnceLock<GatewayResult<Gateway>> = OnceLock::new();

/// The shared gateway, or the error it failed to start with.
pub fn shared_gateway() -> Result<&'static Gateway, &'static GatewayError> {
    GATEWAY
        .get_or_init(|| Gateway::new(GatewayConfig::from_env()))
        .as_ref()
}

/// Stateless receiver for the mobile bindings.
///
/// Every method forwards to [`shared_gateway`]. If the gateway could not
/// start, init returns `0` and fetches return the startup error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct MobileGateway;

impl MobileGateway {
    pub fn new() -> Self {
        MobileGateway
    }

    pub fn init_exchange(&self, name: &str, config: &str) -> Handle {
        match shared_gateway() {
            Ok(gateway) => gateway.init_exchange(name, config),
            Err(_) => INVALID_HANDLE,
        }
    }

    pub fn fetch_markets(&self, handle: Handle) -> String {
        with_gateway(|gateway| gateway.fetch_markets(handle))
    }

    pub fn fetch_currencies(&self, handle: Handle) -> String {
        with_gateway(|gateway| gateway.fetch_currencies(handle))
    }

    pub fn fetch_ticker(&self, handle: Handle, symbol: &str) -> String {
        with_gateway(|gateway| gateway.fetch_ticker(handle, symbol))
    }

    pub fn close_exchange(&self, handle: Handle) -> bool {
        shared_gateway().is_ok_and(|gateway| gateway.close_exchange(handle))
    }

    pub fn is_open(&self, handle: Handle) -> bool {
        shared_gateway().is_ok_and(|gateway| gateway.is_open(handle))
    }

    pub fn list_exchanges(&self) -> String {
        with_gateway(Gateway::list_exchanges)
    }

    /// Close every session. The gateway itself stays up.
    pub fn shutdown(&self) -> usize {
        shared_gateway().map_or(0, Gateway::shutdown)
    }
}

fn with_gateway(call: impl FnOnce(&Gateway) -> String) -> String {
    match shared_gateway() {
        Ok(gateway) => call(gateway),
        Err(e) => e.envelope(false),
    }
}
