//! Synchronous, handle-based gateway over the exchange clients.
//!
//! [`Gateway`] owns a [`SessionRegistry`] of exchange sessions and a
//! [`BlockingExecutor`] that runs their async operations for blocking
//! callers. [`MobileGateway`] and the [`ffi`] functions expose one
//! process-wide gateway to mobile bindings.

pub mod blocking;
pub mod config;
pub mod error;
pub mod ffi;
pub mod gateway;
pub mod mobile;
pub mod registry;

pub use blocking::BlockingExecutor;
pub use config::GatewayConfig;
pub use error::{error_envelope, GatewayError, GatewayResult, INVALID_HANDLE_MESSAGE};
pub use gateway::Gateway;
pub use mobile::{shared_gateway, MobileGateway};
pub use registry::{Handle, SessionRegistry, INVALID_HANDLE};
