//! Exchange clients behind the `xbridge_core::ExchangeApi` trait.
//!
//! Public REST market data for Binance, Kraken and Luno, plus an in-memory
//! simulated exchange for tests and offline use. [`ExchangeFactory`] maps
//! exchange ids to constructors.

pub mod binance;
pub mod factory;
pub mod http;
pub mod kraken;
pub mod luno;
pub mod parse;
pub mod simulated;

pub use factory::{ExchangeDescriptor, ExchangeFactory};
