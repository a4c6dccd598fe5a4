pub mod config;
pub mod error;
pub mod exchange;
pub mod models;
pub mod traits;

pub use config::*;
pub use error::*;
pub use exchange::*;
pub use models::*;
pub use traits::*;
