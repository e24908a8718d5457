//! Bridge adapter capability: trait, raw responses and errors

pub mod errors;
pub mod models;
pub mod traits;

pub use errors::{AdapterError, AdapterRegistryError};
pub use models::{BridgeQuote, RelayStatus};
pub use traits::BridgeAdapter;

/// Result types for adapter operations
pub type AdapterResult<T> = Result<T, AdapterError>;
