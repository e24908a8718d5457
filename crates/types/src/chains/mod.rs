//! Chain connectivity and signing capabilities

pub mod errors;
pub mod traits;

pub use errors::{ChainError, SignerError};
pub use traits::{ChainClient, Signer};

/// Result type for chain client operations
pub type ChainResult<T> = Result<T, ChainError>;
