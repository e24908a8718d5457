//! Shared domain models used across chains, routes and transfers

pub mod amount;
pub mod chain;
pub mod token;
pub mod transaction;

pub use amount::Amount;
pub use chain::Chain;
pub use token::Token;
pub use transaction::{SignedTransaction, TransactionKind, TxReceipt, TxRef, UnsignedTransaction};
