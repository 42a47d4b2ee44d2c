//! Per-chain transaction executor. One `WalletService` owns a chain's
//! signing key and nonce; `WalletHandle`s (cheap to clone) are handed to the
//! submitter and the evaluator.

pub mod config;
pub mod error;
mod service;
mod tracker;
pub mod types;

pub use config::WalletConfig;
pub use error::{Error, Result};
pub use service::{WalletHandle, WalletService};
pub use tracker::SubmissionOutcome;
pub use types::TxRequest;
