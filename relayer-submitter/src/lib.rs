//! Per-chain submitter: pairs AMB messages with their proofs, asks the
//! evaluator whether delivery or ack is currently profitable, and drives the
//! resulting `processPacket` calls through the wallet.

mod abi;
mod ack;
pub mod config;
mod delivery;
mod error;
mod fanout;
mod keyparse;
mod queue;
mod service;

pub use config::SubmitterConfig;
pub use error::{Error, Result};
pub use fanout::{MultiChainFeeSource, MultiChainPriceOracle};
pub use service::SubmitterService;
