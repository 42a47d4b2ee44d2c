//! Per-chain RPC client facade (`ChainClient`) and the best-effort
//! block-height heartbeat (`Monitor`) built on top of it.

pub mod client;
pub mod error;
mod monitor;

pub use client::{ChainClient, ChainHead, Web3Client};
pub use error::{Error, Result};
pub use monitor::Monitor;
