//! Redis-backed keyed state and pub/sub shared by every worker.
//!
//! Every key lives under `relayer:<chainId>:<kind>:<messageIdentifier>`; see
//! [`keys`]. `RelayState` writes go through [`Store::update_relay_state`],
//! which retries on optimistic-lock conflicts instead of requiring callers to
//! hold a lock across a network round trip.

pub mod error;
pub mod keys;
mod store;

pub use error::{Error, Result};
pub use store::Store;
