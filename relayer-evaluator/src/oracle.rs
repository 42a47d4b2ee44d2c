//! The evaluator's two upstream dependencies, as narrow traits so it stays
//! testable without a live Pricing worker or Wallet connection.

use async_trait::async_trait;
use relayer_types::ChainId;
use rust_decimal::Decimal;

/// Fiat price of one wei of a chain's native gas token. Implemented by the
/// Pricing worker's client handle.
///
/// Returning a per-unit price rather than converting a caller-supplied
/// amount lets the evaluator apply it to intermediate values that can be
/// negative (a worst-case loss) without the oracle needing to understand it.
#[async_trait]
pub trait PriceOracle: Send + Sync {
	/// `tokenId` is always passed explicitly and uniformly, even for chains
	/// with a single native token, so callers never have to special-case it.
	async fn price_per_wei(&self, chain_id: ChainId, token_id: &str) -> anyhow::Result<Decimal>;
}

/// Current fee data for a chain. Implemented by the Wallet worker's client
/// handle; `getFeeData` must never queue behind pending sends.
#[async_trait]
pub trait FeeSource: Send + Sync {
	/// Missing fee data is represented as `None` by the caller, which the
	/// evaluator treats as an unaffordable (`+inf`) gas price rather than
	/// guessing a number.
	async fn gas_price(&self, chain_id: ChainId) -> anyhow::Result<Option<u128>>;
}
