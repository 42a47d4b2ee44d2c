use std::time::Duration;
use web3::types::Address;

/// Scan-loop tuning shared by the bounty collector and every AMB collector
/// on a chain.
#[derive(Clone, Debug)]
pub struct ScanConfig {
	/// How long to sleep between scans when not catching up, and after a
	/// failed query.
	pub interval: Duration,
	/// Blocks to stay behind the chain head, so a scan never reads into a
	/// range the node might still reorg.
	pub block_delay: u64,
	/// Largest block range queried in one `eth_getLogs` call.
	pub max_blocks: u64,
	/// First cursor value. Defaults to the chain's current head at first run
	/// when `None`.
	pub starting_block: Option<u64>,
	/// Cursor value past which the collector exits cleanly.
	pub stopping_block: Option<u64>,
}

/// Configuration for the bounty collector: the escrow contract address whose
/// `BountyPlaced`/`BountyIncreased`/`MessageDelivered`/`BountyClaimed`
/// events it decodes.
#[derive(Clone, Debug)]
pub struct BountyCollectorConfig {
	pub contract_address: Address,
	pub scan: ScanConfig,
}

/// Scan tuning for an AMB collector. The contract address and other
/// provider-specific settings live in [`crate::provider::ProviderConfig`],
/// since the filter itself is the provider's concern, not the scan loop's.
#[derive(Clone, Debug)]
pub struct AmbCollectorConfig {
	pub scan: ScanConfig,
}
