use std::time::Duration;

/// `confirmations`, plus the bounded-resubmission knobs from §4.5/§7.
#[derive(Debug, Clone)]
pub struct WalletConfig {
	/// Blocks that must pass over a transaction's inclusion block before it
	/// counts as settled.
	pub confirmations: u64,
	/// How often to poll for a receipt once a transaction has been broadcast.
	pub poll_interval: Duration,
	/// How long to wait for any status change before classifying a broadcast
	/// transaction `Lost`.
	pub stall_timeout: Duration,
	/// How many times a stalled transaction may be resubmitted (same nonce,
	/// bumped fee) before the wallet gives up and reports it `Lost`.
	pub max_resubmissions: u32,
	/// Percentage points added to the gas price per resubmission attempt.
	pub fee_bump_percent: u64,
}
