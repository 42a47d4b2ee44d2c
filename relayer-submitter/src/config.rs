use relayer_evaluator::EvaluatorConfig;
use relayer_types::ChainId;
use std::collections::HashMap;
use std::time::Duration;
use web3::types::Address;

/// Configuration for one chain's `SubmitterService`. A chain's submitter
/// delivers messages addressed *to* it and acks messages whose bounty lives
/// *on* it, so this covers both legs.
#[derive(Clone, Debug)]
pub struct SubmitterConfig {
	/// The generalised-incentives escrow contract on this chain, the target
	/// of both `processPacket` calls this chain's wallet ever makes.
	pub incentives_address: Address,
	/// Paid the relayer's cut of the bounty on a successful `processPacket`.
	pub fee_recipient: Address,
	/// Native gas token id (as understood by the Pricing worker) of this chain.
	pub local_gas_token: String,
	/// Native gas token id of every other configured chain this chain's
	/// messages can originate from or be delivered to, keyed by that
	/// chain's id. A chain with bounties from several source chains needs
	/// every one of their tokens priced, not just a single "remote" peer.
	pub remote_gas_tokens: HashMap<ChainId, String>,
	pub evaluator: EvaluatorConfig,
	/// Attempts before a message is marked fatal and dropped.
	pub max_attempts: u32,
	/// `base` in `base * 2^attempts`, capped at `max_backoff`.
	pub base_backoff: Duration,
	pub max_backoff: Duration,
	/// At most this many submissions in flight at once, shared between the
	/// delivery and ack loops.
	pub concurrency: usize,
}

impl SubmitterConfig {
	/// Gas token id for `chain_id`, falling back to an unrecognised-but-safe
	/// empty value (which a `PriceOracle` implementation will simply fail to
	/// price) rather than panicking on a chain this submitter wasn't told
	/// about.
	pub fn gas_token(&self, chain_id: ChainId) -> &str {
		self.remote_gas_tokens.get(&chain_id).map(String::as_str).unwrap_or_default()
	}
}
