//! Key and channel namespacing. Every key lives under `relayer:<chainId>:...`
//! so that chains never collide and an operator can `SCAN` one chain's state
//! in isolation.

use relayer_types::{ChainId, MessageIdentifier};

pub fn bounty_key(chain_id: ChainId, message_identifier: &MessageIdentifier) -> String {
	format!("relayer:{chain_id}:bounty:{message_identifier}")
}

pub fn amb_message_key(chain_id: ChainId, message_identifier: &MessageIdentifier) -> String {
	format!("relayer:{chain_id}:amb:{message_identifier}")
}

pub fn amb_proof_key(chain_id: ChainId, message_identifier: &MessageIdentifier) -> String {
	format!("relayer:{chain_id}:proof:{message_identifier}")
}

/// Pattern matching every bounty key on a chain, for `PSUBSCRIBE`/`SCAN`.
pub fn bounty_pattern(chain_id: ChainId) -> String {
	format!("relayer:{chain_id}:bounty:*")
}

pub fn proof_pattern(chain_id: ChainId) -> String {
	format!("relayer:{chain_id}:proof:*")
}

/// Channel a bounty collector publishes to when it deposits an `AMBMessage`
/// destined for `to_chain_id`, so the submitter for that chain only wakes for
/// messages it actually owns.
pub fn amb_message_channel(to_chain_id: ChainId) -> String {
	format!("relayer:ambMessage:{to_chain_id}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keys_are_namespaced_by_chain_and_kind() {
		let id = MessageIdentifier::new([1u8; 32]);
		assert_eq!(bounty_key(ChainId(5), &id), format!("relayer:5:bounty:{id}"));
		assert_eq!(amb_message_key(ChainId(5), &id), format!("relayer:5:amb:{id}"));
		assert_eq!(amb_proof_key(ChainId(5), &id), format!("relayer:5:proof:{id}"));
	}

	#[test]
	fn channel_names_are_stable() {
		assert_eq!(amb_message_channel(ChainId(7)), "relayer:ambMessage:7");
	}
}
