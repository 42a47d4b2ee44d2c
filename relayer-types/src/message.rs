//! `AMBMessage`: the raw cross-chain message as observed on the source chain.

use crate::codec::{hex_bytes, hex_bytes_fixed32, hex_bytes_opt};
use crate::ids::{AmbId, ChainId, MessageIdentifier};
use serde::{Deserialize, Serialize};

/// The raw cross-chain message as observed on the source chain, written by a
/// bounty collector when it sees the corresponding source-chain event and
/// read by the submitter that owns the destination chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbMessage {
	pub message_identifier: MessageIdentifier,
	pub amb: AmbId,
	pub from_chain_id: ChainId,
	pub to_chain_id: ChainId,
	#[serde(with = "hex_bytes_fixed32")]
	pub from_incentives_address: [u8; 32],
	#[serde(default, with = "hex_bytes_opt")]
	pub to_incentives_address: Option<Vec<u8>>,
	#[serde(with = "hex_bytes")]
	pub incentives_payload: Vec<u8>,
	#[serde(default, with = "hex_bytes_opt")]
	pub recovery_context: Option<Vec<u8>>,
	#[serde(with = "hex_bytes_fixed32")]
	pub transaction_hash: [u8; 32],
	#[serde(with = "hex_bytes_fixed32")]
	pub block_hash: [u8; 32],
	pub block_number: u64,
	/// When `true`, the submitter jumps this message to the head of its
	/// pending queue and bypasses backoff once (still subject to evaluation).
	#[serde(default)]
	pub priority: bool,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> AmbMessage {
		AmbMessage {
			message_identifier: MessageIdentifier::new([1u8; 32]),
			amb: AmbId::from("mock"),
			from_chain_id: ChainId(1),
			to_chain_id: ChainId(2),
			from_incentives_address: [2u8; 32],
			to_incentives_address: Some(vec![3u8; 20]),
			incentives_payload: vec![0xde, 0xad],
			recovery_context: None,
			transaction_hash: [4u8; 32],
			block_hash: [5u8; 32],
			block_number: 100,
			priority: true,
		}
	}

	#[test]
	fn round_trips_through_json() {
		let message = sample();
		let json = serde_json::to_string(&message).unwrap();
		let decoded: AmbMessage = serde_json::from_str(&json).unwrap();
		assert_eq!(decoded, message);
	}

	#[test]
	fn priority_defaults_to_false() {
		let message = AmbMessage {
			message_identifier: MessageIdentifier::new([1u8; 32]),
			amb: AmbId::from("mock"),
			from_chain_id: ChainId(1),
			to_chain_id: ChainId(2),
			from_incentives_address: [2u8; 32],
			to_incentives_address: None,
			incentives_payload: vec![],
			recovery_context: None,
			transaction_hash: [4u8; 32],
			block_hash: [5u8; 32],
			block_number: 100,
			priority: false,
		};
		let mut value = serde_json::to_value(&message).unwrap();
		value.as_object_mut().unwrap().remove("priority");
		let decoded: AmbMessage = serde_json::from_value(value).unwrap();
		assert!(!decoded.priority);
	}
}
