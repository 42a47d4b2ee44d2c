//! `AMBProof`: the provider-specific proof that authorises delivery or ack.

use crate::codec::hex_bytes;
use crate::ids::{AmbId, ChainId, MessageIdentifier};
use serde::{Deserialize, Serialize};

/// The provider-specific proof that authorises delivery or ack, written by an
/// AMB collector once it has observed the out-of-band proof material (signed
/// message, merkle proof, ...) for a given `messageIdentifier`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbProof {
	pub message_identifier: MessageIdentifier,
	pub amb: AmbId,
	pub from_chain_id: ChainId,
	pub to_chain_id: ChainId,
	/// Bytes to submit to the destination (or source, for ack) contract.
	#[serde(with = "hex_bytes")]
	pub message: Vec<u8>,
	/// Auxiliary bytes required alongside `message`; may be empty.
	#[serde(default, with = "hex_bytes")]
	pub message_ctx: Vec<u8>,
}

impl AmbProof {
	/// Best-effort extraction of `gasSpent` from a `DESTINATION_TO_SOURCE`
	/// proof's `message_ctx`. The wire format is provider-specific; collectors
	/// populate `message_ctx` as `gasSpent` encoded big-endian in its low 16
	/// bytes when emitting a destination-to-source context, which is all the
	/// evaluator needs to know.
	pub fn decode_gas_spent(&self) -> Option<u128> {
		if self.message_ctx.len() < 16 {
			return None;
		}
		let start = self.message_ctx.len() - 16;
		let mut buf = [0u8; 16];
		buf.copy_from_slice(&self.message_ctx[start..]);
		Some(u128::from_be_bytes(buf))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> AmbProof {
		AmbProof {
			message_identifier: MessageIdentifier::new([7u8; 32]),
			amb: AmbId::from("mock"),
			from_chain_id: ChainId(1),
			to_chain_id: ChainId(2),
			message: vec![1, 2, 3],
			message_ctx: vec![],
		}
	}

	#[test]
	fn round_trips_through_json() {
		let proof = sample();
		let json = serde_json::to_string(&proof).unwrap();
		let decoded: AmbProof = serde_json::from_str(&json).unwrap();
		assert_eq!(decoded, proof);
	}

	#[test]
	fn decode_gas_spent_reads_trailing_16_bytes() {
		let mut proof = sample();
		proof.message_ctx = 123_456u128.to_be_bytes().to_vec();
		assert_eq!(proof.decode_gas_spent(), Some(123_456));
	}

	#[test]
	fn decode_gas_spent_none_when_too_short() {
		let proof = sample();
		assert_eq!(proof.decode_gas_spent(), None);
	}
}
