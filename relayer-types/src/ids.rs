//! Chain and message identifiers shared by every record in the data model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric chain identifier (an EVM chain id).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<u64> for ChainId {
	fn from(value: u64) -> Self {
		ChainId(value)
	}
}

/// 32-byte globally unique message identifier, encoded as `0x`-hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageIdentifier(#[serde(with = "crate::codec::hex_bytes_fixed32")] [u8; 32]);

impl MessageIdentifier {
	pub fn new(bytes: [u8; 32]) -> Self {
		MessageIdentifier(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}

	/// Parse from a `0x`-prefixed (or bare) hex string.
	pub fn from_hex(raw: &str) -> Result<Self, hex::FromHexError> {
		let stripped = raw.strip_prefix("0x").unwrap_or(raw);
		let decoded = hex::decode(stripped)?;
		let mut bytes = [0u8; 32];
		if decoded.len() != 32 {
			return Err(hex::FromHexError::InvalidStringLength);
		}
		bytes.copy_from_slice(&decoded);
		Ok(MessageIdentifier(bytes))
	}

	pub fn to_hex(&self) -> String {
		format!("0x{}", hex::encode(self.0))
	}
}

impl fmt::Debug for MessageIdentifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "MessageIdentifier({})", self.to_hex())
	}
}

impl fmt::Display for MessageIdentifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_hex())
	}
}

/// Tag identifying which AMB provider produced/will deliver a message, e.g.
/// `"mock"`, `"wormhole"`, `"layer-zero"`. Selected at configuration time and
/// used to look up the provider in the collector registry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AmbId(pub String);

impl fmt::Display for AmbId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl From<&str> for AmbId {
	fn from(value: &str) -> Self {
		AmbId(value.to_string())
	}
}

/// A minimal reference to the on-chain transaction that produced a record:
/// used purely for diagnostics/audit, never as a join key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxDescriptor {
	#[serde(with = "crate::codec::hex_bytes_fixed32")]
	pub transaction_hash: [u8; 32],
	#[serde(with = "crate::codec::hex_bytes_fixed32")]
	pub block_hash: [u8; 32],
	pub block_number: u64,
}
