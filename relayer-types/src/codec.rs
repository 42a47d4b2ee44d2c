//! Serde helpers enforcing the wire encoding mandated by the data model:
//! integers too large for a JSON number travel as decimal strings, and raw
//! byte strings travel as `0x`-prefixed hex.

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

/// `#[serde(with = "decimal_u128")]` — encodes a `u128` as a decimal string
/// instead of a JSON number, so values that don't fit in an `f64`-backed
/// `serde_json::Number` survive a round trip untouched.
pub mod decimal_u128 {
	use super::*;

	pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&value.to_string())
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
		let raw = String::deserialize(deserializer)?;
		raw.parse().map_err(|_| D::Error::custom(format!("not a decimal u128: {raw:?}")))
	}
}

/// Same as [`decimal_u128`] but for `Option<u128>`.
pub mod decimal_u128_opt {
	use super::*;

	pub fn serialize<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
		match value {
			Some(value) => serializer.serialize_some(&value.to_string()),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u128>, D::Error> {
		let raw: Option<String> = Option::deserialize(deserializer)?;
		raw.map(|raw| raw.parse().map_err(|_| D::Error::custom(format!("not a decimal u128: {raw:?}"))))
			.transpose()
	}
}

/// `#[serde(with = "hex_bytes")]` — encodes a byte string as `0x`-prefixed hex.
pub mod hex_bytes {
	use super::*;

	pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&format!("0x{}", hex::encode(value)))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
		let raw = String::deserialize(deserializer)?;
		let stripped = raw.strip_prefix("0x").unwrap_or(&raw);
		hex::decode(stripped).map_err(|err| D::Error::custom(format!("not hex: {raw:?}: {err}")))
	}
}

/// Same as [`hex_bytes`] but for `Option<Vec<u8>>`.
pub mod hex_bytes_opt {
	use super::*;

	pub fn serialize<S: Serializer>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
		match value {
			Some(bytes) => serializer.serialize_some(&format!("0x{}", hex::encode(bytes))),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
		let raw: Option<String> = Option::deserialize(deserializer)?;
		raw.map(|raw| {
			let stripped = raw.strip_prefix("0x").unwrap_or(&raw).to_string();
			hex::decode(&stripped).map_err(|err| D::Error::custom(format!("not hex: {raw:?}: {err}")))
		})
		.transpose()
	}
}

/// `#[serde(with = "hex_bytes_fixed32")]` — encodes a fixed 32-byte array as
/// `0x`-prefixed hex (message identifiers, transaction/block hashes).
pub mod hex_bytes_fixed32 {
	use super::*;

	pub fn serialize<S: Serializer>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&format!("0x{}", hex::encode(value)))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
		let raw = String::deserialize(deserializer)?;
		let stripped = raw.strip_prefix("0x").unwrap_or(&raw);
		let decoded = hex::decode(stripped).map_err(|err| D::Error::custom(format!("not hex: {raw:?}: {err}")))?;
		let mut bytes = [0u8; 32];
		if decoded.len() != 32 {
			return Err(D::Error::custom(format!("expected 32 bytes, got {}", decoded.len())));
		}
		bytes.copy_from_slice(&decoded);
		Ok(bytes)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
	struct DecimalHolder(#[serde(with = "decimal_u128")] u128);

	#[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
	struct BytesHolder(#[serde(with = "hex_bytes")] Vec<u8>);

	#[test]
	fn decimal_u128_round_trips_large_values() {
		let value = DecimalHolder(u128::MAX);
		let json = serde_json::to_string(&value).unwrap();
		assert_eq!(json, format!("\"{}\"", u128::MAX));
		assert_eq!(serde_json::from_str::<DecimalHolder>(&json).unwrap(), value);
	}

	#[test]
	fn hex_bytes_round_trips() {
		let value = BytesHolder(vec![0xde, 0xad, 0xbe, 0xef]);
		let json = serde_json::to_string(&value).unwrap();
		assert_eq!(json, "\"0xdeadbeef\"");
		assert_eq!(serde_json::from_str::<BytesHolder>(&json).unwrap(), value);
	}

	#[test]
	fn hex_bytes_accepts_missing_0x_prefix() {
		let json = "\"deadbeef\"";
		assert_eq!(serde_json::from_str::<BytesHolder>(json).unwrap(), BytesHolder(vec![0xde, 0xad, 0xbe, 0xef]));
	}
}
