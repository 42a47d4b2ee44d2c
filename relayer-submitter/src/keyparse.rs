//! `Store::subscribe_pattern` hands back the raw key name that changed
//! (`relayer:<chainId>:<kind>:<messageIdentifier>`); the submitter has to
//! pull the chain and identifier back out of it to know what to re-fetch.

use crate::error::{Error, Result};
use relayer_types::{ChainId, MessageIdentifier};

pub struct ParsedKey {
	pub chain_id: ChainId,
	pub message_identifier: MessageIdentifier,
}

pub fn parse_key(key: &str) -> Result<ParsedKey> {
	let mut parts = key.splitn(4, ':');
	let (Some("relayer"), Some(chain), Some(_kind), Some(id)) =
		(parts.next(), parts.next(), parts.next(), parts.next())
	else {
		return Err(Error::MalformedKey(key.to_string()));
	};
	let chain_id = chain.parse::<u64>().map(ChainId).map_err(|_| Error::MalformedKey(key.to_string()))?;
	let message_identifier = MessageIdentifier::from_hex(id).map_err(|_| Error::MalformedKey(key.to_string()))?;
	Ok(ParsedKey { chain_id, message_identifier })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_a_well_formed_key() {
		let id = MessageIdentifier::new([7u8; 32]);
		let key = format!("relayer:5:proof:{id}");
		let parsed = parse_key(&key).unwrap();
		assert_eq!(parsed.chain_id, ChainId(5));
		assert_eq!(parsed.message_identifier, id);
	}

	#[test]
	fn rejects_a_key_from_a_different_namespace() {
		assert!(parse_key("something:else").is_err());
		assert!(parse_key("relayer:5:proof").is_err());
	}
}
