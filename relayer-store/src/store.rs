//! The `Store`: the single source of shared state. Every worker talks to
//! Redis only through this type, never directly, so key namespacing and the
//! read-modify-write discipline around `RelayState` live in one place.

use crate::error::{Error, Result};
use crate::keys;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use relayer_types::{AmbMessage, AmbProof, ChainId, MessageIdentifier, RelayState};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// An optimistic-concurrency envelope: every `RelayState` write carries a
/// version counter so concurrent updates detect each other without needing a
/// Redis transaction.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
struct Versioned<T> {
	version: u64,
	value: T,
}

/// Maximum number of compare-and-swap attempts before [`Store::update_relay_state`]
/// gives up and returns [`Error::Conflict`].
const MAX_CAS_ATTEMPTS: u32 = 8;

#[derive(Clone)]
pub struct Store {
	connection: ConnectionManager,
	/// A bare `redis::Client`, kept around only to open dedicated pub/sub
	/// connections: `ConnectionManager` multiplexes regular commands but a
	/// subscriber needs its own connection for the lifetime of the subscription.
	client: redis::Client,
}

impl Store {
	pub async fn connect(url: &str) -> Result<Self> {
		let client = redis::Client::open(url)?;
		let connection = ConnectionManager::new(client.clone()).await?;
		Ok(Store { connection, client })
	}

	fn conn(&self) -> ConnectionManager {
		self.connection.clone()
	}

	async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
		let raw: Option<String> = self.conn().get(key).await?;
		raw.map(|raw| {
			serde_json::from_str(&raw)
				.map_err(|source| Error::Corrupted { key: key.to_string(), source: Arc::new(source) })
		})
		.transpose()
	}

	async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
		let raw = serde_json::to_string(value)
			.map_err(|source| Error::Serialization { key: key.to_string(), source: Arc::new(source) })?;
		let _: () = self.conn().set(key, raw).await?;
		self.publish_key_changed(key).await
	}

	/// Publishes `key` as the message payload on a channel named after `key`
	/// itself, so a `PSUBSCRIBE` pattern over channel names (`relayer:*:proof:*`)
	/// is exactly a subscription over key changes matching that same pattern.
	async fn publish_key_changed(&self, key: &str) -> Result<()> {
		let _: i64 = self.conn().publish(key, key).await?;
		Ok(())
	}

	/// Fetch the current `RelayState` for a message, or `None` if no bounty
	/// has been observed for it yet.
	pub async fn get_relay_state(
		&self,
		chain_id: ChainId,
		message_identifier: &MessageIdentifier,
	) -> Result<Option<RelayState>> {
		let key = keys::bounty_key(chain_id, message_identifier);
		let versioned: Option<Versioned<RelayState>> = self.get_json(&key).await?;
		Ok(versioned.map(|v| v.value))
	}

	/// Apply `mutate` to the current `RelayState` (or `None`, for a message
	/// that has never seen a bounty placed) and write the result back,
	/// retrying on optimistic-lock conflicts. `mutate` must be pure: it may
	/// be called more than once if another writer races it.
	pub async fn update_relay_state<F>(
		&self,
		chain_id: ChainId,
		message_identifier: &MessageIdentifier,
		mut mutate: F,
	) -> Result<RelayState>
	where
		F: FnMut(Option<RelayState>) -> RelayState,
	{
		let key = keys::bounty_key(chain_id, message_identifier);
		for _attempt in 0..MAX_CAS_ATTEMPTS {
			let current: Option<Versioned<RelayState>> = self.get_json(&key).await?;
			let (current_version, current_value) =
				current.map(|v| (v.version, Some(v.value))).unwrap_or((0, None));
			let next = Versioned { version: current_version + 1, value: mutate(current_value) };

			let raw = serde_json::to_string(&next)
				.map_err(|source| Error::Serialization { key: key.clone(), source: Arc::new(source) })?;

			let swapped: bool = compare_and_swap(&self.conn(), &key, current_version, &raw).await?;
			if swapped {
				self.publish_key_changed(&key).await?;
				return Ok(next.value);
			}
		}
		Err(Error::Conflict { key, attempts: MAX_CAS_ATTEMPTS })
	}

	pub async fn set_amb_message(&self, chain_id: ChainId, message: &AmbMessage) -> Result<()> {
		let key = keys::amb_message_key(chain_id, &message.message_identifier);
		self.set_json(&key, message).await?;
		let _: i64 = self
			.conn()
			.publish(keys::amb_message_channel(message.to_chain_id), &key)
			.await?;
		Ok(())
	}

	pub async fn get_amb_message(
		&self,
		chain_id: ChainId,
		message_identifier: &MessageIdentifier,
	) -> Result<Option<AmbMessage>> {
		self.get_json(&keys::amb_message_key(chain_id, message_identifier)).await
	}

	pub async fn set_amb_proof(&self, chain_id: ChainId, proof: &AmbProof) -> Result<()> {
		let key = keys::amb_proof_key(chain_id, &proof.message_identifier);
		self.set_json(&key, proof).await
	}

	pub async fn get_amb_proof(
		&self,
		chain_id: ChainId,
		message_identifier: &MessageIdentifier,
	) -> Result<Option<AmbProof>> {
		self.get_json(&keys::amb_proof_key(chain_id, message_identifier)).await
	}

	/// Subscribe to every key-change notification matching `pattern` (e.g.
	/// [`keys::proof_pattern`]). Yields the changed key's name for each
	/// publish; the caller re-reads the key itself, since pub/sub in Redis is
	/// at-most-once and never a substitute for the stored value.
	pub async fn subscribe_pattern(&self, pattern: &str) -> Result<impl futures::Stream<Item = String>> {
		let mut pubsub = self.client.get_async_pubsub().await?;
		pubsub.psubscribe(pattern).await?;
		Ok(pubsub.into_on_message().filter_map(|msg| async move { msg.get_payload::<String>().ok() }))
	}

	/// Subscribe to the `relayer:ambMessage:<chainId>` channel for messages
	/// destined to `chain_id`, yielding the key of each newly-written
	/// `AMBMessage` so the submitter for that chain can fetch it.
	pub async fn subscribe_amb_messages(&self, chain_id: ChainId) -> Result<impl futures::Stream<Item = String>> {
		let mut pubsub = self.client.get_async_pubsub().await?;
		pubsub.subscribe(keys::amb_message_channel(chain_id)).await?;
		Ok(pubsub.into_on_message().filter_map(|msg| async move { msg.get_payload::<String>().ok() }))
	}
}

/// `SET key value` only if the key's current JSON envelope still carries
/// `expected_version` (or the key is absent and `expected_version == 0`),
/// implemented with a Lua script so the read-compare-write is atomic from
/// Redis's point of view.
async fn compare_and_swap(
	conn: &ConnectionManager,
	key: &str,
	expected_version: u64,
	new_value: &str,
) -> Result<bool> {
	const SCRIPT: &str = r#"
local current = redis.call("GET", KEYS[1])
local expected = tonumber(ARGV[1])
if current == false then
    if expected ~= 0 then return 0 end
else
    local ok, decoded = pcall(cjson.decode, current)
    if not ok or decoded.version ~= expected then return 0 end
end
redis.call("SET", KEYS[1], ARGV[2])
return 1
"#;
	let mut conn = conn.clone();
	let result: i32 = redis::Script::new(SCRIPT)
		.key(key)
		.arg(expected_version)
		.arg(new_value)
		.invoke_async(&mut conn)
		.await?;
	Ok(result == 1)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn versioned_round_trips() {
		let value: Versioned<u32> = Versioned { version: 3, value: 42 };
		let json = serde_json::to_string(&value).unwrap();
		let decoded: Versioned<u32> = serde_json::from_str(&json).unwrap();
		assert_eq!(decoded.version, 3);
		assert_eq!(decoded.value, 42);
	}
}
