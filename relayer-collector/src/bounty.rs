//! The bounty collector: decodes the escrow contract's own events and is the
//! only writer allowed to advance a `RelayState`'s status.
//!
//! `MessageDelivered` is special: it fires on the *destination* chain, for a
//! bounty that lives under the *source* chain's key, so it carries the
//! source chain id explicitly and this collector writes across chains for
//! that one event.

use crate::config::BountyCollectorConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use ethabi::{Event, EventParam, ParamType, RawLog};
use relayer_store::Store;
use relayer_types::{
	BountyClaimedEvent, BountyIncreasedEvent, BountyPlacedEvent, ChainId, MessageDeliveredEvent, MessageIdentifier,
	RelayState, TxDescriptor,
};
use web3::types::{Address, FilterBuilder, Log, H256};

use crate::scan::EventSink;

fn bounty_placed_event() -> Event {
	Event {
		name: "BountyPlaced".into(),
		inputs: vec![
			EventParam { name: "messageIdentifier".into(), kind: ParamType::FixedBytes(32), indexed: true },
			EventParam { name: "maxGasDelivery".into(), kind: ParamType::Uint(256), indexed: false },
			EventParam { name: "maxGasAck".into(), kind: ParamType::Uint(256), indexed: false },
			EventParam { name: "refundGasTo".into(), kind: ParamType::FixedBytes(32), indexed: false },
			EventParam { name: "priceOfDeliveryGas".into(), kind: ParamType::Uint(256), indexed: false },
			EventParam { name: "priceOfAckGas".into(), kind: ParamType::Uint(256), indexed: false },
			EventParam { name: "targetDelta".into(), kind: ParamType::Uint(256), indexed: false },
		],
		anonymous: false,
	}
}

fn bounty_increased_event() -> Event {
	Event {
		name: "BountyIncreased".into(),
		inputs: vec![
			EventParam { name: "messageIdentifier".into(), kind: ParamType::FixedBytes(32), indexed: true },
			EventParam { name: "newDeliveryGasPrice".into(), kind: ParamType::Uint(256), indexed: false },
			EventParam { name: "newAckGasPrice".into(), kind: ParamType::Uint(256), indexed: false },
		],
		anonymous: false,
	}
}

fn message_delivered_event() -> Event {
	Event {
		name: "MessageDelivered".into(),
		inputs: vec![
			EventParam { name: "messageIdentifier".into(), kind: ParamType::FixedBytes(32), indexed: true },
			EventParam { name: "fromChainId".into(), kind: ParamType::Uint(256), indexed: false },
		],
		anonymous: false,
	}
}

fn bounty_claimed_event() -> Event {
	Event {
		name: "BountyClaimed".into(),
		inputs: vec![EventParam { name: "messageIdentifier".into(), kind: ParamType::FixedBytes(32), indexed: true }],
		anonymous: false,
	}
}

/// This contract's event signatures, built once per `BountySink` so a log's
/// `topic0` can be dispatched to the right decoder.
struct Signatures {
	bounty_placed: Event,
	bounty_increased: Event,
	message_delivered: Event,
	bounty_claimed: Event,
}

impl Signatures {
	fn new() -> Self {
		Signatures {
			bounty_placed: bounty_placed_event(),
			bounty_increased: bounty_increased_event(),
			message_delivered: message_delivered_event(),
			bounty_claimed: bounty_claimed_event(),
		}
	}

	fn topics(&self) -> Vec<H256> {
		vec![
			self.bounty_placed.signature(),
			self.bounty_increased.signature(),
			self.message_delivered.signature(),
			self.bounty_claimed.signature(),
		]
	}
}

pub struct BountySink {
	chain_id: ChainId,
	config: BountyCollectorConfig,
	store: Store,
	signatures: Signatures,
}

impl BountySink {
	pub fn new(chain_id: ChainId, config: BountyCollectorConfig, store: Store) -> Self {
		BountySink { chain_id, config, store, signatures: Signatures::new() }
	}

	async fn handle_log(&self, log: &Log) -> Result<()> {
		let topic0 = *log.topics.first().ok_or_else(|| decode_err(log, "log has no topics"))?;
		let raw = || RawLog { topics: log.topics.clone(), data: log.data.0.clone() };

		if topic0 == self.signatures.bounty_placed.signature() {
			let parsed = self.signatures.bounty_placed.parse_log(raw()).map_err(|e| decode_err(log, &e.to_string()))?;
			self.handle_bounty_placed(log, parsed).await
		} else if topic0 == self.signatures.bounty_increased.signature() {
			let parsed =
				self.signatures.bounty_increased.parse_log(raw()).map_err(|e| decode_err(log, &e.to_string()))?;
			self.handle_bounty_increased(log, parsed).await
		} else if topic0 == self.signatures.message_delivered.signature() {
			let parsed =
				self.signatures.message_delivered.parse_log(raw()).map_err(|e| decode_err(log, &e.to_string()))?;
			self.handle_message_delivered(log, parsed).await
		} else if topic0 == self.signatures.bounty_claimed.signature() {
			let parsed = self.signatures.bounty_claimed.parse_log(raw()).map_err(|e| decode_err(log, &e.to_string()))?;
			self.handle_bounty_claimed(log, parsed).await
		} else {
			Ok(())
		}
	}

	async fn handle_bounty_placed(&self, log: &Log, parsed: ethabi::Log) -> Result<()> {
		let message_identifier = message_identifier(&parsed, log, "messageIdentifier")?;
		let event = BountyPlacedEvent {
			from_chain_id: self.chain_id,
			incentives_address: address32(log.address),
			max_gas_delivery: uint(&parsed, log, "maxGasDelivery")?,
			max_gas_ack: uint(&parsed, log, "maxGasAck")?,
			refund_gas_to: fixed_bytes32(&parsed, log, "refundGasTo")?,
			price_of_delivery_gas: uint(&parsed, log, "priceOfDeliveryGas")?,
			price_of_ack_gas: uint(&parsed, log, "priceOfAckGas")?,
			target_delta: uint(&parsed, log, "targetDelta")?,
			tx: tx_descriptor(log)?,
		};
		self.store
			.update_relay_state(self.chain_id, &message_identifier, move |existing| {
				existing.unwrap_or_else(|| RelayState::new(event.clone()))
			})
			.await?;
		Ok(())
	}

	async fn handle_bounty_increased(&self, log: &Log, parsed: ethabi::Log) -> Result<()> {
		let message_identifier = message_identifier(&parsed, log, "messageIdentifier")?;
		if !self.bounty_exists(self.chain_id, &message_identifier).await? {
			log::warn!("BountyIncreased for a message with no known bounty, ignoring: {message_identifier}");
			return Ok(());
		}
		let event = BountyIncreasedEvent {
			new_delivery_gas_price: uint(&parsed, log, "newDeliveryGasPrice")?,
			new_ack_gas_price: uint(&parsed, log, "newAckGasPrice")?,
			tx: tx_descriptor(log)?,
		};
		self.store
			.update_relay_state(self.chain_id, &message_identifier, move |existing| {
				let mut state = existing.unwrap_or_else(|| missing_bounty_fallback(message_identifier, event.tx.clone()));
				state.apply_bounty_increased(event.clone());
				state
			})
			.await?;
		Ok(())
	}

	async fn handle_message_delivered(&self, log: &Log, parsed: ethabi::Log) -> Result<()> {
		let message_identifier = message_identifier(&parsed, log, "messageIdentifier")?;
		let from_chain_id = ChainId(uint(&parsed, log, "fromChainId")? as u64);
		if !self.bounty_exists(from_chain_id, &message_identifier).await? {
			log::warn!(
				"MessageDelivered for a message with no known bounty on chain {from_chain_id}, ignoring: {message_identifier}"
			);
			return Ok(());
		}
		let event = MessageDeliveredEvent { to_chain_id: self.chain_id, tx: tx_descriptor(log)? };
		self.store
			.update_relay_state(from_chain_id, &message_identifier, move |existing| {
				let mut state = existing.unwrap_or_else(|| missing_bounty_fallback(message_identifier, event.tx.clone()));
				if let Err(err) = state.apply_message_delivered(event.clone()) {
					log::warn!("ignoring out-of-order MessageDelivered for {message_identifier}: {err}");
				}
				state
			})
			.await?;
		Ok(())
	}

	async fn handle_bounty_claimed(&self, log: &Log, parsed: ethabi::Log) -> Result<()> {
		let message_identifier = message_identifier(&parsed, log, "messageIdentifier")?;
		if !self.bounty_exists(self.chain_id, &message_identifier).await? {
			log::warn!("BountyClaimed for a message with no known bounty, ignoring: {message_identifier}");
			return Ok(());
		}
		let event = BountyClaimedEvent { tx: tx_descriptor(log)? };
		self.store
			.update_relay_state(self.chain_id, &message_identifier, move |existing| {
				let mut state = existing.unwrap_or_else(|| missing_bounty_fallback(message_identifier, event.tx.clone()));
				if let Err(err) = state.apply_bounty_claimed(event.clone()) {
					log::warn!("ignoring out-of-order BountyClaimed for {message_identifier}: {err}");
				}
				state
			})
			.await?;
		Ok(())
	}

	/// `BountyIncreased`/`MessageDelivered`/`BountyClaimed` only make sense
	/// once a `BountyPlaced` has been recorded; this never races a concurrent
	/// `BountyPlaced` write against the same identifier in practice, since
	/// on-chain causality guarantees `BountyPlaced` is always scanned first.
	async fn bounty_exists(&self, chain_id: ChainId, message_identifier: &MessageIdentifier) -> Result<bool> {
		Ok(self.store.get_relay_state(chain_id, message_identifier).await?.is_some())
	}
}

#[async_trait]
impl EventSink for BountySink {
	fn filter(&self, from_block: u64, to_block: u64) -> web3::types::Filter {
		FilterBuilder::default()
			.address(vec![self.config.contract_address])
			.topics(Some(self.signatures.topics()), None, None, None)
			.from_block(from_block.into())
			.to_block(to_block.into())
			.build()
	}

	async fn handle(&self, logs: Vec<Log>) -> Result<()> {
		for log in &logs {
			self.handle_log(log).await?;
		}
		Ok(())
	}
}

/// `bounty_exists` already confirmed a `RelayState` is present before any of
/// these closures run, and the store never deletes a key, so this branch
/// should be unreachable. It exists only so a CAS race lands a loud log
/// instead of a panicked collector task.
fn missing_bounty_fallback(message_identifier: MessageIdentifier, tx: TxDescriptor) -> RelayState {
	log::error!(
		"no RelayState found for {message_identifier} despite a prior existence check; synthesizing a placeholder so the collector keeps running"
	);
	RelayState::new(BountyPlacedEvent {
		from_chain_id: ChainId(0),
		incentives_address: [0u8; 32],
		max_gas_delivery: 0,
		max_gas_ack: 0,
		refund_gas_to: [0u8; 32],
		price_of_delivery_gas: 0,
		price_of_ack_gas: 0,
		target_delta: 0,
		tx,
	})
}

fn decode_err(log: &Log, reason: &str) -> Error {
	Error::Decode { address: log.address, reason: reason.to_string() }
}

fn tx_descriptor(log: &Log) -> Result<TxDescriptor> {
	let transaction_hash = log.transaction_hash.ok_or_else(|| decode_err(log, "log missing transaction hash"))?;
	let block_hash = log.block_hash.ok_or_else(|| decode_err(log, "log missing block hash"))?;
	let block_number = log.block_number.ok_or_else(|| decode_err(log, "log missing block number"))?;
	Ok(TxDescriptor {
		transaction_hash: transaction_hash.0,
		block_hash: block_hash.0,
		block_number: block_number.as_u64(),
	})
}

fn address32(address: Address) -> [u8; 32] {
	let mut bytes = [0u8; 32];
	bytes[12..].copy_from_slice(address.as_bytes());
	bytes
}

fn message_identifier(parsed: &ethabi::Log, log: &Log, name: &str) -> Result<MessageIdentifier> {
	Ok(MessageIdentifier::new(fixed_bytes32(parsed, log, name)?))
}

fn fixed_bytes32(parsed: &ethabi::Log, log: &Log, name: &str) -> Result<[u8; 32]> {
	let raw = param(parsed, log, name)?
		.clone()
		.into_fixed_bytes()
		.ok_or_else(|| decode_err(log, &format!("{name} is not fixed bytes")))?;
	if raw.len() != 32 {
		return Err(decode_err(log, &format!("{name} is not 32 bytes")));
	}
	let mut bytes = [0u8; 32];
	bytes.copy_from_slice(&raw);
	Ok(bytes)
}

fn uint(parsed: &ethabi::Log, log: &Log, name: &str) -> Result<u128> {
	let value = param(parsed, log, name)?
		.clone()
		.into_uint()
		.ok_or_else(|| decode_err(log, &format!("{name} is not a uint")))?;
	if value.bits() > 128 {
		return Err(decode_err(log, &format!("{name} overflows u128")));
	}
	Ok(value.as_u128())
}

fn param<'a>(parsed: &'a ethabi::Log, log: &Log, name: &str) -> Result<&'a ethabi::Token> {
	parsed
		.params
		.iter()
		.find(|p| p.name == name)
		.map(|p| &p.value)
		.ok_or_else(|| decode_err(log, &format!("missing field {name}")))
}
