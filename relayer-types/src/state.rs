//! `RelayState`: the per-message lifecycle record, and the monotonicity
//! invariant that only the bounty collector is allowed to advance it.

use crate::codec::decimal_u128_opt;
use crate::ids::{ChainId, TxDescriptor};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a relayed message. Must only ever advance in this
/// order; see [`RelayState::apply`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelayStatus {
	BountyPlaced,
	MessageDelivered,
	BountyClaimed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BountyPlacedEvent {
	pub from_chain_id: ChainId,
	#[serde(with = "crate::codec::hex_bytes_fixed32")]
	pub incentives_address: [u8; 32],
	#[serde(with = "crate::codec::decimal_u128")]
	pub max_gas_delivery: u128,
	#[serde(with = "crate::codec::decimal_u128")]
	pub max_gas_ack: u128,
	#[serde(with = "crate::codec::hex_bytes_fixed32")]
	pub refund_gas_to: [u8; 32],
	#[serde(with = "crate::codec::decimal_u128")]
	pub price_of_delivery_gas: u128,
	#[serde(with = "crate::codec::decimal_u128")]
	pub price_of_ack_gas: u128,
	#[serde(with = "crate::codec::decimal_u128")]
	pub target_delta: u128,
	pub tx: TxDescriptor,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeliveredEvent {
	pub to_chain_id: ChainId,
	pub tx: TxDescriptor,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BountyClaimedEvent {
	pub tx: TxDescriptor,
}

/// Always holds the *latest* reported prices: unlike the other event detail
/// records this one is overwritten, not write-once, every time a
/// `BountyIncreased` log is seen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BountyIncreasedEvent {
	#[serde(with = "crate::codec::decimal_u128")]
	pub new_delivery_gas_price: u128,
	#[serde(with = "crate::codec::decimal_u128")]
	pub new_ack_gas_price: u128,
	pub tx: TxDescriptor,
}

/// The per-message lifecycle record, keyed by `messageIdentifier` in the
/// store. Only the bounty collector may call the `apply_*` transitions;
/// everything else reads it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayState {
	pub status: RelayStatus,
	pub bounty_placed_event: Option<BountyPlacedEvent>,
	pub message_delivered_event: Option<MessageDeliveredEvent>,
	pub bounty_claimed_event: Option<BountyClaimedEvent>,
	pub bounty_increased_event: Option<BountyIncreasedEvent>,
	/// Only set when *this* relayer process submitted delivery.
	#[serde(default, with = "decimal_u128_opt")]
	pub delivery_gas_cost: Option<u128>,
}

/// Violation of the `RelayState` monotonicity invariant: the mutation would
/// either skip a status, move backwards, or overwrite a write-once field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
	#[error("cannot place a bounty for a message that already has relay state (status {0:?})")]
	AlreadyPlaced(RelayStatus),
	#[error("cannot record delivery for a message not currently in BountyPlaced (status {0:?})")]
	NotYetPlaced(RelayStatus),
	#[error("cannot record bounty claim for a message not currently in MessageDelivered (status {0:?})")]
	NotYetDelivered(RelayStatus),
}

impl RelayState {
	/// Create the initial record for a message, as observed from a
	/// `BountyPlaced` event. This is the only way a `RelayState` comes into
	/// existence.
	pub fn new(event: BountyPlacedEvent) -> Self {
		RelayState {
			status: RelayStatus::BountyPlaced,
			bounty_placed_event: Some(event),
			message_delivered_event: None,
			bounty_claimed_event: None,
			bounty_increased_event: None,
			delivery_gas_cost: None,
		}
	}

	/// Overwrite the latest reported gas prices. Allowed from any status;
	/// this is the one field that is not write-once.
	pub fn apply_bounty_increased(&mut self, event: BountyIncreasedEvent) {
		self.bounty_increased_event = Some(event);
	}

	/// Advance `BountyPlaced -> MessageDelivered`. Fails if the message is not
	/// currently `BountyPlaced`.
	pub fn apply_message_delivered(&mut self, event: MessageDeliveredEvent) -> Result<(), StateError> {
		if self.status != RelayStatus::BountyPlaced {
			return Err(StateError::NotYetPlaced(self.status));
		}
		self.status = RelayStatus::MessageDelivered;
		self.message_delivered_event = Some(event);
		Ok(())
	}

	/// Advance `MessageDelivered -> BountyClaimed`. Fails if the message is
	/// not currently `MessageDelivered`.
	pub fn apply_bounty_claimed(&mut self, event: BountyClaimedEvent) -> Result<(), StateError> {
		if self.status != RelayStatus::MessageDelivered {
			return Err(StateError::NotYetDelivered(self.status));
		}
		self.status = RelayStatus::BountyClaimed;
		self.bounty_claimed_event = Some(event);
		Ok(())
	}

	/// Record that *this* relayer process paid for delivery. Write-once:
	/// calling it twice is a no-op that keeps the first recorded cost, since
	/// only one delivery transaction can ever be "the" one this process paid
	/// for.
	pub fn record_own_delivery_gas_cost(&mut self, gas_cost: u128) {
		if self.delivery_gas_cost.is_none() {
			self.delivery_gas_cost = Some(gas_cost);
		}
	}

	/// The delivery gas price to use for evaluation: the latest
	/// `BountyIncreased` value if any, else the original `BountyPlaced` price.
	pub fn effective_delivery_gas_price(&self) -> Option<u128> {
		self.bounty_increased_event
			.as_ref()
			.map(|event| event.new_delivery_gas_price)
			.or_else(|| self.bounty_placed_event.as_ref().map(|event| event.price_of_delivery_gas))
	}

	/// The ack gas price to use for evaluation: the latest `BountyIncreased`
	/// value if any, else the original `BountyPlaced` price.
	pub fn effective_ack_gas_price(&self) -> Option<u128> {
		self.bounty_increased_event
			.as_ref()
			.map(|event| event.new_ack_gas_price)
			.or_else(|| self.bounty_placed_event.as_ref().map(|event| event.price_of_ack_gas))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tx() -> TxDescriptor {
		TxDescriptor { transaction_hash: [1u8; 32], block_hash: [2u8; 32], block_number: 1 }
	}

	fn bounty_placed() -> BountyPlacedEvent {
		BountyPlacedEvent {
			from_chain_id: ChainId(1),
			incentives_address: [9u8; 32],
			max_gas_delivery: 200_000,
			max_gas_ack: 100_000,
			refund_gas_to: [3u8; 32],
			price_of_delivery_gas: 10,
			price_of_ack_gas: 5,
			target_delta: 0,
			tx: tx(),
		}
	}

	#[test]
	fn status_transitions_follow_the_prefix_invariant() {
		let mut state = RelayState::new(bounty_placed());
		assert_eq!(state.status, RelayStatus::BountyPlaced);

		state.apply_message_delivered(MessageDeliveredEvent { to_chain_id: ChainId(2), tx: tx() }).unwrap();
		assert_eq!(state.status, RelayStatus::MessageDelivered);

		state.apply_bounty_claimed(BountyClaimedEvent { tx: tx() }).unwrap();
		assert_eq!(state.status, RelayStatus::BountyClaimed);
	}

	#[test]
	fn cannot_skip_message_delivered() {
		let mut state = RelayState::new(bounty_placed());
		let err = state.apply_bounty_claimed(BountyClaimedEvent { tx: tx() }).unwrap_err();
		assert_eq!(err, StateError::NotYetDelivered(RelayStatus::BountyPlaced));
	}

	#[test]
	fn cannot_deliver_twice() {
		let mut state = RelayState::new(bounty_placed());
		state.apply_message_delivered(MessageDeliveredEvent { to_chain_id: ChainId(2), tx: tx() }).unwrap();
		let err = state
			.apply_message_delivered(MessageDeliveredEvent { to_chain_id: ChainId(2), tx: tx() })
			.unwrap_err();
		assert_eq!(err, StateError::NotYetPlaced(RelayStatus::MessageDelivered));
	}

	#[test]
	fn bounty_increased_always_keeps_latest_price() {
		let mut state = RelayState::new(bounty_placed());
		assert_eq!(state.effective_delivery_gas_price(), Some(10));

		state.apply_bounty_increased(BountyIncreasedEvent {
			new_delivery_gas_price: 1000,
			new_ack_gas_price: 500,
			tx: tx(),
		});
		assert_eq!(state.effective_delivery_gas_price(), Some(1000));
		assert_eq!(state.effective_ack_gas_price(), Some(500));

		// Advancing status doesn't reset the increased price.
		state.apply_message_delivered(MessageDeliveredEvent { to_chain_id: ChainId(2), tx: tx() }).unwrap();
		assert_eq!(state.effective_delivery_gas_price(), Some(1000));
	}

	#[test]
	fn own_delivery_gas_cost_is_write_once() {
		let mut state = RelayState::new(bounty_placed());
		state.record_own_delivery_gas_cost(42);
		state.record_own_delivery_gas_cost(99);
		assert_eq!(state.delivery_gas_cost, Some(42));
	}

	#[test]
	fn round_trips_through_json() {
		let mut state = RelayState::new(bounty_placed());
		state.record_own_delivery_gas_cost(7);
		let json = serde_json::to_string(&state).unwrap();
		let decoded: RelayState = serde_json::from_str(&json).unwrap();
		assert_eq!(decoded, state);
	}
}
