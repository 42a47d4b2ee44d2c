//! Inputs and outputs of `evaluateDelivery`/`evaluateAck`.

use rust_decimal::Decimal;

/// `gasEstimateComponents` from the spec: what a Wallet's gas estimation
/// step hands the evaluator before it decides whether to submit.
#[derive(Clone, Copy, Debug)]
pub struct GasEstimateComponents {
	/// Gas the transaction is expected to use (feeds `gasCost`).
	pub gas_estimate: u128,
	/// Gas actually observed to have been used, when re-evaluating after the
	/// fact (e.g. an ack recomputed from the delivery's real gas spend);
	/// equal to `gas_estimate` for a pre-submission decision.
	pub observed_gas_estimate: u128,
	/// Flat fee on top of `gas_estimate * gas_price` (L1 data fees, etc).
	pub additional_fee_estimate: u128,
}

/// Result of `evaluateDelivery`, carrying every intermediate value the spec
/// asks implementers to return for logging.
#[derive(Clone, Copy, Debug)]
pub struct DeliveryDecision {
	pub relay_delivery: bool,
	pub delivery_cost: u128,
	pub delivery_reward: u128,
	pub max_ack_loss: i128,
	pub secured_reward: Decimal,
	pub delivery_fiat_cost: Decimal,
	pub secured_fiat_profit: Decimal,
}

/// Result of `evaluateAck`.
#[derive(Clone, Copy, Debug)]
pub struct AckDecision {
	pub relay_ack: bool,
	pub ack_cost: u128,
	pub ack_reward: u128,
	pub adjusted_ack_reward: Decimal,
	pub ack_profit: Decimal,
	pub ack_fiat_profit: Decimal,
	pub ack_relative_profit: Decimal,
}
