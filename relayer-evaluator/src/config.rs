//! Per-chain evaluator configuration (spec §6: `evaluator.{...}`).

use rust_decimal::Decimal;

/// Thresholds and gas allowances the evaluator needs that don't come from
/// the bounty itself. One of these exists per chain (a chain's evaluator
/// config governs deliveries *to* that chain and acks *from* it).
#[derive(Clone, Debug)]
pub struct EvaluatorConfig {
	/// Gas below which delivery earns no reward (the `u` term in `gasReward`).
	pub unrewarded_gas_delivery: u128,
	/// Worst-case extra gas a delivery's ack-side verification might cost
	/// (the `v` term in `maxGasLoss`).
	pub verification_gas_delivery: u128,
	/// Same as `unrewarded_gas_delivery` but for the ack leg.
	pub unrewarded_gas_ack: u128,
	/// Same as `verification_gas_delivery` but for the ack leg.
	pub verification_gas_ack: u128,
	/// Minimum absolute fiat profit required to relay a delivery.
	pub min_delivery_reward: Decimal,
	/// Minimum profit/cost ratio required to relay a delivery.
	pub relative_min_delivery_reward: Decimal,
	/// Minimum absolute fiat profit required to relay an ack.
	pub min_ack_reward: Decimal,
	/// Minimum profit/cost ratio required to relay an ack.
	pub relative_min_ack_reward: Decimal,
	/// Divisor applied to the expected reward before the loss-adjustment;
	/// `1.0` is aggressive, higher values conservative. `0.0` means
	/// "reward is free money", per spec it makes the adjusted reward
	/// effectively infinite.
	pub profitability_factor: Decimal,
}
