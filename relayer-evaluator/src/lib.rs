//! Stateless profitability decision engine. `Evaluator` holds no state of
//! its own beyond handles to its two upstream dependencies; every decision is
//! a pure function of its inputs plus whatever those dependencies return.

pub mod config;
pub mod decision;
pub mod error;
pub mod math;
pub mod oracle;

pub use config::EvaluatorConfig;
pub use decision::{AckDecision, DeliveryDecision, GasEstimateComponents};
pub use error::{Error, Result};
pub use oracle::{FeeSource, PriceOracle};

use relayer_types::{AmbProof, ChainId, MessageIdentifier, RelayState};
use rust_decimal::Decimal;

/// Gas price reported as `None` by a `FeeSource` is treated as this: large
/// enough that any gas cost computed against it is unaffordable, without the
/// evaluator ever guessing a real number.
const UNAFFORDABLE_GAS_PRICE: u128 = u128::MAX / 1_000_000;

fn decimal_u128(value: u128) -> Decimal {
	Decimal::try_from(value).unwrap_or(Decimal::MAX)
}

fn decimal_i128(value: i128) -> Decimal {
	Decimal::try_from(value).unwrap_or(if value < 0 { Decimal::MIN } else { Decimal::MAX })
}

/// `a * b`, clamped instead of overflow-panicking when `a` is the
/// `Decimal::MAX` stand-in for a zero `profitabilityFactor`.
fn mul_clamped(a: Decimal, b: Decimal) -> Decimal {
	a.checked_mul(b).unwrap_or(Decimal::MAX)
}

pub struct Evaluator<O, F> {
	price_oracle: O,
	fee_source: F,
}

impl<O: PriceOracle, F: FeeSource> Evaluator<O, F> {
	pub fn new(price_oracle: O, fee_source: F) -> Self {
		Evaluator { price_oracle, fee_source }
	}

	async fn gas_price_or_unaffordable(&self, chain_id: ChainId) -> Result<u128> {
		self.fee_source
			.gas_price(chain_id)
			.await
			.map_err(Error::Pricing)
			.map(|maybe_price| maybe_price.unwrap_or(UNAFFORDABLE_GAS_PRICE))
	}

	/// `evaluateDelivery`: should this process submit `message_identifier`'s
	/// delivery transaction on `to_chain_id`?
	pub async fn evaluate_delivery(
		&self,
		message_identifier: &MessageIdentifier,
		to_chain_id: ChainId,
		state: &RelayState,
		gas: GasEstimateComponents,
		dest_gas_token: &str,
		source_gas_token: &str,
		config: &EvaluatorConfig,
	) -> Result<DeliveryDecision> {
		let bounty = state
			.bounty_placed_event
			.as_ref()
			.ok_or_else(|| Error::NoBountyPlaced(*message_identifier))?;

		let dest_gas_price = self.gas_price_or_unaffordable(to_chain_id).await?;
		let delivery_cost = math::gas_cost(gas.gas_estimate, dest_gas_price, gas.additional_fee_estimate);

		let price_of_delivery_gas = state.effective_delivery_gas_price().unwrap_or(0);
		let delivery_reward =
			math::gas_reward(gas.observed_gas_estimate, config.unrewarded_gas_delivery, bounty.max_gas_delivery, price_of_delivery_gas);

		let source_gas_price = self.gas_price_or_unaffordable(bounty.from_chain_id).await?;
		let price_of_ack_gas = state.effective_ack_gas_price().unwrap_or(0);
		let max_ack_loss = math::max_gas_loss(
			source_gas_price,
			config.unrewarded_gas_ack,
			config.verification_gas_ack,
			bounty.max_gas_ack,
			price_of_ack_gas,
		);

		let adjusted = math::adjusted_reward(delivery_reward, config.profitability_factor);
		let secured_reward = adjusted + decimal_i128(max_ack_loss);

		let dest_unit_price =
			self.price_oracle.price_per_wei(to_chain_id, dest_gas_token).await.map_err(Error::Pricing)?;
		let source_unit_price =
			self.price_oracle.price_per_wei(bounty.from_chain_id, source_gas_token).await.map_err(Error::Pricing)?;

		let delivery_fiat_cost = mul_clamped(decimal_u128(delivery_cost), dest_unit_price);
		let secured_fiat_reward = mul_clamped(secured_reward, source_unit_price);
		let secured_fiat_profit = secured_fiat_reward - delivery_fiat_cost;

		let relay_delivery = secured_fiat_profit > config.min_delivery_reward
			|| (delivery_fiat_cost > Decimal::ZERO
				&& secured_fiat_profit / delivery_fiat_cost > config.relative_min_delivery_reward);

		log::trace!(
			"evaluateDelivery({message_identifier}): cost={delivery_fiat_cost} secured_profit={secured_fiat_profit} relay={relay_delivery}"
		);

		Ok(DeliveryDecision {
			relay_delivery,
			delivery_cost,
			delivery_reward,
			max_ack_loss,
			secured_reward,
			delivery_fiat_cost,
			secured_fiat_profit,
		})
	}

	/// `evaluateAck`: should this process submit `message_identifier`'s ack
	/// transaction back on its source chain, `from_chain_id`?
	pub async fn evaluate_ack(
		&self,
		message_identifier: &MessageIdentifier,
		from_chain_id: ChainId,
		state: &RelayState,
		gas: GasEstimateComponents,
		ack_gas_token: &str,
		proof: Option<&AmbProof>,
		config: &EvaluatorConfig,
	) -> Result<AckDecision> {
		let bounty = state
			.bounty_placed_event
			.as_ref()
			.ok_or_else(|| Error::NoBountyPlaced(*message_identifier))?;
		if bounty.from_chain_id != from_chain_id {
			return Err(Error::ChainMismatch);
		}

		let source_gas_price = self.gas_price_or_unaffordable(from_chain_id).await?;
		let ack_cost = math::gas_cost(gas.gas_estimate, source_gas_price, gas.additional_fee_estimate);

		let price_of_ack_gas = state.effective_ack_gas_price().unwrap_or(0);
		let ack_reward =
			math::gas_reward(gas.observed_gas_estimate, config.unrewarded_gas_ack, bounty.max_gas_ack, price_of_ack_gas);
		let adjusted_ack_reward = math::adjusted_reward(ack_reward, config.profitability_factor);
		let ack_profit = adjusted_ack_reward - decimal_u128(ack_cost);

		let unit_price = self.price_oracle.price_per_wei(from_chain_id, ack_gas_token).await.map_err(Error::Pricing)?;
		let ack_fiat_profit = mul_clamped(ack_profit, unit_price);
		let ack_fiat_cost = mul_clamped(decimal_u128(ack_cost), unit_price);
		let ack_relative_profit =
			if ack_fiat_cost > Decimal::ZERO { ack_fiat_profit / ack_fiat_cost } else { Decimal::MAX };

		// If this relayer submitted delivery, recompute its reward from the
		// actual destination-chain gas spent (read out of the proof's
		// DESTINATION_TO_SOURCE context) and check combined round-trip profit,
		// so the relayer doesn't walk away from an ack whose bounty recoups an
		// otherwise-marginal delivery. A message this relayer didn't deliver
		// (no recorded `delivery_gas_cost`) simply never has this branch to
		// lean on -- the fiat/relative checks below still apply to it.
		let delivery_gas_cost_nonzero = state.delivery_gas_cost.unwrap_or(0) != 0;
		let price_of_delivery_gas = state.effective_delivery_gas_price().unwrap_or(0);
		let recomputed_delivery_reward = delivery_gas_cost_nonzero
			.then(|| proof.and_then(AmbProof::decode_gas_spent))
			.flatten()
			.map(|gas_spent| {
				math::gas_reward(gas_spent, config.unrewarded_gas_delivery, bounty.max_gas_delivery, price_of_delivery_gas)
			});

		let relay_ack = recomputed_delivery_reward
			.map(|delivery_reward| ack_profit + decimal_u128(delivery_reward) > Decimal::ZERO)
			.unwrap_or(false)
			|| ack_fiat_profit > config.min_ack_reward
			|| ack_relative_profit > config.relative_min_ack_reward;

		log::trace!(
			"evaluateAck({message_identifier}): profit={ack_fiat_profit} relative={ack_relative_profit} relay={relay_ack}"
		);

		Ok(AckDecision {
			relay_ack,
			ack_cost,
			ack_reward,
			adjusted_ack_reward,
			ack_profit,
			ack_fiat_profit,
			ack_relative_profit,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relayer_types::{BountyPlacedEvent, ChainId, MessageIdentifier, RelayState, TxDescriptor};

	struct FlatPrice(Decimal);

	#[async_trait::async_trait]
	impl PriceOracle for FlatPrice {
		async fn price_per_wei(&self, _chain_id: ChainId, _token_id: &str) -> anyhow::Result<Decimal> {
			Ok(self.0)
		}
	}

	struct FixedFee(Option<u128>);

	#[async_trait::async_trait]
	impl FeeSource for FixedFee {
		async fn gas_price(&self, _chain_id: ChainId) -> anyhow::Result<Option<u128>> {
			Ok(self.0)
		}
	}

	fn tx() -> TxDescriptor {
		TxDescriptor { transaction_hash: [1u8; 32], block_hash: [2u8; 32], block_number: 1 }
	}

	fn state_with_prices(price_of_delivery_gas: u128, price_of_ack_gas: u128) -> RelayState {
		RelayState::new(BountyPlacedEvent {
			from_chain_id: ChainId(1),
			incentives_address: [9u8; 32],
			max_gas_delivery: 500_000,
			max_gas_ack: 200_000,
			refund_gas_to: [3u8; 32],
			price_of_delivery_gas,
			price_of_ack_gas,
			target_delta: 0,
			tx: tx(),
		})
	}

	fn cheap_config(profitability_factor: Decimal) -> EvaluatorConfig {
		EvaluatorConfig {
			unrewarded_gas_delivery: 0,
			verification_gas_delivery: 0,
			unrewarded_gas_ack: 0,
			verification_gas_ack: 0,
			min_delivery_reward: Decimal::ZERO,
			relative_min_delivery_reward: Decimal::ZERO,
			min_ack_reward: Decimal::ZERO,
			relative_min_ack_reward: Decimal::ZERO,
			profitability_factor,
		}
	}

	fn gas() -> GasEstimateComponents {
		GasEstimateComponents { gas_estimate: 100_000, observed_gas_estimate: 100_000, additional_fee_estimate: 0 }
	}

	#[tokio::test]
	async fn delivery_is_profitable_when_reward_price_exceeds_gas_price() {
		let evaluator = Evaluator::new(FlatPrice(Decimal::ONE), FixedFee(Some(1)));
		let state = state_with_prices(10, 10);
		let decision = evaluator
			.evaluate_delivery(&MessageIdentifier::new([1u8; 32]), ChainId(2), &state, gas(), "eth", "eth", &cheap_config(Decimal::ONE))
			.await
			.unwrap();
		assert!(decision.relay_delivery);
	}

	#[tokio::test]
	async fn delivery_is_unprofitable_when_gas_price_dwarfs_reward_price() {
		let evaluator = Evaluator::new(FlatPrice(Decimal::ONE), FixedFee(Some(1_000)));
		let state = state_with_prices(1, 1);
		let decision = evaluator
			.evaluate_delivery(&MessageIdentifier::new([1u8; 32]), ChainId(2), &state, gas(), "eth", "eth", &cheap_config(Decimal::ONE))
			.await
			.unwrap();
		assert!(!decision.relay_delivery);
	}

	#[tokio::test]
	async fn bounty_increased_price_flips_an_unprofitable_delivery_to_profitable() {
		let evaluator = Evaluator::new(FlatPrice(Decimal::ONE), FixedFee(Some(1_000)));
		let mut state = state_with_prices(1, 1);
		let before = evaluator
			.evaluate_delivery(&MessageIdentifier::new([1u8; 32]), ChainId(2), &state, gas(), "eth", "eth", &cheap_config(Decimal::ONE))
			.await
			.unwrap();
		assert!(!before.relay_delivery);

		state.apply_bounty_increased(relayer_types::BountyIncreasedEvent {
			new_delivery_gas_price: 10_000,
			new_ack_gas_price: 10_000,
			tx: tx(),
		});
		let after = evaluator
			.evaluate_delivery(&MessageIdentifier::new([1u8; 32]), ChainId(2), &state, gas(), "eth", "eth", &cheap_config(Decimal::ONE))
			.await
			.unwrap();
		assert!(after.relay_delivery);
	}

	#[test]
	fn adjusted_reward_is_monotone_nonincreasing_in_profitability_factor() {
		let reward = 1_000_000u128;
		let mut previous = math::adjusted_reward(reward, Decimal::new(2, 1));
		for pf_tenths in 3i64..=50 {
			let pf = Decimal::new(pf_tenths, 1);
			let current = math::adjusted_reward(reward, pf);
			assert!(
				current <= previous,
				"adjusted_reward should not increase as pf grows: pf={pf} prev={previous} cur={current}"
			);
			previous = current;
		}
	}

	#[tokio::test]
	async fn evaluate_delivery_is_monotone_in_profitability_factor() {
		let evaluator = Evaluator::new(FlatPrice(Decimal::ONE), FixedFee(Some(50)));
		let state = state_with_prices(100, 100);

		let mut previously_true = true;
		for pf_tenths in 1i64..=50 {
			let pf = Decimal::new(pf_tenths, 1);
			let decision = evaluator
				.evaluate_delivery(&MessageIdentifier::new([1u8; 32]), ChainId(2), &state, gas(), "eth", "eth", &cheap_config(pf))
				.await
				.unwrap();
			assert!(
				!(decision.relay_delivery && !previously_true),
				"relay_delivery flipped false->true as pf increased to {pf}"
			);
			previously_true = decision.relay_delivery;
		}
	}

	#[tokio::test]
	async fn ack_requires_matching_from_chain() {
		let evaluator = Evaluator::new(FlatPrice(Decimal::ONE), FixedFee(Some(1)));
		let state = state_with_prices(10, 10);
		let err = evaluator
			.evaluate_ack(&MessageIdentifier::new([1u8; 32]), ChainId(99), &state, gas(), "eth", None, &cheap_config(Decimal::ONE))
			.await
			.unwrap_err();
		assert!(matches!(err, Error::ChainMismatch));
	}

	/// S5: this process never delivered the message (no recorded
	/// `delivery_gas_cost`), so the round-trip recompute has nothing to work
	/// with -- the ack must still be relayed purely off `ackFiatProfit`.
	#[tokio::test]
	async fn ack_is_relayed_on_fiat_profit_alone_when_this_relayer_did_not_deliver() {
		let evaluator = Evaluator::new(FlatPrice(Decimal::ONE), FixedFee(Some(1)));
		let mut state = state_with_prices(10_000, 10_000);
		state.apply_message_delivered(relayer_types::MessageDeliveredEvent { to_chain_id: ChainId(2), tx: tx() }).unwrap();
		assert!(state.delivery_gas_cost.is_none());

		let decision = evaluator
			.evaluate_ack(&MessageIdentifier::new([1u8; 32]), ChainId(1), &state, gas(), "eth", None, &cheap_config(Decimal::ONE))
			.await
			.unwrap();
		assert!(decision.relay_ack, "ack-only relayer must still gate purely on ack fiat/relative profit");
	}
}
