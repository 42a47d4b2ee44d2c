//! The pure gas/reward arithmetic behind `evaluateDelivery`/`evaluateAck`.
//! Kept free of I/O so the monotonicity property can be tested directly.

use rust_decimal::Decimal;

/// Scale used when applying `profitabilityFactor` to a reward: the factor is
/// truncated to four decimal digits before it divides the reward.
pub const DECIMAL_BASE: u128 = 10_000;

/// `g·p + extra`: the gas cost of a transaction, in the paying chain's gas token.
pub fn gas_cost(gas_estimate: u128, gas_price: u128, additional_fee_estimate: u128) -> u128 {
	gas_estimate.saturating_mul(gas_price).saturating_add(additional_fee_estimate)
}

/// `pG · min(max(g − u, 0), maxG)`: the bounty-side reward for gas actually
/// used, clipped to the bounty's cap and floored at the unrewarded threshold.
pub fn gas_reward(observed_gas: u128, unrewarded_gas: u128, max_gas: u128, reward_gas_price: u128) -> u128 {
	let rewarded = observed_gas.saturating_sub(unrewarded_gas).min(max_gas);
	rewarded.saturating_mul(reward_gas_price)
}

/// The worst-case loss (always `<= 0`) a relayer could take on the
/// complementary leg of a delivery, used to discount the reward side of the
/// profitability check before committing to relay.
pub fn max_gas_loss(
	gas_price: u128,
	unrewarded_gas: u128,
	verification_gas: u128,
	max_gas: u128,
	reward_gas_price: u128,
) -> i128 {
	let min_reward = verification_gas as i128 * reward_gas_price as i128;
	let min_cost = (unrewarded_gas + verification_gas) as i128 * gas_price as i128;
	let min_profit = min_reward - min_cost;

	let max_reward = max_gas as i128 * reward_gas_price as i128;
	let max_cost = (unrewarded_gas + verification_gas + max_gas) as i128 * gas_price as i128;
	let max_profit = max_reward - max_cost;

	min_profit.min(max_profit).min(0)
}

/// `adjustedReward = (pf==0) ? +inf : reward · DECIMAL_BASE / floor(pf·DECIMAL_BASE)`.
/// `Decimal::MAX` stands in for the `pf == 0` case: the factor requests
/// treating the reward as free money, so no cost check can ever veto relaying
/// it.
pub fn adjusted_reward(reward: u128, profitability_factor: Decimal) -> Decimal {
	if profitability_factor <= Decimal::ZERO {
		return Decimal::MAX;
	}
	let base = Decimal::from(DECIMAL_BASE);
	let divisor = (profitability_factor * base).trunc();
	if divisor <= Decimal::ZERO {
		return Decimal::MAX;
	}
	let reward = Decimal::try_from(reward).unwrap_or(Decimal::MAX);
	reward.checked_mul(base).unwrap_or(Decimal::MAX) / divisor
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn gas_cost_is_linear_plus_extra() {
		assert_eq!(gas_cost(100, 5, 20), 520);
	}

	#[test]
	fn gas_reward_clips_to_max_and_floors_at_unrewarded() {
		assert_eq!(gas_reward(50, 10, 1_000, 2), 80); // (50-10)*2
		assert_eq!(gas_reward(50, 10, 20, 2), 40); // clipped to max_gas=20
		assert_eq!(gas_reward(5, 10, 1_000, 2), 0); // below unrewarded floor
	}

	#[test]
	fn max_gas_loss_is_never_positive() {
		let loss = max_gas_loss(100, 10, 5, 1_000, 2);
		assert!(loss <= 0);
	}

	#[test]
	fn max_gas_loss_is_zero_when_reward_always_covers_cost() {
		// reward price far exceeds gas price: neither bound can go negative.
		let loss = max_gas_loss(1, 10, 5, 1_000, 1_000_000);
		assert_eq!(loss, 0);
	}

	#[test]
	fn adjusted_reward_zero_factor_is_infinite() {
		assert_eq!(adjusted_reward(1_000, Decimal::ZERO), Decimal::MAX);
	}

	#[test]
	fn adjusted_reward_unit_factor_is_identity() {
		assert_eq!(adjusted_reward(1_000, Decimal::ONE), Decimal::from(1_000));
	}

	#[test]
	fn adjusted_reward_decreases_as_factor_increases() {
		let low = adjusted_reward(1_000, Decimal::ONE);
		let high = adjusted_reward(1_000, Decimal::TWO);
		assert!(high < low);
	}
}
