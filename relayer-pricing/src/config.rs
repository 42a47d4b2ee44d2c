use std::time::Duration;

/// Hard ceiling on `cacheDuration`, regardless of what configuration asks for.
const MAX_CACHE_DURATION: Duration = Duration::from_secs(3600);

/// `pricing.{provider, providerSpecificConfig}`: which `PriceProvider` to build.
#[derive(Debug, Clone)]
pub enum ProviderKind {
	/// Returns a constant price, never touches the network. Used for test
	/// chains and local development.
	Fixed { price: f64 },
	/// Queries a CoinGecko-compatible simple-price HTTP endpoint.
	CoinGecko { base_url: String },
}

/// `pricing.{coinDecimals, pricingDenomination, cacheDuration, retryInterval, maxTries}`.
#[derive(Debug, Clone)]
pub struct PricingConfig {
	pub coin_decimals: u32,
	pub pricing_denomination: String,
	pub cache_duration: Duration,
	pub retry_interval: Duration,
	pub max_tries: u32,
}

impl PricingConfig {
	pub fn new(
		coin_decimals: u32,
		pricing_denomination: impl Into<String>,
		cache_duration: Duration,
		retry_interval: Duration,
		max_tries: u32,
	) -> Self {
		PricingConfig {
			coin_decimals,
			pricing_denomination: pricing_denomination.into(),
			cache_duration: cache_duration.min(MAX_CACHE_DURATION),
			retry_interval,
			max_tries,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cache_duration_is_clamped_to_one_hour() {
		let config = PricingConfig::new(18, "usd", Duration::from_secs(7200), Duration::from_secs(1), 3);
		assert_eq!(config.cache_duration, MAX_CACHE_DURATION);
	}
}
