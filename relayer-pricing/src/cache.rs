//! A private, per-worker price cache. Never shared outside the owning
//! `PricingService` task, so plain `HashMap` + `Instant` is enough.

use std::{collections::HashMap, time::{Duration, Instant}};

#[derive(Clone, Copy)]
struct CachedPrice {
	price: f64,
	fetched_at: Instant,
}

#[derive(Default)]
pub struct PriceCache(HashMap<String, CachedPrice>);

impl PriceCache {
	/// The cached price for `token_id`, if one exists and is younger than `max_age`.
	pub fn fresh(&self, token_id: &str, max_age: Duration) -> Option<f64> {
		self.0.get(token_id).filter(|cached| cached.fetched_at.elapsed() < max_age).map(|cached| cached.price)
	}

	/// The cached price for `token_id` regardless of age, for the stale-fallback path.
	pub fn stale(&self, token_id: &str) -> Option<f64> {
		self.0.get(token_id).map(|cached| cached.price)
	}

	pub fn update(&mut self, token_id: &str, price: f64) {
		self.0.insert(token_id.to_string(), CachedPrice { price, fetched_at: Instant::now() });
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fresh_entry_is_returned_within_max_age() {
		let mut cache = PriceCache::default();
		cache.update("eth", 3000.0);
		assert_eq!(cache.fresh("eth", Duration::from_secs(60)), Some(3000.0));
	}

	#[test]
	fn fresh_entry_expires_after_max_age() {
		let mut cache = PriceCache::default();
		cache.update("eth", 3000.0);
		assert_eq!(cache.fresh("eth", Duration::from_secs(0)), None);
		assert_eq!(cache.stale("eth"), Some(3000.0));
	}

	#[test]
	fn missing_entry_has_no_stale_value() {
		let cache = PriceCache::default();
		assert_eq!(cache.stale("eth"), None);
	}
}
