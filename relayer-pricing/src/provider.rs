//! `PriceProvider` implementations, selected at worker startup by
//! `ProviderKind` rather than loaded dynamically, per the plugin-loading
//! convention used for AMB collectors too.

use crate::{
	config::ProviderKind,
	error::{Error, Result},
};
use async_trait::async_trait;

/// A single upstream source of a token's fiat price. Implementors must not
/// cache; caching is the `PricingService`'s job so the cache is visible to
/// every provider uniformly.
#[async_trait]
pub trait PriceProvider: Send + Sync {
	async fn query_coin_price(&self, token_id: &str) -> Result<f64>;
}

/// Constant configured price, never touches the network. Used for test
/// chains and local development.
pub struct FixedProvider {
	pub price: f64,
}

#[async_trait]
impl PriceProvider for FixedProvider {
	async fn query_coin_price(&self, _token_id: &str) -> Result<f64> {
		Ok(self.price)
	}
}

/// Queries a CoinGecko-compatible `/simple/price` endpoint and selects
/// `$.<tokenId>.<denomination>` out of the JSON response.
pub struct CoinGeckoProvider {
	base_url: String,
	denomination: String,
	client: isahc::HttpClient,
}

impl CoinGeckoProvider {
	pub fn new(base_url: impl Into<String>, denomination: impl Into<String>) -> Result<Self> {
		let client = isahc::HttpClient::new().map_err(|err| Error::Http(anyhow::anyhow!(err)))?;
		Ok(CoinGeckoProvider { base_url: base_url.into(), denomination: denomination.into(), client })
	}
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
	async fn query_coin_price(&self, token_id: &str) -> Result<f64> {
		use isahc::AsyncReadResponseExt;

		let url =
			format!("{}/simple/price?ids={token_id}&vs_currencies={}", self.base_url, self.denomination);
		let request = isahc::Request::get(&url)
			.header("Accept", "application/json")
			.body(())
			.map_err(|err| Error::Http(anyhow::anyhow!(err)))?;
		let body = self
			.client
			.send_async(request)
			.await
			.map_err(|err| Error::Http(anyhow::anyhow!(err)))?
			.text()
			.await
			.map_err(|err| Error::Http(anyhow::anyhow!(err)))?;

		let json_path = format!("$.{token_id}.{}", self.denomination);
		relayer_utils::metrics::select_f64(&json_path, &body).map_err(Error::Provider)
	}
}

/// Build the configured provider. The one place `ProviderKind` gets matched;
/// adding a provider means adding a variant here, not a new call site.
pub fn build(kind: &ProviderKind, denomination: &str) -> Result<Box<dyn PriceProvider>> {
	match kind {
		ProviderKind::Fixed { price } => Ok(Box::new(FixedProvider { price: *price })),
		ProviderKind::CoinGecko { base_url } => Ok(Box::new(CoinGeckoProvider::new(base_url.clone(), denomination)?)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn fixed_provider_returns_its_configured_price() {
		let provider = FixedProvider { price: 1234.5 };
		assert_eq!(provider.query_coin_price("anything").await.unwrap(), 1234.5);
	}
}
