//! The pricing worker: owns the cache and the provider, answers `getPrice`
//! requests from any number of cloned `PricingHandle`s over a channel.

use crate::{
	cache::PriceCache,
	config::PricingConfig,
	error::{Error, Result},
	provider::PriceProvider,
};
use relayer_evaluator::PriceOracle;
use relayer_types::ChainId;
use relayer_utils::retry::retry_bounded;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

const REQUEST_CHANNEL_DEPTH: usize = 64;

struct PriceRequest {
	token_id: String,
	amount: u128,
	reply: oneshot::Sender<Result<f64>>,
}

/// Client handle to a running `PricingService`. Cheap to clone; every worker
/// that needs a price for this chain gets its own handle.
#[derive(Clone)]
pub struct PricingHandle {
	sender: mpsc::Sender<PriceRequest>,
}

impl PricingHandle {
	/// `getPrice(amount, tokenId)`.
	pub async fn get_price(&self, token_id: &str, amount: u128) -> Result<f64> {
		let (reply_tx, reply_rx) = oneshot::channel();
		self.sender
			.send(PriceRequest { token_id: token_id.to_string(), amount, reply: reply_tx })
			.await
			.map_err(|_| Error::WorkerGone)?;
		reply_rx.await.map_err(|_| Error::WorkerGone)?
	}
}

#[async_trait::async_trait]
impl PriceOracle for PricingHandle {
	/// `price_per_wei` is `getPrice(1, tokenId)`: the cache already stores a
	/// per-unit price internally, so asking for a one-wei amount is exactly
	/// the conversion factor the evaluator needs, with no separate code path.
	async fn price_per_wei(&self, _chain_id: ChainId, token_id: &str) -> anyhow::Result<Decimal> {
		let price = self.get_price(token_id, 1).await?;
		Decimal::try_from(price).map_err(|err| anyhow::anyhow!("price {price} is not representable as a decimal: {err}"))
	}
}

pub struct PricingService {
	provider: Box<dyn PriceProvider>,
	config: PricingConfig,
	cache: PriceCache,
	requests: mpsc::Receiver<PriceRequest>,
}

impl PricingService {
	pub fn spawn(
		provider: Box<dyn PriceProvider>,
		config: PricingConfig,
		cancel: CancellationToken,
	) -> (PricingHandle, tokio::task::JoinHandle<()>) {
		let (sender, requests) = mpsc::channel(REQUEST_CHANNEL_DEPTH);
		let service = PricingService { provider, config, cache: PriceCache::default(), requests };
		let join = tokio::spawn(service.run(cancel));
		(PricingHandle { sender }, join)
	}

	async fn run(mut self, cancel: CancellationToken) {
		loop {
			tokio::select! {
				_ = cancel.cancelled() => {
					log::info!(target: "relayer::pricing", "pricing worker shutting down");
					return;
				}
				request = self.requests.recv() => {
					let Some(request) = request else { return };
					let result = self.get_price(&request.token_id, request.amount).await;
					let _ = request.reply.send(result);
				}
			}
		}
	}

	async fn get_price(&mut self, token_id: &str, amount: u128) -> Result<f64> {
		let scale = 10f64.powi(self.config.coin_decimals as i32);

		if let Some(cached) = self.cache.fresh(token_id, self.config.cache_duration) {
			return Ok(cached * amount as f64 / scale);
		}

		let provider = &self.provider;
		let queried =
			retry_bounded(self.config.max_tries, self.config.retry_interval, || provider.query_coin_price(token_id))
				.await;

		match queried {
			Ok(price) => {
				self.cache.update(token_id, price);
				Ok(price * amount as f64 / scale)
			}
			Err(err) => match self.cache.stale(token_id) {
				Some(stale) => {
					log::warn!(
						target: "relayer::pricing",
						"all {} price queries for {token_id} failed ({err}); falling back to stale cached price",
						self.config.max_tries,
					);
					Ok(stale * amount as f64 / scale)
				}
				None => Err(err),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::FixedProvider;
	use std::{
		sync::{
			atomic::{AtomicU32, Ordering},
			Arc,
		},
		time::Duration,
	};

	struct CountingProvider {
		price: f64,
		calls: Arc<AtomicU32>,
	}

	#[async_trait::async_trait]
	impl PriceProvider for CountingProvider {
		async fn query_coin_price(&self, _token_id: &str) -> Result<f64> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Ok(self.price)
		}
	}

	fn config(cache_duration: Duration, max_tries: u32) -> PricingConfig {
		PricingConfig::new(18, "usd", cache_duration, Duration::from_millis(1), max_tries)
	}

	#[tokio::test]
	async fn repeated_calls_within_cache_duration_query_the_provider_once() {
		let calls = Arc::new(AtomicU32::new(0));
		let provider = CountingProvider { price: 2000.0, calls: calls.clone() };
		let mut service = PricingService {
			provider: Box::new(provider),
			config: config(Duration::from_secs(60), 3),
			cache: PriceCache::default(),
			requests: mpsc::channel(1).1,
		};

		service.get_price("eth", 10u128.pow(18)).await.unwrap();
		service.get_price("eth", 10u128.pow(18)).await.unwrap();

		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn stale_cache_is_used_when_every_retry_fails() {
		let mut service = PricingService {
			provider: Box::new(FixedFailProvider),
			config: config(Duration::from_secs(0), 2),
			cache: PriceCache::default(),
			requests: mpsc::channel(1).1,
		};
		service.cache.update("eth", 1500.0);

		let price = service.get_price("eth", 1).await.unwrap();
		assert!(price > 0.0);
	}

	struct FixedFailProvider;
	#[async_trait::async_trait]
	impl PriceProvider for FixedFailProvider {
		async fn query_coin_price(&self, _token_id: &str) -> Result<f64> {
			Err(Error::Http(anyhow::anyhow!("simulated outage")))
		}
	}

	#[tokio::test]
	async fn error_propagates_when_no_stale_cache_exists() {
		let mut service = PricingService {
			provider: Box::new(FixedFailProvider),
			config: config(Duration::from_secs(60), 2),
			cache: PriceCache::default(),
			requests: mpsc::channel(1).1,
		};
		assert!(service.get_price("eth", 1).await.is_err());
	}

	#[tokio::test]
	async fn handle_round_trips_through_the_spawned_worker() {
		let cancel = CancellationToken::new();
		let (handle, join) =
			PricingService::spawn(Box::new(FixedProvider { price: 3000.0 }), config(Duration::from_secs(60), 1), cancel.clone());

		let price = handle.get_price("eth", 10u128.pow(18)).await.unwrap();
		assert_eq!(price, 3000.0);

		cancel.cancel();
		join.await.unwrap();
	}
}
