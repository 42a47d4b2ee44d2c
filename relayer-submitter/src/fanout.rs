//! The evaluator's `FeeSource`/`PriceOracle` are single-value lookups, but a
//! delivery or ack decision needs prices and fees for *two* chains (the
//! message's source and destination). These route a per-chain lookup to
//! whichever chain's handle actually owns that data.

use async_trait::async_trait;
use relayer_evaluator::{FeeSource, PriceOracle};
use relayer_types::ChainId;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

pub struct MultiChainFeeSource {
	sources: HashMap<ChainId, Arc<dyn FeeSource>>,
}

impl MultiChainFeeSource {
	pub fn new(sources: HashMap<ChainId, Arc<dyn FeeSource>>) -> Self {
		MultiChainFeeSource { sources }
	}
}

#[async_trait]
impl FeeSource for MultiChainFeeSource {
	async fn gas_price(&self, chain_id: ChainId) -> anyhow::Result<Option<u128>> {
		match self.sources.get(&chain_id) {
			Some(source) => source.gas_price(chain_id).await,
			None => {
				log::warn!("no wallet configured for chain {chain_id}, treating its gas price as unaffordable");
				Ok(None)
			}
		}
	}
}

pub struct MultiChainPriceOracle {
	oracles: HashMap<ChainId, Arc<dyn PriceOracle>>,
}

impl MultiChainPriceOracle {
	pub fn new(oracles: HashMap<ChainId, Arc<dyn PriceOracle>>) -> Self {
		MultiChainPriceOracle { oracles }
	}
}

#[async_trait]
impl PriceOracle for MultiChainPriceOracle {
	async fn price_per_wei(&self, chain_id: ChainId, token_id: &str) -> anyhow::Result<Decimal> {
		match self.oracles.get(&chain_id) {
			Some(oracle) => oracle.price_per_wei(chain_id, token_id).await,
			None => Err(anyhow::anyhow!("no pricing provider configured for chain {chain_id}")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Flat(u128);
	#[async_trait]
	impl FeeSource for Flat {
		async fn gas_price(&self, _chain_id: ChainId) -> anyhow::Result<Option<u128>> {
			Ok(Some(self.0))
		}
	}

	#[tokio::test]
	async fn routes_to_the_matching_chain() {
		let mut sources: HashMap<ChainId, Arc<dyn FeeSource>> = HashMap::new();
		sources.insert(ChainId(1), Arc::new(Flat(100)));
		sources.insert(ChainId(2), Arc::new(Flat(200)));
		let fanout = MultiChainFeeSource::new(sources);

		assert_eq!(fanout.gas_price(ChainId(1)).await.unwrap(), Some(100));
		assert_eq!(fanout.gas_price(ChainId(2)).await.unwrap(), Some(200));
		assert_eq!(fanout.gas_price(ChainId(3)).await.unwrap(), None);
	}
}
