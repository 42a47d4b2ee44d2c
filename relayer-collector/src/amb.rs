//! Wraps an [`AmbProvider`] into the scan loop's [`EventSink`]: decodes each
//! matching log into an `AMBMessage` and, where the provider can produce one
//! inline, an `AMBProof`. Never touches `RelayState`; that belongs to the
//! bounty collector alone.

use crate::error::Result;
use crate::provider::AmbProvider;
use crate::scan::EventSink;
use async_trait::async_trait;
use relayer_store::Store;
use relayer_types::ChainId;
use web3::types::{Filter, Log};

pub struct AmbSink {
	chain_id: ChainId,
	provider: Box<dyn AmbProvider>,
	store: Store,
}

impl AmbSink {
	pub fn new(chain_id: ChainId, provider: Box<dyn AmbProvider>, store: Store) -> Self {
		AmbSink { chain_id, provider, store }
	}
}

#[async_trait]
impl EventSink for AmbSink {
	fn filter(&self, from_block: u64, to_block: u64) -> Filter {
		self.provider.filter(from_block, to_block)
	}

	async fn handle(&self, logs: Vec<Log>) -> Result<()> {
		for log in &logs {
			let Some(message) = self.provider.decode(log)? else { continue };
			self.store.set_amb_message(self.chain_id, &message).await?;
			if let Some(proof) = self.provider.build_proof(&message).await? {
				self.store.set_amb_proof(self.chain_id, &proof).await?;
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::provider::ProviderConfig;
	use relayer_types::AmbId;

	#[test]
	fn sink_delegates_filter_construction_to_the_provider() {
		let provider_config = ProviderConfig {
			amb_id: AmbId::from("mock"),
			contract_address: web3::types::Address::zero(),
			from_chain_id: ChainId(1),
			mock_signing_key: None,
		};
		let provider = crate::provider::build("mock", &provider_config).unwrap();
		let filter = provider.filter(10, 20);
		assert_eq!(filter.from_block, Some(10.into()));
		assert_eq!(filter.to_block, Some(20.into()));
	}
}
