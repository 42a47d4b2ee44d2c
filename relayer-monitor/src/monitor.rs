//! Per-chain block-height heartbeat. Best-effort: collectors derive their own
//! cursors and may lag behind what the monitor last observed.

use crate::client::{ChainClient, ChainHead};
use relayer_utils::retry::{client_is_online_after, delay};
use relayer_utils::FailedClient;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// One instance per chain. Owns the polling loop; consumers call
/// [`Monitor::attach`] to get their own `watch::Receiver` and simply drop it
/// to unsubscribe.
#[derive(Clone)]
pub struct Monitor {
	head: watch::Sender<Option<ChainHead>>,
}

impl Monitor {
	/// Spawn the polling loop against `client`, polling every `interval`.
	/// Returns the `Monitor` handle immediately; the loop runs until
	/// `cancel` is triggered.
	pub fn spawn<C: ChainClient>(
		client: C,
		chain_is_source: bool,
		interval: Duration,
		cancel: CancellationToken,
	) -> (Self, tokio::task::JoinHandle<()>) {
		let (head, _) = watch::channel(None);
		let monitor = Monitor { head: head.clone() };

		let handle = tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = cancel.cancelled() => break,
					_ = delay(interval) => {}
				}

				let result = client.head().await;
				let online = client_is_online_after(&result);
				match result {
					Ok(new_head) => {
						let advanced = head.borrow().map(|current| new_head.block_number > current.block_number).unwrap_or(true);
						if advanced {
							let _ = head.send(Some(new_head));
						}
					}
					Err(err) => {
						log::warn!(
							"monitor poll failed for {} chain: {:?}",
							if chain_is_source { FailedClient::Source } else { FailedClient::Target },
							err
						);
					}
				}
				if !online {
					delay(relayer_utils::CONNECTION_ERROR_DELAY).await;
				}
			}
		});

		(monitor, handle)
	}

	/// Get a listener channel for this chain's head updates. Dropping the
	/// receiver unsubscribes; it carries no other cleanup.
	pub fn attach(&self) -> watch::Receiver<Option<ChainHead>> {
		self.head.subscribe()
	}

	/// The most recently observed head, if any poll has succeeded yet.
	pub fn current(&self) -> Option<ChainHead> {
		*self.head.borrow()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::atomic::{AtomicU64, Ordering};
	use std::sync::Arc;
	use web3::types::{Bytes, CallRequest, Filter, Log, TransactionReceipt, H256, U256};

	#[derive(Clone)]
	struct StubClient {
		block_number: Arc<AtomicU64>,
	}

	#[async_trait]
	impl ChainClient for StubClient {
		async fn head(&self) -> crate::error::Result<ChainHead> {
			let n = self.block_number.fetch_add(1, Ordering::SeqCst);
			Ok(ChainHead { block_number: n, hash: H256::zero(), timestamp: n })
		}
		async fn estimate_gas(&self, _call: CallRequest) -> crate::error::Result<U256> {
			Ok(U256::zero())
		}
		async fn gas_price(&self) -> crate::error::Result<U256> {
			Ok(U256::zero())
		}
		async fn next_nonce(&self, _address: web3::types::Address) -> crate::error::Result<U256> {
			Ok(U256::zero())
		}
		async fn send_raw_transaction(&self, _raw: Bytes) -> crate::error::Result<H256> {
			Ok(H256::zero())
		}
		async fn transaction_receipt(&self, _hash: H256) -> crate::error::Result<Option<TransactionReceipt>> {
			Ok(None)
		}
		async fn get_logs(&self, _filter: Filter) -> crate::error::Result<Vec<Log>> {
			Ok(vec![])
		}
		async fn sign_and_send_transaction(
			&self,
			_params: web3::types::TransactionParameters,
			_key: &web3::signing::SecretKey,
		) -> crate::error::Result<H256> {
			Ok(H256::zero())
		}
	}

	#[tokio::test]
	async fn attach_observes_strictly_increasing_heads() {
		let client = StubClient { block_number: Arc::new(AtomicU64::new(1)) };
		let cancel = CancellationToken::new();
		let (monitor, handle) = Monitor::spawn(client, true, Duration::from_millis(1), cancel.clone());
		let mut rx = monitor.attach();

		rx.changed().await.unwrap();
		let first = rx.borrow().unwrap().block_number;
		rx.changed().await.unwrap();
		let second = rx.borrow().unwrap().block_number;
		assert!(second > first);

		cancel.cancel();
		handle.await.unwrap();
	}
}
