//! The scan loop shared by the bounty collector and every AMB collector:
//! pick a safe block range, query it, hand the logs to a sink, advance the
//! cursor. Identical for both kinds of collector; only what a sink does with
//! the logs differs.
//!
//! The "current confirmed block" comes from a `Monitor::attach()` receiver
//! rather than each collector polling `ChainClient::head` on its own --
//! `Monitor` is the single RPC poller a chain's collectors share.

use crate::config::ScanConfig;
use crate::error::Result;
use async_trait::async_trait;
use relayer_monitor::{ChainClient, ChainHead};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use web3::types::{Filter, Log};

/// What a collector does with the logs a scan turns up. Implemented once per
/// collector kind (bounty, or a given AMB provider).
#[async_trait]
pub trait EventSink: Send + Sync {
	/// The filter to query for `[from_block, to_block]`.
	fn filter(&self, from_block: u64, to_block: u64) -> Filter;
	/// Decode and persist every log in the range. Called with an empty `Vec`
	/// when the range held no matching events; sinks may ignore that case.
	async fn handle(&self, logs: Vec<Log>) -> Result<()>;
}

/// Waits until `head_rx` carries an observed head, returning `None` only if
/// `cancel` fires first. Returns immediately if the monitor has already
/// observed one, so callers never block on an update that already happened.
async fn latest_head(head_rx: &mut watch::Receiver<Option<ChainHead>>, cancel: &CancellationToken) -> Option<ChainHead> {
	if let Some(head) = *head_rx.borrow() {
		return Some(head);
	}
	tokio::select! {
		_ = cancel.cancelled() => None,
		changed = head_rx.changed() => changed.ok().and_then(|()| *head_rx.borrow()),
	}
}

/// Runs a sink's scan loop until cancelled or the configured stopping block
/// is passed. `head_rx` is this chain's `Monitor::attach()` channel.
pub async fn run<C: ChainClient, S: EventSink>(
	client: &C,
	head_rx: &mut watch::Receiver<Option<ChainHead>>,
	config: &ScanConfig,
	sink: &S,
	cancel: CancellationToken,
) -> Result<()> {
	let mut cursor = match config.starting_block {
		Some(block) => block,
		None => match latest_head(head_rx, &cancel).await {
			Some(head) => head.block_number,
			None => return Ok(()),
		},
	};

	loop {
		if let Some(stopping_block) = config.stopping_block {
			if cursor > stopping_block {
				return Ok(());
			}
		}

		let head = match latest_head(head_rx, &cancel).await {
			Some(head) => head.block_number,
			None => return Ok(()),
		};
		let start = cursor;
		let safe_head = head.saturating_sub(config.block_delay);

		if safe_head < start {
			if sleep_or_cancelled(config.interval, &cancel).await {
				return Ok(());
			}
			continue;
		}

		let mut end = safe_head;
		let catching_up = end - start > config.max_blocks;
		if catching_up {
			end = start + config.max_blocks;
		}

		let logs = match client.get_logs(sink.filter(start, end)).await {
			Ok(logs) => logs,
			Err(err) => {
				log::warn!("collector scan of blocks {start}..={end} failed, will retry: {err}");
				if sleep_or_cancelled(config.interval, &cancel).await {
					return Ok(());
				}
				continue;
			}
		};

		sink.handle(logs).await?;
		cursor = end + 1;

		if !catching_up && sleep_or_cancelled(config.interval, &cancel).await {
			return Ok(());
		}
	}
}

/// Sleeps for `duration`, or stops early if `cancel` fires. Returns `true` if
/// the caller should stop the loop.
async fn sleep_or_cancelled(duration: std::time::Duration, cancel: &CancellationToken) -> bool {
	tokio::select! {
		_ = tokio::time::sleep(duration) => false,
		_ = cancel.cancelled() => true,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relayer_monitor::ChainHead;
	use std::sync::atomic::{AtomicU64, Ordering};
	use std::sync::Arc;
	use web3::types::{Address, FilterBuilder, H256};

	#[derive(Clone)]
	struct StubClient {
		head: Arc<AtomicU64>,
		calls: Arc<std::sync::Mutex<Vec<(u64, u64)>>>,
	}

	#[async_trait]
	impl ChainClient for StubClient {
		async fn head(&self) -> relayer_monitor::Result<ChainHead> {
			Ok(ChainHead { block_number: self.head.load(Ordering::SeqCst), hash: H256::zero(), timestamp: 0 })
		}
		async fn estimate_gas(&self, _call: web3::types::CallRequest) -> relayer_monitor::Result<web3::types::U256> {
			unimplemented!()
		}
		async fn gas_price(&self) -> relayer_monitor::Result<web3::types::U256> {
			unimplemented!()
		}
		async fn next_nonce(&self, _address: Address) -> relayer_monitor::Result<web3::types::U256> {
			unimplemented!()
		}
		async fn send_raw_transaction(&self, _raw: web3::types::Bytes) -> relayer_monitor::Result<H256> {
			unimplemented!()
		}
		async fn transaction_receipt(
			&self,
			_hash: H256,
		) -> relayer_monitor::Result<Option<web3::types::TransactionReceipt>> {
			unimplemented!()
		}
		async fn get_logs(&self, filter: Filter) -> relayer_monitor::Result<Vec<Log>> {
			let from = filter.from_block.unwrap().as_number().unwrap().as_u64();
			let to = filter.to_block.unwrap().as_number().unwrap().as_u64();
			self.calls.lock().unwrap().push((from, to));
			Ok(vec![])
		}
		async fn sign_and_send_transaction(
			&self,
			_params: web3::types::TransactionParameters,
			_key: &web3::signing::SecretKey,
		) -> relayer_monitor::Result<H256> {
			unimplemented!()
		}
	}

	struct RecordingSink {
		address: Address,
		seen: Arc<std::sync::Mutex<Vec<usize>>>,
	}

	#[async_trait]
	impl EventSink for RecordingSink {
		fn filter(&self, from_block: u64, to_block: u64) -> Filter {
			FilterBuilder::default()
				.address(vec![self.address])
				.from_block(from_block.into())
				.to_block(to_block.into())
				.build()
		}
		async fn handle(&self, logs: Vec<Log>) -> Result<()> {
			self.seen.lock().unwrap().push(logs.len());
			Ok(())
		}
	}

	fn head_channel(block_number: u64) -> watch::Receiver<Option<ChainHead>> {
		let (_tx, rx) = watch::channel(Some(ChainHead { block_number, hash: H256::zero(), timestamp: 0 }));
		rx
	}

	#[tokio::test(start_paused = true)]
	async fn catching_up_clamps_the_range_and_does_not_sleep_between_chunks() {
		let client = StubClient { head: Arc::new(AtomicU64::new(1_000)), calls: Arc::new(Default::default()) };
		let mut head_rx = head_channel(1_000);
		let sink = RecordingSink { address: Address::zero(), seen: Arc::new(Default::default()) };
		let config = ScanConfig {
			interval: std::time::Duration::from_secs(10),
			block_delay: 0,
			max_blocks: 100,
			starting_block: Some(0),
			stopping_block: Some(250),
		};
		let cancel = CancellationToken::new();

		run(&client, &mut head_rx, &config, &sink, cancel).await.unwrap();

		let calls = client.calls.lock().unwrap().clone();
		assert_eq!(calls, vec![(0, 100), (101, 201), (202, 251)]);
	}

	#[tokio::test(start_paused = true)]
	async fn exits_cleanly_once_the_stopping_block_is_passed() {
		let client = StubClient { head: Arc::new(AtomicU64::new(50)), calls: Arc::new(Default::default()) };
		let mut head_rx = head_channel(50);
		let sink = RecordingSink { address: Address::zero(), seen: Arc::new(Default::default()) };
		let config = ScanConfig {
			interval: std::time::Duration::from_millis(1),
			block_delay: 0,
			max_blocks: 1_000,
			starting_block: Some(0),
			stopping_block: Some(50),
		};
		let cancel = CancellationToken::new();

		run(&client, &mut head_rx, &config, &sink, cancel).await.unwrap();
		assert_eq!(*client.calls.lock().unwrap(), vec![(0, 50)]);
	}

	#[tokio::test(start_paused = true)]
	async fn waits_for_the_monitor_to_observe_a_head_before_scanning() {
		let client = StubClient { head: Arc::new(AtomicU64::new(0)), calls: Arc::new(Default::default()) };
		let (head_tx, mut head_rx) = watch::channel(None);
		let sink = RecordingSink { address: Address::zero(), seen: Arc::new(Default::default()) };
		let config = ScanConfig {
			interval: std::time::Duration::from_millis(1),
			block_delay: 0,
			max_blocks: 1_000,
			starting_block: Some(0),
			stopping_block: Some(10),
		};
		let cancel = CancellationToken::new();

		let calls = client.calls.clone();
		let run_cancel = cancel.clone();
		let handle = tokio::spawn(async move { run(&client, &mut head_rx, &config, &sink, run_cancel).await });

		tokio::time::sleep(std::time::Duration::from_millis(5)).await;
		assert!(calls.lock().unwrap().is_empty(), "scan must not run before the monitor has observed a head");

		head_tx.send(Some(ChainHead { block_number: 10, hash: H256::zero(), timestamp: 0 })).unwrap();
		handle.await.unwrap().unwrap();
		assert_eq!(*calls.lock().unwrap(), vec![(0, 10)]);
	}
}
