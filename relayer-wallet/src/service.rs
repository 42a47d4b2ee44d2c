//! The wallet worker: the only thing in the process allowed to pick a nonce
//! for this chain's signing key. `submit` requests are processed strictly
//! one at a time so nonces never race; `getFeeData` bypasses the queue
//! entirely by reading straight off the shared `ChainClient`.

use crate::{
	config::WalletConfig,
	error::{Error, Result},
	tracker::{SubmissionOutcome, Tracker},
	types::TxRequest,
};
use relayer_evaluator::FeeSource;
use relayer_monitor::ChainClient;
use relayer_types::ChainId;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use web3::signing::SecretKey;
use web3::types::{Address, TransactionParameters, U256};

const SUBMIT_CHANNEL_DEPTH: usize = 32;

struct SubmitRequest {
	tx: TxRequest,
	reply: oneshot::Sender<Result<SubmissionOutcome>>,
}

/// Client handle to a running `WalletService`. `submit` queues behind
/// whatever this chain's wallet is already processing; `gas_price` (the
/// evaluator's `FeeSource`) never does.
#[derive(Clone)]
pub struct WalletHandle<C> {
	client: C,
	chain_id: ChainId,
	address: Address,
	submit: mpsc::Sender<SubmitRequest>,
}

impl<C: ChainClient> WalletHandle<C> {
	pub async fn submit(&self, tx: TxRequest) -> Result<SubmissionOutcome> {
		let (reply, reply_rx) = oneshot::channel();
		self.submit.send(SubmitRequest { tx, reply }).await.map_err(|_| Error::WorkerGone)?;
		reply_rx.await.map_err(|_| Error::WorkerGone)?
	}

	/// Gas estimate for a not-yet-submitted call, read straight off the chain
	/// client. Like `gas_price`, this never queues behind a pending submit:
	/// the evaluator needs it to *decide* whether to submit at all.
	pub async fn estimate_gas(&self, call: web3::types::CallRequest) -> Result<U256> {
		self.client.estimate_gas(call).await.map_err(Error::Client)
	}

	pub fn chain_id(&self) -> ChainId {
		self.chain_id
	}

	pub fn address(&self) -> Address {
		self.address
	}
}

#[async_trait::async_trait]
impl<C: ChainClient> FeeSource for WalletHandle<C> {
	async fn gas_price(&self, chain_id: ChainId) -> anyhow::Result<Option<u128>> {
		if chain_id != self.chain_id {
			return Ok(None);
		}
		match self.client.gas_price().await {
			Ok(price) => Ok(u256_to_u128(price)),
			Err(err) => {
				log::warn!(target: "relayer::wallet", "fee data unavailable for {chain_id:?}: {err}");
				Ok(None)
			}
		}
	}
}

fn u256_to_u128(value: U256) -> Option<u128> {
	(value.bits() <= 128).then(|| value.as_u128())
}

pub struct WalletService<C> {
	client: C,
	key: SecretKey,
	address: Address,
	chain_id: ChainId,
	evm_chain_id: u64,
	next_nonce: U256,
	config: WalletConfig,
	requests: mpsc::Receiver<SubmitRequest>,
}

impl<C: ChainClient> WalletService<C> {
	/// Fetches the starting nonce from the chain, then spawns the worker.
	pub async fn spawn(
		client: C,
		key: SecretKey,
		address: Address,
		chain_id: ChainId,
		evm_chain_id: u64,
		config: WalletConfig,
		cancel: CancellationToken,
	) -> Result<(WalletHandle<C>, tokio::task::JoinHandle<()>)> {
		let next_nonce = client.next_nonce(address).await.map_err(Error::Client)?;
		let (sender, requests) = mpsc::channel(SUBMIT_CHANNEL_DEPTH);
		let handle = WalletHandle { client: client.clone(), chain_id, address, submit: sender };
		let service = WalletService { client, key, address, chain_id, evm_chain_id, next_nonce, config, requests };
		let join = tokio::spawn(service.run(cancel));
		Ok((handle, join))
	}

	async fn run(mut self, cancel: CancellationToken) {
		loop {
			tokio::select! {
				_ = cancel.cancelled() => {
					log::info!(target: "relayer::wallet", "wallet worker for {:?} shutting down", self.chain_id);
					return;
				}
				request = self.requests.recv() => {
					let Some(request) = request else { return };
					let outcome = self.submit_and_track(request.tx).await;
					let _ = request.reply.send(outcome);
				}
			}
		}
	}

	/// Broadcasts `tx`, tracks it to settlement, and bumps the fee and
	/// resubmits (same nonce) up to `max_resubmissions` times if it stalls or
	/// reverts.
	async fn submit_and_track(&mut self, tx: TxRequest) -> Result<SubmissionOutcome> {
		let nonce = self.next_nonce;
		let gas_estimate = self.client.estimate_gas(tx.as_call_request(self.address)).await.map_err(Error::Client)?;
		let base_gas_price = self.client.gas_price().await.map_err(Error::Client)?;

		let mut outcome = SubmissionOutcome::Lost;
		for attempt in 0..=self.config.max_resubmissions {
			let gas_price = bump(base_gas_price, self.config.fee_bump_percent, attempt);
			let params = TransactionParameters {
				to: Some(tx.to),
				value: tx.value,
				data: tx.data.clone().into(),
				gas: gas_estimate,
				gas_price: Some(gas_price),
				nonce: Some(nonce),
				chain_id: Some(self.evm_chain_id),
				..Default::default()
			};

			let transaction_hash = self.client.sign_and_send_transaction(params, &self.key).await.map_err(Error::Client)?;
			let tracker = Tracker::new(
				&self.client,
				transaction_hash,
				self.config.confirmations,
				self.config.poll_interval,
				self.config.stall_timeout,
			);
			outcome = tracker.wait().await?;

			match &outcome {
				SubmissionOutcome::Lost if attempt < self.config.max_resubmissions => {
					log::warn!(
						target: "relayer::wallet",
						"transaction {transaction_hash:?} (nonce {nonce}) stalled; resubmitting with a bumped fee (attempt {})",
						attempt + 1,
					);
				}
				SubmissionOutcome::Invalid if attempt < self.config.max_resubmissions => {
					log::warn!(
						target: "relayer::wallet",
						"transaction {transaction_hash:?} (nonce {nonce}) reverted; resubmitting with a bumped fee (attempt {})",
						attempt + 1,
					);
				}
				_ => break,
			}
		}

		// A `Lost` outcome after exhausting resubmissions leaves the nonce's
		// fate genuinely unknown; reusing it lets the wallet make forward
		// progress instead of getting stuck behind a transaction that may
		// never actually land.
		if !matches!(outcome, SubmissionOutcome::Lost) {
			self.next_nonce = nonce + U256::one();
		}

		Ok(outcome)
	}
}

fn bump(base: U256, bump_percent: u64, attempt: u32) -> U256 {
	let factor = U256::from(100u64 + bump_percent.saturating_mul(attempt as u64));
	base.saturating_mul(factor) / U256::from(100u64)
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use std::sync::{Arc, Mutex};
	use web3::types::{Bytes, CallRequest, Filter, Log, TransactionReceipt, H256, U64};

	#[derive(Clone, PartialEq)]
	enum ReceiptMode {
		NeverIncluded,
		IncludedAt { block_number: u64, status_ok: bool },
	}

	struct ClientState {
		nonce: U256,
		head_block: u64,
		receipt_mode: ReceiptMode,
		sent_gas_prices: Vec<U256>,
		next_hash: u64,
	}

	#[derive(Clone)]
	struct StubClient {
		state: Arc<Mutex<ClientState>>,
	}

	impl StubClient {
		fn new(head_block: u64, receipt_mode: ReceiptMode) -> Self {
			StubClient {
				state: Arc::new(Mutex::new(ClientState {
					nonce: U256::from(7),
					head_block,
					receipt_mode,
					sent_gas_prices: Vec::new(),
					next_hash: 1,
				})),
			}
		}

		fn sent_gas_prices(&self) -> Vec<U256> {
			self.state.lock().unwrap().sent_gas_prices.clone()
		}
	}

	#[async_trait]
	impl ChainClient for StubClient {
		async fn head(&self) -> relayer_monitor::Result<relayer_monitor::ChainHead> {
			let state = self.state.lock().unwrap();
			Ok(relayer_monitor::ChainHead { block_number: state.head_block, hash: H256::zero(), timestamp: 0 })
		}
		async fn estimate_gas(&self, _call: CallRequest) -> relayer_monitor::Result<U256> {
			Ok(U256::from(21_000))
		}
		async fn gas_price(&self) -> relayer_monitor::Result<U256> {
			Ok(U256::from(100))
		}
		async fn next_nonce(&self, _address: Address) -> relayer_monitor::Result<U256> {
			Ok(self.state.lock().unwrap().nonce)
		}
		async fn send_raw_transaction(&self, _raw: Bytes) -> relayer_monitor::Result<H256> {
			Ok(H256::zero())
		}
		async fn transaction_receipt(&self, _hash: H256) -> relayer_monitor::Result<Option<TransactionReceipt>> {
			let state = self.state.lock().unwrap();
			match state.receipt_mode {
				ReceiptMode::NeverIncluded => Ok(None),
				ReceiptMode::IncludedAt { block_number, status_ok } => {
					let mut receipt = TransactionReceipt::default();
					receipt.block_number = Some(block_number.into());
					receipt.status = Some(if status_ok { U64::one() } else { U64::zero() });
					Ok(Some(receipt))
				}
			}
		}
		async fn get_logs(&self, _filter: Filter) -> relayer_monitor::Result<Vec<Log>> {
			Ok(vec![])
		}
		async fn sign_and_send_transaction(
			&self,
			params: TransactionParameters,
			_key: &SecretKey,
		) -> relayer_monitor::Result<H256> {
			let mut state = self.state.lock().unwrap();
			state.sent_gas_prices.push(params.gas_price.unwrap());
			let hash = H256::from_low_u64_be(state.next_hash);
			state.next_hash += 1;
			Ok(hash)
		}
	}

	fn config(stall_timeout_ms: u64, max_resubmissions: u32) -> WalletConfig {
		WalletConfig {
			confirmations: 2,
			poll_interval: std::time::Duration::from_millis(1),
			stall_timeout: std::time::Duration::from_millis(stall_timeout_ms),
			max_resubmissions,
			fee_bump_percent: 10,
		}
	}

	fn test_key() -> SecretKey {
		SecretKey::from_slice(&[7u8; 32]).unwrap()
	}

	fn tx() -> TxRequest {
		TxRequest { to: Address::zero(), data: vec![1, 2, 3], value: U256::zero() }
	}

	#[tokio::test]
	async fn successful_submission_finalizes_and_advances_nonce() {
		let client = StubClient::new(105, ReceiptMode::IncludedAt { block_number: 100, status_ok: true });
		let cancel = CancellationToken::new();
		let (handle, join) = WalletService::spawn(
			client,
			test_key(),
			Address::zero(),
			ChainId(1),
			1,
			config(1_000, 2),
			cancel.clone(),
		)
		.await
		.unwrap();

		let outcome = handle.submit(tx()).await.unwrap();
		assert!(matches!(outcome, SubmissionOutcome::Finalized(_)));

		cancel.cancel();
		join.await.unwrap();
	}

	#[tokio::test]
	async fn reverted_transaction_resubmits_with_bumped_fees_then_reports_invalid() {
		let client = StubClient::new(100, ReceiptMode::IncludedAt { block_number: 100, status_ok: false });
		let client_handle = client.clone();
		let cancel = CancellationToken::new();
		let (handle, join) = WalletService::spawn(
			client,
			test_key(),
			Address::zero(),
			ChainId(1),
			1,
			config(1_000, 2),
			cancel.clone(),
		)
		.await
		.unwrap();

		let outcome = handle.submit(tx()).await.unwrap();
		assert_eq!(outcome, SubmissionOutcome::Invalid);

		let sent = client_handle.sent_gas_prices();
		assert_eq!(sent.len(), 3, "a revert must be retried up to max_resubmissions before giving up");
		assert!(sent.windows(2).all(|pair| pair[1] > pair[0]));

		cancel.cancel();
		join.await.unwrap();
	}

	#[tokio::test]
	async fn stalled_submission_resubmits_with_bumped_fees_then_reports_lost() {
		let client = StubClient::new(1, ReceiptMode::NeverIncluded);
		let client_handle = client.clone();
		let cancel = CancellationToken::new();
		let (handle, join) =
			WalletService::spawn(client, test_key(), Address::zero(), ChainId(1), 1, config(5, 2), cancel.clone())
				.await
				.unwrap();

		let outcome = handle.submit(tx()).await.unwrap();
		assert_eq!(outcome, SubmissionOutcome::Lost);

		let sent = client_handle.sent_gas_prices();
		assert_eq!(sent.len(), 3); // initial attempt + 2 resubmissions
		assert!(sent.windows(2).all(|pair| pair[1] > pair[0]));

		cancel.cancel();
		join.await.unwrap();
	}

	#[tokio::test]
	async fn gas_price_is_available_without_queuing_behind_a_pending_submit() {
		let client = StubClient::new(1, ReceiptMode::NeverIncluded);
		let cancel = CancellationToken::new();
		let (handle, join) =
			WalletService::spawn(client, test_key(), Address::zero(), ChainId(1), 1, config(5, 0), cancel.clone())
				.await
				.unwrap();

		let price = handle.gas_price(ChainId(1)).await.unwrap();
		assert_eq!(price, Some(100));

		let price_for_other_chain = handle.gas_price(ChainId(99)).await.unwrap();
		assert_eq!(price_for_other_chain, None);

		cancel.cancel();
		join.await.unwrap();
	}
}
