//! Delivers messages addressed to this chain: pairs an `AMBMessage` with its
//! `AMBProof`, waits until the relay state they belong to is still
//! `BountyPlaced`, asks the evaluator, and submits `processPacket` through
//! the wallet.

use crate::abi::encode_process_packet;
use crate::config::SubmitterConfig;
use crate::error::{Error, Result};
use crate::keyparse::parse_key;
use crate::queue::{PendingEntry, PendingQueue};
use futures::StreamExt;
use relayer_evaluator::{Evaluator, FeeSource, GasEstimateComponents, PriceOracle};
use relayer_monitor::ChainClient;
use relayer_store::Store;
use relayer_types::{AmbMessage, AmbProof, ChainId, MessageIdentifier, RelayStatus};
use relayer_wallet::{SubmissionOutcome, TxRequest, WalletHandle};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use web3::types::U256;

const RETRY_TICK: Duration = Duration::from_millis(250);
const DONE_CHANNEL_DEPTH: usize = 64;

#[derive(Default, Clone)]
struct Tracked {
	message: Option<AmbMessage>,
	proof: Option<AmbProof>,
}

impl Tracked {
	fn ready(&self) -> Option<(AmbMessage, AmbProof)> {
		match (&self.message, &self.proof) {
			(Some(message), Some(proof)) => Some((message.clone(), proof.clone())),
			_ => None,
		}
	}
}

enum SubmissionResult {
	Delivered,
	NotProfitable,
	Transient(PendingEntry),
	Fatal,
}

struct Shared<C, O, F> {
	chain_id: ChainId,
	store: Store,
	wallet: WalletHandle<C>,
	evaluator: Arc<Evaluator<O, F>>,
	config: SubmitterConfig,
}

pub struct DeliveryWorker<C, O, F> {
	shared: Arc<Shared<C, O, F>>,
	semaphore: Arc<Semaphore>,
	queue: PendingQueue,
	tracked: HashMap<MessageIdentifier, Tracked>,
}

impl<C, O, F> DeliveryWorker<C, O, F>
where
	C: ChainClient + 'static,
	O: PriceOracle + 'static,
	F: FeeSource + 'static,
{
	pub fn new(
		chain_id: ChainId,
		store: Store,
		wallet: WalletHandle<C>,
		evaluator: Arc<Evaluator<O, F>>,
		config: SubmitterConfig,
		semaphore: Arc<Semaphore>,
	) -> Self {
		let queue = PendingQueue::new(config.base_backoff, config.max_backoff, config.max_attempts);
		DeliveryWorker {
			shared: Arc::new(Shared { chain_id, store, wallet, evaluator, config }),
			semaphore,
			queue,
			tracked: HashMap::new(),
		}
	}

	pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
		let amb_notifications = self.shared.store.subscribe_pattern("relayer:*:amb:*").await?;
		let proof_notifications = self.shared.store.subscribe_pattern("relayer:*:proof:*").await?;
		let mut notifications = futures::stream::select(amb_notifications, proof_notifications);
		let mut tick = tokio::time::interval(RETRY_TICK);
		let (done_tx, mut done_rx) = mpsc::channel(DONE_CHANNEL_DEPTH);

		loop {
			tokio::select! {
				_ = cancel.cancelled() => return Ok(()),
				key = notifications.next() => {
					let Some(key) = key else { return Ok(()) };
					if let Err(err) = self.on_key_changed(&key).await {
						log::warn!(target: "relayer::submitter", "failed to process store notification {key:?}: {err}");
					}
					self.dispatch_ready(&done_tx);
				}
				Some((message_identifier, result)) = done_rx.recv() => {
					self.on_submission_done(message_identifier, result);
					self.dispatch_ready(&done_tx);
				}
				_ = tick.tick() => {
					self.dispatch_ready(&done_tx);
				}
			}
		}
	}

	async fn on_key_changed(&mut self, key: &str) -> Result<()> {
		let parsed = parse_key(key)?;
		let entry = self.tracked.entry(parsed.message_identifier).or_default();
		if key.contains(":amb:") {
			entry.message = self.shared.store.get_amb_message(parsed.chain_id, &parsed.message_identifier).await?;
		} else if key.contains(":proof:") {
			entry.proof = self.shared.store.get_amb_proof(parsed.chain_id, &parsed.message_identifier).await?;
		} else {
			return Ok(());
		}

		let Some((message, _proof)) = self.tracked.get(&parsed.message_identifier).and_then(Tracked::ready) else {
			return Ok(());
		};
		if message.to_chain_id != self.shared.chain_id {
			return Ok(());
		}
		self.queue.enqueue(parsed.message_identifier, message.priority);
		Ok(())
	}

	fn dispatch_ready(&mut self, done_tx: &mpsc::Sender<(MessageIdentifier, SubmissionResult)>) {
		loop {
			let Ok(permit) = self.semaphore.clone().try_acquire_owned() else { break };
			let Some(entry) = self.queue.pop_ready() else { break };
			let Some((message, proof)) = self.tracked.get(&entry.message_identifier).and_then(Tracked::ready) else {
				continue;
			};
			let shared = self.shared.clone();
			let done_tx = done_tx.clone();
			tokio::spawn(async move {
				let message_identifier = entry.message_identifier;
				let result = attempt_delivery(&shared, &message, &proof).await;
				let outcome = classify(result, entry);
				drop(permit);
				let _ = done_tx.send((message_identifier, outcome)).await;
			});
		}
	}

	fn on_submission_done(&mut self, message_identifier: MessageIdentifier, result: SubmissionResult) {
		match result {
			SubmissionResult::Delivered => {
				log::info!(target: "relayer::submitter", "delivered {message_identifier} on chain {}", self.shared.chain_id);
				self.tracked.remove(&message_identifier);
			}
			SubmissionResult::NotProfitable => {
				log::debug!(target: "relayer::submitter", "delivery for {message_identifier} is not currently profitable");
			}
			SubmissionResult::Transient(entry) => {
				if !self.queue.requeue_after_failure(entry) {
					log::error!(target: "relayer::submitter", "delivery for {message_identifier} marked fatal after exhausting retries");
				}
			}
			SubmissionResult::Fatal => {
				log::error!(target: "relayer::submitter", "delivery for {message_identifier} failed fatally, dropping");
			}
		}
	}
}

fn classify(result: Result<bool>, entry: PendingEntry) -> SubmissionResult {
	match result {
		Ok(true) => SubmissionResult::Delivered,
		Ok(false) => SubmissionResult::NotProfitable,
		Err(err) if is_fatal(&err) => {
			log::error!(target: "relayer::submitter", "delivery for {} failed fatally: {err}", entry.message_identifier);
			SubmissionResult::Fatal
		}
		Err(err) => {
			log::warn!(target: "relayer::submitter", "delivery for {} hit a transient failure: {err}", entry.message_identifier);
			SubmissionResult::Transient(entry)
		}
	}
}

/// Fatal-per-message: drop this one and move on. Everything else (a Redis
/// hiccup, an RPC timeout, the wallet worker's channel closing) is transient
/// and goes back on the queue with backoff.
fn is_fatal(err: &Error) -> bool {
	matches!(err, Error::Encode(_) | Error::MalformedKey(_) | Error::UndecodableProof(..))
		|| matches!(err, Error::Evaluator(relayer_evaluator::Error::ChainMismatch))
}

/// Returns `Ok(true)` if the delivery was submitted and finalised, `Ok(false)`
/// if the evaluator declined it (not an error; just try again once more is
/// seen, e.g. after a `BountyIncreased`), or an error otherwise.
async fn attempt_delivery<C: ChainClient, O: PriceOracle, F: FeeSource>(
	shared: &Shared<C, O, F>,
	message: &AmbMessage,
	proof: &AmbProof,
) -> Result<bool> {
	let Some(state) = shared.store.get_relay_state(message.from_chain_id, &message.message_identifier).await? else {
		// Raced away: the bounty disappeared, which the store never actually
		// does. Treat as "nothing to do" rather than fatal.
		return Ok(false);
	};
	if state.status != RelayStatus::BountyPlaced {
		return Ok(false);
	}

	let call_data = encode_process_packet(&proof.message_ctx, &proof.message, shared.config.fee_recipient)?;
	let tx = TxRequest { to: shared.config.incentives_address, data: call_data, value: U256::zero() };
	let call_request = tx.as_call_request(shared.wallet.address());
	let gas_estimate = shared.wallet.estimate_gas(call_request).await.map_err(Error::Wallet)?;
	let gas_estimate = u256_to_u128(gas_estimate);
	let gas = GasEstimateComponents { gas_estimate, observed_gas_estimate: gas_estimate, additional_fee_estimate: 0 };

	let decision = shared
		.evaluator
		.evaluate_delivery(
			&message.message_identifier,
			shared.chain_id,
			&state,
			gas,
			&shared.config.local_gas_token,
			shared.config.gas_token(message.from_chain_id),
			&shared.config.evaluator,
		)
		.await?;

	if !decision.relay_delivery {
		log::trace!(
			target: "relayer::submitter",
			"declining delivery for {}: secured_fiat_profit={}",
			message.message_identifier, decision.secured_fiat_profit
		);
		return Ok(false);
	}

	match shared.wallet.submit(tx).await.map_err(Error::Wallet)? {
		SubmissionOutcome::Finalized(_receipt) => {
			shared
				.store
				.update_relay_state(message.from_chain_id, &message.message_identifier, |existing| {
					let mut state = existing.unwrap_or_else(|| state.clone());
					state.record_own_delivery_gas_cost(decision.delivery_cost);
					state
				})
				.await?;
			Ok(true)
		}
		SubmissionOutcome::Invalid => {
			Err(Error::UndecodableProof(message.message_identifier, "processPacket reverted".to_string()))
		}
		SubmissionOutcome::Lost => Err(Error::Wallet(relayer_wallet::Error::WorkerGone)),
	}
}

fn u256_to_u128(value: U256) -> u128 {
	if value.bits() > 128 {
		u128::MAX
	} else {
		value.as_u128()
	}
}
