//! Submits acks for messages whose bounty lives on this chain: waits for
//! `MessageDelivered` (and, if the AMB needs one, a return proof), asks the
//! evaluator, and drives `processPacket` back on the source contract.

use crate::abi::encode_process_packet;
use crate::config::SubmitterConfig;
use crate::error::{Error, Result};
use crate::keyparse::parse_key;
use crate::queue::{PendingEntry, PendingQueue};
use futures::StreamExt;
use relayer_evaluator::{Evaluator, FeeSource, GasEstimateComponents, PriceOracle};
use relayer_monitor::ChainClient;
use relayer_store::{keys, Store};
use relayer_types::{AmbProof, ChainId, MessageIdentifier, RelayState, RelayStatus};
use relayer_wallet::{SubmissionOutcome, TxRequest, WalletHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use web3::types::U256;

const RETRY_TICK: Duration = Duration::from_millis(250);
const DONE_CHANNEL_DEPTH: usize = 64;

enum SubmissionResult {
	Acked,
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

/// Whether `state` is actually ready for an ack decision: delivered and not
/// already claimed. `delivery_gas_cost` is absent when some other relayer
/// delivered the message; that's not disqualifying on its own -- the
/// evaluator still gates the ack on `ackFiatProfit`/`ackRelativeProfit`
/// alone in that case, it just can't use the combined round-trip profit.
fn is_ack_ready(state: &RelayState) -> bool {
	state.status == RelayStatus::MessageDelivered
}

pub struct AckWorker<C, O, F> {
	shared: Arc<Shared<C, O, F>>,
	semaphore: Arc<Semaphore>,
	queue: PendingQueue,
}

impl<C, O, F> AckWorker<C, O, F>
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
		AckWorker { shared: Arc::new(Shared { chain_id, store, wallet, evaluator, config }), semaphore, queue }
	}

	pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
		let mut notifications = self.shared.store.subscribe_pattern(&keys::bounty_pattern(self.shared.chain_id)).await?;
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
		let Some(state) = self.shared.store.get_relay_state(parsed.chain_id, &parsed.message_identifier).await? else {
			return Ok(());
		};
		if !is_ack_ready(&state) {
			return Ok(());
		}
		// `priority` lives on the AMBMessage, which the ack leg never fetches;
		// a bounty reaching MessageDelivered is itself already a signal this
		// relayer should move on it promptly, so it isn't needed here.
		self.queue.enqueue(parsed.message_identifier, false);
		Ok(())
	}

	fn dispatch_ready(&mut self, done_tx: &mpsc::Sender<(MessageIdentifier, SubmissionResult)>) {
		loop {
			let Ok(permit) = self.semaphore.clone().try_acquire_owned() else { break };
			let Some(entry) = self.queue.pop_ready() else { break };
			let shared = self.shared.clone();
			let done_tx = done_tx.clone();
			tokio::spawn(async move {
				let message_identifier = entry.message_identifier;
				let result = attempt_ack(&shared, message_identifier).await;
				let outcome = classify(result, entry);
				drop(permit);
				let _ = done_tx.send((message_identifier, outcome)).await;
			});
		}
	}

	fn on_submission_done(&mut self, message_identifier: MessageIdentifier, result: SubmissionResult) {
		match result {
			SubmissionResult::Acked => {
				log::info!(target: "relayer::submitter", "acked {message_identifier} on chain {}", self.shared.chain_id);
			}
			SubmissionResult::NotProfitable => {
				log::debug!(target: "relayer::submitter", "ack for {message_identifier} is not currently profitable");
			}
			SubmissionResult::Transient(entry) => {
				if !self.queue.requeue_after_failure(entry) {
					log::error!(target: "relayer::submitter", "ack for {message_identifier} marked fatal after exhausting retries");
				}
			}
			SubmissionResult::Fatal => {
				log::error!(target: "relayer::submitter", "ack for {message_identifier} failed fatally, dropping");
			}
		}
	}
}

fn classify(result: Result<bool>, entry: PendingEntry) -> SubmissionResult {
	match result {
		Ok(true) => SubmissionResult::Acked,
		Ok(false) => SubmissionResult::NotProfitable,
		Err(err) if is_fatal(&err) => {
			log::error!(target: "relayer::submitter", "ack for {} failed fatally: {err}", entry.message_identifier);
			SubmissionResult::Fatal
		}
		Err(err) => {
			log::warn!(target: "relayer::submitter", "ack for {} hit a transient failure: {err}", entry.message_identifier);
			SubmissionResult::Transient(entry)
		}
	}
}

fn is_fatal(err: &Error) -> bool {
	matches!(err, Error::Encode(_) | Error::MalformedKey(_) | Error::UndecodableProof(..))
		|| matches!(err, Error::Evaluator(relayer_evaluator::Error::ChainMismatch))
}

async fn attempt_ack<C: ChainClient, O: PriceOracle, F: FeeSource>(
	shared: &Shared<C, O, F>,
	message_identifier: MessageIdentifier,
) -> Result<bool> {
	let Some(state) = shared.store.get_relay_state(shared.chain_id, &message_identifier).await? else {
		return Ok(false);
	};
	if !is_ack_ready(&state) {
		return Ok(false);
	}

	// Some AMBs need a return proof to authorise the ack call; others don't
	// (the escrow contract can verify delivery purely from local state). When
	// present it's keyed the same way a forward proof is, just parented under
	// this (source) chain.
	let proof: Option<AmbProof> = shared.store.get_amb_proof(shared.chain_id, &message_identifier).await?;

	let (call_data, tx_target) = match &proof {
		Some(proof) => (
			encode_process_packet(&proof.message_ctx, &proof.message, shared.config.fee_recipient)?,
			shared.config.incentives_address,
		),
		None => (encode_process_packet(&[], &[], shared.config.fee_recipient)?, shared.config.incentives_address),
	};
	let tx = TxRequest { to: tx_target, data: call_data, value: U256::zero() };
	let call_request = tx.as_call_request(shared.wallet.address());
	let gas_estimate = shared.wallet.estimate_gas(call_request).await.map_err(Error::Wallet)?;
	let gas_estimate = u256_to_u128(gas_estimate);
	let gas = GasEstimateComponents { gas_estimate, observed_gas_estimate: gas_estimate, additional_fee_estimate: 0 };

	let decision = shared
		.evaluator
		.evaluate_ack(
			&message_identifier,
			shared.chain_id,
			&state,
			gas,
			&shared.config.local_gas_token,
			proof.as_ref(),
			&shared.config.evaluator,
		)
		.await?;

	if !decision.relay_ack {
		log::trace!(
			target: "relayer::submitter",
			"declining ack for {message_identifier}: fiat_profit={}",
			decision.ack_fiat_profit
		);
		return Ok(false);
	}

	match shared.wallet.submit(tx).await.map_err(Error::Wallet)? {
		SubmissionOutcome::Finalized(_receipt) => {
			shared
				.store
				.update_relay_state(shared.chain_id, &message_identifier, |existing| {
					let mut state = existing.unwrap_or_else(|| state.clone());
					let _ = state.apply_bounty_claimed(relayer_types::BountyClaimedEvent {
						tx: relayer_types::TxDescriptor {
							transaction_hash: [0u8; 32],
							block_hash: [0u8; 32],
							block_number: 0,
						},
					});
					state
				})
				.await?;
			Ok(true)
		}
		SubmissionOutcome::Invalid => {
			Err(Error::UndecodableProof(message_identifier, "processPacket (ack) reverted".to_string()))
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

#[cfg(test)]
mod tests {
	use super::*;
	use relayer_types::{BountyPlacedEvent, TxDescriptor};

	fn tx() -> TxDescriptor {
		TxDescriptor { transaction_hash: [1u8; 32], block_hash: [2u8; 32], block_number: 1 }
	}

	fn bounty_placed_state() -> RelayState {
		RelayState::new(BountyPlacedEvent {
			from_chain_id: ChainId(1),
			incentives_address: [9u8; 32],
			max_gas_delivery: 500_000,
			max_gas_ack: 200_000,
			refund_gas_to: [3u8; 32],
			price_of_delivery_gas: 10,
			price_of_ack_gas: 10,
			target_delta: 0,
			tx: tx(),
		})
	}

	#[test]
	fn not_ack_ready_before_delivery() {
		assert!(!is_ack_ready(&bounty_placed_state()));
	}

	#[test]
	fn ack_ready_when_delivered_by_someone_else() {
		let mut state = bounty_placed_state();
		state
			.apply_message_delivered(relayer_types::MessageDeliveredEvent { to_chain_id: ChainId(2), tx: tx() })
			.unwrap();
		assert!(state.delivery_gas_cost.is_none(), "this relayer did not record a delivery cost");
		assert!(is_ack_ready(&state), "an ack-only relayer must still be able to evaluate the ack");
	}

	#[test]
	fn ack_ready_once_this_relayer_recorded_its_own_delivery_cost() {
		let mut state = bounty_placed_state();
		state
			.apply_message_delivered(relayer_types::MessageDeliveredEvent { to_chain_id: ChainId(2), tx: tx() })
			.unwrap();
		state.record_own_delivery_gas_cost(42);
		assert!(is_ack_ready(&state));
	}
}
