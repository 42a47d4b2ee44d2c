//! Wires a chain's delivery and ack loops together behind one shared
//! concurrency budget, the way a chain's `WalletService` owns exactly one
//! signing key but serves every caller that needs it.

use crate::ack::AckWorker;
use crate::config::SubmitterConfig;
use crate::delivery::DeliveryWorker;
use crate::error::Result;
use relayer_evaluator::{Evaluator, FeeSource, PriceOracle};
use relayer_monitor::ChainClient;
use relayer_store::Store;
use relayer_types::ChainId;
use relayer_wallet::WalletHandle;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Runs one chain's delivery loop (messages addressed *to* this chain) and
/// ack loop (bounties that live *on* this chain) side by side, sharing one
/// `Semaphore` so at most `config.concurrency` submissions are ever in
/// flight on this chain's wallet at once, regardless of which loop they came
/// from.
pub struct SubmitterService {
	delivery: JoinHandle<Result<()>>,
	ack: JoinHandle<Result<()>>,
}

impl SubmitterService {
	pub fn spawn<C, O, F>(
		chain_id: ChainId,
		store: Store,
		wallet: WalletHandle<C>,
		evaluator: Arc<Evaluator<O, F>>,
		config: SubmitterConfig,
		cancel: CancellationToken,
	) -> Self
	where
		C: ChainClient + 'static,
		O: PriceOracle + 'static,
		F: FeeSource + 'static,
	{
		let semaphore = Arc::new(Semaphore::new(config.concurrency));

		let delivery_worker =
			DeliveryWorker::new(chain_id, store.clone(), wallet.clone(), evaluator.clone(), config.clone(), semaphore.clone());
		let ack_worker = AckWorker::new(chain_id, store, wallet, evaluator, config, semaphore);

		let delivery_cancel = cancel.clone();
		let delivery = tokio::spawn(async move { delivery_worker.run(delivery_cancel).await });
		let ack = tokio::spawn(async move { ack_worker.run(cancel).await });

		SubmitterService { delivery, ack }
	}

	/// Waits for both loops to exit, propagating the first error either of
	/// them returned. A loop only ever returns on cancellation or a
	/// fatal-per-worker failure; either way the caller treats this process's
	/// submitter for this chain as finished.
	pub async fn join(self) -> Result<()> {
		let (delivery, ack) = tokio::join!(self.delivery, self.ack);
		delivery.expect("delivery loop panicked")?;
		ack.expect("ack loop panicked")?;
		Ok(())
	}
}
