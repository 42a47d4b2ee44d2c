//! Waits out a broadcast transaction's fate by polling for its receipt,
//! racing that against a stall timeout. Adapted from this codebase's
//! subscription-driven transaction tracker to receipt polling, since an EVM
//! node has no equivalent of a transaction-status subscription.

use crate::error::{Error, Result};
use relayer_monitor::ChainClient;
use std::time::Duration;
use web3::types::{TransactionReceipt, H256, U64};

/// The three-way outcome a tracked submission settles into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
	/// Mined, not reverted, and `confirmations` blocks have passed since.
	Finalized(TransactionReceipt),
	/// Mined but reverted.
	Invalid,
	/// No status change observed before `stall_timeout` elapsed; the
	/// transaction may still be pending, but we stop waiting on it.
	Lost,
}

pub struct Tracker<'a, C> {
	client: &'a C,
	transaction_hash: H256,
	confirmations: u64,
	poll_interval: Duration,
	stall_timeout: Duration,
}

impl<'a, C: ChainClient> Tracker<'a, C> {
	pub fn new(
		client: &'a C,
		transaction_hash: H256,
		confirmations: u64,
		poll_interval: Duration,
		stall_timeout: Duration,
	) -> Self {
		Tracker { client, transaction_hash, confirmations, poll_interval, stall_timeout }
	}

	pub async fn wait(&self) -> Result<SubmissionOutcome> {
		let stall = tokio::time::sleep(self.stall_timeout);
		let poll = self.poll_until_settled();
		tokio::pin!(stall, poll);

		tokio::select! {
			_ = &mut stall => Ok(SubmissionOutcome::Lost),
			outcome = &mut poll => outcome,
		}
	}

	async fn poll_until_settled(&self) -> Result<SubmissionOutcome> {
		let mut included_at: Option<u64> = None;
		loop {
			if let Some(receipt) =
				self.client.transaction_receipt(self.transaction_hash).await.map_err(Error::Client)?
			{
				if receipt.status == Some(U64::zero()) {
					return Ok(SubmissionOutcome::Invalid);
				}
				if let Some(block_number) = receipt.block_number {
					let included_at = *included_at.get_or_insert(block_number.as_u64());
					let head = self.client.head().await.map_err(Error::Client)?;
					if head.block_number.saturating_sub(included_at) >= self.confirmations {
						return Ok(SubmissionOutcome::Finalized(receipt));
					}
				}
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}
}
