//! Spawns collector scan loops as background tasks. One call per collector
//! instance; a chain with a bounty collector and two AMB providers spawns
//! three independent tasks sharing only the `Store`.

use crate::bounty::BountySink;
use crate::config::{AmbCollectorConfig, BountyCollectorConfig};
use crate::error::Result;
use crate::provider::AmbProvider;
use crate::scan;
use relayer_monitor::{ChainClient, ChainHead};
use relayer_store::Store;
use relayer_types::ChainId;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn the bounty collector for `chain_id`. Logs and retries on a failed
/// scan rather than returning; the task only ends on cancellation, or once
/// `stoppingBlock` has been passed. `head_rx` is this chain's
/// `Monitor::attach()` channel.
pub fn spawn_bounty_collector<C: ChainClient>(
	client: C,
	chain_id: ChainId,
	config: BountyCollectorConfig,
	store: Store,
	mut head_rx: watch::Receiver<Option<ChainHead>>,
	cancel: CancellationToken,
) -> JoinHandle<Result<()>> {
	tokio::spawn(async move {
		let scan_config = config.scan.clone();
		let sink = BountySink::new(chain_id, config, store);
		scan::run(&client, &mut head_rx, &scan_config, &sink, cancel).await
	})
}

/// Spawn an AMB collector for `provider` on `chain_id`. `head_rx` is this
/// chain's `Monitor::attach()` channel.
pub fn spawn_amb_collector<C: ChainClient>(
	client: C,
	chain_id: ChainId,
	provider: Box<dyn AmbProvider>,
	config: AmbCollectorConfig,
	store: Store,
	mut head_rx: watch::Receiver<Option<ChainHead>>,
	cancel: CancellationToken,
) -> JoinHandle<Result<()>> {
	tokio::spawn(async move {
		let scan_config = config.scan.clone();
		let sink = crate::amb::AmbSink::new(chain_id, provider, store);
		scan::run(&client, &mut head_rx, &scan_config, &sink, cancel).await
	})
}
