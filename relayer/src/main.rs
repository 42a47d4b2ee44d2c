//! Process entry point: loads configuration, wires up every chain's workers,
//! and runs until interrupted.

use clap::Parser;
use relayer_collector::{build_provider as build_amb_provider, spawn_amb_collector, spawn_bounty_collector};
use relayer_config::Args;
use relayer_evaluator::{Evaluator, FeeSource, PriceOracle};
use relayer_monitor::{Monitor, Web3Client};
use relayer_pricing::{build_provider as build_price_provider, PricingService};
use relayer_store::Store;
use relayer_submitter::{MultiChainFeeSource, MultiChainPriceOracle, SubmitterService};
use relayer_types::ChainId;
use relayer_wallet::WalletService;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	let config = relayer_config::load(&args)?;

	relayer_utils::logging::init(&config.logging);

	let cancel = CancellationToken::new();
	let store = Store::connect(&config.redis_url).await?;

	let registry = prometheus::Registry::new();
	let mut background: Vec<tokio::task::JoinHandle<()>> = Vec::new();
	let mut collectors: Vec<tokio::task::JoinHandle<relayer_collector::Result<()>>> = Vec::new();
	if config.metrics.enabled {
		relayer_utils::metrics::GlobalMetrics::new(&registry)?.spawn();
		let metrics_registry = registry.clone();
		let metrics_addr = config.metrics.addr;
		let metrics_cancel = cancel.clone();
		background.push(tokio::spawn(async move {
			tokio::select! {
				_ = metrics_cancel.cancelled() => {}
				result = relayer_utils::metrics::serve(metrics_registry, metrics_addr) => {
					if let Err(err) = result {
						log::error!(target: "relayer", "metrics server exited: {err}");
					}
				}
			}
		}));
	}

	let mut wallets = Vec::new();
	let mut fee_sources: HashMap<ChainId, Arc<dyn FeeSource>> = HashMap::new();
	let mut price_oracles: HashMap<ChainId, Arc<dyn PriceOracle>> = HashMap::new();

	for chain in &config.chains {
		let client = Web3Client::new(&chain.rpc)?;

		let (monitor, monitor_join) = Monitor::spawn(client.clone(), true, chain.bounty.scan.interval, cancel.clone());
		background.push(monitor_join);

		let (wallet, wallet_join) = WalletService::spawn(
			client.clone(),
			chain.private_key.clone(),
			chain.address,
			chain.chain_id,
			chain.evm_chain_id,
			chain.wallet.clone(),
			cancel.clone(),
		)
		.await?;
		background.push(wallet_join);
		fee_sources.insert(chain.chain_id, Arc::new(wallet.clone()));

		let (provider_kind, pricing_config) = &chain.pricing;
		let price_provider = build_price_provider(provider_kind, &pricing_config.pricing_denomination)?;
		let (pricing, pricing_join) = PricingService::spawn(price_provider, pricing_config.clone(), cancel.clone());
		background.push(pricing_join);
		price_oracles.insert(chain.chain_id, Arc::new(pricing));

		collectors.push(spawn_bounty_collector(
			client.clone(),
			chain.chain_id,
			chain.bounty.clone(),
			store.clone(),
			monitor.attach(),
			cancel.clone(),
		));
		for amb in &chain.ambs {
			let provider = build_amb_provider(&amb.provider_kind, &amb.provider)?;
			collectors.push(spawn_amb_collector(
				client.clone(),
				chain.chain_id,
				provider,
				amb.scan.clone(),
				store.clone(),
				monitor.attach(),
				cancel.clone(),
			));
		}

		wallets.push((chain.clone(), wallet));
	}

	let evaluator = Arc::new(Evaluator::new(MultiChainPriceOracle::new(price_oracles), MultiChainFeeSource::new(fee_sources)));

	let mut submitters = Vec::new();
	for (chain, wallet) in wallets {
		submitters.push(SubmitterService::spawn(
			chain.chain_id,
			store.clone(),
			wallet,
			evaluator.clone(),
			chain.submitter_base.clone(),
			cancel.clone(),
		));
	}

	log::info!(target: "relayer", "relayer started for {} chains", submitters.len());
	tokio::signal::ctrl_c().await?;
	log::info!(target: "relayer", "shutdown signal received, stopping workers");
	cancel.cancel();

	for submitter in submitters {
		if let Err(err) = submitter.join().await {
			log::error!(target: "relayer", "submitter shut down with an error: {err}");
		}
	}
	for handle in background {
		let _ = handle.await;
	}
	for handle in collectors {
		match handle.await {
			Ok(Err(err)) => log::error!(target: "relayer", "collector exited with an error: {err}"),
			Err(err) => log::error!(target: "relayer", "collector task panicked: {err}"),
			Ok(Ok(())) => {}
		}
	}

	Ok(())
}
