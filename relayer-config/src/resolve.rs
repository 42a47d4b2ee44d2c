//! Turns the raw TOML schema into the typed configuration each worker crate
//! actually takes. One pass, no partial results: a malformed chain fails the
//! whole load, since a relayer process half-configured for some chains and
//! not others is worse than one that refuses to start.

use crate::error::{Error, Result};
use crate::raw::{RawChainConfig, RawConfig, RawPricingProvider};
use relayer_collector::{AmbCollectorConfig, BountyCollectorConfig, ProviderConfig, ScanConfig};
use relayer_evaluator::EvaluatorConfig;
use relayer_pricing::{PricingConfig, ProviderKind};
use relayer_submitter::SubmitterConfig;
use relayer_types::{AmbId, ChainId};
use relayer_utils::logging::LoggerOptions;
use relayer_wallet::WalletConfig;
use rust_decimal::Decimal;
use secp256k1::SecretKey;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use web3::types::Address;

/// TOML only gives us `f64` thresholds; they're plain constants rather than
/// the product of any arithmetic, so an exact decimal reading is as good as
/// the config author's intent gets.
fn decimal_config_value(value: f64) -> Decimal {
	Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone)]
pub struct MetricsSettings {
	pub enabled: bool,
	pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct AmbSettings {
	pub amb_id: AmbId,
	pub provider_kind: String,
	pub provider: ProviderConfig,
	pub scan: AmbCollectorConfig,
}

#[derive(Clone)]
pub struct ChainSettings {
	pub chain_id: ChainId,
	pub name: String,
	pub rpc: String,
	pub confirmations: u64,
	pub private_key: SecretKey,
	pub address: Address,
	pub evm_chain_id: u64,
	pub gas_token: String,
	pub bounty: BountyCollectorConfig,
	pub ambs: Vec<AmbSettings>,
	pub evaluator: EvaluatorConfig,
	pub pricing: (ProviderKind, PricingConfig),
	pub wallet: WalletConfig,
	pub submitter_base: SubmitterConfig,
}

pub struct ResolvedConfig {
	pub logging: LoggerOptions,
	pub metrics: MetricsSettings,
	pub redis_url: String,
	pub chains: Vec<ChainSettings>,
}

pub fn resolve(raw: RawConfig) -> Result<ResolvedConfig> {
	let logging = LoggerOptions { filter: logging_filter(&raw.logging), color: true };

	let metrics_addr = format!("{}:{}", raw.metrics.host, raw.metrics.port)
		.parse()
		.map_err(|err: std::net::AddrParseError| Error::InvalidMetricsAddress(err.to_string()))?;
	let metrics = MetricsSettings { enabled: raw.metrics.enabled, addr: metrics_addr };

	let mut seen = std::collections::HashSet::new();
	let mut chains = Vec::with_capacity(raw.chains.len());
	let gas_tokens: HashMap<ChainId, String> =
		raw.chains.iter().map(|chain| (ChainId(chain.chain_id), chain.gas_token.clone())).collect();

	for chain in &raw.chains {
		if !seen.insert(chain.chain_id) {
			return Err(Error::DuplicateChainId(chain.chain_id));
		}
		chains.push(resolve_chain(chain, &gas_tokens)?);
	}

	Ok(ResolvedConfig { logging, metrics, redis_url: raw.persister.connection_string.clone(), chains })
}

fn logging_filter(logging: &crate::raw::RawLoggingConfig) -> String {
	let mut filter = logging.level.clone();
	for (target, level) in &logging.targets {
		filter.push(',');
		filter.push_str(target);
		filter.push('=');
		filter.push_str(level);
	}
	filter
}

fn resolve_chain(chain: &RawChainConfig, gas_tokens: &HashMap<ChainId, String>) -> Result<ChainSettings> {
	let chain_id = ChainId(chain.chain_id);

	let private_key = parse_private_key(&chain.private_key).map_err(|err| Error::InvalidPrivateKey(err, chain.chain_id))?;
	let secp = secp256k1::Secp256k1::signing_only();
	let public_key = secp256k1::PublicKey::from_secret_key(&secp, &private_key);
	let address = public_key_to_address(&public_key);

	let incentives_address = parse_address(&chain.incentives_address)
		.map_err(|reason| Error::InvalidAddress { chain_id: chain.chain_id, field: "incentivesAddress".to_string(), reason })?;

	let chain_scan = ScanConfig {
		interval: Duration::from_secs(chain.interval_secs),
		block_delay: chain.block_delay,
		max_blocks: chain.max_blocks,
		starting_block: chain.starting_block,
		stopping_block: chain.stopping_block,
	};

	let bounty = BountyCollectorConfig { contract_address: incentives_address, scan: chain_scan.clone() };

	if chain.amb.is_empty() {
		return Err(Error::NoAmbProviders { chain_id: chain.chain_id });
	}

	let mut ambs = Vec::with_capacity(chain.amb.len());
	for (name, raw_amb) in &chain.amb {
		let contract_address = parse_address(&raw_amb.contract_address).map_err(|reason| Error::InvalidAddress {
			chain_id: chain.chain_id,
			field: format!("amb.{name}.contractAddress"),
			reason,
		})?;
		let mock_signing_key = raw_amb
			.mock_signing_key
			.as_deref()
			.map(parse_private_key)
			.transpose()
			.map_err(|err| Error::InvalidPrivateKey(err, chain.chain_id))?;

		let scan = AmbCollectorConfig {
			scan: ScanConfig {
				interval: raw_amb.interval_secs.map(Duration::from_secs).unwrap_or(chain_scan.interval),
				block_delay: raw_amb.block_delay.unwrap_or(chain_scan.block_delay),
				max_blocks: raw_amb.max_blocks.unwrap_or(chain_scan.max_blocks),
				starting_block: raw_amb.starting_block.or(chain_scan.starting_block),
				stopping_block: raw_amb.stopping_block.or(chain_scan.stopping_block),
			},
		};

		ambs.push(AmbSettings {
			amb_id: AmbId::from(name.as_str()),
			provider_kind: name.clone(),
			provider: ProviderConfig {
				amb_id: AmbId::from(name.as_str()),
				contract_address,
				from_chain_id: ChainId(raw_amb.from_chain_id),
				mock_signing_key,
			},
			scan,
		});
	}

	let evaluator = EvaluatorConfig {
		unrewarded_gas_delivery: chain.evaluator.unrewarded_gas_delivery,
		verification_gas_delivery: chain.evaluator.verification_gas_delivery,
		unrewarded_gas_ack: chain.evaluator.unrewarded_gas_ack,
		verification_gas_ack: chain.evaluator.verification_gas_ack,
		min_delivery_reward: decimal_config_value(chain.evaluator.min_delivery_reward),
		relative_min_delivery_reward: decimal_config_value(chain.evaluator.relative_min_delivery_reward),
		min_ack_reward: decimal_config_value(chain.evaluator.min_ack_reward),
		relative_min_ack_reward: decimal_config_value(chain.evaluator.relative_min_ack_reward),
		profitability_factor: decimal_config_value(chain.evaluator.profitability_factor),
	};

	let provider_kind = match &chain.pricing.provider {
		RawPricingProvider::Fixed { price } => ProviderKind::Fixed { price: *price },
		RawPricingProvider::CoinGecko { base_url } => ProviderKind::CoinGecko { base_url: base_url.clone() },
	};
	let pricing_config = PricingConfig::new(
		chain.pricing.coin_decimals,
		chain.pricing.pricing_denomination.clone(),
		Duration::from_secs(chain.pricing.cache_duration_secs),
		Duration::from_secs(chain.pricing.retry_interval_secs),
		chain.pricing.max_tries,
	);

	let wallet = WalletConfig {
		confirmations: chain.confirmations,
		poll_interval: Duration::from_secs(chain.wallet.poll_interval_secs),
		stall_timeout: Duration::from_secs(chain.wallet.stall_timeout_secs),
		max_resubmissions: chain.wallet.max_resubmissions,
		fee_bump_percent: chain.wallet.fee_bump_percent,
	};

	let fee_recipient = match &chain.submitter.fee_recipient {
		Some(raw) => parse_address(raw).map_err(|reason| Error::InvalidAddress {
			chain_id: chain.chain_id,
			field: "submitter.feeRecipient".to_string(),
			reason,
		})?,
		None => address,
	};

	let mut remote_gas_tokens = gas_tokens.clone();
	remote_gas_tokens.remove(&chain_id);

	let submitter_base = SubmitterConfig {
		incentives_address,
		fee_recipient,
		local_gas_token: chain.gas_token.clone(),
		remote_gas_tokens,
		evaluator: evaluator.clone(),
		max_attempts: chain.submitter.max_attempts,
		base_backoff: Duration::from_secs(chain.submitter.base_backoff_secs),
		max_backoff: Duration::from_secs(chain.submitter.max_backoff_secs),
		concurrency: chain.submitter.concurrency.max(1),
	};

	Ok(ChainSettings {
		chain_id,
		name: chain.name.clone(),
		rpc: chain.rpc.clone(),
		confirmations: chain.confirmations,
		private_key,
		address,
		evm_chain_id: chain.chain_id,
		gas_token: chain.gas_token.clone(),
		bounty,
		ambs,
		evaluator,
		pricing: (provider_kind, pricing_config),
		wallet,
		submitter_base,
	})
}

fn parse_private_key(raw: &str) -> std::result::Result<SecretKey, secp256k1::Error> {
	let stripped = raw.strip_prefix("0x").unwrap_or(raw);
	let bytes = hex::decode(stripped).map_err(|_| secp256k1::Error::InvalidSecretKey)?;
	SecretKey::from_slice(&bytes)
}

fn parse_address(raw: &str) -> std::result::Result<Address, String> {
	let stripped = raw.strip_prefix("0x").unwrap_or(raw);
	let bytes = hex::decode(stripped).map_err(|err| err.to_string())?;
	if bytes.len() != 20 {
		return Err(format!("expected 20 bytes, got {}", bytes.len()));
	}
	Ok(Address::from_slice(&bytes))
}

/// Ethereum address is the low 20 bytes of `keccak256(uncompressed_public_key[1..])`.
fn public_key_to_address(public_key: &secp256k1::PublicKey) -> Address {
	let serialized = public_key.serialize_uncompressed();
	let hash = web3::signing::keccak256(&serialized[1..]);
	Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::raw::*;

	fn minimal_chain(chain_id: u64) -> RawChainConfig {
		let mut amb = HashMap::new();
		amb.insert(
			"mock".to_string(),
			RawAmbConfig {
				contract_address: "0x0000000000000000000000000000000000000001".to_string(),
				from_chain_id: chain_id,
				mock_signing_key: None,
				block_delay: None,
				max_blocks: None,
				interval_secs: None,
				starting_block: None,
				stopping_block: None,
			},
		);
		RawChainConfig {
			chain_id,
			name: format!("chain-{chain_id}"),
			rpc: "http://localhost:8545".to_string(),
			starting_block: None,
			stopping_block: None,
			block_delay: 5,
			max_blocks: 2_000,
			interval_secs: 15,
			confirmations: 12,
			private_key: "0x0101010101010101010101010101010101010101010101010101010101010101".to_string(),
			incentives_address: "0x0000000000000000000000000000000000000002".to_string(),
			gas_token: "ethereum".to_string(),
			amb,
			evaluator: RawEvaluatorConfig::default(),
			pricing: RawPricingConfig {
				provider: RawPricingProvider::Fixed { price: 3_000.0 },
				coin_decimals: 18,
				pricing_denomination: "usd".to_string(),
				cache_duration_secs: 60,
				retry_interval_secs: 2,
				max_tries: 3,
			},
			wallet: RawWalletConfig::default(),
			submitter: RawSubmitterConfig::default(),
		}
	}

	#[test]
	fn resolves_a_minimal_single_chain_config() {
		let raw = RawConfig { chains: vec![minimal_chain(1)], ..RawConfig::default() };
		let resolved = resolve(raw).unwrap();
		assert_eq!(resolved.chains.len(), 1);
		assert_eq!(resolved.chains[0].ambs.len(), 1);
	}

	#[test]
	fn rejects_duplicate_chain_ids() {
		let raw = RawConfig { chains: vec![minimal_chain(1), minimal_chain(1)], ..RawConfig::default() };
		assert!(matches!(resolve(raw), Err(Error::DuplicateChainId(1))));
	}

	#[test]
	fn rejects_a_chain_with_no_amb_providers() {
		let mut chain = minimal_chain(1);
		chain.amb.clear();
		let raw = RawConfig { chains: vec![chain], ..RawConfig::default() };
		assert!(matches!(resolve(raw), Err(Error::NoAmbProviders { chain_id: 1 })));
	}

	#[test]
	fn remote_gas_tokens_excludes_the_chain_itself() {
		let raw = RawConfig { chains: vec![minimal_chain(1), minimal_chain(2)], ..RawConfig::default() };
		let resolved = resolve(raw).unwrap();
		let chain_one = &resolved.chains.iter().find(|c| c.chain_id == ChainId(1)).unwrap().submitter_base;
		assert!(!chain_one.remote_gas_tokens.contains_key(&ChainId(1)));
		assert!(chain_one.remote_gas_tokens.contains_key(&ChainId(2)));
	}
}
