//! The TOML schema itself (spec §6: "Configuration (enumerated)"), as plain
//! `serde::Deserialize` structs with defaults. [`crate::resolve`] turns this
//! into the typed configuration each worker crate actually takes.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawConfig {
	pub logging: RawLoggingConfig,
	pub metrics: RawMetricsConfig,
	pub persister: RawPersisterConfig,
	pub chains: Vec<RawChainConfig>,
}

impl Default for RawConfig {
	fn default() -> Self {
		RawConfig {
			logging: RawLoggingConfig::default(),
			metrics: RawMetricsConfig::default(),
			persister: RawPersisterConfig::default(),
			chains: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawLoggingConfig {
	pub level: String,
	/// `env_logger`-style per-target overrides, e.g. `{"relayer::wallet": "debug"}`.
	pub targets: HashMap<String, String>,
}

impl Default for RawLoggingConfig {
	fn default() -> Self {
		RawLoggingConfig { level: "info".to_string(), targets: HashMap::new() }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawMetricsConfig {
	pub enabled: bool,
	pub host: String,
	pub port: u16,
}

impl Default for RawMetricsConfig {
	fn default() -> Self {
		RawMetricsConfig { enabled: false, host: "127.0.0.1".to_string(), port: 9616 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPersisterConfig {
	pub enabled: bool,
	pub connection_string: String,
}

impl Default for RawPersisterConfig {
	fn default() -> Self {
		RawPersisterConfig { enabled: true, connection_string: "redis://127.0.0.1:6379".to_string() }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChainConfig {
	pub chain_id: u64,
	pub name: String,
	pub rpc: String,
	#[serde(default)]
	pub starting_block: Option<u64>,
	#[serde(default)]
	pub stopping_block: Option<u64>,
	#[serde(default = "default_block_delay")]
	pub block_delay: u64,
	#[serde(default = "default_max_blocks")]
	pub max_blocks: u64,
	#[serde(default = "default_interval_secs")]
	pub interval_secs: u64,
	#[serde(default = "default_confirmations")]
	pub confirmations: u64,
	/// `0x`-prefixed hex-encoded secp256k1 private key for this chain's wallet.
	pub private_key: String,
	pub incentives_address: String,
	/// Native gas token id (as understood by the Pricing worker), e.g. `"ethereum"`.
	pub gas_token: String,
	#[serde(default)]
	pub amb: HashMap<String, RawAmbConfig>,
	#[serde(default)]
	pub evaluator: RawEvaluatorConfig,
	pub pricing: RawPricingConfig,
	#[serde(default)]
	pub wallet: RawWalletConfig,
	#[serde(default)]
	pub submitter: RawSubmitterConfig,
}

fn default_block_delay() -> u64 {
	5
}

fn default_max_blocks() -> u64 {
	2_000
}

fn default_interval_secs() -> u64 {
	15
}

fn default_confirmations() -> u64 {
	12
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAmbConfig {
	pub contract_address: String,
	/// Source chain id this provider's dispatch events are read from. Equal
	/// to the owning chain's `chainId` for the common case of a provider
	/// whose source and destination-side collectors are configured
	/// separately per chain.
	pub from_chain_id: u64,
	/// `0x`-prefixed hex secp256k1 key the mock provider signs proofs with.
	/// Only meaningful for the `"mock"` provider kind.
	#[serde(default)]
	pub mock_signing_key: Option<String>,
	#[serde(default)]
	pub block_delay: Option<u64>,
	#[serde(default)]
	pub max_blocks: Option<u64>,
	#[serde(default)]
	pub interval_secs: Option<u64>,
	#[serde(default)]
	pub starting_block: Option<u64>,
	#[serde(default)]
	pub stopping_block: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawEvaluatorConfig {
	pub unrewarded_gas_delivery: u128,
	pub verification_gas_delivery: u128,
	pub unrewarded_gas_ack: u128,
	pub verification_gas_ack: u128,
	pub min_delivery_reward: f64,
	pub relative_min_delivery_reward: f64,
	pub min_ack_reward: f64,
	pub relative_min_ack_reward: f64,
	pub profitability_factor: f64,
}

impl Default for RawEvaluatorConfig {
	fn default() -> Self {
		RawEvaluatorConfig {
			unrewarded_gas_delivery: 0,
			verification_gas_delivery: 0,
			unrewarded_gas_ack: 0,
			verification_gas_ack: 0,
			min_delivery_reward: 0.0,
			relative_min_delivery_reward: 0.1,
			min_ack_reward: 0.0,
			relative_min_ack_reward: 0.1,
			profitability_factor: 1.0,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", tag = "provider")]
pub enum RawPricingProvider {
	#[serde(rename = "fixed")]
	Fixed { price: f64 },
	#[serde(rename = "coin-gecko")]
	CoinGecko { base_url: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPricingConfig {
	#[serde(flatten)]
	pub provider: RawPricingProvider,
	#[serde(default = "default_coin_decimals")]
	pub coin_decimals: u32,
	#[serde(default = "default_pricing_denomination")]
	pub pricing_denomination: String,
	#[serde(default = "default_cache_duration_secs")]
	pub cache_duration_secs: u64,
	#[serde(default = "default_retry_interval_secs")]
	pub retry_interval_secs: u64,
	#[serde(default = "default_max_tries")]
	pub max_tries: u32,
}

fn default_coin_decimals() -> u32 {
	18
}

fn default_pricing_denomination() -> String {
	"usd".to_string()
}

fn default_cache_duration_secs() -> u64 {
	60
}

fn default_retry_interval_secs() -> u64 {
	2
}

fn default_max_tries() -> u32 {
	3
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawWalletConfig {
	pub poll_interval_secs: u64,
	pub stall_timeout_secs: u64,
	pub max_resubmissions: u32,
	pub fee_bump_percent: u64,
}

impl Default for RawWalletConfig {
	fn default() -> Self {
		RawWalletConfig { poll_interval_secs: 5, stall_timeout_secs: 180, max_resubmissions: 3, fee_bump_percent: 15 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSubmitterConfig {
	/// Defaults to the chain's own signing address when unset (the relayer
	/// collects its own fee).
	pub fee_recipient: Option<String>,
	pub max_attempts: u32,
	pub base_backoff_secs: u64,
	pub max_backoff_secs: u64,
	pub concurrency: usize,
}

impl Default for RawSubmitterConfig {
	fn default() -> Self {
		RawSubmitterConfig {
			fee_recipient: None,
			max_attempts: 8,
			base_backoff_secs: 5,
			max_backoff_secs: 300,
			concurrency: 1,
		}
	}
}
