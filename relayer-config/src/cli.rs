//! Command-line entry point: a config file path plus a handful of scalar
//! overrides for the things operators most often need to flip without
//! editing the file (log verbosity, where Redis lives, whether metrics are
//! exposed).

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Cross-chain message relayer", long_about = None)]
pub struct Args {
	/// Path to the TOML configuration file.
	#[clap(long, short = 'c', env = "RELAYER_CONFIG", default_value = "relayer.toml")]
	pub config: PathBuf,

	/// Overrides `logging.level`.
	#[clap(long, env = "RELAYER_LOG_LEVEL")]
	pub log_level: Option<String>,

	/// Overrides `persister.connectionString`.
	#[clap(long, env = "RELAYER_REDIS_URL")]
	pub redis_url: Option<String>,

	/// Overrides `metrics.enabled`.
	#[clap(long, env = "RELAYER_METRICS_ENABLED")]
	pub metrics_enabled: Option<bool>,

	/// Overrides `metrics.host`:`metrics.port`.
	#[clap(long, env = "RELAYER_METRICS_ADDR")]
	pub metrics_addr: Option<std::net::SocketAddr>,
}
