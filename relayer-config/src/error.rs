use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error("failed to read config file {path}: {source}")]
	Read { path: String, #[source] source: std::io::Error },
	#[error("failed to parse config file {path} as TOML: {source}")]
	Parse { path: String, #[source] source: Box<toml::de::Error> },
	#[error("invalid metrics address {0}")]
	InvalidMetricsAddress(String),
	#[error("chain {chain_id} declares no amb providers; every chain needs at least one")]
	NoAmbProviders { chain_id: u64 },
	#[error("chain {1}: invalid private key: {0}")]
	InvalidPrivateKey(#[source] secp256k1::Error, u64),
	#[error("chain {chain_id}: invalid address {field}: {reason}")]
	InvalidAddress { chain_id: u64, field: String, reason: String },
	#[error("duplicate chain id {0} in configuration")]
	DuplicateChainId(u64),
}
