use relayer_utils::{FailedClient, MaybeConnectionError};
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
	#[error("redis error: {0}")]
	Redis(#[from] Arc<redis::RedisError>),
	#[error("stored value at {key:?} failed to deserialize: {source}")]
	Corrupted { key: String, source: Arc<serde_json::Error> },
	#[error("serializing value for {key:?} failed: {source}")]
	Serialization { key: String, source: Arc<serde_json::Error> },
	#[error("optimistic write to {key:?} lost the race {attempts} times in a row")]
	Conflict { key: String, attempts: u32 },
}

impl From<redis::RedisError> for Error {
	fn from(err: redis::RedisError) -> Self {
		Error::Redis(Arc::new(err))
	}
}

impl MaybeConnectionError for Error {
	fn is_connection_error(&self) -> bool {
		match self {
			Error::Redis(err) => err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout(),
			Error::Corrupted { .. } | Error::Serialization { .. } | Error::Conflict { .. } => false,
		}
	}
}

impl Error {
	/// Classify this failure for the caller's [`FailedClient`] bookkeeping.
	/// The store sits between every worker and every chain, so callers tag
	/// it under the chain whose operation they were attempting.
	pub fn failed_client(&self, chain_is_source: bool) -> Option<FailedClient> {
		self.is_connection_error()
			.then(|| if chain_is_source { FailedClient::Source } else { FailedClient::Target })
	}
}
