use relayer_utils::MaybeConnectionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error(transparent)]
	Client(#[from] relayer_monitor::Error),
	#[error(transparent)]
	Store(#[from] relayer_store::Error),
	#[error("malformed log from {address:?}: {reason}")]
	Decode { address: web3::types::Address, reason: String },
	#[error("relay state invariant violated while applying a collected event: {0}")]
	State(#[from] relayer_types::StateError),
	#[error("no provider registered for amb id {0:?}")]
	UnknownProvider(relayer_types::AmbId),
}

impl MaybeConnectionError for Error {
	fn is_connection_error(&self) -> bool {
		match self {
			Error::Client(err) => err.is_connection_error(),
			Error::Store(_) | Error::Decode { .. } | Error::State(_) | Error::UnknownProvider(_) => false,
		}
	}
}
