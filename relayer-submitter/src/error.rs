use relayer_utils::MaybeConnectionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error(transparent)]
	Store(#[from] relayer_store::Error),
	#[error(transparent)]
	Wallet(#[from] relayer_wallet::Error),
	#[error(transparent)]
	Evaluator(#[from] relayer_evaluator::Error),
	#[error("failed to encode processPacket call data: {0}")]
	Encode(#[from] ethabi::Error),
	#[error("key {0:?} does not look like a relayer store key")]
	MalformedKey(String),
	#[error("undecodable proof for {0}: {1}")]
	UndecodableProof(relayer_types::MessageIdentifier, String),
}

impl MaybeConnectionError for Error {
	fn is_connection_error(&self) -> bool {
		match self {
			Error::Store(err) => err.is_connection_error(),
			Error::Wallet(err) => err.is_connection_error(),
			Error::Evaluator(_) | Error::Encode(_) | Error::MalformedKey(_) | Error::UndecodableProof(..) => false,
		}
	}
}
