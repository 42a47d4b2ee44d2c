use relayer_utils::MaybeConnectionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error(transparent)]
	Client(#[from] relayer_monitor::Error),
	#[error("wallet worker's channel is gone; did the worker task panic or get dropped?")]
	WorkerGone,
}

impl MaybeConnectionError for Error {
	fn is_connection_error(&self) -> bool {
		match self {
			Error::Client(err) => err.is_connection_error(),
			Error::WorkerGone => false,
		}
	}
}
