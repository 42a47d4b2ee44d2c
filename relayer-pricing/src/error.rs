use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error("failed to reach price provider: {0}")]
	Http(#[source] anyhow::Error),
	#[error(transparent)]
	Provider(#[from] relayer_utils::Error),
	#[error("pricing worker's channel is gone; did the worker task panic or get dropped?")]
	WorkerGone,
}

impl relayer_utils::MaybeConnectionError for Error {
	fn is_connection_error(&self) -> bool {
		matches!(self, Error::Http(_))
	}
}
