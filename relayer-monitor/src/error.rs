use relayer_utils::MaybeConnectionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
	#[error("RPC transport error: {0}")]
	Transport(#[from] web3::Error),
	#[error("node returned a block with no header fields populated")]
	IncompleteBlock,
}

impl MaybeConnectionError for Error {
	fn is_connection_error(&self) -> bool {
		// web3's `Error` doesn't expose a stable "was this a transport failure"
		// check across its transport backends, so fall back to sniffing the
		// message the way the pricing client does for HTTP failures.
		match self {
			Error::Transport(err) => {
				let message = err.to_string().to_ascii_lowercase();
				message.contains("connect") || message.contains("timed out") || message.contains("timeout")
			}
			Error::IncompleteBlock => false,
		}
	}
}
