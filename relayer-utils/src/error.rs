use thiserror::Error;

/// Result type used throughout the relayer workers.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by every worker in the relayer process.
///
/// Component-specific crates (store, wallet, pricing, ...) define their own
/// `Error` enum and convert into/out of this one at their public boundary,
/// the same way this codebase keeps a narrow `relay-utils::Error` and lets
/// each client crate own its richer error type.
#[derive(Error, Debug)]
pub enum Error {
	/// Failed to request a value from an HTTP service (price APIs, RPC).
	#[error("failed to reach remote service: {0}")]
	Http(#[source] anyhow::Error),
	/// Failed to parse the response from an HTTP service.
	#[error("failed to parse HTTP service response: {0:?}. Response: {1:?}")]
	ParseHttp(serde_json::Error, String),
	/// Failed to select a response value with a JSONPath expression.
	#[error("failed to select value from response: {0:?}. Response: {1:?}")]
	SelectResponseValue(jsonpath_lib::JsonPathError, String),
	/// Failed to parse a float value from the selected JSON value.
	#[error("failed to parse float value {0:?} from response; expected a positive, normal number")]
	ParseFloat(f64),
	/// Couldn't find the requested value in the JSON response.
	#[error("missing required value from response: {0:?}")]
	MissingResponseValue(String),
	/// Invalid host/port combination used for exposing Prometheus metrics.
	#[error("invalid host/port for metrics endpoint: {0}")]
	InvalidMetricsAddress(String),
	/// Prometheus registration error.
	#[error("prometheus error: {0}")]
	Prometheus(#[from] prometheus::Error),
}

/// Error that can signal a connection-class failure.
///
/// Implemented by every client-facing error enum (RPC clients, the store
/// client, pricing providers) so that generic retry/backoff code can decide
/// whether a failure is worth reconnecting for, without knowing the concrete
/// error type.
pub trait MaybeConnectionError {
	/// Returns true if this error (probably) represents a connection error,
	/// as opposed to e.g. a logic error that retrying won't fix.
	fn is_connection_error(&self) -> bool;
}

impl MaybeConnectionError for Error {
	fn is_connection_error(&self) -> bool {
		matches!(self, Error::Http(_))
	}
}

/// Identifies which side of a two-party relay loop (source chain / target
/// chain) went offline, so the caller knows which client to reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedClient {
	/// The source-chain client failed.
	Source,
	/// The target-chain client failed.
	Target,
}

impl std::fmt::Display for FailedClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			FailedClient::Source => write!(f, "source"),
			FailedClient::Target => write!(f, "target"),
		}
	}
}
