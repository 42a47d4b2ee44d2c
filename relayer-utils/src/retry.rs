//! Retry/backoff helpers shared by collectors, the pricing worker and the wallet.

use crate::error::MaybeConnectionError;
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

/// Delay before a worker retries talking to a node after a connection-class error.
pub const CONNECTION_ERROR_DELAY: Duration = Duration::from_secs(10);

/// Build the standard backoff used when reconnecting to an RPC endpoint: starts
/// small, doubles up to a one-minute ceiling, retries forever (the caller decides
/// when to give up, e.g. via `maxTries`).
pub fn retry_backoff() -> ExponentialBackoff {
	ExponentialBackoffBuilder::new()
		.with_initial_interval(Duration::from_millis(100))
		.with_max_interval(Duration::from_secs(60))
		.with_max_elapsed_time(None)
		.build()
}

/// Sleep for `duration`, then resolve. Used to build interval streams without
/// pulling in a stream-specific interval type at every call site.
pub async fn delay(duration: Duration) {
	tokio::time::sleep(duration).await;
}

/// Retry `operation` up to `max_tries` times, sleeping `retry_interval` between
/// attempts. Returns the last error if every attempt fails.
///
/// This is the bounded-retry shape used by the Pricing worker (`maxTries`,
/// `retryInterval`) and by collectors waiting out a transient RPC failure.
pub async fn retry_bounded<T, E, F, Fut>(
	max_tries: u32,
	retry_interval: Duration,
	mut operation: F,
) -> std::result::Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = std::result::Result<T, E>>,
{
	let mut attempt = 0;
	loop {
		attempt += 1;
		match operation().await {
			Ok(value) => return Ok(value),
			Err(err) if attempt >= max_tries => return Err(err),
			Err(_err) => {
				delay(retry_interval).await;
			}
		}
	}
}

/// Outcome of processing a future's result inside a worker's event loop: whether
/// the worker's upstream client should be considered online, and whether it
/// needs to be reconnected after a connection-class error.
pub fn client_is_online_after<T, E: std::fmt::Debug + MaybeConnectionError>(
	result: &std::result::Result<T, E>,
) -> bool {
	match result {
		Ok(_) => true,
		Err(err) => !err.is_connection_error(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[tokio::test]
	async fn retry_bounded_stops_after_max_tries() {
		let calls = AtomicU32::new(0);
		let result: std::result::Result<(), &'static str> = retry_bounded(3, Duration::from_millis(1), || async {
			calls.fetch_add(1, Ordering::SeqCst);
			Err("nope")
		})
		.await;

		assert_eq!(result, Err("nope"));
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn retry_bounded_returns_first_success() {
		let calls = AtomicU32::new(0);
		let result = retry_bounded(5, Duration::from_millis(1), || async {
			let n = calls.fetch_add(1, Ordering::SeqCst);
			if n < 2 {
				Err("nope")
			} else {
				Ok(42)
			}
		})
		.await;

		assert_eq!(result, Ok(42));
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}
}
