//! Exponential backoff for node requests.
//!
//! A [`Backoff`] yields `base * 2^attempt` until that delay would exceed the configured
//! maximum, at which point the retried operation is considered failed for good.
//! [`retry_with_backoff`] drives an async operation with a fresh backoff and stops early when
//! the cancellation token fires.

mod error;

pub use error::RetryError;

use std::{future::Future, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::models::BackoffConfig;

/// Doubling delay sequence capped by a terminal maximum.
#[derive(Debug, Clone)]
pub struct Backoff {
	base: Duration,
	max: Duration,
	attempt: u32,
}

impl Backoff {
	pub fn new(base: Duration, max: Duration) -> Self {
		Self {
			base,
			max,
			attempt: 0,
		}
	}

	/// Starts the sequence over from `base`.
	pub fn reset(&mut self) {
		self.attempt = 0;
	}

	/// Number of delays handed out since the last reset.
	pub fn attempt(&self) -> u32 {
		self.attempt
	}

	/// Returns the next delay, or `None` once it would exceed the maximum.
	///
	/// A `None` is terminal: further calls keep returning `None` until [`Backoff::reset`].
	pub fn next_delay(&mut self) -> Option<Duration> {
		let factor = 1u32.checked_shl(self.attempt)?;
		let delay = self.base.checked_mul(factor)?;
		if delay > self.max {
			return None;
		}
		self.attempt += 1;
		Some(delay)
	}
}

impl From<&BackoffConfig> for Backoff {
	fn from(config: &BackoffConfig) -> Self {
		Self::new(
			Duration::from_millis(config.base_delay_ms),
			Duration::from_millis(config.max_delay_ms),
		)
	}
}

/// Runs `operation` until it succeeds, the backoff is exhausted or `cancellation` fires.
///
/// The operation receives the zero-based attempt number. Each call owns its own [`Backoff`],
/// so concurrent retries never share delay state.
pub async fn retry_with_backoff<T, E, F, Fut>(
	config: &BackoffConfig,
	cancellation: &CancellationToken,
	mut operation: F,
) -> Result<T, RetryError<E>>
where
	F: FnMut(u32) -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: std::fmt::Display,
{
	let mut backoff = Backoff::from(config);
	let mut attempt: u32 = 0;

	loop {
		if cancellation.is_cancelled() {
			return Err(RetryError::Cancelled);
		}

		let error = tokio::select! {
			biased;
			_ = cancellation.cancelled() => return Err(RetryError::Cancelled),
			result = operation(attempt) => match result {
				Ok(value) => return Ok(value),
				Err(error) => error,
			},
		};
		attempt += 1;

		let Some(delay) = backoff.next_delay() else {
			return Err(RetryError::Exhausted {
				attempts: attempt,
				last_error: error,
			});
		};

		tracing::debug!(
			attempt,
			delay_ms = delay.as_millis() as u64,
			error = %error,
			"operation failed, retrying"
		);

		if !sleep_with_cancellation(delay, cancellation).await {
			return Err(RetryError::Cancelled);
		}
	}
}

/// Sleeps for `delay`; returns `false` when cancelled first.
pub async fn sleep_with_cancellation(delay: Duration, cancellation: &CancellationToken) -> bool {
	if delay.is_zero() {
		tokio::task::yield_now().await;
		return !cancellation.is_cancelled();
	}

	tokio::select! {
		_ = cancellation.cancelled() => false,
		_ = tokio::time::sleep(delay) => true,
	}
}
