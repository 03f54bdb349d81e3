use thiserror::Error as ThisError;

/// Outcome of a retried operation that never succeeded.
#[derive(ThisError, Debug)]
pub enum RetryError<E> {
	/// The backoff ran past its maximum delay
	#[error("gave up after {attempts} attempts: {last_error}")]
	Exhausted { attempts: u32, last_error: E },

	/// The cancellation token fired before the operation succeeded
	#[error("retry cancelled")]
	Cancelled,
}

impl<E> RetryError<E> {
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}
