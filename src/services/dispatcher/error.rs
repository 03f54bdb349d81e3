//! Worker pool errors.

use thiserror::Error as ThisError;

/// Errors returned by [`WorkerPool`](super::WorkerPool)
#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
	/// The pool no longer accepts work, or stopped before the task ran
	#[error("Worker pool is stopped")]
	Stopped,
}
