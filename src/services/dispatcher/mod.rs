//! Dispatcher service.
//!
//! Runs block fan-out tasks on a dynamically sized pool of workers that grows up to a bound
//! under load and shrinks back to zero when idle.

mod error;
mod pool;

pub use error::PoolError;
pub use pool::{Task, WorkerPool, DEFAULT_IDLE_TIMEOUT};
