//! Block watcher service implementation.
//!
//! This module follows networks and emits their irreversible blocks. It includes:
//! - A generic watcher over the blockchain client capability trait
//! - Checkpoint storage so a restarted watcher resumes where it stopped
//! - Error handling specific to block watching operations

mod error;
mod service;
mod storage;

pub use error::BlockWatcherError;
pub use service::BlockWatcher;
pub use storage::{BlockStorage, FileBlockStorage};
