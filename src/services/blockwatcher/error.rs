//! Block watcher error types and handling.
//!
//! Every error a watcher hits while running is reported on its error channel as one of these;
//! none of them stops the watcher.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents possible errors that can occur during block watching operations
#[derive(ThisError, Debug)]
pub enum BlockWatcherError {
	/// A head or block could not be fetched before the backoff ran out
	#[error("Fetch error: {0}")]
	FetchError(ErrorContext),

	/// A transaction could not be unified and was left out of its block
	#[error("Decode error: {0}")]
	DecodeError(ErrorContext),

	/// The head subscription reported a failure
	#[error("Subscription error: {0}")]
	SubscriptionError(ErrorContext),

	/// The checkpoint could not be read or written
	#[error("Storage error: {0}")]
	StorageError(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl BlockWatcherError {
	// Fetch error
	pub fn fetch_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::FetchError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Decode error
	pub fn decode_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::DecodeError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Subscription error
	pub fn subscription_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::SubscriptionError(ErrorContext::new_with_log(msg, source, metadata))
	}

	// Storage error
	pub fn storage_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::StorageError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for BlockWatcherError {
	fn trace_id(&self) -> String {
		match self {
			Self::FetchError(ctx) => ctx.trace_id.clone(),
			Self::DecodeError(ctx) => ctx.trace_id.clone(),
			Self::SubscriptionError(ctx) => ctx.trace_id.clone(),
			Self::StorageError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
