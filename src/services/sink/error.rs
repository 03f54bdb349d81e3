//! Sink error types and handling.
//!
//! Provides error types for sink setup and publishing. Failures are always per sink.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;

/// Represents errors that can occur while configuring or publishing to a sink
#[derive(ThisError, Debug)]
pub enum SinkError {
	/// The sink configuration is unusable or its target could not be prepared
	#[error("Config error: {0}")]
	ConfigError(Box<ErrorContext>),

	/// A payload was not accepted by the target
	#[error("Publish error: {0}")]
	PublishError(Box<ErrorContext>),

	/// Errors related to internal processing errors
	#[error("Internal error: {0}")]
	InternalError(Box<ErrorContext>),
}

impl SinkError {
	// Config error
	pub fn config_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ConfigError(Box::new(ErrorContext::new_with_log(msg, source, metadata)))
	}

	// Publish error
	pub fn publish_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::PublishError(Box::new(ErrorContext::new_with_log(msg, source, metadata)))
	}

	// Internal error
	pub fn internal_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::InternalError(Box::new(ErrorContext::new_with_log(msg, source, metadata)))
	}
}

impl TraceableError for SinkError {
	fn trace_id(&self) -> String {
		match self {
			Self::ConfigError(ctx) => ctx.trace_id.clone(),
			Self::PublishError(ctx) => ctx.trace_id.clone(),
			Self::InternalError(ctx) => ctx.trace_id.clone(),
		}
	}
}
