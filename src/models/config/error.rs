//! Errors raised while loading configuration.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Configuration errors. The offending network or sink is skipped.
#[derive(ThisError, Debug)]
pub enum ConfigError {
	/// A value is out of range or inconsistent
	#[error("Validation error: {0}")]
	ValidationError(ErrorContext),

	/// The file is not valid JSON for the expected type
	#[error("Parse error: {0}")]
	ParseError(ErrorContext),

	/// The file or directory could not be read
	#[error("File error: {0}")]
	FileError(ErrorContext),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl ConfigError {
	pub fn validation_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ValidationError(ErrorContext::new(msg, source, metadata))
	}

	pub fn parse_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::ParseError(ErrorContext::new(msg, source, metadata))
	}

	pub fn file_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::FileError(ErrorContext::new(msg, source, metadata))
	}
}

impl TraceableError for ConfigError {
	fn trace_id(&self) -> String {
		match self {
			Self::ValidationError(ctx) | Self::ParseError(ctx) | Self::FileError(ctx) => {
				ctx.trace_id.clone()
			}
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}

impl From<std::io::Error> for ConfigError {
	fn from(err: std::io::Error) -> Self {
		Self::file_error(err.to_string(), None, None)
	}
}

impl From<serde_json::Error> for ConfigError {
	fn from(err: serde_json::Error) -> Self {
		Self::parse_error(err.to_string(), None, None)
	}
}
