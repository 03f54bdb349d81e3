//! Pipeline error types and handling.

use crate::utils::logging::error::{ErrorContext, TraceableError};
use std::collections::HashMap;
use thiserror::Error as ThisError;
use uuid::Uuid;

/// Represents errors raised by pipeline steps
#[derive(ThisError, Debug)]
pub enum PipelineError {
	/// A step rejected or failed to transform a block
	#[error("Step error: {0}")]
	StepError(ErrorContext),

	/// Other errors that don't fit into the categories above
	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl PipelineError {
	// Step error
	pub fn step_error(
		msg: impl Into<String>,
		source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		Self::StepError(ErrorContext::new_with_log(msg, source, metadata))
	}
}

impl TraceableError for PipelineError {
	fn trace_id(&self) -> String {
		match self {
			Self::StepError(ctx) => ctx.trace_id.clone(),
			Self::Other(_) => Uuid::new_v4().to_string(),
		}
	}
}
