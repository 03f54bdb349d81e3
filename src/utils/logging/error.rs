//! Error context shared by every error type in the crate.
//!
//! [`ErrorContext`] carries a message, an optional source, free-form metadata, the moment the
//! error was raised and a trace id. Trace ids are inherited from the source chain when one of
//! the wrapped errors already has one, so a failure that travels from a transport, through a
//! client, into a watcher keeps a single id across every log line it produces.

use chrono::Utc;
use std::{collections::HashMap, fmt};
use uuid::Uuid;

/// Boxed error used as the source of an [`ErrorContext`].
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Message, source and metadata attached to an error variant.
#[derive(Debug)]
pub struct ErrorContext {
	/// Human readable message
	pub message: String,
	/// Underlying cause, if any
	pub source: Option<BoxedError>,
	/// Key/value pairs rendered after the message
	pub metadata: Option<HashMap<String, String>>,
	/// RFC 3339 timestamp of creation
	pub timestamp: String,
	/// UUID v4, inherited from the source chain when available
	pub trace_id: String,
}

impl ErrorContext {
	/// Builds a context without logging it.
	pub fn new(
		message: impl Into<String>,
		source: Option<BoxedError>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let trace_id = match source.as_ref() {
			Some(src) => TraceableError::trace_id(src.as_ref()),
			None => Uuid::new_v4().to_string(),
		};

		Self {
			message: message.into(),
			source,
			metadata,
			timestamp: Utc::now().to_rfc3339(),
			trace_id,
		}
	}

	/// Builds a context and emits it as an `error` event.
	pub fn new_with_log(
		message: impl Into<String>,
		source: Option<BoxedError>,
		metadata: Option<HashMap<String, String>>,
	) -> Self {
		let context = Self::new(message, source, metadata);
		log_error(&context);
		context
	}

	/// Adds one metadata entry, creating the map on first use.
	pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata
			.get_or_insert_with(HashMap::new)
			.insert(key.into(), value.into());
		self
	}

	/// Renders `message [k1=v1, k2=v2]` with keys in lexical order.
	pub fn format_with_metadata(&self) -> String {
		let Some(metadata) = self.metadata.as_ref().filter(|m| !m.is_empty()) else {
			return self.message.clone();
		};

		let mut entries: Vec<_> = metadata.iter().collect();
		entries.sort_by(|a, b| a.0.cmp(b.0));
		let rendered = entries
			.into_iter()
			.map(|(k, v)| format!("{}={}", k, v))
			.collect::<Vec<_>>()
			.join(", ");

		format!("{} [{}]", self.message, rendered)
	}
}

impl fmt::Display for ErrorContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.format_with_metadata())
	}
}

impl std::error::Error for ErrorContext {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		self.source
			.as_ref()
			.map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
	}
}

/// Errors that expose a trace id.
pub trait TraceableError: std::error::Error + Send + Sync {
	fn trace_id(&self) -> String;
}

impl TraceableError for dyn std::error::Error + Send + Sync + 'static {
	fn trace_id(&self) -> String {
		if let Some(id) = try_extract_trace_id(self) {
			return id;
		}

		// Only the first few links are inspected; deeper chains get a fresh id.
		const MAX_DEPTH: usize = 3;
		let mut source = self.source();
		let mut depth = 0;
		while let Some(err) = source {
			depth += 1;
			if depth > MAX_DEPTH {
				break;
			}
			if let Some(id) = try_extract_trace_id(err) {
				return id;
			}
			source = err.source();
		}

		Uuid::new_v4().to_string()
	}
}

fn try_extract_trace_id(err: &(dyn std::error::Error + 'static)) -> Option<String> {
	if let Some(ctx) = err.downcast_ref::<ErrorContext>() {
		return Some(ctx.trace_id.clone());
	}

	macro_rules! try_downcast {
		($($ty:path),*) => {
			$(
				if let Some(e) = err.downcast_ref::<$ty>() {
					return Some(e.trace_id());
				}
			)*
		}
	}

	try_downcast!(
		crate::services::blockwatcher::BlockWatcherError,
		crate::services::blockchain::BlockChainError,
		crate::services::blockchain::TransportError,
		crate::services::sink::SinkError,
		crate::services::pipeline::PipelineError,
		crate::repositories::RepositoryError,
		crate::models::ConfigError,
		crate::models::SecurityError
	);

	None
}

/// Drops everything from the first tag when a node answers with an HTML error page.
fn sanitize_error_message(message: &str) -> String {
	let looks_like_html = ["<html>", "<head>", "<body>"]
		.iter()
		.any(|tag| message.contains(tag));
	match message.find('<') {
		Some(pos) if looks_like_html => message[..pos].trim().to_string(),
		_ => message.to_string(),
	}
}

fn format_error_chain(err: &dyn std::error::Error) -> String {
	let mut result = sanitize_error_message(&err.to_string());
	let mut source = err.source();

	while let Some(err) = source {
		result.push_str("\n\tCaused by: ");
		result.push_str(&sanitize_error_message(&err.to_string()));
		source = err.source();
	}

	result
}

/// Flattens metadata into `(key, value)` pairs for structured events.
pub fn metadata_to_fields(metadata: &Option<HashMap<String, String>>) -> Vec<(&str, &str)> {
	metadata
		.iter()
		.flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v.as_str())))
		.collect()
}

fn log_error(error: &ErrorContext) {
	match &error.source {
		Some(err) => tracing::error!(
			message = error.format_with_metadata(),
			trace_id = %error.trace_id,
			timestamp = %error.timestamp,
			error.chain = %format_error_chain(&**err),
			"Error occurred"
		),
		None => tracing::error!(
			message = error.format_with_metadata(),
			trace_id = %error.trace_id,
			timestamp = %error.timestamp,
			"Error occurred"
		),
	}
}
