//! Configuration loading and validation.
//!
//! Networks and sinks are read from directories of JSON files, one entity per file.

#![allow(clippy::result_large_err)]

use async_trait::async_trait;
use std::path::Path;

mod error;
mod network_config;
mod sink_config;

pub use error::ConfigError;

/// Common interface for loading configuration files
#[async_trait]
pub trait ConfigLoader: Sized {
	/// Load every JSON file in a directory, keyed by file stem.
	///
	/// Falls back to the type's default directory when no path is given.
	async fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>;

	/// Load, resolve and validate a single file
	async fn load_from_path(path: &Path) -> Result<Self, ConfigError>;

	fn validate(&self) -> Result<(), ConfigError>;

	/// Log a warning for every plaintext endpoint
	fn validate_protocol(&self);

	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase() == "json")
			.unwrap_or(false)
	}

	/// Replace secret references with their values
	async fn resolve_secrets(&self) -> Result<Self, ConfigError>;

	/// Fail when `current_instance` collides with one of `instances`
	fn validate_uniqueness(
		instances: &[&Self],
		current_instance: &Self,
		file_path: &str,
	) -> Result<(), ConfigError>;
}

/// Reads every JSON file of `dir` with `load`, keeping file stems as keys.
///
/// Shared by the loaders so that directory walking and uniqueness checks behave the same for
/// networks and sinks.
pub(crate) async fn load_dir<C, T, F, Fut>(
	dir: &Path,
	kind: &str,
	load: F,
) -> Result<T, ConfigError>
where
	C: ConfigLoader,
	T: FromIterator<(String, C)>,
	F: Fn(std::path::PathBuf) -> Fut,
	Fut: std::future::Future<Output = Result<C, ConfigError>>,
{
	use std::collections::HashMap;

	let path_meta = || {
		Some(HashMap::from([(
			"path".to_string(),
			dir.display().to_string(),
		)]))
	};

	if !dir.exists() {
		return Err(ConfigError::file_error(
			format!("{} directory not found", kind),
			None,
			path_meta(),
		));
	}

	let mut paths = Vec::new();
	for entry in std::fs::read_dir(dir).map_err(|e| {
		ConfigError::file_error(
			format!("failed to read {} directory: {}", kind, e),
			Some(Box::new(e)),
			path_meta(),
		)
	})? {
		let entry = entry.map_err(|e| {
			ConfigError::file_error(
				format!("failed to read directory entry: {}", e),
				Some(Box::new(e)),
				path_meta(),
			)
		})?;
		if C::is_json_file(&entry.path()) {
			paths.push(entry.path());
		}
	}
	// read_dir order is platform dependent
	paths.sort();

	let mut pairs: Vec<(String, C)> = Vec::new();
	for path in paths {
		let name = path
			.file_stem()
			.and_then(|s| s.to_str())
			.unwrap_or("unknown")
			.to_string();
		let item = load(path.clone()).await?;

		let existing: Vec<&C> = pairs.iter().map(|(_, c)| c).collect();
		C::validate_uniqueness(&existing, &item, &path.display().to_string())?;

		pairs.push((name, item));
	}

	Ok(T::from_iter(pairs))
}
