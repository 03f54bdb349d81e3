//! File sink implementation.
//!
//! Appends every block as one JSON line to a local file.

use async_trait::async_trait;
use std::{collections::HashMap, path::PathBuf};
use tokio::{
	fs::{File, OpenOptions},
	io::AsyncWriteExt,
	sync::Mutex,
};

use crate::{
	models::SinkTypeConfig,
	services::sink::{Sink, SinkError},
};

/// Sink writing JSON lines to a file
#[derive(Debug)]
pub struct FileSink {
	pub name: String,
	pub path: PathBuf,
	/// Opened by `configure`; one writer at a time keeps lines whole
	file: Mutex<Option<File>>,
}

impl FileSink {
	pub fn from_config(name: &str, config: &SinkTypeConfig) -> Result<Self, SinkError> {
		let SinkTypeConfig::File { path } = config else {
			return Err(SinkError::config_error(
				format!("Invalid file sink configuration: {:?}", config.sink_type()),
				None,
				Some(HashMap::from([("sink".to_string(), name.to_string())])),
			));
		};

		Ok(Self {
			name: name.to_string(),
			path: PathBuf::from(path),
			file: Mutex::new(None),
		})
	}

	fn metadata(&self) -> Option<HashMap<String, String>> {
		Some(HashMap::from([
			("sink".to_string(), self.name.clone()),
			("path".to_string(), self.path.display().to_string()),
		]))
	}

	async fn open(&self) -> Result<File, SinkError> {
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			tokio::fs::create_dir_all(parent).await.map_err(|e| {
				SinkError::config_error(
					format!("Failed to create directory: {}", e),
					Some(Box::new(e)),
					self.metadata(),
				)
			})?;
		}

		OpenOptions::new()
			.create(true)
			.append(true)
			.open(&self.path)
			.await
			.map_err(|e| {
				SinkError::config_error(
					format!("Failed to open file: {}", e),
					Some(Box::new(e)),
					self.metadata(),
				)
			})
	}
}

#[async_trait]
impl Sink for FileSink {
	fn name(&self) -> &str {
		&self.name
	}

	fn can_configure(config: &SinkTypeConfig) -> bool {
		matches!(config, SinkTypeConfig::File { path } if !path.trim().is_empty())
	}

	/// Creates the file and its parent directories when missing.
	async fn configure(&self) -> Result<(), SinkError> {
		let file = self.open().await?;
		*self.file.lock().await = Some(file);
		Ok(())
	}

	async fn publish(&self, payload: &[u8]) -> Result<(), SinkError> {
		let mut guard = self.file.lock().await;
		if guard.is_none() {
			*guard = Some(self.open().await?);
		}
		let Some(file) = guard.as_mut() else {
			return Err(SinkError::internal_error(
				"File sink has no open file",
				None,
				self.metadata(),
			));
		};

		let mut line = Vec::with_capacity(payload.len() + 1);
		line.extend_from_slice(payload);
		line.push(b'\n');

		let written = async {
			file.write_all(&line).await?;
			file.flush().await
		}
		.await;
		if let Err(e) = written {
			// Reopen on the next publish
			*guard = None;
			return Err(SinkError::publish_error(
				format!("Failed to write block: {}", e),
				Some(Box::new(e)),
				self.metadata(),
			));
		}

		Ok(())
	}
}
