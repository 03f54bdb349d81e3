//! Logging setup driven by environment variables.
//!
//! - `LOG_MODE`: `stdout` (default) or `file`
//! - `LOG_LEVEL`: `trace`, `debug`, `info` (default), `warn` or `error`
//! - `LOG_DATA_DIR`: directory for log files, `logs/` by default
//! - `LOG_MAX_SIZE`: size in bytes after which a new file is started, 1GB by default
//! - `IN_DOCKER`: when `true`, `LOG_DATA_DIR` is ignored and `logs/` is used

pub mod error;

use chrono::Utc;
use regex::Regex;
use std::{
	env,
	fs::{create_dir_all, metadata},
	path::{Path, PathBuf},
	sync::OnceLock,
};
use tracing::{info, Subscriber};
use tracing_subscriber::{
	filter::EnvFilter,
	fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
	prelude::*,
	registry::LookupSpan,
};

const DEFAULT_LOG_DIR: &str = "logs/";
const DEFAULT_MAX_SIZE: u64 = 1_073_741_824;
const LOG_FILE_NAME: &str = "chainwatch.log";

/// Where log events are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
	Stdout,
	File,
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
	pub mode: LogMode,
	pub level: tracing::Level,
	pub dir: String,
	pub max_size: u64,
}

impl LogSettings {
	/// Reads the settings, falling back to defaults for anything unset.
	pub fn from_env() -> Result<Self, String> {
		let mode = match env::var("LOG_MODE")
			.unwrap_or_default()
			.to_lowercase()
			.as_str()
		{
			"file" => LogMode::File,
			_ => LogMode::Stdout,
		};

		let level = parse_level(&env::var("LOG_LEVEL").unwrap_or_default());

		let in_docker = env::var("IN_DOCKER").map(|v| v == "true").unwrap_or(false);
		let dir = if in_docker {
			DEFAULT_LOG_DIR.to_string()
		} else {
			env::var("LOG_DATA_DIR").unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string())
		};

		let max_size = parse_log_max_size(env::var("LOG_MAX_SIZE").ok().as_deref())?;

		Ok(Self {
			mode,
			level,
			dir: format!("{}/", dir.trim_end_matches('/')),
			max_size,
		})
	}

	/// Base log file inside the configured directory.
	pub fn base_file_path(&self) -> String {
		format!("{}{}", self.dir, LOG_FILE_NAME)
	}
}

fn parse_level(level: &str) -> tracing::Level {
	match level.to_lowercase().as_str() {
		"trace" => tracing::Level::TRACE,
		"debug" => tracing::Level::DEBUG,
		"warn" => tracing::Level::WARN,
		"error" => tracing::Level::ERROR,
		_ => tracing::Level::INFO,
	}
}

fn parse_log_max_size(raw: Option<&str>) -> Result<u64, String> {
	match raw {
		None => Ok(DEFAULT_MAX_SIZE),
		Some(s) => s
			.trim()
			.parse::<u64>()
			.map_err(|_| format!("LOG_MAX_SIZE must be a valid u64 if set, got '{}'", s)),
	}
}

/// Event formatter that removes ANSI colour codes before writing.
struct StripAnsiFormatter<T> {
	inner: T,
}

impl<S, N, T> FormatEvent<S, N> for StripAnsiFormatter<T>
where
	S: Subscriber + for<'a> LookupSpan<'a>,
	N: for<'a> FormatFields<'a> + 'static,
	T: FormatEvent<S, N>,
{
	fn format_event(
		&self,
		ctx: &FmtContext<'_, S, N>,
		mut writer: Writer<'_>,
		event: &tracing::Event<'_>,
	) -> std::fmt::Result {
		let mut buf = String::new();
		self.inner.format_event(ctx, Writer::new(&mut buf), event)?;
		write!(writer, "{}", strip_ansi_escapes(&buf))
	}
}

fn ansi_pattern() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| {
		#[allow(clippy::unwrap_used)]
		Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").unwrap()
	})
}

fn strip_ansi_escapes(s: &str) -> String {
	ansi_pattern().replace_all(s, "").into_owned()
}

/// `logs/chainwatch.log` + `2024-01-01` + `2` => `logs/chainwatch-2024-01-01.2.log`
pub fn compute_rolled_file_path(base_file_path: &str, date_str: &str, index: u32) -> String {
	let stem = base_file_path
		.strip_suffix(".log")
		.unwrap_or(base_file_path);
	format!("{}-{}.{}.log", stem, date_str, index)
}

/// Moves to the next index while the candidate file is larger than `max_size` bytes.
pub fn space_based_rolling(
	file_path: &str,
	base_file_path: &str,
	date_str: &str,
	max_size: u64,
) -> String {
	let mut candidate = file_path.to_string();
	let mut index = 1;
	while let Ok(meta) = metadata(&candidate) {
		if meta.len() <= max_size {
			break;
		}
		index += 1;
		candidate = compute_rolled_file_path(base_file_path, date_str, index);
	}
	candidate
}

fn create_log_format(with_ansi: bool) -> fmt::format::Format<fmt::format::Compact> {
	fmt::format()
		.with_level(true)
		.with_target(true)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_ansi(with_ansi)
		.compact()
}

/// Installs the global subscriber.
pub fn setup_logging() -> Result<(), Box<dyn std::error::Error>> {
	let settings = LogSettings::from_env()?;
	let filter = EnvFilter::new(settings.level.to_string());
	let subscriber = tracing_subscriber::registry().with(filter);

	match settings.mode {
		LogMode::File => {
			let base_file_path = settings.base_file_path();
			let date_str = Utc::now().format("%Y-%m-%d").to_string();
			let dated_path = compute_rolled_file_path(&base_file_path, &date_str, 1);

			if let Some(parent) = Path::new(&dated_path).parent() {
				create_dir_all(parent)?;
			}

			let final_path = PathBuf::from(space_based_rolling(
				&dated_path,
				&base_file_path,
				&date_str,
				settings.max_size,
			));
			let appender = tracing_appender::rolling::never(
				final_path.parent().unwrap_or(Path::new(".")),
				final_path.file_name().unwrap_or_default(),
			);

			subscriber
				.with(
					fmt::layer()
						.event_format(StripAnsiFormatter {
							inner: create_log_format(false),
						})
						.with_writer(appender)
						.fmt_fields(fmt::format::PrettyFields::new()),
				)
				.try_init()?;
			info!(path = %final_path.display(), "logging to file");
		}
		LogMode::Stdout => {
			subscriber
				.with(
					fmt::layer()
						.event_format(create_log_format(true))
						.fmt_fields(fmt::format::PrettyFields::new()),
				)
				.try_init()?;
		}
	}

	info!(level = %settings.level, "logging configured");
	Ok(())
}
