//! Parsing helpers for CLI arguments and configuration values.

use byte_unit::Byte;
use std::str::FromStr;

/// Parses a human-readable size such as "1GB", "500MB" or "1KiB" into bytes.
pub fn parse_string_to_bytes_size(s: &str) -> Result<u64, String> {
	Byte::from_str(s)
		.map(|byte| byte.as_u64())
		.map_err(|e| format!("Invalid size format: '{}'. Error: {}", s, e))
}

/// Parses a count that must be at least one, such as a worker bound.
pub fn parse_positive_count(s: &str) -> Result<usize, String> {
	match s.trim().parse::<usize>() {
		Ok(0) => Err("Value must be at least 1".to_string()),
		Ok(n) => Ok(n),
		Err(e) => Err(format!("Invalid count: '{}'. Error: {}", s, e)),
	}
}

/// Trims and lowercases `input` for case-insensitive comparisons.
pub fn normalize_string(input: &str) -> String {
	input.trim().to_lowercase()
}
