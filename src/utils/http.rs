//! Retryable HTTP clients shared by node transports and sinks.

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
	policies::ExponentialBackoff, Jitter, RetryTransientMiddleware, RetryableStrategy,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_max_retries() -> u32 {
	3
}

fn default_base_for_backoff() -> u32 {
	2
}

fn default_initial_backoff() -> Duration {
	Duration::from_millis(250)
}

fn default_max_backoff() -> Duration {
	Duration::from_secs(10)
}

/// Randomization applied to each retry delay
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JitterSetting {
	None,
	#[default]
	Full,
}

/// Retry policy for HTTP requests, as written in sink and network configuration.
///
/// Only transient failures are retried; which ones count as transient is decided by the
/// strategy passed to [`create_retryable_http_client`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
	/// Retries after the first attempt
	#[serde(default = "default_max_retries")]
	pub max_retries: u32,
	/// Growth factor between consecutive delays
	#[serde(default = "default_base_for_backoff")]
	pub base_for_backoff: u32,
	#[serde(default = "default_initial_backoff")]
	pub initial_backoff: Duration,
	#[serde(default = "default_max_backoff")]
	pub max_backoff: Duration,
	#[serde(default)]
	pub jitter: JitterSetting,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_retries: default_max_retries(),
			base_for_backoff: default_base_for_backoff(),
			initial_backoff: default_initial_backoff(),
			max_backoff: default_max_backoff(),
			jitter: JitterSetting::default(),
		}
	}
}

impl RetryConfig {
	/// Exponential backoff policy described by this configuration
	pub fn policy(&self) -> ExponentialBackoff {
		let jitter = match self.jitter {
			JitterSetting::None => Jitter::None,
			JitterSetting::Full => Jitter::Full,
		};
		ExponentialBackoff::builder()
			.jitter(jitter)
			.base(self.base_for_backoff)
			.retry_bounds(self.initial_backoff, self.max_backoff)
			.build_with_max_retries(self.max_retries)
	}
}

/// Wraps `base_client` in retry middleware following `config`.
///
/// Without a `custom_strategy` the middleware's default notion of a transient error applies.
pub fn create_retryable_http_client<S>(
	config: &RetryConfig,
	base_client: reqwest::Client,
	custom_strategy: Option<S>,
) -> ClientWithMiddleware
where
	S: RetryableStrategy + Send + Sync + 'static,
{
	let policy = config.policy();
	if let Some(strategy) = custom_strategy {
		ClientBuilder::new(base_client).with(
			RetryTransientMiddleware::new_with_policy_and_strategy(policy, strategy),
		)
	} else {
		ClientBuilder::new(base_client).with(RetryTransientMiddleware::new_with_policy(policy))
	}
	.build()
}
