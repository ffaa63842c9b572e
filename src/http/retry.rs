//! Retry utilities for upstream HTTP requests.
//!
//! Backoff is deterministic exponential (`2^attempt` seconds) with no jitter: the external
//! contract specifies exact delays (2s, 4s, 8s), so this intentionally drops the jitter
//! strategies a multi-tenant client would need to avoid synchronized retry storms across many
//! independent callers.

// crates.io
use tokio::time;
// self
use crate::{_prelude::*, config::EngineConfig};

/// Tracks how many attempts a single logical call has made and whether another is permitted.
///
/// Each attempt passes through the circuit breaker independently (see [`super::client`]); this
/// executor only tracks the attempt count and the deterministic backoff, not the breaker state.
#[derive(Debug)]
pub struct RetryExecutor<'a> {
	config: &'a EngineConfig,
	attempts_made: u32,
}
impl<'a> RetryExecutor<'a> {
	/// Create a new executor respecting the supplied engine configuration.
	pub fn new(config: &'a EngineConfig) -> Self {
		Self { config, attempts_made: 0 }
	}

	/// Timeout applied to every attempt, flat regardless of how many attempts have been made.
	pub fn attempt_timeout(&self) -> Duration {
		self.config.per_attempt_timeout
	}

	/// Record that an attempt was just made.
	pub fn record_attempt(&mut self) {
		self.attempts_made = self.attempts_made.saturating_add(1);
	}

	/// Number of attempts made so far.
	pub fn attempts_made(&self) -> u32 {
		self.attempts_made
	}

	/// Whether another attempt is permitted after the most recent failure: up to
	/// `config.retries` retries, i.e. `config.retries + 1` attempts total.
	pub fn can_retry(&self) -> bool {
		self.attempts_made <= self.config.retries
	}

	/// Sleep for the deterministic backoff of the upcoming retry: `2^attempts_made` seconds.
	pub async fn sleep_backoff(&self) {
		let delay = Duration::from_secs(1u64 << self.attempts_made);

		tracing::debug!(attempt = self.attempts_made, ?delay, "retry backoff computed");

		time::sleep(delay).await;
	}
}
