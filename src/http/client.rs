//! Resilient HTTP client for the upstream item API: retry with deterministic backoff composed
//! with a circuit breaker, over a shared `reqwest::Client`.

// crates.io
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	config::EngineConfig,
	http::{
		circuit::{CircuitBreaker, CircuitState},
		retry::RetryExecutor,
	},
	metrics::EngineMetrics,
};

/// Resilient upstream client: every call passes through the circuit breaker before a retry loop
/// attempts the request.
#[derive(Debug)]
pub struct ResilientClient {
	http: Client,
	breaker: CircuitBreaker,
}
impl ResilientClient {
	/// Build a client from a shared `reqwest::Client` and the engine's resilience knobs.
	pub fn new(http: Client, config: &EngineConfig, metrics: Arc<EngineMetrics>) -> Self {
		Self {
			http,
			breaker: CircuitBreaker::new(config.breaker_threshold, config.breaker_open_duration, metrics),
		}
	}

	/// Current circuit breaker mode, for status reporting.
	pub fn breaker_state(&self) -> CircuitState {
		self.breaker.state()
	}

	/// Fetch `url` and decode it as JSON. Each attempt passes through the circuit breaker
	/// independently: a breaker-admitted attempt that fails transiently records its own failure
	/// and, if attempts remain, sleeps the deterministic backoff before the next attempt tries
	/// the breaker again. A breaker that opens mid-retry short-circuits the remaining attempts.
	pub async fn fetch_json<T>(&self, config: &EngineConfig, url: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut retry = RetryExecutor::new(config);

		loop {
			if !self.breaker.try_acquire() {
				return Err(Error::CircuitOpen);
			}

			retry.record_attempt();

			match self.attempt(url, retry.attempt_timeout()).await {
				Ok(bytes) => {
					self.breaker.record_success();

					return serde_json::from_slice(&bytes).map_err(Error::from);
				},
				Err(err) if err.is_transient() => {
					self.breaker.record_failure();

					if retry.can_retry() {
						tracing::warn!(url, attempt = retry.attempts_made(), error = %err, "retrying after transient failure");
						retry.sleep_backoff().await;
					} else {
						return Err(err);
					}
				},
				Err(err) => return Err(err),
			}
		}
	}

	async fn attempt(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
		let start = Instant::now();

		let response = match self.http.get(url).timeout(timeout).send().await {
			Ok(response) => response,
			Err(err) if err.is_timeout() =>
				return Err(Error::Timeout { url: url.to_string(), elapsed: start.elapsed() }),
			Err(_) => return Err(Error::Transient { status: None, url: url.to_string() }),
		};
		let status = response.status();

		if status.is_success() {
			response
				.bytes()
				.await
				.map(|bytes| bytes.to_vec())
				.map_err(|err| Error::Permanent { status: Some(status), url: url.to_string(), reason: err.to_string() })
		} else if is_retryable_status(status) {
			Err(Error::Transient { status: Some(status), url: url.to_string() })
		} else {
			Err(Error::Permanent {
				status: Some(status),
				url: url.to_string(),
				reason: format!("unexpected status {status}"),
			})
		}
	}
}

fn is_retryable_status(status: StatusCode) -> bool {
	status.as_u16() == 408 || status.as_u16() == 429 || status.is_server_error()
}
