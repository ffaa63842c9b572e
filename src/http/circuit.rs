//! Circuit breaker guarding the upstream client against a collapsed upstream.
//!
//! Counts consecutive transient failures across every caller of the resilient client; once the
//! threshold is reached the breaker opens and calls fail fast without reaching the upstream.

// std
use std::sync::Mutex;
// self
use crate::{_prelude::*, metrics::EngineMetrics};

/// Public snapshot of the breaker's current mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitState {
	/// All calls are admitted.
	Closed,
	/// All calls are rejected without contacting the upstream.
	Open,
	/// Exactly one probe call is admitted to test recovery.
	HalfOpen,
}

#[derive(Debug)]
enum Mode {
	Closed { consecutive_failures: u32 },
	Open { until: Instant },
	HalfOpen,
}

/// Circuit breaker state machine. Safe to share across tasks; never holds its lock across an
/// `.await` point, so it can be taken by reference rather than wrapped in an async mutex.
#[derive(Debug)]
pub struct CircuitBreaker {
	mode: Mutex<Mode>,
	threshold: u32,
	open_duration: Duration,
	metrics: Arc<EngineMetrics>,
}
impl CircuitBreaker {
	/// Construct a breaker that opens after `threshold` consecutive transient failures and stays
	/// open for `open_duration` before admitting a half-open probe.
	pub fn new(threshold: u32, open_duration: Duration, metrics: Arc<EngineMetrics>) -> Self {
		Self {
			mode: Mutex::new(Mode::Closed { consecutive_failures: 0 }),
			threshold,
			open_duration,
			metrics,
		}
	}

	/// Decide whether a call is admitted right now, performing the `open` → `half_open`
	/// transition if the open deadline has passed.
	pub fn try_acquire(&self) -> bool {
		let mut mode = self.mode.lock().expect("circuit breaker mutex poisoned");

		match &*mode {
			Mode::Closed { .. } => true,
			Mode::Open { until } =>
				if Instant::now() >= *until {
					tracing::info!("circuit breaker admitting half-open probe");
					*mode = Mode::HalfOpen;
					true
				} else {
					false
				},
			Mode::HalfOpen => false,
		}
	}

	/// Record a successful, breaker-admitted call.
	pub fn record_success(&self) {
		let mut mode = self.mode.lock().expect("circuit breaker mutex poisoned");

		match &*mode {
			Mode::HalfOpen => {
				tracing::info!("circuit breaker closing after successful probe");
			},
			Mode::Closed { consecutive_failures } if *consecutive_failures > 0 => {
				tracing::debug!("circuit breaker failure streak reset");
			},
			_ => {},
		}

		*mode = Mode::Closed { consecutive_failures: 0 };
	}

	/// Record a transient failure from a breaker-admitted call.
	pub fn record_failure(&self) {
		let mut mode = self.mode.lock().expect("circuit breaker mutex poisoned");

		match &*mode {
			Mode::HalfOpen => {
				tracing::warn!("circuit breaker re-opening after failed probe");
				*mode = Mode::Open { until: Instant::now() + self.open_duration };
				self.record_breaker_open();
			},
			Mode::Closed { consecutive_failures } => {
				let failures = consecutive_failures + 1;

				if failures >= self.threshold {
					tracing::warn!(failures, threshold = self.threshold, "circuit breaker opening");
					*mode = Mode::Open { until: Instant::now() + self.open_duration };
					self.record_breaker_open();
				} else {
					*mode = Mode::Closed { consecutive_failures: failures };
				}
			},
			Mode::Open { .. } => {},
		}
	}

	fn record_breaker_open(&self) {
		self.metrics.record_breaker_open();
		#[cfg(feature = "metrics")]
		crate::metrics::record_breaker_open();
	}

	/// Current mode, for status reporting.
	pub fn state(&self) -> CircuitState {
		match &*self.mode.lock().expect("circuit breaker mutex poisoned") {
			Mode::Closed { .. } => CircuitState::Closed,
			Mode::Open { .. } => CircuitState::Open,
			Mode::HalfOpen => CircuitState::HalfOpen,
		}
	}
}
