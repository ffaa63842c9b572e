//! Metrics helpers and engine-wide telemetry bookkeeping.
//!
//! [`EngineMetrics`] is always available — it is a plain atomic counter struct with no external
//! dependency, consulted directly by status/health reporting. The `metrics`-facade functions
//! below it additionally emit the same counters through the `metrics` crate when the `metrics`
//! feature is enabled, and [`install_default_exporter`] wires a Prometheus exporter on top of
//! that when `prometheus` is enabled.

// std
use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "prometheus")] use std::sync::OnceLock;
// crates.io
#[cfg(feature = "metrics")] use metrics::Label;
#[cfg(feature = "prometheus")]
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
#[cfg(feature = "metrics")] use smallvec::SmallVec;
// self
use crate::_prelude::*;

#[cfg(feature = "metrics")] type LabelSet = SmallVec<[Label; 2]>;

/// Fixed `provider` label value; this engine only ever fronts one upstream.
#[cfg(feature = "metrics")] const PROVIDER: &str = "hackernews";

#[cfg(feature = "metrics")] const METRIC_REQUESTS_TOTAL: &str = "top_stories_cache_requests_total";
#[cfg(feature = "metrics")] const METRIC_HITS_TOTAL: &str = "top_stories_cache_hits_total";
#[cfg(feature = "metrics")] const METRIC_STALE_TOTAL: &str = "top_stories_cache_stale_total";
#[cfg(feature = "metrics")] const METRIC_MISSES_TOTAL: &str = "top_stories_cache_misses_total";
#[cfg(feature = "metrics")] const METRIC_REFRESH_TOTAL: &str = "top_stories_cache_refresh_total";
#[cfg(feature = "metrics")]
const METRIC_REFRESH_DURATION: &str = "top_stories_cache_refresh_duration_seconds";
#[cfg(feature = "metrics")]
const METRIC_REFRESH_ERRORS: &str = "top_stories_cache_refresh_errors_total";
#[cfg(feature = "metrics")] const METRIC_BREAKER_OPENS: &str = "top_stories_cache_breaker_opens_total";

/// Shared Prometheus handle installed by [`install_default_exporter`].
#[cfg(feature = "prometheus")]
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Thread-safe metrics accumulator for the engine.
#[derive(Debug, Default)]
pub struct EngineMetrics {
	total_requests: AtomicU64,
	cache_hits: AtomicU64,
	stale_serves: AtomicU64,
	refresh_successes: AtomicU64,
	refresh_errors: AtomicU64,
	breaker_opens: AtomicU64,
	last_refresh_micros: AtomicU64,
}
impl EngineMetrics {
	/// Create a new metrics accumulator.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Record a hit outcome.
	pub fn record_hit(&self, stale: bool) {
		self.total_requests.fetch_add(1, Ordering::Relaxed);
		self.cache_hits.fetch_add(1, Ordering::Relaxed);
		if stale {
			self.stale_serves.fetch_add(1, Ordering::Relaxed);
		}
	}

	/// Record a miss outcome.
	pub fn record_miss(&self) {
		self.total_requests.fetch_add(1, Ordering::Relaxed);
	}

	/// Record a successful refresh and latency.
	pub fn record_refresh_success(&self, duration: Duration) {
		self.refresh_successes.fetch_add(1, Ordering::Relaxed);
		self.last_refresh_micros.store(duration.as_micros() as u64, Ordering::Relaxed);
	}

	/// Record refresh failure.
	pub fn record_refresh_error(&self) {
		self.refresh_errors.fetch_add(1, Ordering::Relaxed);
	}

	/// Record the circuit breaker opening.
	pub fn record_breaker_open(&self) {
		self.breaker_opens.fetch_add(1, Ordering::Relaxed);
	}

	/// Take a point-in-time snapshot for status reporting.
	pub fn snapshot(&self) -> EngineMetricsSnapshot {
		EngineMetricsSnapshot {
			total_requests: self.total_requests.load(Ordering::Relaxed),
			cache_hits: self.cache_hits.load(Ordering::Relaxed),
			stale_serves: self.stale_serves.load(Ordering::Relaxed),
			refresh_successes: self.refresh_successes.load(Ordering::Relaxed),
			refresh_errors: self.refresh_errors.load(Ordering::Relaxed),
			breaker_opens: self.breaker_opens.load(Ordering::Relaxed),
			last_refresh_micros: match self.last_refresh_micros.load(Ordering::Relaxed) {
				0 => None,
				value => Some(value),
			},
		}
	}
}

/// Read-only snapshot of engine telemetry counters.
#[derive(Clone, Debug)]
pub struct EngineMetricsSnapshot {
	/// Total number of `get_top` calls observed.
	pub total_requests: u64,
	/// Count of calls served from the snapshot cache.
	pub cache_hits: u64,
	/// Count of calls served from a stale snapshot (breaker-open fallback).
	pub stale_serves: u64,
	/// Count of successful warmup refreshes.
	pub refresh_successes: u64,
	/// Count of warmup attempts that resulted in errors.
	pub refresh_errors: u64,
	/// Count of circuit breaker open transitions.
	pub breaker_opens: u64,
	/// Microsecond latency of the most recent warmup.
	pub last_refresh_micros: Option<u64>,
}
impl EngineMetricsSnapshot {
	/// Convenience method to compute the cache hit rate.
	pub fn hit_rate(&self) -> f64 {
		if self.total_requests == 0 {
			0.0
		} else {
			self.cache_hits as f64 / self.total_requests as f64
		}
	}

	/// Ratio of stale serves over total requests.
	pub fn stale_ratio(&self) -> f64 {
		if self.total_requests == 0 {
			0.0
		} else {
			self.stale_serves as f64 / self.total_requests as f64
		}
	}
}


/// Install the default Prometheus recorder backed by `metrics`.
///
/// Multiple invocations are safe; subsequent calls become no-ops once the recorder is installed.
#[cfg(feature = "prometheus")]
pub fn install_default_exporter() -> Result<()> {
	if PROMETHEUS_HANDLE.get().is_some() {
		return Ok(());
	}

	let handle = PrometheusBuilder::new()
		.install_recorder()
		.map_err(|err| Error::Metrics(err.to_string()))?;
	let _ = PROMETHEUS_HANDLE.set(handle);

	Ok(())
}

/// Access the global Prometheus exporter handle when installed.
#[cfg(feature = "prometheus")]
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
	PROMETHEUS_HANDLE.get()
}

/// Record a cache hit, tagging whether it was served stale.
#[cfg(feature = "metrics")]
pub fn record_resolve_hit(stale: bool) {
	let labels = base_labels();

	metrics::counter!(METRIC_REQUESTS_TOTAL, labels.iter()).increment(1);
	metrics::counter!(METRIC_HITS_TOTAL, labels.iter()).increment(1);

	if stale {
		metrics::counter!(METRIC_STALE_TOTAL, labels.iter()).increment(1);
	}
}

/// Record a cache miss that required a synchronous warmup.
#[cfg(feature = "metrics")]
pub fn record_resolve_miss() {
	let labels = base_labels();

	metrics::counter!(METRIC_REQUESTS_TOTAL, labels.iter()).increment(1);
	metrics::counter!(METRIC_MISSES_TOTAL, labels.iter()).increment(1);
}

/// Record a successful warmup along with its latency.
#[cfg(feature = "metrics")]
pub fn record_refresh_success(duration: Duration) {
	metrics::counter!(METRIC_REFRESH_TOTAL, status_labels("success").iter()).increment(1);
	metrics::histogram!(METRIC_REFRESH_DURATION, base_labels().iter()).record(duration.as_secs_f64());
}

/// Record a failed warmup attempt.
#[cfg(feature = "metrics")]
pub fn record_refresh_error() {
	metrics::counter!(METRIC_REFRESH_TOTAL, status_labels("error").iter()).increment(1);
	metrics::counter!(METRIC_REFRESH_ERRORS, base_labels().iter()).increment(1);
}

/// Record the circuit breaker opening.
#[cfg(feature = "metrics")]
pub fn record_breaker_open() {
	metrics::counter!(METRIC_BREAKER_OPENS, base_labels().iter()).increment(1);
}

#[cfg(feature = "metrics")]
fn base_labels() -> LabelSet {
	let mut labels = LabelSet::with_capacity(1);

	labels.push(Label::new("provider", PROVIDER));

	labels
}

#[cfg(feature = "metrics")]
fn status_labels(status: &'static str) -> LabelSet {
	let mut labels = base_labels();

	labels.push(Label::new("status", status));

	labels
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
	// std
	use std::borrow::Borrow;
	// crates.io
	use metrics_util::{
		CompositeKey, MetricKind,
		debugging::{DebugValue, DebuggingRecorder},
	};
	// self
	use super::*;

	fn capture_metrics<F>(f: F) -> Vec<(CompositeKey, DebugValue)>
	where
		F: FnOnce(),
	{
		let recorder = DebuggingRecorder::new();
		let snapshotter = recorder.snapshotter();

		metrics::with_local_recorder(&recorder, f);

		snapshotter
			.snapshot()
			.into_vec()
			.into_iter()
			.map(|(key, _, _, value)| (key, value))
			.collect()
	}

	fn counter_value(
		snapshot: &[(CompositeKey, DebugValue)],
		name: &str,
		labels: &[(&str, &str)],
	) -> u64 {
		snapshot
			.iter()
			.find_map(|(key, value)| {
				(key.kind() == MetricKind::Counter
					&& Borrow::<str>::borrow(key.key().name()) == name
					&& labels_match(key, labels))
				.then(|| match value {
					DebugValue::Counter(value) => *value,
					_ => 0,
				})
			})
			.unwrap_or(0)
	}

	fn last_histogram_value(
		snapshot: &[(CompositeKey, DebugValue)],
		name: &str,
		labels: &[(&str, &str)],
	) -> Option<f64> {
		snapshot.iter().find_map(|(key, value)| {
			if key.kind() == MetricKind::Histogram
				&& Borrow::<str>::borrow(key.key().name()) == name
				&& labels_match(key, labels)
			{
				if let DebugValue::Histogram(values) = value {
					values.last().map(|v| v.into_inner())
				} else {
					None
				}
			} else {
				None
			}
		})
	}

	fn labels_match(key: &CompositeKey, expected: &[(&str, &str)]) -> bool {
		let mut labels: Vec<_> =
			key.key().labels().map(|label| (label.key(), label.value())).collect();

		labels.sort_unstable();

		let mut expected_sorted: Vec<_> = expected.to_vec();

		expected_sorted.sort_unstable();

		labels.len() == expected_sorted.len()
			&& labels
				.into_iter()
				.zip(expected_sorted.into_iter())
				.all(|((lk, lv), (ek, ev))| lk == ek && lv == ev)
	}

	#[test]
	fn records_hits_misses_and_stale_counts() {
		let snapshot = capture_metrics(|| {
			record_resolve_hit(false);
			record_resolve_hit(true);
			record_resolve_miss();
		});
		let base = [("provider", "hackernews")];

		assert_eq!(counter_value(&snapshot, "top_stories_cache_requests_total", &base), 3);
		assert_eq!(counter_value(&snapshot, "top_stories_cache_hits_total", &base), 2);
		assert_eq!(counter_value(&snapshot, "top_stories_cache_misses_total", &base), 1);
		assert_eq!(counter_value(&snapshot, "top_stories_cache_stale_total", &base), 1);
	}

	#[test]
	#[cfg_attr(miri, ignore)]
	fn records_refresh_success_and_errors() {
		let snapshot = capture_metrics(|| {
			record_refresh_success(std::time::Duration::from_millis(20));
			record_refresh_error();
		});
		let base = [("provider", "hackernews")];
		let success = [("provider", "hackernews"), ("status", "success")];
		let error = [("provider", "hackernews"), ("status", "error")];

		assert_eq!(counter_value(&snapshot, "top_stories_cache_refresh_total", &success), 1);
		assert_eq!(counter_value(&snapshot, "top_stories_cache_refresh_total", &error), 1);
		assert_eq!(counter_value(&snapshot, "top_stories_cache_refresh_errors_total", &base), 1);

		let duration =
			last_histogram_value(&snapshot, "top_stories_cache_refresh_duration_seconds", &base)
				.expect("refresh duration recorded");

		assert!((duration - 0.020).abs() < 1e-6, "expected ~20ms histogram, got {duration}");
	}

	#[test]
	fn records_breaker_opens() {
		let snapshot = capture_metrics(record_breaker_open);
		let base = [("provider", "hackernews")];

		assert_eq!(counter_value(&snapshot, "top_stories_cache_breaker_opens_total", &base), 1);
	}
}
