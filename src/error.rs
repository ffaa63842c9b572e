//! Crate-wide error types and `Result` alias.

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the top-stories cache engine.
///
/// Variants map onto the error taxonomy used to drive retry, circuit-breaking, and
/// stale-fallback decisions: callers that need to branch on failure class should use
/// [`Error::is_transient`] / [`Error::is_circuit_open`] rather than matching variants
/// directly, so classification stays centralized.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),

	#[cfg(feature = "redis")]
	#[error(transparent)]
	Redis(#[from] redis::RedisError),

	/// Per-attempt deadline exceeded.
	#[error("Upstream request to {url} timed out after {elapsed:?}.")]
	Timeout { url: String, elapsed: std::time::Duration },
	/// Retry-eligible failure: 5xx / 408 / 429 / transport error.
	#[error("Transient upstream failure ({status:?}) from {url}.")]
	Transient { status: Option<reqwest::StatusCode>, url: String },
	/// Non-retryable failure: 4xx other than 408/429, or a malformed payload.
	#[error("Permanent upstream failure ({status:?}) from {url}: {reason}")]
	Permanent { status: Option<reqwest::StatusCode>, url: String, reason: String },
	/// The circuit breaker refused the call without contacting the upstream.
	#[error("Circuit breaker is open; refusing call without contacting the upstream.")]
	CircuitOpen,
	/// The caller cancelled the operation.
	#[error("Operation cancelled.")]
	Cancelled,
	/// Rebuild failed and no usable (fresh or stale) snapshot exists.
	#[error("Service unavailable: no cached data and upstream rebuild failed.")]
	ServiceUnavailable,

	#[error("Cache error: {0}")]
	Cache(String),
	#[error("Metrics error: {0}")]
	Metrics(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
impl Error {
	/// Whether this error should count toward the circuit breaker and be eligible for retry.
	pub fn is_transient(&self) -> bool {
		matches!(self, Error::Timeout { .. } | Error::Transient { .. } | Error::Reqwest(_))
	}

	/// Whether this error originated from an open circuit breaker.
	pub fn is_circuit_open(&self) -> bool {
		matches!(self, Error::CircuitOpen)
	}
}
#[cfg(feature = "metrics")]
impl<T> From<metrics::SetRecorderError<T>> for Error
where
	T: std::fmt::Display,
{
	fn from(value: metrics::SetRecorderError<T>) -> Self {
		Self::Metrics(value.to_string())
	}
}
