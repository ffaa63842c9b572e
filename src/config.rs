//! Engine configuration: the operational knobs from the external-interfaces contract, with
//! validated defaults and a fluent builder in the same style the teacher crate uses for its
//! registry configuration.

// self
use crate::_prelude::*;

/// Upstream "best stories" endpoint, relative to [`EngineConfig::upstream_base_url`].
pub const BEST_STORIES_PATH: &str = "/v0/beststories.json";
/// Default production upstream base URL.
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://hacker-news.firebaseio.com";
/// Hard ceiling on the number of stories a caller may request or the builder may retain.
pub const MAX_STORIES_CEILING: usize = 200;
/// Hard ceiling on `retries`: `RetryExecutor::sleep_backoff` computes `1u64 << attempts_made`,
/// which overflows at a shift of 64, so `attempts_made` (bounded by `retries`) must stay well
/// under that.
pub const MAX_RETRIES: u32 = 62;

/// Validated, defaulted configuration for the top-stories cache engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
	/// Base URL of the upstream item API (overridable so tests can target a mock server).
	pub upstream_base_url: String,
	/// How often the periodic warmup driver refreshes the snapshot.
	pub refresh_interval: Duration,
	/// Age beyond which a reader considers a snapshot stale on the normal path.
	///
	/// Intentionally distinct from the cache store's own TTL (`refresh_interval + 1 minute`);
	/// see the "double-TTL" design note this engine preserves on purpose.
	pub cache_duration: Duration,
	/// Maximum number of stories ever served or retained in a snapshot.
	pub max_stories: usize,
	/// Maximum number of item fetches in flight simultaneously, globally.
	pub fanout_concurrency: usize,
	/// Per-attempt upstream timeout.
	pub per_attempt_timeout: Duration,
	/// Number of retries after the initial attempt (so `retries + 1` attempts total).
	pub retries: u32,
	/// Consecutive transient failures before the circuit breaker opens.
	pub breaker_threshold: u32,
	/// How long the breaker stays open before admitting a half-open probe.
	pub breaker_open_duration: Duration,
	/// Delay after process start before the first periodic warmup runs.
	pub startup_delay: Duration,
	/// Delay before retrying the periodic driver after a warmup failure.
	pub error_backoff: Duration,
	/// TTL applied to the per-item micro-cache (`item_<id>` keys).
	pub item_cache_ttl: Duration,
	/// TTL applied to the cached id list (`beststories_ids` key).
	pub id_list_cache_ttl: Duration,
}
impl EngineConfig {
	/// Construct a builder seeded with documented defaults.
	pub fn builder() -> EngineConfigBuilder {
		EngineConfigBuilder::new()
	}

	/// TTL applied to the pre-processed snapshot in the cache store.
	///
	/// One minute longer than `refresh_interval` so a snapshot considered stale on the
	/// normal reader path still exists for stale-fallback.
	pub fn snapshot_store_ttl(&self) -> Duration {
		self.refresh_interval + Duration::from_secs(60)
	}

	/// Validate internal consistency of the configuration.
	pub fn validate(&self) -> Result<()> {
		if self.max_stories == 0 || self.max_stories > MAX_STORIES_CEILING {
			return Err(Error::Validation {
				field: "max_stories",
				reason: format!("Must be between 1 and {MAX_STORIES_CEILING}."),
			});
		}
		if self.fanout_concurrency == 0 {
			return Err(Error::Validation {
				field: "fanout_concurrency",
				reason: "Must be at least 1.".into(),
			});
		}
		if self.per_attempt_timeout.is_zero() {
			return Err(Error::Validation {
				field: "per_attempt_timeout",
				reason: "Must be greater than zero.".into(),
			});
		}
		if self.retries > MAX_RETRIES {
			return Err(Error::Validation {
				field: "retries",
				reason: format!("Must be at most {MAX_RETRIES}."),
			});
		}
		if self.breaker_threshold == 0 {
			return Err(Error::Validation {
				field: "breaker_threshold",
				reason: "Must be at least 1.".into(),
			});
		}
		if self.breaker_open_duration.is_zero() {
			return Err(Error::Validation {
				field: "breaker_open_duration",
				reason: "Must be greater than zero.".into(),
			});
		}
		if self.refresh_interval.is_zero() {
			return Err(Error::Validation {
				field: "refresh_interval",
				reason: "Must be greater than zero.".into(),
			});
		}
		if url::Url::parse(&self.upstream_base_url).is_err() {
			return Err(Error::Validation {
				field: "upstream_base_url",
				reason: "Must be a valid URL.".into(),
			});
		}

		Ok(())
	}
}
impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
			refresh_interval: Duration::from_secs(120),
			cache_duration: Duration::from_secs(120),
			max_stories: MAX_STORIES_CEILING,
			fanout_concurrency: 10,
			per_attempt_timeout: Duration::from_secs(8),
			retries: 3,
			breaker_threshold: 5,
			breaker_open_duration: Duration::from_secs(30),
			startup_delay: Duration::from_secs(10),
			error_backoff: Duration::from_secs(30),
			item_cache_ttl: Duration::from_secs(5 * 60),
			id_list_cache_ttl: Duration::from_secs(30),
		}
	}
}

/// Fluent builder for [`EngineConfig`].
#[derive(Clone, Debug, Default)]
pub struct EngineConfigBuilder {
	config: EngineConfig,
}
impl EngineConfigBuilder {
	/// Start from the documented defaults.
	pub fn new() -> Self {
		Self { config: EngineConfig::default() }
	}

	/// Override the upstream base URL (production default points at the real HN Firebase API).
	pub fn upstream_base_url(mut self, url: impl Into<String>) -> Self {
		self.config.upstream_base_url = url.into();

		self
	}

	/// Override the periodic refresh interval.
	pub fn refresh_interval(mut self, value: Duration) -> Self {
		self.config.refresh_interval = value;

		self
	}

	/// Override the reader's freshness window.
	pub fn cache_duration(mut self, value: Duration) -> Self {
		self.config.cache_duration = value;

		self
	}

	/// Override the maximum number of stories served or retained.
	pub fn max_stories(mut self, value: usize) -> Self {
		self.config.max_stories = value;

		self
	}

	/// Override the fan-out concurrency ceiling.
	pub fn fanout_concurrency(mut self, value: usize) -> Self {
		self.config.fanout_concurrency = value;

		self
	}

	/// Override the per-attempt upstream timeout.
	pub fn per_attempt_timeout(mut self, value: Duration) -> Self {
		self.config.per_attempt_timeout = value;

		self
	}

	/// Override the retry count.
	pub fn retries(mut self, value: u32) -> Self {
		self.config.retries = value;

		self
	}

	/// Override the circuit breaker's failure threshold.
	pub fn breaker_threshold(mut self, value: u32) -> Self {
		self.config.breaker_threshold = value;

		self
	}

	/// Override how long the breaker stays open.
	pub fn breaker_open_duration(mut self, value: Duration) -> Self {
		self.config.breaker_open_duration = value;

		self
	}

	/// Override the startup delay before the first periodic warmup.
	pub fn startup_delay(mut self, value: Duration) -> Self {
		self.config.startup_delay = value;

		self
	}

	/// Override the periodic driver's post-failure backoff.
	pub fn error_backoff(mut self, value: Duration) -> Self {
		self.config.error_backoff = value;

		self
	}

	/// Override the per-item micro-cache TTL.
	pub fn item_cache_ttl(mut self, value: Duration) -> Self {
		self.config.item_cache_ttl = value;

		self
	}

	/// Override the cached id list's TTL.
	pub fn id_list_cache_ttl(mut self, value: Duration) -> Self {
		self.config.id_list_cache_ttl = value;

		self
	}

	/// Finalise and validate the configuration.
	pub fn build(self) -> Result<EngineConfig> {
		self.config.validate()?;

		Ok(self.config)
	}
}
