//! Public engine facade: `get_top(n)`, the cache-hit/cold-miss/stale-fallback reader algorithm,
//! and lifecycle management for the periodic warmup driver.

// std
use std::sync::Mutex as StdMutex;
// crates.io
use reqwest::Client;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	cache::{
		snapshot_store::SnapshotStore,
		store::{CacheStore, CacheStoreHandle, InMemoryStore},
	},
	config::EngineConfig,
	fanout::FanoutFetcher,
	http::{circuit::CircuitState, client::ResilientClient},
	idlist::IdListFetcher,
	metrics::{EngineMetrics, EngineMetricsSnapshot},
	micro_cache::MicroCache,
	model::StoryDto,
	warmup::WarmupOrchestrator,
};

/// Read-through top-N cache engine fronting the upstream item API.
///
/// Construct with [`Engine::builder`], call [`Engine::start`] once to launch the periodic
/// warmup driver, serve reads with [`Engine::get_top`], and call [`Engine::shutdown`] to stop
/// the driver cooperatively.
pub struct Engine<S = CacheStoreHandle>
where
	S: CacheStore + Clone + 'static,
{
	config: EngineConfig,
	client: Arc<ResilientClient>,
	snapshot_store: SnapshotStore<S>,
	warmup: Arc<WarmupOrchestrator<S>>,
	cancel: CancellationToken,
	driver: StdMutex<Option<tokio::task::JoinHandle<()>>>,
	metrics: Arc<EngineMetrics>,
}
impl Engine<CacheStoreHandle> {
	/// Start building an engine with the default in-memory cache store.
	pub fn builder() -> EngineBuilder {
		EngineBuilder::default()
	}
}
impl<S> Engine<S>
where
	S: CacheStore + Clone + 'static,
{
	/// Current circuit breaker mode, for status/health reporting.
	pub fn breaker_state(&self) -> CircuitState {
		self.client.breaker_state()
	}

	/// Point-in-time telemetry snapshot.
	pub fn metrics(&self) -> EngineMetricsSnapshot {
		self.metrics.snapshot()
	}

	/// Launch the periodic warmup driver. A no-op if already started.
	pub fn start(&self) {
		let mut guard = self.driver.lock().expect("driver mutex poisoned");

		if guard.is_none() {
			*guard = Some(Arc::clone(&self.warmup).spawn_periodic(self.cancel.clone()));
		}
	}

	/// Cancel the periodic driver and await its cooperative exit.
	pub async fn shutdown(&self) {
		self.cancel.cancel();

		let handle = self.driver.lock().expect("driver mutex poisoned").take();

		if let Some(handle) = handle {
			let _ = handle.await;
		}
	}

	/// Serve up to `n` top stories, freshest available.
	///
	/// `n ≤ 0` returns an empty list without touching the cache; `n` is otherwise clamped to
	/// [`EngineConfig::max_stories`]. `cancel` governs only this call: a cold miss that needs a
	/// synchronous warmup races it against `cancel`, surfacing [`Error::Cancelled`] if the caller
	/// abandons the request before it resolves. It is independent of the engine-wide token
	/// [`Engine::shutdown`] uses to stop the periodic driver.
	#[tracing::instrument(skip(self, cancel))]
	pub async fn get_top(&self, n: i64, cancel: &CancellationToken) -> Result<Vec<StoryDto>> {
		if cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}

		if n <= 0 {
			return Ok(Vec::new());
		}

		let n = (n as usize).min(self.config.max_stories);
		let now = Utc::now();

		if let Some(snapshot) = self.snapshot_store.get().await? {
			let age = snapshot.age(now);

			if age <= to_chrono(self.config.cache_duration) {
				self.record_hit(false);

				return Ok(snapshot.top(n));
			}
		}

		self.record_miss();
		tracing::debug!("cache miss; invoking synchronous warmup");

		let warmup_result = tokio::select! {
			biased;

			() = cancel.cancelled() => return Err(Error::Cancelled),
			result = self.warmup.warmup(cancel) => result,
		};

		if warmup_result.is_ok()
			&& let Some(snapshot) = self.snapshot_store.get().await?
		{
			return Ok(snapshot.top(n));
		}

		match warmup_result {
			Ok(()) => Err(Error::ServiceUnavailable),
			Err(err) if err.is_circuit_open() =>
				if let Some(snapshot) = self.snapshot_store.get().await? {
					tracing::warn!("serving stale snapshot: circuit breaker is open");
					self.record_hit(true);

					Ok(snapshot.top(n))
				} else {
					Err(Error::ServiceUnavailable)
				},
			Err(err) => Err(err),
		}
	}

	fn record_hit(&self, stale: bool) {
		self.metrics.record_hit(stale);
		#[cfg(feature = "metrics")]
		crate::metrics::record_resolve_hit(stale);
	}

	fn record_miss(&self) {
		self.metrics.record_miss();
		#[cfg(feature = "metrics")]
		crate::metrics::record_resolve_miss();
	}
}

fn to_chrono(duration: Duration) -> TimeDelta {
	TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
	config: EngineConfig,
	http_client: Option<Client>,
}
impl Default for EngineBuilder {
	fn default() -> Self {
		Self { config: EngineConfig::default(), http_client: None }
	}
}
impl EngineBuilder {
	/// Override the full engine configuration.
	pub fn config(mut self, config: EngineConfig) -> Self {
		self.config = config;

		self
	}

	/// Supply a pre-built `reqwest::Client` (e.g. with a custom `User-Agent`).
	pub fn http_client(mut self, client: Client) -> Self {
		self.http_client = Some(client);

		self
	}

	/// Build the engine over the default in-memory cache store.
	pub fn build(self) -> Result<Engine<CacheStoreHandle>> {
		self.config.validate()?;

		let store = CacheStoreHandle::InMemory(InMemoryStore::new());

		build_engine(self.config, self.http_client, store)
	}

	/// Build the engine over a Redis-backed cache store.
	#[cfg(feature = "redis")]
	pub fn build_with_redis(
		self,
		redis: crate::cache::store::RedisStore,
	) -> Result<Engine<CacheStoreHandle>> {
		self.config.validate()?;

		build_engine(self.config, self.http_client, CacheStoreHandle::Redis(redis))
	}
}

fn build_engine<S>(config: EngineConfig, http_client: Option<Client>, store: S) -> Result<Engine<S>>
where
	S: CacheStore + Clone + 'static,
{
	let http_client = http_client.unwrap_or_else(|| {
		Client::builder()
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()
			.unwrap_or_default()
	});
	let metrics = EngineMetrics::new();
	let client = Arc::new(ResilientClient::new(http_client, &config, Arc::clone(&metrics)));
	let id_list = IdListFetcher::new(store.clone(), config.id_list_cache_ttl);
	let micro_cache = MicroCache::new(store.clone(), config.item_cache_ttl);
	let fanout = FanoutFetcher::new(micro_cache, config.fanout_concurrency);
	let snapshot_store = SnapshotStore::new(store, config.snapshot_store_ttl());
	let warmup = Arc::new(WarmupOrchestrator::new(
		Arc::clone(&client),
		config.clone(),
		id_list,
		fanout,
		snapshot_store.clone(),
		Arc::clone(&metrics),
	));

	Ok(Engine {
		config,
		client,
		snapshot_store,
		warmup,
		cancel: CancellationToken::new(),
		driver: StdMutex::new(None),
		metrics,
	})
}
