//! Warmup orchestrator: on-demand and periodic refresh of the published snapshot.

// crates.io
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	builder,
	cache::{snapshot_store::SnapshotStore, store::CacheStore},
	config::EngineConfig,
	fanout::FanoutFetcher,
	idlist::IdListFetcher,
	metrics::EngineMetrics,
	model::CachedSnapshot,
	http::client::ResilientClient,
};

/// Drives the fetch-build-publish sequence, on demand and on a fixed cadence.
///
/// A single-flight mutex bounds concurrent warmups to one in-flight fetch-and-build at a time;
/// it narrows, but does not eliminate, the duplicate-warmup burst a stampede of concurrent
/// cold-miss readers can trigger (see the concurrency model's stampede note).
pub struct WarmupOrchestrator<S> {
	client: Arc<ResilientClient>,
	config: EngineConfig,
	id_list: IdListFetcher<S>,
	fanout: FanoutFetcher<S>,
	snapshot_store: SnapshotStore<S>,
	single_flight: tokio::sync::Mutex<()>,
	metrics: Arc<EngineMetrics>,
}
impl<S> WarmupOrchestrator<S>
where
	S: CacheStore + Clone + 'static,
{
	/// Assemble an orchestrator from its already-constructed collaborators.
	pub fn new(
		client: Arc<ResilientClient>,
		config: EngineConfig,
		id_list: IdListFetcher<S>,
		fanout: FanoutFetcher<S>,
		snapshot_store: SnapshotStore<S>,
		metrics: Arc<EngineMetrics>,
	) -> Self {
		Self { client, config, id_list, fanout, snapshot_store, single_flight: tokio::sync::Mutex::new(()), metrics }
	}

	/// Run one fetch-build-publish cycle. Idempotent and safe to invoke concurrently.
	#[tracing::instrument(skip_all)]
	pub async fn warmup(&self, cancel: &CancellationToken) -> Result<()> {
		let _single_flight = self.single_flight.lock().await;
		let start = Instant::now();

		let ids = match self.id_list.best_story_ids(&self.client, &self.config).await {
			Ok(ids) => ids,
			Err(err) => {
				self.metrics.record_refresh_error();

				return Err(err);
			},
		};

		if ids.is_empty() {
			tracing::warn!("upstream id list empty; leaving existing snapshot untouched");

			return Ok(());
		}

		let ids: Vec<u64> = ids.into_iter().take(self.config.max_stories).collect();
		// Generous enough for a full retry budget on every item without overrunning the refresh
		// interval under default settings.
		let fanout_deadline = self.config.per_attempt_timeout * (self.config.retries + 1);
		let items =
			self.fanout.fetch_many(&self.client, &self.config, &ids, fanout_deadline, cancel).await;
		let stories = builder::build(items);
		let snapshot = CachedSnapshot::new(stories, Utc::now());

		if let Err(err) = self.snapshot_store.set(&snapshot).await {
			self.metrics.record_refresh_error();

			return Err(err);
		}

		self.metrics.record_refresh_success(start.elapsed());
		tracing::info!(
			total_stories = snapshot.total_stories,
			elapsed = ?start.elapsed(),
			"warmup complete"
		);

		Ok(())
	}

	/// Spawn the periodic driver: sleep [`EngineConfig::startup_delay`], run a warmup, then loop
	/// sleeping [`EngineConfig::refresh_interval`] between runs (or
	/// [`EngineConfig::error_backoff`] after a failure). Terminates promptly when `cancel` fires.
	pub fn spawn_periodic(self: Arc<Self>, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
		tokio::spawn(async move {
			tokio::select! {
				() = cancel.cancelled() => return,
				() = tokio::time::sleep(self.config.startup_delay) => {},
			}

			loop {
				match self.warmup(&cancel).await {
					Ok(()) => {
						tokio::select! {
							() = cancel.cancelled() => return,
							() = tokio::time::sleep(self.config.refresh_interval) => {},
						}
					},
					Err(err) => {
						tracing::warn!(error = %err, "periodic warmup failed, backing off");

						tokio::select! {
							() = cancel.cancelled() => return,
							() = tokio::time::sleep(self.config.error_backoff) => {},
						}
					},
				}
			}
		})
	}
}
