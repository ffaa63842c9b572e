//! Fan-out fetcher: bounded-concurrency batch retrieval of item records.

// crates.io
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*, cache::store::CacheStore, config::EngineConfig, http::client::ResilientClient,
	metrics::EngineMetrics, micro_cache::MicroCache, model::Item,
};

/// Retrieves many items concurrently under a fixed global permit budget.
///
/// The semaphore is owned by the fetcher instance and shared across every call, so the
/// concurrency ceiling holds globally rather than per invocation.
#[derive(Clone, Debug)]
pub struct FanoutFetcher<S> {
	micro_cache: Arc<MicroCache<S>>,
	semaphore: Arc<Semaphore>,
}
impl<S> FanoutFetcher<S>
where
	S: CacheStore + 'static,
{
	/// Construct a fetcher with `concurrency` permits.
	pub fn new(micro_cache: MicroCache<S>, concurrency: usize) -> Self {
		Self { micro_cache: Arc::new(micro_cache), semaphore: Arc::new(Semaphore::new(concurrency)) }
	}

	/// Retrieve `ids`, returning every item successfully fetched before `deadline` elapses or
	/// `cancel` fires. Per-item failures are already swallowed by the micro-cache; this never
	/// fails outright, even if every item is missing.
	pub async fn fetch_many(
		&self,
		client: &ResilientClient,
		config: &EngineConfig,
		ids: &[u64],
		deadline: Duration,
		cancel: &CancellationToken,
	) -> Vec<Item> {
		let mut in_flight: FuturesUnordered<_> = ids
			.iter()
			.map(|&id| {
				let semaphore = Arc::clone(&self.semaphore);
				let micro_cache = Arc::clone(&self.micro_cache);

				async move {
					let _permit = semaphore.acquire_owned().await.ok()?;

					micro_cache.get_or_fetch(client, config, id).await
				}
			})
			.collect();

		let mut items = Vec::with_capacity(ids.len());
		let sleep = tokio::time::sleep(deadline);

		tokio::pin!(sleep);

		loop {
			tokio::select! {
				biased;

				() = cancel.cancelled() => {
					tracing::warn!(remaining = in_flight.len(), "fan-out cancelled");

					break;
				},
				() = &mut sleep => {
					tracing::warn!(remaining = in_flight.len(), "fan-out deadline reached");

					break;
				},
				next = in_flight.next() => match next {
					Some(Some(item)) => items.push(item),
					Some(None) => {},
					None => break,
				},
			}
		}

		items
	}
}
