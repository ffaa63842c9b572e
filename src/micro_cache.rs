//! Per-item micro-cache: a short-TTL memoization layer in front of individual
//! `item/<id>.json` fetches.

// self
use crate::{
	_prelude::*, cache::store::CacheStore, config::EngineConfig, http::client::ResilientClient,
	metrics::EngineMetrics, model::Item,
};

/// Wraps a [`CacheStore`] to memoize individual item lookups.
#[derive(Clone, Debug)]
pub struct MicroCache<S> {
	store: S,
	ttl: Duration,
}
impl<S> MicroCache<S>
where
	S: CacheStore,
{
	/// Construct a micro-cache over `store` with the configured item TTL.
	pub fn new(store: S, ttl: Duration) -> Self {
		Self { store, ttl }
	}

	/// Fetch item `id`, consulting the cache first.
	///
	/// Every error — including a circuit-open upstream — is swallowed and reported as `None`.
	/// A single missing item must never poison the top-N build; the builder tolerates holes.
	/// Two concurrent misses for the same id may both reach the upstream; the last writer wins.
	pub async fn get_or_fetch(
		&self,
		client: &ResilientClient,
		config: &EngineConfig,
		id: u64,
	) -> Option<Item> {
		let key = format!("item_{id}");

		match self.store.get_raw(&key).await {
			Ok(Some(json)) => match serde_json::from_str(&json) {
				Ok(item) => return Some(item),
				Err(err) => tracing::warn!(id, error = %err, "micro-cache entry corrupt, re-fetching"),
			},
			Ok(None) => {},
			Err(err) => tracing::warn!(id, error = %err, "micro-cache read failed"),
		}

		let url = format!("{}/v0/item/{id}.json", config.upstream_base_url);

		match client.fetch_json::<Item>(config, &url).await {
			Ok(item) => {
				match serde_json::to_string(&item) {
					Ok(json) =>
						if let Err(err) = self.store.set_raw(&key, json, self.ttl).await {
							tracing::warn!(id, error = %err, "micro-cache write failed");
						},
					Err(err) => tracing::warn!(id, error = %err, "item serialization failed"),
				}

				Some(item)
			},
			Err(err) => {
				tracing::warn!(id, error = %err, "item fetch failed");

				None
			},
		}
	}
}
