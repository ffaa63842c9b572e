//! ID list fetcher: the upstream "best stories" endpoint, cached under a fixed key with a short
//! TTL.

// self
use crate::{
	_prelude::*, cache::store::CacheStore, config::EngineConfig, http::client::ResilientClient,
	metrics::EngineMetrics,
};

const ID_LIST_KEY: &str = "beststories_ids";

/// Fetches and caches the ordered list of "best story" ids.
#[derive(Clone, Debug)]
pub struct IdListFetcher<S> {
	store: S,
	ttl: Duration,
}
impl<S> IdListFetcher<S>
where
	S: CacheStore,
{
	/// Construct a fetcher over `store` with the configured id-list TTL.
	pub fn new(store: S, ttl: Duration) -> Self {
		Self { store, ttl }
	}

	/// Retrieve the ordered id list, serving from cache when possible.
	///
	/// Unlike the per-item micro-cache, upstream failures here propagate: the warmup orchestrator
	/// cannot proceed without ids.
	pub async fn best_story_ids(
		&self,
		client: &ResilientClient,
		config: &EngineConfig,
	) -> Result<Vec<u64>> {
		if let Some(json) = self.store.get_raw(ID_LIST_KEY).await? {
			if let Ok(ids) = serde_json::from_str(&json) {
				return Ok(ids);
			}

			tracing::warn!("id-list cache entry corrupt, re-fetching");
		}

		let url = format!("{}{}", config.upstream_base_url, crate::config::BEST_STORIES_PATH);
		let ids: Vec<u64> = client.fetch_json(config, &url).await?;

		if let Ok(json) = serde_json::to_string(&ids) {
			if let Err(err) = self.store.set_raw(ID_LIST_KEY, json, self.ttl).await {
				tracing::warn!(error = %err, "id-list cache write failed");
			}
		}

		Ok(ids)
	}
}
