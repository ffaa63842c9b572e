//! Typed wrapper storing the published top-N snapshot in a [`CacheStore`].

// self
use crate::{_prelude::*, cache::store::CacheStore, model::CachedSnapshot};

const SNAPSHOT_KEY: &str = "preprocessed_top_stories";

/// Read/write access to the single published snapshot, keyed under one well-known cache key.
#[derive(Clone, Debug)]
pub struct SnapshotStore<S> {
	store: S,
	ttl: Duration,
}
impl<S> SnapshotStore<S>
where
	S: CacheStore,
{
	/// Wrap `store`, persisting snapshots for `ttl`.
	///
	/// `ttl` is expected to be [`EngineConfig::snapshot_store_ttl`](crate::config::EngineConfig::snapshot_store_ttl),
	/// deliberately longer than the reader-facing freshness window so a stale snapshot remains
	/// available for breaker-open fallback.
	pub fn new(store: S, ttl: Duration) -> Self {
		Self { store, ttl }
	}

	/// Fetch the current snapshot, if one is cached and unexpired.
	pub async fn get(&self) -> Result<Option<CachedSnapshot>> {
		match self.store.get_raw(SNAPSHOT_KEY).await? {
			Some(json) => Ok(Some(serde_json::from_str(&json)?)),
			None => Ok(None),
		}
	}

	/// Publish a new snapshot.
	pub async fn set(&self, snapshot: &CachedSnapshot) -> Result<()> {
		let json = serde_json::to_string(snapshot)?;

		self.store.set_raw(SNAPSHOT_KEY, json, self.ttl).await
	}
}
