//! Generic cache store abstraction, with an in-memory default and an optional Redis-backed
//! implementation for deployments that want the snapshot to survive a process restart.

// crates.io
use dashmap::DashMap;
// self
use crate::_prelude::*;

/// Minimal key/value store contract used by every cache layer in this engine (the per-item
/// micro-cache, the id-list cache, and the published snapshot).
///
/// Values are opaque JSON strings; typed callers serialize/deserialize at the call site so this
/// trait stays storage-agnostic.
pub trait CacheStore: Send + Sync {
	/// Fetch a value, or `None` if absent or expired.
	async fn get_raw(&self, key: &str) -> Result<Option<String>>;

	/// Insert a value with the given TTL, replacing any existing entry.
	async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

#[derive(Clone, Debug)]
struct Entry {
	value: String,
	expires_at: Instant,
}

/// Default, process-local cache store backed by `dashmap`.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
	map: Arc<DashMap<String, Entry>>,
}
impl InMemoryStore {
	/// Construct an empty store.
	pub fn new() -> Self {
		Self::default()
	}
}
impl CacheStore for InMemoryStore {
	async fn get_raw(&self, key: &str) -> Result<Option<String>> {
		let now = Instant::now();

		if let Some(entry) = self.map.get(key) {
			if entry.expires_at > now {
				return Ok(Some(entry.value.clone()));
			}
		} else {
			return Ok(None);
		}

		self.map.remove(key);

		Ok(None)
	}

	async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
		self.map.insert(key.to_string(), Entry { value, expires_at: Instant::now() + ttl });

		Ok(())
	}
}

/// Redis-backed store for deployments that want the snapshot to outlive a process restart.
///
/// TTLs are delegated to Redis's own expiry (`SET EX`) rather than re-checked client-side.
#[cfg(feature = "redis")]
#[derive(Clone, Debug)]
pub struct RedisStore {
	client: redis::Client,
	namespace: Arc<str>,
}
#[cfg(feature = "redis")]
impl RedisStore {
	/// Wrap a Redis client under the default `top-stories-cache` namespace.
	pub fn new(client: redis::Client) -> Self {
		Self { client, namespace: Arc::from("top-stories-cache") }
	}

	/// Override the key namespace.
	pub fn namespace(mut self, namespace: impl Into<Arc<str>>) -> Self {
		self.namespace = namespace.into();

		self
	}

	fn key(&self, key: &str) -> String {
		format!("{}:{key}", self.namespace)
	}
}
#[cfg(feature = "redis")]
impl CacheStore for RedisStore {
	async fn get_raw(&self, key: &str) -> Result<Option<String>> {
		use redis::AsyncCommands;

		let mut conn = self.client.get_multiplexed_async_connection().await?;
		let value: Option<String> = conn.get(self.key(key)).await?;

		Ok(value)
	}

	async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
		use redis::AsyncCommands;

		let mut conn = self.client.get_multiplexed_async_connection().await?;
		let ttl_secs = ttl.as_secs().max(1);

		conn.set_ex::<_, _, ()>(self.key(key), value, ttl_secs).await?;

		Ok(())
	}
}

/// Runtime choice of cache store backend, selected once at engine construction.
#[derive(Clone, Debug)]
pub enum CacheStoreHandle {
	/// In-memory `dashmap` store; the default.
	InMemory(InMemoryStore),
	/// Redis-backed store, available behind the `redis` feature.
	#[cfg(feature = "redis")]
	Redis(RedisStore),
}
impl Default for CacheStoreHandle {
	fn default() -> Self {
		Self::InMemory(InMemoryStore::new())
	}
}
impl CacheStore for CacheStoreHandle {
	async fn get_raw(&self, key: &str) -> Result<Option<String>> {
		match self {
			Self::InMemory(store) => store.get_raw(key).await,
			#[cfg(feature = "redis")]
			Self::Redis(store) => store.get_raw(key).await,
		}
	}

	async fn set_raw(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
		match self {
			Self::InMemory(store) => store.set_raw(key, value, ttl).await,
			#[cfg(feature = "redis")]
			Self::Redis(store) => store.set_raw(key, value, ttl).await,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn in_memory_store_round_trips_before_ttl() {
		let store = InMemoryStore::new();

		store.set_raw("k", "v".into(), Duration::from_secs(60)).await.unwrap();

		assert_eq!(store.get_raw("k").await.unwrap(), Some("v".to_string()));
	}

	#[tokio::test]
	async fn in_memory_store_expires_after_ttl() {
		let store = InMemoryStore::new();

		store.set_raw("k", "v".into(), Duration::from_millis(5)).await.unwrap();
		tokio::time::sleep(Duration::from_millis(20)).await;

		assert_eq!(store.get_raw("k").await.unwrap(), None);
	}

	#[tokio::test]
	async fn missing_key_is_none() {
		let store = InMemoryStore::new();

		assert_eq!(store.get_raw("absent").await.unwrap(), None);
	}
}
