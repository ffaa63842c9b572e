//! Read-through top-N cache engine fronting a slow upstream item API — background refresh,
//! bounded concurrent fan-out, and circuit-breaking resilience.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod builder;
pub mod cache;
pub mod engine;
pub mod fanout;
pub mod http;
pub mod idlist;
pub mod metrics;
pub mod micro_cache;
pub mod model;
pub mod warmup;

mod config;
mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, TimeDelta, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}

#[cfg(feature = "prometheus")] pub use crate::metrics::install_default_exporter;
pub use tokio_util::sync::CancellationToken;
pub use crate::{
	cache::store::{CacheStore, CacheStoreHandle, InMemoryStore},
	config::{EngineConfig, EngineConfigBuilder},
	engine::{Engine, EngineBuilder},
	error::{Error, Result},
	metrics::EngineMetricsSnapshot,
	model::{CachedSnapshot, Item, StoryDto},
};
#[cfg(feature = "redis")] pub use crate::cache::store::RedisStore;
