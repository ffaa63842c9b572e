//! End-to-end scenarios driven entirely through the public [`top_stories_cache::Engine`] API
//! against a mocked upstream, covering the literal scenarios from the spec's testable
//! properties: cache hit, cold miss, partial failure, and breaker-open stale-fallback.

// std
use std::time::Duration;
// crates.io
use tokio_util::sync::CancellationToken;
use top_stories_cache::{Engine, EngineConfig, Error};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path, path_regex},
};

fn short_config(base_url: String) -> EngineConfig {
	EngineConfig::builder()
		.upstream_base_url(base_url)
		.per_attempt_timeout(Duration::from_millis(200))
		.retries(1)
		.refresh_interval(Duration::from_millis(60))
		.cache_duration(Duration::from_millis(60))
		.breaker_threshold(2)
		.breaker_open_duration(Duration::from_secs(30))
		.build()
		.expect("valid config")
}

async fn mount_story(server: &MockServer, id: u64, score: i64) {
	Mock::given(method("GET"))
		.and(path_regex(format!(r"^/v0/item/{id}\.json$")))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
			"id": id, "type": "story", "score": score,
		})))
		.mount(server)
		.await;
}

#[tokio::test]
async fn cache_hit_then_cold_miss_produce_consistent_ordering() {
	let _ = tracing_subscriber::fmt::try_init();
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/v0/beststories.json"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([10, 20, 30])))
		.mount(&server)
		.await;
	mount_story(&server, 10, 50).await;
	mount_story(&server, 20, 90).await;
	mount_story(&server, 30, 70).await;

	let engine = Engine::builder().config(short_config(server.uri())).build().expect("engine");
	let cancel = CancellationToken::new();

	let first = engine.get_top(3, &cancel).await.expect("cold miss resolves");
	assert_eq!(first.iter().map(|s| s.score).collect::<Vec<_>>(), vec![90, 70, 50]);

	// Within the freshness window: served from the snapshot, no extra upstream round trip needed.
	let second = engine.get_top(2, &cancel).await.expect("cache hit resolves");
	assert_eq!(second.iter().map(|s| s.score).collect::<Vec<_>>(), vec![90, 70]);

	// Past the freshness window: triggers a synchronous rebuild; idempotent since upstream
	// hasn't changed (ignoring `cached_at`, the story ordering is identical).
	tokio::time::sleep(Duration::from_millis(120)).await;

	let third = engine.get_top(3, &cancel).await.expect("expired snapshot rebuilds");
	assert_eq!(third.iter().map(|s| s.score).collect::<Vec<_>>(), vec![90, 70, 50]);
}

#[tokio::test]
async fn partial_item_failure_is_excluded_without_surfacing_an_error() {
	let _ = tracing_subscriber::fmt::try_init();
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/v0/beststories.json"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1, 2, 3])))
		.mount(&server)
		.await;
	mount_story(&server, 1, 10).await;
	mount_story(&server, 3, 20).await;
	// Item 2 is persistently down; after its retry budget is exhausted it is simply dropped.
	Mock::given(method("GET"))
		.and(path_regex(r"^/v0/item/2\.json$"))
		.respond_with(ResponseTemplate::new(503))
		.mount(&server)
		.await;

	let engine = Engine::builder().config(short_config(server.uri())).build().expect("engine");
	let cancel = CancellationToken::new();

	let stories = engine.get_top(5, &cancel).await.expect("no exception surfaces for a partial failure");

	assert_eq!(stories.iter().map(|s| s.score).collect::<Vec<_>>(), vec![20, 10]);
}

#[tokio::test]
async fn breaker_open_falls_back_to_a_stale_snapshot() {
	let _ = tracing_subscriber::fmt::try_init();
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/v0/beststories.json"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1])))
		.mount(&server)
		.await;
	mount_story(&server, 1, 42).await;

	let engine = Engine::builder().config(short_config(server.uri())).build().expect("engine");
	let cancel = CancellationToken::new();

	let seeded = engine.get_top(1, &cancel).await.expect("initial warmup succeeds");
	assert_eq!(seeded[0].score, 42);

	// The upstream goes down entirely; let the snapshot age past its freshness window.
	server.reset().await;
	Mock::given(method("GET"))
		.and(path("/v0/beststories.json"))
		.respond_with(ResponseTemplate::new(503))
		.mount(&server)
		.await;
	tokio::time::sleep(Duration::from_millis(120)).await;

	// First call after the outage exhausts the retry budget and opens the breaker, but the
	// resulting error is a plain transient failure, not `CircuitOpen` yet.
	let first_failure = engine.get_top(1, &cancel).await.unwrap_err();
	assert!(!matches!(first_failure, Error::ServiceUnavailable));

	// Second call: the breaker is now open, so the id-list fetch fails fast with `CircuitOpen`
	// and the reader falls back to the stale snapshot instead of propagating the error.
	let stale = engine.get_top(1, &cancel).await.expect("stale-fallback serves the old snapshot");
	assert_eq!(stale[0].score, 42);
}

#[tokio::test]
async fn breaker_open_with_no_snapshot_surfaces_service_unavailable() {
	let _ = tracing_subscriber::fmt::try_init();
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/v0/beststories.json"))
		.respond_with(ResponseTemplate::new(503))
		.mount(&server)
		.await;

	let engine = Engine::builder().config(short_config(server.uri())).build().expect("engine");
	let cancel = CancellationToken::new();

	let _ = engine.get_top(1, &cancel).await;
	let err = engine.get_top(1, &cancel).await.unwrap_err();

	assert!(matches!(err, Error::ServiceUnavailable));
}

#[tokio::test]
async fn clamp_bounds_are_enforced_end_to_end() {
	let _ = tracing_subscriber::fmt::try_init();
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/v0/beststories.json"))
		.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([1, 2])))
		.mount(&server)
		.await;
	mount_story(&server, 1, 5).await;
	mount_story(&server, 2, 9).await;

	let engine = Engine::builder()
		.config(EngineConfig::builder()
			.upstream_base_url(server.uri())
			.per_attempt_timeout(Duration::from_millis(200))
			.retries(1)
			.max_stories(1)
			.build()
			.unwrap())
		.build()
		.expect("engine");
	let cancel = CancellationToken::new();

	assert!(engine.get_top(0, &cancel).await.unwrap().is_empty());
	assert!(engine.get_top(-10, &cancel).await.unwrap().is_empty());
	assert_eq!(engine.get_top(500, &cancel).await.unwrap().len(), 1);
}

#[tokio::test]
async fn cancelling_before_the_call_short_circuits_without_touching_upstream() {
	let _ = tracing_subscriber::fmt::try_init();
	let server = MockServer::start().await;

	let engine = Engine::builder().config(short_config(server.uri())).build().expect("engine");
	let cancel = CancellationToken::new();
	cancel.cancel();

	let err = engine.get_top(1, &cancel).await.unwrap_err();

	assert!(matches!(err, Error::Cancelled));
}
