//! Data model shared across the engine: raw upstream items, the published Story DTO, and the
//! cached top-N snapshot.

// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::_prelude::*;

/// Raw upstream record as returned by the `item/<id>.json` endpoint.
///
/// All fields besides `id` may be absent — a missing field is simply `None`, never an error.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Item {
	/// Upstream numeric identifier.
	pub id: u64,
	/// Submitter username.
	#[serde(default, rename = "by")]
	pub author: Option<String>,
	/// Unix timestamp (seconds) of submission.
	#[serde(default, rename = "time")]
	pub unix_time: Option<i64>,
	/// Item title, present for stories, jobs, and polls.
	#[serde(default)]
	pub title: Option<String>,
	/// Destination URL, present for link stories.
	#[serde(default)]
	pub url: Option<String>,
	/// Upstream score; absent for comments and deleted items.
	#[serde(default)]
	pub score: Option<i64>,
	/// Descendant comment count, surfaced as `comment_count`.
	#[serde(default, rename = "descendants")]
	pub comment_count: Option<i64>,
	/// Upstream item type: `"story"`, `"comment"`, `"job"`, `"poll"`, `"ask"`, etc.
	#[serde(default, rename = "type")]
	pub kind: Option<String>,
}
impl Item {
	/// Whether this item's `kind` is `"story"`.
	pub fn is_story(&self) -> bool {
		self.kind.as_deref() == Some("story")
	}

	/// Project this item into a [`StoryDto`], following the filter in the Top-N builder.
	///
	/// Returns `None` unless `kind == "story"` and `score` is present.
	pub fn into_story_dto(self) -> Option<StoryDto> {
		if !self.is_story() {
			return None;
		}
		let score = self.score?;

		Some(StoryDto {
			title: self.title,
			uri: self.url,
			posted_by: self.author,
			time: self.unix_time.map(format_unix_time).unwrap_or_default(),
			score,
			comment_count: self.comment_count.unwrap_or(0),
		})
	}
}

/// Published record for a single story, shaped for the downstream JSON contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoryDto {
	/// Story title.
	pub title: Option<String>,
	/// Destination URL.
	pub uri: Option<String>,
	/// Submitter username.
	#[serde(rename = "postedBy")]
	pub posted_by: Option<String>,
	/// ISO-8601 timestamp with offset, or `""` if unknown.
	pub time: String,
	/// Upstream score; `0` if unknown.
	pub score: i64,
	/// Comment count; `0` if unknown.
	#[serde(rename = "commentCount")]
	pub comment_count: i64,
}

/// Authoritative published artifact: the sorted top-N list plus publication metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CachedSnapshot {
	/// Stories sorted strictly by `score` descending, ties broken by fetch-completion order.
	pub stories: Vec<StoryDto>,
	/// Wall-clock instant at which this snapshot was committed to the store.
	pub cached_at: DateTime<Utc>,
	/// `stories.len()`, carried explicitly so deserialized snapshots can be sanity-checked.
	pub total_stories: usize,
}
impl CachedSnapshot {
	/// Build a snapshot from an already-sorted story list.
	pub fn new(stories: Vec<StoryDto>, cached_at: DateTime<Utc>) -> Self {
		let total_stories = stories.len();

		Self { stories, cached_at, total_stories }
	}

	/// Age of this snapshot relative to `now`.
	pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
		now - self.cached_at
	}

	/// The first `n` stories (clamped to the snapshot's length).
	pub fn top(&self, n: usize) -> Vec<StoryDto> {
		self.stories.iter().take(n).cloned().collect()
	}
}

fn format_unix_time(unix_time: i64) -> String {
	DateTime::<Utc>::from_timestamp(unix_time, 0)
		.map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string())
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn story_item(id: u64, score: i64) -> Item {
		Item {
			id,
			kind: Some("story".into()),
			score: Some(score),
			title: Some(format!("story {id}")),
			..Default::default()
		}
	}

	#[test]
	fn projects_story_with_known_fields() {
		let item = Item {
			id: 1,
			author: Some("pg".into()),
			unix_time: Some(1_700_000_000),
			title: Some("Ask HN".into()),
			url: Some("https://example.com".into()),
			score: Some(42),
			comment_count: Some(7),
			kind: Some("story".into()),
		};
		let dto = item.into_story_dto().expect("story projects");

		assert_eq!(dto.score, 42);
		assert_eq!(dto.comment_count, 7);
		assert_eq!(dto.posted_by.as_deref(), Some("pg"));
		assert!(!dto.time.is_empty());
	}

	#[test]
	fn non_story_kind_is_rejected() {
		let item = story_item(2, 10);
		let mut comment = item;
		comment.kind = Some("comment".into());

		assert!(comment.into_story_dto().is_none());
	}

	#[test]
	fn missing_score_is_rejected() {
		let mut item = story_item(3, 0);
		item.score = None;

		assert!(item.into_story_dto().is_none());
	}

	#[test]
	fn missing_unix_time_yields_empty_string() {
		let item = story_item(4, 5);

		assert_eq!(item.into_story_dto().unwrap().time, "");
	}

	#[test]
	fn snapshot_top_clamps_to_length() {
		let snapshot = CachedSnapshot::new(
			vec![
				story_item(1, 100).into_story_dto().unwrap(),
				story_item(2, 90).into_story_dto().unwrap(),
			],
			Utc::now(),
		);

		assert_eq!(snapshot.top(10).len(), 2);
		assert_eq!(snapshot.top(1)[0].score, 100);
	}
}
