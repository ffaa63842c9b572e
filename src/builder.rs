//! Top-N builder: filters fetched items down to stories, orders them, and projects to the
//! published DTO.

// self
use crate::{_prelude::*, model::Item};
pub use crate::model::StoryDto;

/// Filter to stories with a known score, sort descending by score (stable), and project to
/// [`StoryDto`]. Never truncates — the reader is responsible for taking the first `n`.
pub fn build(mut items: Vec<Item>) -> Vec<StoryDto> {
	items.sort_by(|a, b| b.score.cmp(&a.score));

	items.into_iter().filter_map(Item::into_story_dto).collect()
}
