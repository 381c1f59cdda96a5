//! Chapter Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered child of a course. Chapters with `default_unlocked` are open
/// previews; the rest require a chapter access row for the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub position: i64,
    pub default_unlocked: bool,
    pub created_at: DateTime<Utc>,
}

impl Chapter {
    pub fn new(course_id: impl Into<String>, title: impl Into<String>, position: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            course_id: course_id.into(),
            title: title.into(),
            position,
            default_unlocked: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_default_unlocked(mut self, default_unlocked: bool) -> Self {
        self.default_unlocked = default_unlocked;
        self
    }
}

/// Per-account unlock state for one chapter.
///
/// Created only by the chapter access cascade. Unlocks are monotonic:
/// no engine code path ever writes `unlocked = false` over a `true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterAccess {
    pub account_id: String,
    pub chapter_id: String,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}
