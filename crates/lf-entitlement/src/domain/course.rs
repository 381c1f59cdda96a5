//! Course Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sellable course. Series membership is never stored as a snapshot;
/// the set of published courses sharing a `series_name` *is* the series,
/// computed at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub price_cents: i64,
    pub published: bool,
    pub series_name: Option<String>,
    pub series_part: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn new(title: impl Into<String>, price_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            price_cents,
            published: false,
            series_name: None,
            series_part: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bind the course into a series as the given part.
    pub fn with_series(mut self, series_name: impl Into<String>, part: i64) -> Self {
        self.series_name = Some(series_name.into());
        self.series_part = Some(part);
        self
    }

    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    /// Only series-bound courses participate in entitlement reconciliation.
    pub fn is_series_course(&self) -> bool {
        self.series_name.is_some()
    }
}
