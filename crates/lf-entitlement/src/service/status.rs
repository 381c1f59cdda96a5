//! Series Status Query
//!
//! Read-only operator view: for one customer, how many courses each of
//! their series has versus how many they currently hold.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::Result;
use crate::repository::LedgerRepository;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStatus {
    pub series_name: String,
    pub total_courses: i64,
    pub granted_courses: i64,
    pub complete: bool,
}

#[derive(Clone)]
pub struct SeriesStatusService {
    ledger_repo: Arc<LedgerRepository>,
}

impl SeriesStatusService {
    pub fn new(ledger_repo: Arc<LedgerRepository>) -> Self {
        Self { ledger_repo }
    }

    pub async fn for_customer(&self, customer_email: &str) -> Result<Vec<SeriesStatus>> {
        let rows = self
            .ledger_repo
            .series_progress_for_customer(customer_email)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(series_name, total_courses, granted_courses)| SeriesStatus {
                series_name,
                total_courses,
                granted_courses,
                complete: granted_courses >= total_courses,
            })
            .collect())
    }
}
