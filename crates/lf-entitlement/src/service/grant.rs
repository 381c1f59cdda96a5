//! Grant Engine
//!
//! Turns a resolver's missing set into idempotent, zero-price ledger
//! grants. The single conditional insert per course is the only
//! correctness mechanism: a conflict on the (email, course) unique pair
//! means "already granted" and is success, never an error. Safe to invoke
//! concurrently from the reactive and repair paths for the same pair.

use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::Course;
use crate::error::{EntitlementError, Result};
use crate::report::GrantRecord;
use crate::repository::LedgerRepository;

#[derive(Clone)]
pub struct GrantEngine {
    ledger_repo: Arc<LedgerRepository>,
}

impl GrantEngine {
    pub fn new(ledger_repo: Arc<LedgerRepository>) -> Self {
        Self { ledger_repo }
    }

    /// Create grants for every missing course. Returns only the grants
    /// newly created by this call; pre-existing ones are not re-reported.
    ///
    /// The customer must already hold a real-payment PAID entry somewhere:
    /// its name/phone seed the synthetic rows. Identity data is never
    /// fabricated; without a source the customer is skipped with a
    /// [`EntitlementError::MissingSourceEntry`] for the batch to record.
    pub async fn grant_missing(
        &self,
        customer_email: &str,
        missing: &[Course],
    ) -> Result<Vec<GrantRecord>> {
        if missing.is_empty() {
            return Ok(Vec::new());
        }

        let source = self
            .ledger_repo
            .find_identity_source(customer_email)
            .await?
            .ok_or_else(|| EntitlementError::MissingSourceEntry {
                email: customer_email.to_string(),
            })?;

        let mut created = Vec::new();
        for course in missing {
            let granted = self
                .ledger_repo
                .insert_series_unlock(
                    customer_email,
                    &course.id,
                    source.customer_name.as_deref(),
                    source.customer_phone.as_deref(),
                )
                .await?;

            match granted {
                Some(ledger_id) => {
                    debug!(
                        customer = %customer_email,
                        course = %course.id,
                        "series unlock granted"
                    );
                    created.push(GrantRecord {
                        ledger_id,
                        customer_email: source.customer_email.clone(),
                        course_id: course.id.clone(),
                        course_title: course.title.clone(),
                        series_name: course.series_name.clone().unwrap_or_default(),
                    });
                }
                None => {
                    // Concurrent grant or an untouchable row (PENDING /
                    // REFUNDED) on the pair; both are steady states.
                    debug!(
                        customer = %customer_email,
                        course = %course.id,
                        "series unlock already present"
                    );
                }
            }
        }

        if !created.is_empty() {
            info!(
                customer = %customer_email,
                grants = created.len(),
                "created series unlock grants"
            );
        }

        Ok(created)
    }
}
