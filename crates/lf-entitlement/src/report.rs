//! Reconciliation Result Objects
//!
//! Every mode returns an explicit result object (counts, newly created
//! grants, per-unit failures) instead of signalling through logs or
//! exceptions. Structured logging is layered on top of these, never a
//! substitute for them. The grant lists double as the input for the
//! external notification dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use utoipa::ToSchema;

/// A ledger grant created by the engine (never by a real payment).
/// Always priced at zero with the synthetic SERIES_UNLOCK method.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantRecord {
    pub ledger_id: String,
    pub customer_email: String,
    pub course_id: String,
    pub course_title: String,
    pub series_name: String,
}

/// One failed (customer, scope) unit inside a batch scan. Recorded and
/// returned, never thrown; the batch keeps going.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnitFailure {
    pub customer_email: String,
    /// Series name (repair) or course id (backfill) the unit covered.
    pub scope: String,
    pub error: String,
}

impl UnitFailure {
    pub fn new(
        customer_email: impl Into<String>,
        scope: impl Into<String>,
        error: impl std::fmt::Display,
    ) -> Self {
        Self {
            customer_email: customer_email.into(),
            scope: scope.into(),
            error: error.to_string(),
        }
    }
}

/// Outcome of one resolver -> grant -> cascade cycle for a single
/// (customer, series) pair. This is Mode A's whole report and the unit
/// of work inside Mode C.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesReconciliation {
    pub customer_email: String,
    pub series_name: String,
    /// Grants newly created by this cycle; pre-existing ones are not
    /// re-reported.
    pub grants: Vec<GrantRecord>,
    pub chapters_unlocked: u64,
    /// True when the customer has no linked account yet; chapter unlocks
    /// are retried at account-creation time.
    pub cascade_deferred: bool,
}

/// Mode B result: one new series course backfilled across existing
/// series holders.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub course_id: String,
    pub series_name: String,
    pub customers_processed: u64,
    pub grants: Vec<GrantRecord>,
    pub chapters_unlocked: u64,
    pub failures: Vec<UnitFailure>,
}

/// Mode C result: full scan over every customer and series.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub customers_processed: u64,
    pub pairs_processed: u64,
    pub grants_created: u64,
    pub chapters_unlocked: u64,
    pub grants: Vec<GrantRecord>,
    pub failures: Vec<UnitFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Live counters for an in-flight repair run, readable while the scan is
/// still walking customers.
#[derive(Debug, Default)]
pub struct RepairProgress {
    running: AtomicBool,
    customers: AtomicU64,
    pairs: AtomicU64,
    grants: AtomicU64,
    chapters: AtomicU64,
    failures: AtomicU64,
}

impl RepairProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim the single repair slot and zero the counters. Returns false
    /// when a run is already in flight.
    pub fn try_begin(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.customers.store(0, Ordering::SeqCst);
        self.pairs.store(0, Ordering::SeqCst);
        self.grants.store(0, Ordering::SeqCst);
        self.chapters.store(0, Ordering::SeqCst);
        self.failures.store(0, Ordering::SeqCst);
        true
    }

    pub fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn record_customer(&self) {
        self.customers.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_pair(&self, grants: u64, chapters: u64) {
        self.pairs.fetch_add(1, Ordering::SeqCst);
        self.grants.fetch_add(grants, Ordering::SeqCst);
        self.chapters.fetch_add(chapters, Ordering::SeqCst);
    }

    pub fn record_failure(&self) {
        self.pairs.fetch_add(1, Ordering::SeqCst);
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> RepairProgressSnapshot {
        RepairProgressSnapshot {
            running: self.running.load(Ordering::SeqCst),
            customers_processed: self.customers.load(Ordering::SeqCst),
            pairs_processed: self.pairs.load(Ordering::SeqCst),
            grants_created: self.grants.load(Ordering::SeqCst),
            chapters_unlocked: self.chapters.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
        }
    }
}

/// Point-in-time view of [`RepairProgress`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairProgressSnapshot {
    pub running: bool,
    pub customers_processed: u64,
    pub pairs_processed: u64,
    pub grants_created: u64,
    pub chapters_unlocked: u64,
    pub failures: u64,
}
