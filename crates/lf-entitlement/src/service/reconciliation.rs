//! Reconciliation Scheduler
//!
//! Orchestrates resolver -> grant engine -> cascade in three modes:
//! - Mode A: reactive point unlock, fired after a ledger entry reaches
//!   PAID; detached from the payment path and best-effort.
//! - Mode B: new-course backfill across existing series holders.
//! - Mode C: operator-triggered comprehensive repair over every customer
//!   and series.
//!
//! Batch units are independent: each (customer, series/course) pair has
//! its own commit boundary, failures are accumulated into the returned
//! report, and only store unavailability aborts a scan. All modes are
//! safe to run concurrently with each other and with themselves; grant
//! creation and chapter unlocks are idempotent, so overlap costs at most
//! duplicated reads.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::domain::Course;
use crate::error::{EntitlementError, Result};
use crate::report::{
    BackfillReport, GrantRecord, RepairProgress, RepairProgressSnapshot, RepairReport,
    SeriesReconciliation, UnitFailure,
};
use crate::repository::{CourseRepository, LedgerRepository};
use crate::service::cascade::{CascadeOutcome, ChapterAccessCascade};
use crate::service::grant::GrantEngine;
use crate::service::resolver::{EntitlementResolver, SeriesEntitlement};

pub struct ReconciliationScheduler {
    resolver: EntitlementResolver,
    grants: GrantEngine,
    cascade: ChapterAccessCascade,
    course_repo: Arc<CourseRepository>,
    ledger_repo: Arc<LedgerRepository>,
    progress: Arc<RepairProgress>,
    last_repair: RwLock<Option<RepairReport>>,
}

impl ReconciliationScheduler {
    pub fn new(
        resolver: EntitlementResolver,
        grants: GrantEngine,
        cascade: ChapterAccessCascade,
        course_repo: Arc<CourseRepository>,
        ledger_repo: Arc<LedgerRepository>,
    ) -> Self {
        Self {
            resolver,
            grants,
            cascade,
            course_repo,
            ledger_repo,
            progress: RepairProgress::new(),
            last_repair: RwLock::new(None),
        }
    }

    // ------------------------------------------------------------------
    // Mode A - reactive point unlock
    // ------------------------------------------------------------------

    /// Reconcile one customer against the series of a course that just
    /// became PAID. Returns None when the course is not series-bound.
    pub async fn reconcile_purchase(
        &self,
        customer_email: &str,
        course_id: &str,
    ) -> Result<Option<SeriesReconciliation>> {
        let entitlement = match self
            .resolver
            .resolve_for_course(customer_email, course_id)
            .await?
        {
            Some(entitlement) => entitlement,
            None => return Ok(None),
        };

        self.run_cycle(entitlement).await.map(Some)
    }

    /// Detached Mode A: runs as a best-effort side effect of the payment
    /// confirmation path. Every error is logged and swallowed; the HTTP
    /// outcome already reported for the payment is never altered, and the
    /// comprehensive repair converges whatever is missed here.
    pub fn spawn_reconcile_purchase(self: Arc<Self>, customer_email: String, course_id: String) {
        tokio::spawn(async move {
            match self
                .reconcile_purchase(&customer_email, &course_id)
                .await
            {
                Ok(Some(unit)) => info!(
                    customer = %customer_email,
                    series = %unit.series_name,
                    grants = unit.grants.len(),
                    chapters = unit.chapters_unlocked,
                    "point unlock complete"
                ),
                Ok(None) => debug!(
                    customer = %customer_email,
                    course = %course_id,
                    "paid course is not series-bound; nothing to reconcile"
                ),
                Err(e) => error!(
                    customer = %customer_email,
                    course = %course_id,
                    error = %e,
                    "point unlock failed; next repair pass will converge"
                ),
            }
        });
    }

    // ------------------------------------------------------------------
    // Mode B - new-course backfill
    // ------------------------------------------------------------------

    /// Grant one newly published series course to every customer already
    /// holding a PAID entry for any other course of that series.
    pub async fn backfill_course(&self, course_id: &str) -> Result<BackfillReport> {
        let course = self
            .course_repo
            .find_by_id(course_id)
            .await?
            .ok_or_else(|| EntitlementError::course_not_found(course_id))?;

        let series_name = course.series_name.clone().ok_or_else(|| {
            EntitlementError::validation(format!("course {} is not part of a series", course_id))
        })?;
        if !course.published {
            return Err(EntitlementError::validation(format!(
                "course {} is not published",
                course_id
            )));
        }

        let customers = self
            .ledger_repo
            .series_customers_excluding(&series_name, &course.id)
            .await?;

        let mut report = BackfillReport {
            course_id: course.id.clone(),
            series_name: series_name.clone(),
            customers_processed: 0,
            grants: Vec::new(),
            chapters_unlocked: 0,
            failures: Vec::new(),
        };

        for email in customers {
            match self.backfill_unit(&email, &course).await {
                Ok((grants, chapters)) => {
                    report.grants.extend(grants);
                    report.chapters_unlocked += chapters;
                }
                Err(e) if e.is_unit_failure() => {
                    warn!(customer = %email, course = %course.id, error = %e, "backfill unit failed");
                    report.failures.push(UnitFailure::new(&email, &course.id, e));
                }
                Err(e) => return Err(e),
            }
            report.customers_processed += 1;
        }

        info!(
            course = %course.id,
            series = %series_name,
            customers = report.customers_processed,
            grants = report.grants.len(),
            failures = report.failures.len(),
            "backfill complete"
        );

        Ok(report)
    }

    async fn backfill_unit(
        &self,
        customer_email: &str,
        course: &Course,
    ) -> Result<(Vec<GrantRecord>, u64)> {
        let grants = self
            .grants
            .grant_missing(customer_email, std::slice::from_ref(course))
            .await?;

        let chapters = match self.cascade.unlock_course(customer_email, &course.id).await? {
            CascadeOutcome::Unlocked { chapters_unlocked, .. } => chapters_unlocked,
            CascadeOutcome::Deferred => 0,
        };

        Ok((grants, chapters))
    }

    // ------------------------------------------------------------------
    // Mode C - comprehensive repair
    // ------------------------------------------------------------------

    /// Full scan: every customer with a PAID series-course entry, every
    /// series each touches, one resolver -> grant -> cascade cycle per
    /// pair against the current published state. Pair failures are
    /// recorded and the scan continues; a second run with no intervening
    /// purchases creates zero additional grants.
    pub async fn repair_all(&self) -> Result<RepairReport> {
        if !self.progress.try_begin() {
            return Err(EntitlementError::validation(
                "comprehensive repair is already running",
            ));
        }

        let result = self.repair_scan().await;
        self.progress.finish();

        match result {
            Ok(report) => {
                info!(
                    customers = report.customers_processed,
                    pairs = report.pairs_processed,
                    grants = report.grants_created,
                    chapters = report.chapters_unlocked,
                    failures = report.failures.len(),
                    "comprehensive repair complete"
                );
                *self.last_repair.write().await = Some(report.clone());
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "comprehensive repair aborted");
                Err(e)
            }
        }
    }

    async fn repair_scan(&self) -> Result<RepairReport> {
        let started_at = Utc::now();
        let mut report = RepairReport {
            customers_processed: 0,
            pairs_processed: 0,
            grants_created: 0,
            chapters_unlocked: 0,
            grants: Vec::new(),
            failures: Vec::new(),
            started_at,
            finished_at: started_at,
        };

        let customers = self.ledger_repo.distinct_series_customers().await?;
        for email in customers {
            let series_names = self.ledger_repo.distinct_series_for_customer(&email).await?;
            for series_name in series_names {
                match self.reconcile_pair(&email, &series_name).await {
                    Ok(unit) => {
                        let grants = unit.grants.len() as u64;
                        report.grants_created += grants;
                        report.chapters_unlocked += unit.chapters_unlocked;
                        report.grants.extend(unit.grants);
                        self.progress.record_pair(grants, unit.chapters_unlocked);
                    }
                    Err(e) if e.is_unit_failure() => {
                        warn!(customer = %email, series = %series_name, error = %e, "repair unit failed");
                        report.failures.push(UnitFailure::new(&email, &series_name, e));
                        self.progress.record_failure();
                    }
                    Err(e) => return Err(e),
                }
                report.pairs_processed += 1;
            }
            report.customers_processed += 1;
            self.progress.record_customer();
        }

        report.finished_at = Utc::now();
        Ok(report)
    }

    /// One resolver -> grant -> cascade cycle for a (customer, series)
    /// pair. The cascade walks every course the customer now holds in the
    /// series, so chapter-unlock drift on long-held courses is repaired
    /// too, not just the newly granted ones.
    pub async fn reconcile_pair(
        &self,
        customer_email: &str,
        series_name: &str,
    ) -> Result<SeriesReconciliation> {
        let entitlement = self.resolver.resolve_series(customer_email, series_name).await?;
        self.run_cycle(entitlement).await
    }

    async fn run_cycle(&self, entitlement: SeriesEntitlement) -> Result<SeriesReconciliation> {
        let customer_email = entitlement.customer_email.clone();
        let series_name = entitlement.series_name.clone();

        let grants = self
            .grants
            .grant_missing(&customer_email, &entitlement.missing)
            .await?;

        let mut chapters_unlocked = 0u64;
        let mut cascade_deferred = false;
        for course in &entitlement.courses {
            match self.cascade.unlock_course(&customer_email, &course.id).await? {
                CascadeOutcome::Unlocked { chapters_unlocked: n, .. } => chapters_unlocked += n,
                CascadeOutcome::Deferred => {
                    // No account to unlock for; the account-creation
                    // collaborator replays the cascade later.
                    cascade_deferred = true;
                    break;
                }
            }
        }

        Ok(SeriesReconciliation {
            customer_email,
            series_name,
            grants,
            chapters_unlocked,
            cascade_deferred,
        })
    }

    // ------------------------------------------------------------------
    // Operator visibility
    // ------------------------------------------------------------------

    /// Kick off Mode C in a background task. Returns false when a run is
    /// already in flight.
    pub fn spawn_repair(self: Arc<Self>) -> bool {
        if self.progress.is_running() {
            return false;
        }
        tokio::spawn(async move {
            if let Err(e) = self.repair_all().await {
                error!(error = %e, "background repair failed");
            }
        });
        true
    }

    pub fn progress(&self) -> RepairProgressSnapshot {
        self.progress.snapshot()
    }

    pub async fn last_repair(&self) -> Option<RepairReport> {
        self.last_repair.read().await.clone()
    }
}
