//! LearnForge Entitlement Engine
//!
//! Core engine guaranteeing that every customer who paid for any part of a
//! multi-part course series eventually holds access to every part of that
//! series, including parts published after the purchase:
//! - Idempotent, constraint-backed series grants (never double-charged)
//! - Chapter access cascade with monotonic unlocks
//! - Guest/account identity resolution with a deferred-unlock path
//! - Three reconciliation modes: reactive point-unlock, new-course
//!   backfill, and comprehensive repair

pub mod db;
pub mod domain;
pub mod error;
pub mod report;
pub mod repository;
pub mod service;

pub use error::{EntitlementError, Result};
pub use report::{
    BackfillReport, GrantRecord, RepairProgress, RepairProgressSnapshot, RepairReport,
    SeriesReconciliation, UnitFailure,
};
pub use service::{
    ChapterAccessCascade, CascadeOutcome, EntitlementResolver, GrantEngine, IdentityLinker,
    IdentityResolution, ReconciliationScheduler, SeriesEntitlement, SeriesStatus,
    SeriesStatusService,
};
