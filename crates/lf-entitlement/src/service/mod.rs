//! Service Layer
//!
//! The entitlement engine proper: identity resolution, series entitlement
//! reads, idempotent grant creation, the chapter access cascade, the three
//! reconciliation modes, and the operator status read model.

pub mod cascade;
pub mod grant;
pub mod identity;
pub mod reconciliation;
pub mod resolver;
pub mod status;

pub use cascade::{CascadeOutcome, ChapterAccessCascade};
pub use grant::GrantEngine;
pub use identity::{IdentityLinker, IdentityResolution};
pub use reconciliation::ReconciliationScheduler;
pub use resolver::{EntitlementResolver, SeriesEntitlement};
pub use status::{SeriesStatus, SeriesStatusService};
