//! API Layer
//!
//! REST endpoints for the learning platform. Routers follow the
//! state-struct-per-module convention; nesting happens in the server
//! binary.

pub mod accounts;
pub mod common;
pub mod courses;
pub mod ledger;
pub mod openapi;
pub mod reconciliation;

pub use common::*;

pub use accounts::{accounts_router, AccountsState};
pub use courses::{courses_router, CoursesState};
pub use ledger::{checkout_router, ledger_router, LedgerState};
pub use reconciliation::{reconciliation_router, ReconciliationState};
