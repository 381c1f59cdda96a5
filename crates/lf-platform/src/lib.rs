//! LearnForge Platform
//!
//! REST API layer over the entitlement engine:
//! - Checkout and payment-gateway transition hooks (confirm/fail/cancel/refund)
//! - Course publishing with new-course backfill
//! - Account creation with retroactive chapter unlocks
//! - Admin reconciliation trigger and status queries
//!
//! All entitlement semantics live in `lf-entitlement`; the handlers here
//! are thin wrappers that translate HTTP to engine calls.

pub mod api;

pub use api::openapi::PlatformApiDoc;
