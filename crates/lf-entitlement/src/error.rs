//! Entitlement Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntitlementError {
    #[error("Course not found: {id}")]
    CourseNotFound { id: String },

    #[error("No published courses in series: {name}")]
    SeriesNotFound { name: String },

    #[error("Ledger entry not found: {id}")]
    LedgerEntryNotFound { id: String },

    #[error("Account not found: {id}")]
    AccountNotFound { id: String },

    #[error("No paid ledger entry to source identity from for {email}")]
    MissingSourceEntry { email: String },

    #[error("Customer {email} already has a ledger entry for course {course_id}")]
    DuplicatePurchase { email: String, course_id: String },

    #[error("Account already exists for email: {email}")]
    AccountExists { email: String },

    #[error("Invalid status transition {from} -> {to} for ledger entry {id}")]
    InvalidTransition { id: String, from: String, to: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EntitlementError {
    pub fn course_not_found(id: impl Into<String>) -> Self {
        Self::CourseNotFound { id: id.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Whether the error aborts only its own (customer, series) unit.
    ///
    /// Batch scans record these per unit and keep going; everything else
    /// (store unavailability) is propagated to the batch caller.
    pub fn is_unit_failure(&self) -> bool {
        !matches!(self, Self::Database(_))
    }
}

pub type Result<T> = std::result::Result<T, EntitlementError>;
