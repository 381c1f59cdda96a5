//! Ledger Entry Entity
//!
//! The purchase/enrollment ledger is the system of record for "who is
//! entitled to what". Entries are unique on (customer email, course).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EntitlementError;

/// Synthetic payment method tag for engine-created grants. Real entries
/// carry whatever tag the payment collaborator recorded ("CARD", ...).
pub const SERIES_UNLOCK_METHOD: &str = "SERIES_UNLOCK";

/// Payment lifecycle of a ledger entry.
///
/// PENDING is the only non-terminal state from this engine's perspective:
/// the external gateway settles it to PAID or FAILED, and refunds move
/// PAID to REFUNDED. Series-unlock grants are born directly in PAID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, EntitlementError> {
        match value {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "FAILED" => Ok(Self::Failed),
            "REFUNDED" => Ok(Self::Refunded),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(EntitlementError::validation(format!(
                "Unknown payment status: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One purchase or grant record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub customer_email: String,
    pub course_id: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub price_cents: i64,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// A checkout-created entry awaiting gateway settlement.
    pub fn new_pending(
        customer_email: impl Into<String>,
        course_id: impl Into<String>,
        price_cents: i64,
        payment_method: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            customer_email: super::normalize_email(&customer_email.into()),
            course_id: course_id.into(),
            customer_name: None,
            customer_phone: None,
            price_cents,
            status: PaymentStatus::Pending,
            payment_method: payment_method.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_customer(
        mut self,
        name: Option<String>,
        phone: Option<String>,
    ) -> Self {
        self.customer_name = name;
        self.customer_phone = phone;
        self
    }

    pub fn is_series_unlock(&self) -> bool {
        self.payment_method == SERIES_UNLOCK_METHOD
    }
}
