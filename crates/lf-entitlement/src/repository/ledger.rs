//! Ledger Repository
//!
//! Data access for the purchase/enrollment ledger. The grant write is a
//! single conditional statement serialized by the (customer_email,
//! course_id) unique constraint; there is deliberately no existence check
//! ahead of it, so the write stays race-free across processes.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::domain::{normalize_email, LedgerEntry, PaymentStatus, SERIES_UNLOCK_METHOD};
use crate::error::{EntitlementError, Result};

pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a checkout-created PENDING entry.
    pub async fn insert_pending(&self, entry: &LedgerEntry) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (id, customer_email, course_id, customer_name, customer_phone,
                 price_cents, status, payment_method, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.customer_email)
        .bind(&entry.course_id)
        .bind(&entry.customer_name)
        .bind(&entry.customer_phone)
        .bind(entry.price_cents)
        .bind(entry.status.as_str())
        .bind(&entry.payment_method)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(EntitlementError::DuplicatePurchase {
                    email: entry.customer_email.clone(),
                    course_id: entry.course_id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Insert-if-absent series grant: price 0, born PAID, SERIES_UNLOCK
    /// method. Dead FAILED/CANCELLED remnants on the pair are upgraded in
    /// place; PENDING rows are left for the gateway to settle and REFUNDED
    /// rows are never touched. Returns the grant's ledger id when a row
    /// was written, None when the pair was already granted (not an error).
    pub async fn insert_series_unlock(
        &self,
        email: &str,
        course_id: &str,
        customer_name: Option<&str>,
        customer_phone: Option<&str>,
    ) -> Result<Option<String>> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (id, customer_email, course_id, customer_name, customer_phone,
                 price_cents, status, payment_method, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, 'PAID', ?, ?, ?)
            ON CONFLICT (customer_email, course_id) DO UPDATE SET
                price_cents = 0,
                status = 'PAID',
                payment_method = excluded.payment_method,
                updated_at = excluded.updated_at
            WHERE ledger_entries.status IN ('FAILED', 'CANCELLED')
            RETURNING id
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(normalize_email(email))
        .bind(course_id)
        .bind(customer_name)
        .bind(customer_phone)
        .bind(SERIES_UNLOCK_METHOD)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get("id")))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query("SELECT * FROM ledger_entries WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_entry).transpose()
    }

    pub async fn find_pair(&self, email: &str, course_id: &str) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(
            "SELECT * FROM ledger_entries WHERE customer_email = ? AND course_id = ?",
        )
        .bind(normalize_email(email))
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_entry).transpose()
    }

    /// Guarded state transition; fails with InvalidTransition when the
    /// entry is not in the expected source state.
    async fn transition(
        &self,
        id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<LedgerEntry> {
        let result = sqlx::query(
            "UPDATE ledger_entries SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.find_by_id(id).await? {
                Some(entry) => Err(EntitlementError::InvalidTransition {
                    id: id.to_string(),
                    from: entry.status.to_string(),
                    to: to.to_string(),
                }),
                None => Err(EntitlementError::LedgerEntryNotFound { id: id.to_string() }),
            };
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| EntitlementError::LedgerEntryNotFound { id: id.to_string() })
    }

    /// Gateway success: PENDING -> PAID. The caller fires point-unlock
    /// reconciliation exactly once off this transition.
    pub async fn mark_paid(&self, id: &str) -> Result<LedgerEntry> {
        self.transition(id, PaymentStatus::Pending, PaymentStatus::Paid).await
    }

    pub async fn mark_failed(&self, id: &str) -> Result<LedgerEntry> {
        self.transition(id, PaymentStatus::Pending, PaymentStatus::Failed).await
    }

    pub async fn mark_cancelled(&self, id: &str) -> Result<LedgerEntry> {
        self.transition(id, PaymentStatus::Pending, PaymentStatus::Cancelled).await
    }

    /// External refund: PAID -> REFUNDED. No cascade reversal happens here.
    pub async fn mark_refunded(&self, id: &str) -> Result<LedgerEntry> {
        self.transition(id, PaymentStatus::Paid, PaymentStatus::Refunded).await
    }

    /// Earliest real-payment PAID entry for the customer; the authoritative
    /// source of name/phone for synthetic grants. Synthetic rows are never
    /// treated as an identity source.
    pub async fn find_identity_source(&self, email: &str) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(
            r#"
            SELECT * FROM ledger_entries
            WHERE customer_email = ? AND status = 'PAID' AND payment_method != ?
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(normalize_email(email))
        .bind(SERIES_UNLOCK_METHOD)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_entry).transpose()
    }

    /// All PAID entries for a customer (real payments and grants). Used by
    /// the account-creation collaborator to replay the cascade.
    pub async fn list_paid_for_email(&self, email: &str) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM ledger_entries WHERE customer_email = ? AND status = 'PAID' ORDER BY created_at, id",
        )
        .bind(normalize_email(email))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_entry).collect()
    }

    /// Course ids of a series the customer already holds PAID entries for.
    pub async fn paid_series_course_ids(&self, email: &str, series_name: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT le.course_id FROM ledger_entries le
            JOIN courses c ON c.id = le.course_id
            WHERE le.customer_email = ? AND le.status = 'PAID'
              AND c.series_name = ? AND c.published = 1
            "#,
        )
        .bind(normalize_email(email))
        .bind(series_name)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.get("course_id")).collect())
    }

    /// Distinct customers holding a PAID entry for any published course of
    /// the series other than the excluded (newly published) one. Ascending
    /// email for diffable batch logs.
    pub async fn series_customers_excluding(
        &self,
        series_name: &str,
        exclude_course_id: &str,
    ) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT le.customer_email FROM ledger_entries le
            JOIN courses c ON c.id = le.course_id
            WHERE le.status = 'PAID' AND c.series_name = ? AND c.published = 1
              AND c.id != ?
            ORDER BY le.customer_email
            "#,
        )
        .bind(series_name)
        .bind(exclude_course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.get("customer_email")).collect())
    }

    /// Every distinct customer with at least one PAID entry for a published
    /// series course. The comprehensive-repair population.
    pub async fn distinct_series_customers(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT le.customer_email FROM ledger_entries le
            JOIN courses c ON c.id = le.course_id
            WHERE le.status = 'PAID' AND c.series_name IS NOT NULL AND c.published = 1
            ORDER BY le.customer_email
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.get("customer_email")).collect())
    }

    /// Distinct series the customer holds at least one PAID entry in.
    pub async fn distinct_series_for_customer(&self, email: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT c.series_name FROM ledger_entries le
            JOIN courses c ON c.id = le.course_id
            WHERE le.customer_email = ? AND le.status = 'PAID'
              AND c.series_name IS NOT NULL AND c.published = 1
            ORDER BY c.series_name
            "#,
        )
        .bind(normalize_email(email))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| r.get("series_name")).collect())
    }

    /// Per-series (total published courses, courses granted) pairs for one
    /// customer, over every series the customer touches.
    pub async fn series_progress_for_customer(
        &self,
        email: &str,
    ) -> Result<Vec<(String, i64, i64)>> {
        let email = normalize_email(email);
        let rows = sqlx::query(
            r#"
            SELECT c.series_name AS series_name,
                   COUNT(*) AS total_courses,
                   SUM(CASE WHEN le.id IS NOT NULL THEN 1 ELSE 0 END) AS granted_courses
            FROM courses c
            LEFT JOIN ledger_entries le
                   ON le.course_id = c.id AND le.customer_email = ? AND le.status = 'PAID'
            WHERE c.published = 1 AND c.series_name IN (
                SELECT DISTINCT c2.series_name FROM ledger_entries le2
                JOIN courses c2 ON c2.id = le2.course_id
                WHERE le2.customer_email = ? AND le2.status = 'PAID'
                  AND c2.series_name IS NOT NULL AND c2.published = 1
            )
            GROUP BY c.series_name
            ORDER BY c.series_name
            "#,
        )
        .bind(&email)
        .bind(&email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get("series_name"), r.get("total_courses"), r.get("granted_courses")))
            .collect())
    }
}

fn row_to_entry(row: SqliteRow) -> Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: row.get("id"),
        customer_email: row.get("customer_email"),
        course_id: row.get("course_id"),
        customer_name: row.get("customer_name"),
        customer_phone: row.get("customer_phone"),
        price_cents: row.get("price_cents"),
        status: PaymentStatus::parse(row.get::<String, _>("status").as_str())?,
        payment_method: row.get("payment_method"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
