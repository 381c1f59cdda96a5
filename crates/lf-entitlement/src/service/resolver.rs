//! Entitlement Resolver
//!
//! Pure read: given a customer and a series (or a course that belongs to
//! one), computes which sibling courses the customer already holds and
//! which are missing. Series membership is evaluated against the current
//! published state on every call; nothing is cached. Safe to call
//! repeatedly and concurrently.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::Course;
use crate::error::{EntitlementError, Result};
use crate::repository::{CourseRepository, LedgerRepository};

/// A customer's standing in one series.
#[derive(Debug, Clone)]
pub struct SeriesEntitlement {
    pub customer_email: String,
    pub series_name: String,
    /// Every published course of the series, ascending part order.
    pub courses: Vec<Course>,
    /// Course ids the customer already holds PAID entries for.
    pub satisfied: HashSet<String>,
    /// full - satisfied, ascending part order.
    pub missing: Vec<Course>,
}

#[derive(Clone)]
pub struct EntitlementResolver {
    course_repo: Arc<CourseRepository>,
    ledger_repo: Arc<LedgerRepository>,
}

impl EntitlementResolver {
    pub fn new(course_repo: Arc<CourseRepository>, ledger_repo: Arc<LedgerRepository>) -> Self {
        Self { course_repo, ledger_repo }
    }

    /// Resolve from a triggering course (one that just became PAID or was
    /// just published). Returns None for courses outside any series.
    pub async fn resolve_for_course(
        &self,
        customer_email: &str,
        course_id: &str,
    ) -> Result<Option<SeriesEntitlement>> {
        let course = self
            .course_repo
            .find_by_id(course_id)
            .await?
            .ok_or_else(|| EntitlementError::course_not_found(course_id))?;

        match course.series_name {
            Some(series_name) => self
                .resolve_series(customer_email, &series_name)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    pub async fn resolve_series(
        &self,
        customer_email: &str,
        series_name: &str,
    ) -> Result<SeriesEntitlement> {
        let courses = self.course_repo.published_series(series_name).await?;
        if courses.is_empty() {
            return Err(EntitlementError::SeriesNotFound {
                name: series_name.to_string(),
            });
        }

        let satisfied: HashSet<String> = self
            .ledger_repo
            .paid_series_course_ids(customer_email, series_name)
            .await?
            .into_iter()
            .collect();

        let missing: Vec<Course> = courses
            .iter()
            .filter(|c| !satisfied.contains(&c.id))
            .cloned()
            .collect();

        Ok(SeriesEntitlement {
            customer_email: customer_email.to_string(),
            series_name: series_name.to_string(),
            courses,
            satisfied,
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::domain::{LedgerEntry, PaymentStatus};
    use sqlx::SqlitePool;

    async fn setup() -> (SqlitePool, EntitlementResolver, Arc<CourseRepository>, Arc<LedgerRepository>) {
        let pool = db::connect_in_memory().await.unwrap();
        db::init_schema(&pool).await.unwrap();
        let course_repo = Arc::new(CourseRepository::new(pool.clone()));
        let ledger_repo = Arc::new(LedgerRepository::new(pool.clone()));
        let resolver = EntitlementResolver::new(course_repo.clone(), ledger_repo.clone());
        (pool, resolver, course_repo, ledger_repo)
    }

    async fn paid_entry(ledger_repo: &LedgerRepository, email: &str, course_id: &str) {
        let entry = LedgerEntry::new_pending(email, course_id, 4900, "CARD");
        ledger_repo.insert_pending(&entry).await.unwrap();
        let paid = ledger_repo.mark_paid(&entry.id).await.unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_non_series_course_resolves_to_none() {
        let (_pool, resolver, course_repo, _ledger_repo) = setup().await;
        let course = Course::new("Standalone", 1900).with_published(true);
        course_repo.insert(&course).await.unwrap();

        let resolved = resolver
            .resolve_for_course("jane@example.com", &course.id)
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_missing_is_full_minus_satisfied_in_part_order() {
        let (_pool, resolver, course_repo, ledger_repo) = setup().await;

        // Inserted out of part order on purpose
        let part3 = Course::new("Part 3", 4900).with_series("Paint Correction", 3).with_published(true);
        let part1 = Course::new("Part 1", 4900).with_series("Paint Correction", 1).with_published(true);
        let part2 = Course::new("Part 2", 4900).with_series("Paint Correction", 2).with_published(true);
        let draft = Course::new("Part 4", 4900).with_series("Paint Correction", 4);
        for c in [&part3, &part1, &part2, &draft] {
            course_repo.insert(c).await.unwrap();
        }

        paid_entry(&ledger_repo, "jane@example.com", &part2.id).await;

        let ent = resolver
            .resolve_series("jane@example.com", "Paint Correction")
            .await
            .unwrap();

        // Unpublished part 4 does not participate
        assert_eq!(ent.courses.len(), 3);
        assert!(ent.satisfied.contains(&part2.id));
        let missing_ids: Vec<&str> = ent.missing.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(missing_ids, vec![part1.id.as_str(), part3.id.as_str()]);
    }

    #[tokio::test]
    async fn test_unknown_series_is_an_error() {
        let (_pool, resolver, _course_repo, _ledger_repo) = setup().await;
        let err = resolver
            .resolve_series("jane@example.com", "No Such Series")
            .await
            .unwrap_err();
        assert!(matches!(err, EntitlementError::SeriesNotFound { .. }));
    }
}
