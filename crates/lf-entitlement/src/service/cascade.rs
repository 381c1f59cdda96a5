//! Chapter Access Cascade
//!
//! Given one (email, course) grant, unlocks every chapter of the course
//! for the customer's resolved account. Guests defer: the unlock is
//! retried when an account is created for the email. Idempotent and
//! monotonic; re-running over an unlocked course changes nothing.

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::repository::{ChapterAccessRepository, ChapterRepository};
use crate::service::identity::{IdentityLinker, IdentityResolution};

/// Outcome of one cascade. Deferral is an expected steady state for
/// guest purchasers, not a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOutcome {
    /// No account is linked to the email yet; chapters stay locked until
    /// the account-creation collaborator replays the cascade.
    Deferred,
    Unlocked {
        account_id: String,
        /// Chapters newly unlocked by this call (already-open ones are
        /// not counted).
        chapters_unlocked: u64,
    },
}

#[derive(Clone)]
pub struct ChapterAccessCascade {
    identity: IdentityLinker,
    chapter_repo: Arc<ChapterRepository>,
    access_repo: Arc<ChapterAccessRepository>,
}

impl ChapterAccessCascade {
    pub fn new(
        identity: IdentityLinker,
        chapter_repo: Arc<ChapterRepository>,
        access_repo: Arc<ChapterAccessRepository>,
    ) -> Self {
        Self { identity, chapter_repo, access_repo }
    }

    pub async fn unlock_course(
        &self,
        customer_email: &str,
        course_id: &str,
    ) -> Result<CascadeOutcome> {
        let account_id = match self.identity.resolve(customer_email).await? {
            IdentityResolution::Linked { account_id } => account_id,
            IdentityResolution::Unresolved => {
                debug!(
                    customer = %customer_email,
                    course = %course_id,
                    "no linked account; chapter unlock deferred"
                );
                return Ok(CascadeOutcome::Deferred);
            }
        };

        let chapters = self.chapter_repo.list_for_course(course_id).await?;
        let now = Utc::now();
        let mut newly_unlocked = 0u64;
        for chapter in &chapters {
            if self.access_repo.unlock(&account_id, &chapter.id, now).await? {
                newly_unlocked += 1;
            }
        }

        if newly_unlocked > 0 {
            debug!(
                account = %account_id,
                course = %course_id,
                chapters = newly_unlocked,
                "chapters unlocked"
            );
        }

        Ok(CascadeOutcome::Unlocked {
            account_id,
            chapters_unlocked: newly_unlocked,
        })
    }
}
