//! Identity Linker
//!
//! Resolves a customer's stable email identity to an optional registered
//! account. Purchasers may be guests who exist purely as an email; the
//! unresolved outcome is an explicit value with its own retry path (the
//! account-creation collaborator replays the cascade), never a silently
//! dropped unlock.

use std::sync::Arc;

use crate::error::Result;
use crate::repository::AccountRepository;

/// Outcome of an email -> account lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityResolution {
    Linked { account_id: String },
    Unresolved,
}

impl IdentityResolution {
    pub fn is_linked(&self) -> bool {
        matches!(self, Self::Linked { .. })
    }
}

/// Lookup-only resolver; this component never creates accounts.
#[derive(Clone)]
pub struct IdentityLinker {
    account_repo: Arc<AccountRepository>,
}

impl IdentityLinker {
    pub fn new(account_repo: Arc<AccountRepository>) -> Self {
        Self { account_repo }
    }

    pub async fn resolve(&self, email: &str) -> Result<IdentityResolution> {
        match self.account_repo.find_by_email(email).await? {
            Some(account) => Ok(IdentityResolution::Linked { account_id: account.id }),
            None => Ok(IdentityResolution::Unresolved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::domain::Account;

    #[tokio::test]
    async fn test_resolve_guest_and_registered() {
        let pool = db::connect_in_memory().await.unwrap();
        db::init_schema(&pool).await.unwrap();
        let repo = Arc::new(AccountRepository::new(pool));
        let linker = IdentityLinker::new(repo.clone());

        assert_eq!(
            linker.resolve("guest@example.com").await.unwrap(),
            IdentityResolution::Unresolved
        );

        let account = Account::new("Guest@Example.com");
        repo.insert(&account).await.unwrap();

        // Lookup joins on the normalized email
        let resolved = linker.resolve("guest@example.com").await.unwrap();
        assert_eq!(
            resolved,
            IdentityResolution::Linked { account_id: account.id }
        );
    }
}
