//! Accounts API
//!
//! Account creation for customers. This is the account-creation
//! collaborator of the entitlement engine: once the account row exists,
//! the chapter access cascade is replayed over every PAID ledger entry
//! already held by that email, unlocking everything a guest purchaser had
//! earned. Cascade trouble is reported but never rolls back the account.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

use lf_entitlement::domain::Account;
use lf_entitlement::repository::{AccountRepository, LedgerRepository};
use lf_entitlement::{CascadeOutcome, ChapterAccessCascade, EntitlementError};

use crate::api::common::ApiFailure;

/// Accounts service state
#[derive(Clone)]
pub struct AccountsState {
    pub account_repo: Arc<AccountRepository>,
    pub ledger_repo: Arc<LedgerRepository>,
    pub cascade: ChapterAccessCascade,
}

/// Account creation request DTO
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub email: String,
    pub display_name: Option<String>,
}

/// Account response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: String,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            display_name: account.display_name,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Account creation response including the retroactive unlock summary
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountResponse {
    pub account: AccountResponse,
    /// PAID ledger entries the cascade was replayed for
    pub courses_processed: u64,
    pub chapters_unlocked: u64,
    /// Cascade errors, if any; account creation itself succeeded
    pub unlock_errors: Vec<String>,
}

/// Create an account and retroactively unlock purchased chapters
#[utoipa::path(
    post,
    path = "",
    tag = "accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 200, description = "Account created", body = CreateAccountResponse),
        (status = 409, description = "Account already exists for this email")
    )
)]
pub async fn create_account(
    State(state): State<AccountsState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Json<CreateAccountResponse>, ApiFailure> {
    let mut account = Account::new(&request.email);
    if let Some(display_name) = request.display_name {
        account = account.with_display_name(display_name);
    }
    state.account_repo.insert(&account).await?;

    // Retroactive unlock contract: cascade once per existing PAID entry.
    let mut courses_processed = 0u64;
    let mut chapters_unlocked = 0u64;
    let mut unlock_errors = Vec::new();
    let entries = state.ledger_repo.list_paid_for_email(&account.email).await?;
    for entry in entries {
        courses_processed += 1;
        match state
            .cascade
            .unlock_course(&entry.customer_email, &entry.course_id)
            .await
        {
            Ok(CascadeOutcome::Unlocked { chapters_unlocked: n, .. }) => chapters_unlocked += n,
            Ok(CascadeOutcome::Deferred) => {
                // Cannot happen right after insert, but harmless if it does
            }
            Err(e) => {
                warn!(
                    account = %account.id,
                    course = %entry.course_id,
                    error = %e,
                    "retroactive unlock failed"
                );
                unlock_errors.push(format!("course {}: {}", entry.course_id, e));
            }
        }
    }

    Ok(Json(CreateAccountResponse {
        account: account.into(),
        courses_processed,
        chapters_unlocked,
        unlock_errors,
    }))
}

/// Get an account by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "accounts",
    params(("id" = String, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account found", body = AccountResponse),
        (status = 404, description = "Account not found")
    )
)]
pub async fn get_account(
    State(state): State<AccountsState>,
    Path(id): Path<String>,
) -> Result<Json<AccountResponse>, ApiFailure> {
    let account = state
        .account_repo
        .find_by_id(&id)
        .await?
        .ok_or(EntitlementError::AccountNotFound { id })?;
    Ok(Json(account.into()))
}

/// Create accounts router
pub fn accounts_router(state: AccountsState) -> Router {
    Router::new()
        .route("/", post(create_account))
        .route("/:id", get(get_account))
        .with_state(state)
}
