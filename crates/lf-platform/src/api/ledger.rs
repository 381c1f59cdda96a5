//! Ledger API
//!
//! Checkout creation plus the payment-gateway transition hooks. The
//! confirm hook is the Mode A trigger: it marks the entry PAID and fires
//! the point unlock as a detached task, so reconciliation can never fail
//! or delay the payment response.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use lf_entitlement::domain::LedgerEntry;
use lf_entitlement::repository::{CourseRepository, LedgerRepository};
use lf_entitlement::{EntitlementError, ReconciliationScheduler};

use crate::api::common::ApiFailure;

/// Ledger service state
#[derive(Clone)]
pub struct LedgerState {
    pub ledger_repo: Arc<LedgerRepository>,
    pub course_repo: Arc<CourseRepository>,
    pub scheduler: Arc<ReconciliationScheduler>,
}

/// Checkout request DTO
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub customer_email: String,
    pub course_id: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub payment_method: String,
}

/// Ledger entry response DTO
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    pub id: String,
    pub customer_email: String,
    pub course_id: String,
    pub price_cents: i64,
    pub status: String,
    pub payment_method: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            customer_email: entry.customer_email,
            course_id: entry.course_id,
            price_cents: entry.price_cents,
            status: entry.status.to_string(),
            payment_method: entry.payment_method,
            created_at: entry.created_at.to_rfc3339(),
            updated_at: entry.updated_at.to_rfc3339(),
        }
    }
}

/// Create a PENDING ledger entry at checkout
#[utoipa::path(
    post,
    path = "",
    tag = "checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checkout created", body = LedgerEntryResponse),
        (status = 404, description = "Course not found"),
        (status = 409, description = "Customer already holds an entry for this course")
    )
)]
pub async fn create_checkout(
    State(state): State<LedgerState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<LedgerEntryResponse>, ApiFailure> {
    let course = state
        .course_repo
        .find_by_id(&request.course_id)
        .await?
        .ok_or_else(|| EntitlementError::course_not_found(&request.course_id))?;

    if !course.published {
        return Err(EntitlementError::validation(format!(
            "course {} is not published",
            course.id
        ))
        .into());
    }

    let entry = LedgerEntry::new_pending(
        &request.customer_email,
        &course.id,
        course.price_cents,
        &request.payment_method,
    )
    .with_customer(request.customer_name, request.customer_phone);

    state.ledger_repo.insert_pending(&entry).await?;

    Ok(Json(entry.into()))
}

/// Get a ledger entry
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "ledger",
    params(("id" = String, Path, description = "Ledger entry ID")),
    responses(
        (status = 200, description = "Ledger entry found", body = LedgerEntryResponse),
        (status = 404, description = "Ledger entry not found")
    )
)]
pub async fn get_ledger_entry(
    State(state): State<LedgerState>,
    Path(id): Path<String>,
) -> Result<Json<LedgerEntryResponse>, ApiFailure> {
    let entry = state
        .ledger_repo
        .find_by_id(&id)
        .await?
        .ok_or(EntitlementError::LedgerEntryNotFound { id })?;
    Ok(Json(entry.into()))
}

/// Gateway success hook: PENDING -> PAID, then reactive point unlock.
///
/// The point unlock runs detached; its outcome never changes the response
/// already decided for the payment confirmation.
#[utoipa::path(
    post,
    path = "/{id}/confirm",
    tag = "ledger",
    params(("id" = String, Path, description = "Ledger entry ID")),
    responses(
        (status = 200, description = "Payment confirmed", body = LedgerEntryResponse),
        (status = 404, description = "Ledger entry not found"),
        (status = 409, description = "Entry is not PENDING")
    )
)]
pub async fn confirm_payment(
    State(state): State<LedgerState>,
    Path(id): Path<String>,
) -> Result<Json<LedgerEntryResponse>, ApiFailure> {
    let entry = state.ledger_repo.mark_paid(&id).await?;

    state
        .scheduler
        .clone()
        .spawn_reconcile_purchase(entry.customer_email.clone(), entry.course_id.clone());

    Ok(Json(entry.into()))
}

/// Gateway failure hook: PENDING -> FAILED
#[utoipa::path(
    post,
    path = "/{id}/fail",
    tag = "ledger",
    params(("id" = String, Path, description = "Ledger entry ID")),
    responses(
        (status = 200, description = "Payment marked failed", body = LedgerEntryResponse),
        (status = 409, description = "Entry is not PENDING")
    )
)]
pub async fn fail_payment(
    State(state): State<LedgerState>,
    Path(id): Path<String>,
) -> Result<Json<LedgerEntryResponse>, ApiFailure> {
    let entry = state.ledger_repo.mark_failed(&id).await?;
    Ok(Json(entry.into()))
}

/// Checkout abandonment hook: PENDING -> CANCELLED
#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tag = "ledger",
    params(("id" = String, Path, description = "Ledger entry ID")),
    responses(
        (status = 200, description = "Checkout cancelled", body = LedgerEntryResponse),
        (status = 409, description = "Entry is not PENDING")
    )
)]
pub async fn cancel_payment(
    State(state): State<LedgerState>,
    Path(id): Path<String>,
) -> Result<Json<LedgerEntryResponse>, ApiFailure> {
    let entry = state.ledger_repo.mark_cancelled(&id).await?;
    Ok(Json(entry.into()))
}

/// External refund hook: PAID -> REFUNDED. Grants and chapter access for
/// sibling courses are not reversed.
#[utoipa::path(
    post,
    path = "/{id}/refund",
    tag = "ledger",
    params(("id" = String, Path, description = "Ledger entry ID")),
    responses(
        (status = 200, description = "Payment refunded", body = LedgerEntryResponse),
        (status = 409, description = "Entry is not PAID")
    )
)]
pub async fn refund_payment(
    State(state): State<LedgerState>,
    Path(id): Path<String>,
) -> Result<Json<LedgerEntryResponse>, ApiFailure> {
    let entry = state.ledger_repo.mark_refunded(&id).await?;
    Ok(Json(entry.into()))
}

/// Create checkout router
pub fn checkout_router(state: LedgerState) -> Router {
    Router::new()
        .route("/", post(create_checkout))
        .with_state(state)
}

/// Create ledger transitions router
pub fn ledger_router(state: LedgerState) -> Router {
    Router::new()
        .route("/:id", get(get_ledger_entry))
        .route("/:id/confirm", post(confirm_payment))
        .route("/:id/fail", post(fail_payment))
        .route("/:id/cancel", post(cancel_payment))
        .route("/:id/refund", post(refund_payment))
        .with_state(state)
}
