//! Reconciliation Admin API
//!
//! Operator surface: trigger the comprehensive repair, watch it run, and
//! inspect a customer's per-series standing.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use lf_entitlement::{
    ReconciliationScheduler, RepairProgressSnapshot, RepairReport, SeriesStatus,
    SeriesStatusService,
};

use crate::api::common::ApiFailure;

/// Reconciliation admin state
#[derive(Clone)]
pub struct ReconciliationState {
    pub scheduler: Arc<ReconciliationScheduler>,
    pub status: SeriesStatusService,
}

/// Repair trigger response
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairStartedResponse {
    /// False when a repair run was already in flight
    pub started: bool,
}

/// Repair status response: live counters plus the last finished report
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepairStatusResponse {
    pub progress: RepairProgressSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<RepairReport>,
}

/// Trigger the comprehensive repair in the background
#[utoipa::path(
    post,
    path = "/repair",
    tag = "reconciliation",
    responses(
        (status = 200, description = "Repair started (or already running)", body = RepairStartedResponse)
    )
)]
pub async fn trigger_repair(
    State(state): State<ReconciliationState>,
) -> Json<RepairStartedResponse> {
    let started = state.scheduler.clone().spawn_repair();
    Json(RepairStartedResponse { started })
}

/// Live repair progress and the last completed report
#[utoipa::path(
    get,
    path = "/repair",
    tag = "reconciliation",
    responses(
        (status = 200, description = "Repair status", body = RepairStatusResponse)
    )
)]
pub async fn repair_status(
    State(state): State<ReconciliationState>,
) -> Json<RepairStatusResponse> {
    Json(RepairStatusResponse {
        progress: state.scheduler.progress(),
        last_report: state.scheduler.last_repair().await,
    })
}

/// Per-series standing for one customer
#[utoipa::path(
    get,
    path = "/status/{email}",
    tag = "reconciliation",
    params(("email" = String, Path, description = "Customer email")),
    responses(
        (status = 200, description = "Series standing", body = Vec<SeriesStatus>)
    )
)]
pub async fn customer_status(
    State(state): State<ReconciliationState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<SeriesStatus>>, ApiFailure> {
    let statuses = state.status.for_customer(&email).await?;
    Ok(Json(statuses))
}

/// Create reconciliation admin router
pub fn reconciliation_router(state: ReconciliationState) -> Router {
    Router::new()
        .route("/repair", post(trigger_repair).get(repair_status))
        .route("/status/:email", get(customer_status))
        .with_state(state)
}
