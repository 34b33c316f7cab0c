// src/handlers/receipts.rs

use crate::{
    auth::{AuthUser, FINANCE, STAFF, approved_donor},
    errors::AppResult,
    models::{
        ApiResponse, Receipt, ReceiptDownload, ReceiptFilter, ReconcileQuery,
        ReconciliationSummary, YearEndStatus,
    },
    services::receipts::{
        ReconcileScope, accessible_receipt, download_receipt, generate_for_donor, lock_year,
        reconcile_year, unlock_year, visible_receipts, year_status,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;
use uuid::Uuid;

/// Issue year-end tax receipts for every donor (or one donor) with
/// validated donations in the fiscal year
#[utoipa::path(
    post,
    path = "/api/v1/receipts/year-end/{fiscal_year}",
    params(
        ("fiscal_year" = i32, Path, description = "Fiscal (calendar) year"),
        ReconcileQuery,
    ),
    responses(
        (status = 200, description = "Reconciliation finished", body = ReconciliationSummary),
        (status = 400, description = "Invalid year"),
        (status = 403, description = "Insufficient permissions"),
    ),
    security(("bearer_auth" = [])),
    tag = "Receipts"
)]
pub async fn reconcile(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(fiscal_year): Path<i32>,
    Query(query): Query<ReconcileQuery>,
) -> AppResult<Json<ApiResponse<ReconciliationSummary>>> {
    auth.require_role(FINANCE)?;
    info!("Year-end reconciliation for {} started by {}", fiscal_year, auth.id);

    let scope = match query.donor_id {
        Some(donor_id) => ReconcileScope::Donor(donor_id),
        None => ReconcileScope::AllDonors,
    };
    let summary = reconcile_year(&state, fiscal_year, scope).await?;
    Ok(Json(ApiResponse::ok(summary)))
}

/// Let donors see and generate their receipts for a year
#[utoipa::path(
    post,
    path = "/api/v1/receipts/year-end/{fiscal_year}/unlock",
    params(("fiscal_year" = i32, Path, description = "Fiscal year")),
    responses((status = 200, description = "Year unlocked", body = YearEndStatus)),
    security(("bearer_auth" = [])),
    tag = "Receipts"
)]
pub async fn unlock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(fiscal_year): Path<i32>,
) -> AppResult<Json<ApiResponse<YearEndStatus>>> {
    auth.require_role(FINANCE)?;
    let status = unlock_year(&state, fiscal_year).await?;
    info!("Receipts for {} unlocked by {}", fiscal_year, auth.id);
    Ok(Json(ApiResponse::ok(status)))
}

/// Hide a year's receipts from donors again
#[utoipa::path(
    post,
    path = "/api/v1/receipts/year-end/{fiscal_year}/lock",
    params(("fiscal_year" = i32, Path, description = "Fiscal year")),
    responses((status = 200, description = "Year locked", body = YearEndStatus)),
    security(("bearer_auth" = [])),
    tag = "Receipts"
)]
pub async fn lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(fiscal_year): Path<i32>,
) -> AppResult<Json<ApiResponse<YearEndStatus>>> {
    auth.require_role(FINANCE)?;
    let status = lock_year(&state, fiscal_year).await?;
    info!("Receipts for {} locked by {}", fiscal_year, auth.id);
    Ok(Json(ApiResponse::ok(status)))
}

#[utoipa::path(
    get,
    path = "/api/v1/receipts/year-end/{fiscal_year}/status",
    params(("fiscal_year" = i32, Path, description = "Fiscal year")),
    responses((status = 200, description = "Lock status", body = YearEndStatus)),
    security(("bearer_auth" = [])),
    tag = "Receipts"
)]
pub async fn status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(fiscal_year): Path<i32>,
) -> AppResult<Json<ApiResponse<YearEndStatus>>> {
    auth.require_role(FINANCE)?;
    Ok(Json(ApiResponse::ok(year_status(&state, fiscal_year).await?)))
}

/// Generate (or fetch) the caller's own receipt for an unlocked year
#[utoipa::path(
    post,
    path = "/api/v1/receipts/self/year/{year}",
    params(("year" = i32, Path, description = "Fiscal year")),
    responses(
        (status = 200, description = "Receipt", body = Receipt),
        (status = 400, description = "No validated tax-deductible donations in that year"),
        (status = 403, description = "Year not unlocked or account pending approval"),
    ),
    security(("bearer_auth" = [])),
    tag = "Receipts"
)]
pub async fn generate_self(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> AppResult<Json<ApiResponse<Receipt>>> {
    let (_, donor) = approved_donor(&state, &auth).await?;
    let receipt = generate_for_donor(&state, &donor, year).await?;
    Ok(Json(ApiResponse::ok(receipt)))
}

/// Get a download link for a receipt PDF, rendering it on first access
#[utoipa::path(
    get,
    path = "/api/v1/receipts/{receipt_id}/download",
    params(("receipt_id" = Uuid, Path, description = "Receipt ID")),
    responses(
        (status = 200, description = "Download link", body = ReceiptDownload),
        (status = 403, description = "Not your receipt, or year locked"),
        (status = 404, description = "Receipt not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Receipts"
)]
pub async fn download(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(receipt_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReceiptDownload>>> {
    Ok(Json(ApiResponse::ok(
        download_receipt(&state, &auth, receipt_id).await?,
    )))
}

/// List the caller's receipts for unlocked years
#[utoipa::path(
    get,
    path = "/api/v1/receipts/my-receipts",
    responses((status = 200, description = "Receipts, newest first", body = Vec<Receipt>)),
    security(("bearer_auth" = [])),
    tag = "Receipts"
)]
pub async fn my_receipts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Receipt>>>> {
    let (_, donor) = approved_donor(&state, &auth).await?;
    Ok(Json(ApiResponse::ok(visible_receipts(&state, &donor).await?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/receipts",
    params(ReceiptFilter),
    responses((status = 200, description = "Receipts, newest first", body = Vec<Receipt>)),
    security(("bearer_auth" = [])),
    tag = "Receipts"
)]
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ReceiptFilter>,
) -> AppResult<Json<ApiResponse<Vec<Receipt>>>> {
    auth.require_role(STAFF)?;
    let receipts = state.store.list_receipts(None, filter.fiscal_year).await?;
    Ok(Json(ApiResponse::ok(receipts)))
}

#[utoipa::path(
    get,
    path = "/api/v1/receipts/{receipt_id}",
    params(("receipt_id" = Uuid, Path, description = "Receipt ID")),
    responses(
        (status = 200, description = "Receipt", body = Receipt),
        (status = 404, description = "Receipt not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Receipts"
)]
pub async fn get(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(receipt_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Receipt>>> {
    Ok(Json(ApiResponse::ok(
        accessible_receipt(&state, &auth, receipt_id).await?,
    )))
}
