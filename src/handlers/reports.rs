// src/handlers/reports.rs

use crate::{
    auth::{AuthUser, FINANCE},
    errors::AppResult,
    models::{
        ApiResponse, DashboardStats, Donation, DonationFilter, FinancialBreakdown,
        TaxReceiptReport,
    },
    services::reports,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
};

#[utoipa::path(
    get,
    path = "/api/v1/reports/dashboard",
    responses(
        (status = 200, description = "Headline figures", body = DashboardStats),
        (status = 403, description = "Insufficient permissions"),
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn dashboard(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    auth.require_role(FINANCE)?;
    Ok(Json(ApiResponse::ok(reports::dashboard(&state).await?)))
}

/// Donation report with the same filters as the donation list
#[utoipa::path(
    get,
    path = "/api/v1/reports/donations",
    params(DonationFilter),
    responses((status = 200, description = "Donations", body = Vec<Donation>)),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn donations(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<DonationFilter>,
) -> AppResult<Json<ApiResponse<Vec<Donation>>>> {
    auth.require_role(FINANCE)?;
    Ok(Json(ApiResponse::ok(
        state.store.list_donations(&filter).await?,
    )))
}

/// Validated donations grouped by cause
#[utoipa::path(
    get,
    path = "/api/v1/reports/financial/by-cause",
    params(DonationFilter),
    responses((status = 200, description = "Totals per cause", body = Vec<FinancialBreakdown>)),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn by_cause(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<DonationFilter>,
) -> AppResult<Json<ApiResponse<Vec<FinancialBreakdown>>>> {
    auth.require_role(FINANCE)?;
    Ok(Json(ApiResponse::ok(reports::by_cause(&state, &filter).await?)))
}

/// Validated donations grouped by payment type
#[utoipa::path(
    get,
    path = "/api/v1/reports/financial/by-type",
    params(DonationFilter),
    responses((status = 200, description = "Totals per type", body = Vec<FinancialBreakdown>)),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn by_type(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<DonationFilter>,
) -> AppResult<Json<ApiResponse<Vec<FinancialBreakdown>>>> {
    auth.require_role(FINANCE)?;
    Ok(Json(ApiResponse::ok(reports::by_type(&state, &filter).await?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/tax-receipts/{fiscal_year}",
    params(("fiscal_year" = i32, Path, description = "Fiscal year")),
    responses((status = 200, description = "Receipts issued for the year", body = TaxReceiptReport)),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn tax_receipts(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(fiscal_year): Path<i32>,
) -> AppResult<Json<ApiResponse<TaxReceiptReport>>> {
    auth.require_role(FINANCE)?;
    Ok(Json(ApiResponse::ok(
        reports::tax_receipt_report(&state, fiscal_year).await?,
    )))
}

/// Download donations as CSV
#[utoipa::path(
    get,
    path = "/api/v1/reports/export/csv",
    params(DonationFilter),
    responses((status = 200, description = "CSV file", content_type = "text/csv", body = String)),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn export_csv(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<DonationFilter>,
) -> AppResult<impl IntoResponse> {
    auth.require_role(FINANCE)?;
    let csv = reports::export_csv(&state, &filter).await?;
    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"donations.csv\""),
        ],
        csv,
    ))
}
