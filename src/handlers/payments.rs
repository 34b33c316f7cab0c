// src/handlers/payments.rs

use crate::{
    auth::{AuthUser, approved_user},
    errors::AppResult,
    models::{ApiResponse, CardPaymentRequest, CardPaymentResult, PaymentMode},
    services::payment::process_card_payment,
    state::AppState,
};
use axum::{Json, extract::State};
use chrono::Utc;
use tracing::info;

/// Authorize a card payment. Runs in test mode unless a live key is configured
/// and `mode` is `live`.
#[utoipa::path(
    post,
    path = "/api/v1/payments/card/process",
    request_body = CardPaymentRequest,
    responses(
        (status = 200, description = "Payment authorized", body = CardPaymentResult),
        (status = 400, description = "Card rejected"),
        (status = 403, description = "Account pending approval"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn process(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CardPaymentRequest>,
) -> AppResult<Json<ApiResponse<CardPaymentResult>>> {
    approved_user(&state, &auth).await?;
    let result = process_card_payment(
        body,
        state.config.payment_live_key.is_some(),
        Utc::now().date_naive(),
    )?;
    info!(
        "Card payment {} authorized for user {} ({:?})",
        result.transaction_id, auth.id, result.mode
    );
    Ok(Json(ApiResponse::ok(result)))
}

/// Always runs in test mode
#[utoipa::path(
    post,
    path = "/api/v1/payments/card/simulate",
    request_body = CardPaymentRequest,
    responses(
        (status = 200, description = "Simulated authorization", body = CardPaymentResult),
        (status = 400, description = "Card rejected"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn simulate(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(mut body): Json<CardPaymentRequest>,
) -> AppResult<Json<ApiResponse<CardPaymentResult>>> {
    approved_user(&state, &auth).await?;
    body.mode = Some(PaymentMode::Test);
    let result = process_card_payment(body, false, Utc::now().date_naive())?;
    Ok(Json(ApiResponse::ok(result)))
}
