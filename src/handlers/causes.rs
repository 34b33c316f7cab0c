use crate::{
    errors::AppResult,
    models::{ApiResponse, DonationCause},
    state::AppState,
};
use axum::{Json, extract::State};

/// List active donation causes
#[utoipa::path(
    get,
    path = "/api/v1/donation-causes",
    responses(
        (status = 200, description = "Active causes ordered by name", body = Vec<DonationCause>),
    ),
    tag = "Donations"
)]
pub async fn list_causes(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<DonationCause>>>> {
    let causes = state.store.list_causes(true).await?;
    Ok(Json(ApiResponse::ok(causes)))
}
