// src/handlers/donations.rs

use crate::{
    auth::{ADMIN, AuthUser, FINANCE, STAFF, approved_donor},
    errors::{AppError, AppResult},
    models::{
        ApiResponse, CreateDonationRequest, Donation, DonationFilter, UpdateDonationRequest,
        ValidateDonationRequest, parse_booleanish,
    },
    services::donations::{
        Attachment, DonationOrigin, create_donation, delete_donation, update_donation,
        validate_donation,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{StatusCode, header::CONTENT_TYPE},
};
use uuid::Uuid;

/// Record a donation as an approved donor; staff validate it later
#[utoipa::path(
    post,
    path = "/api/v1/donations",
    request_body = CreateDonationRequest,
    responses(
        (status = 201, description = "Donation recorded, pending validation", body = Donation),
        (status = 403, description = "Account pending approval"),
        (status = 404, description = "Donor profile not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donations"
)]
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateDonationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Donation>>)> {
    let (user, donor) = approved_donor(&state, &auth).await?;
    let donation =
        create_donation(&state, Some((&user, &donor)), body, DonationOrigin::Donor).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(donation))))
}

/// Record a walk-in donation without an account
#[utoipa::path(
    post,
    path = "/api/v1/donations/public",
    request_body = CreateDonationRequest,
    responses(
        (status = 201, description = "Donation recorded as received", body = Donation),
        (status = 400, description = "Validation error"),
    ),
    tag = "Donations"
)]
pub async fn create_public(
    State(state): State<AppState>,
    Json(body): Json<CreateDonationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Donation>>)> {
    let donation = create_donation(&state, None, body, DonationOrigin::WalkIn).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(donation))))
}

/// List donations, newest first
#[utoipa::path(
    get,
    path = "/api/v1/donations",
    params(DonationFilter),
    responses(
        (status = 200, description = "Donations", body = Vec<Donation>),
        (status = 403, description = "Insufficient permissions"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donations"
)]
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<DonationFilter>,
) -> AppResult<Json<ApiResponse<Vec<Donation>>>> {
    auth.require_role(STAFF)?;
    Ok(Json(ApiResponse::ok(
        state.store.list_donations(&filter).await?,
    )))
}

/// List the caller's own donations
#[utoipa::path(
    get,
    path = "/api/v1/donations/my-donations",
    responses(
        (status = 200, description = "Donations, newest first", body = Vec<Donation>),
        (status = 403, description = "Account pending approval"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donations"
)]
pub async fn my_donations(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Donation>>>> {
    let (_, donor) = approved_donor(&state, &auth).await?;
    let donations = state
        .store
        .list_donations(&DonationFilter {
            donor_id: Some(donor.id),
            ..Default::default()
        })
        .await?;
    Ok(Json(ApiResponse::ok(donations)))
}

/// Get a donation
#[utoipa::path(
    get,
    path = "/api/v1/donations/{donation_id}",
    params(("donation_id" = Uuid, Path, description = "Donation ID")),
    responses(
        (status = 200, description = "Donation", body = Donation),
        (status = 403, description = "Not your donation"),
        (status = 404, description = "Donation not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donations"
)]
pub async fn get(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(donation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Donation>>> {
    let donation = state
        .store
        .find_donation(donation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Donation {} not found", donation_id)))?;

    if !auth.is_staff() {
        let (_, donor) = approved_donor(&state, &auth).await?;
        if donation.donor_id != Some(donor.id) {
            return Err(AppError::Forbidden(
                "You can only view your own donations".to_string(),
            ));
        }
    }
    Ok(Json(ApiResponse::ok(donation)))
}

/// Edit a donation that is still pending validation
#[utoipa::path(
    patch,
    path = "/api/v1/donations/{donation_id}",
    params(("donation_id" = Uuid, Path, description = "Donation ID")),
    request_body = UpdateDonationRequest,
    responses(
        (status = 200, description = "Donation updated", body = Donation),
        (status = 409, description = "Donation already decided"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donations"
)]
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(donation_id): Path<Uuid>,
    Json(body): Json<UpdateDonationRequest>,
) -> AppResult<Json<ApiResponse<Donation>>> {
    auth.require_role(FINANCE)?;
    let donation = update_donation(&state, donation_id, body).await?;
    Ok(Json(ApiResponse::ok(donation)))
}

/// Delete a donation that has not been validated
#[utoipa::path(
    delete,
    path = "/api/v1/donations/{donation_id}",
    params(("donation_id" = Uuid, Path, description = "Donation ID")),
    responses(
        (status = 200, description = "Donation deleted"),
        (status = 409, description = "Validated donations cannot be deleted"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donations"
)]
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(donation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    auth.require_role(ADMIN)?;
    delete_donation(&state, donation_id).await?;
    Ok(Json(ApiResponse::message("Donation deleted")))
}

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {}", e))
}

async fn read_validation_form(
    mut multipart: Multipart,
) -> AppResult<(bool, Option<String>, Option<Attachment>)> {
    let mut approved = None;
    let mut remarks = None;
    let mut attachment = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "approved" => {
                let text = field.text().await.map_err(multipart_error)?;
                approved = Some(parse_booleanish(&text));
            }
            "remarks" => {
                let text = field.text().await.map_err(multipart_error)?;
                remarks = Some(text).filter(|r| !r.trim().is_empty());
            }
            "attachment" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if !bytes.is_empty() {
                    attachment = Some(Attachment {
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    let approved =
        approved.ok_or_else(|| AppError::Validation("approved is required".to_string()))?;
    Ok((approved, remarks, attachment))
}

/// Approve or reject a pending donation. Accepts JSON, or multipart form data
/// with an optional `attachment` (PNG, JPEG or PDF, up to 5 MB).
#[utoipa::path(
    patch,
    path = "/api/v1/donations/{donation_id}/validate",
    params(("donation_id" = Uuid, Path, description = "Donation ID")),
    request_body = ValidateDonationRequest,
    responses(
        (status = 200, description = "Decision recorded", body = Donation),
        (status = 400, description = "Invalid input or attachment"),
        (status = 409, description = "Donation already decided"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donations"
)]
pub async fn validate(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(donation_id): Path<Uuid>,
    request: Request,
) -> AppResult<Json<ApiResponse<Donation>>> {
    auth.require_role(FINANCE)?;

    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let (approved, remarks, attachment) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(multipart_error)?;
        read_validation_form(multipart).await?
    } else {
        let Json(body) = Json::<ValidateDonationRequest>::from_request(request, &state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        (body.approved, body.remarks, None)
    };

    let donation = validate_donation(&state, donation_id, approved, remarks, attachment).await?;
    let message = if approved {
        "Donation validated"
    } else {
        "Donation cancelled"
    };
    Ok(Json(ApiResponse::with_message(donation, message)))
}
