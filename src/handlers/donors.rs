use crate::{
    auth::{ADMIN, AuthUser, FINANCE, STAFF, approved_donor},
    errors::{AppError, AppResult},
    models::{
        ApiResponse, CreateDonorRequest, Donor, DonorProfile, DonorQuery, DonorRemoval, NewDonor,
        UpdateDonorRequest,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::info;
use uuid::Uuid;

async fn profile(state: &AppState, donor: Donor) -> AppResult<DonorProfile> {
    let family_members = state.store.family_members(donor.id).await?;
    Ok(DonorProfile {
        donor,
        family_members,
    })
}

async fn find_donor(state: &AppState, id: Uuid) -> AppResult<Donor> {
    state
        .store
        .find_donor(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Donor {} not found", id)))
}

async fn own_donor(state: &AppState, auth: &AuthUser) -> AppResult<Donor> {
    state
        .store
        .find_donor_by_user(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Donor profile not found".to_string()))
}

fn new_donor(body: CreateDonorRequest, primary_donor_id: Option<Uuid>) -> AppResult<NewDonor> {
    if body.first_name.trim().is_empty() || body.last_name.trim().is_empty() {
        return Err(AppError::Validation(
            "First and last name are required".to_string(),
        ));
    }
    Ok(NewDonor {
        user_id: None,
        primary_donor_id,
        first_name: body.first_name.trim().to_string(),
        last_name: body.last_name.trim().to_string(),
        email: body.email.filter(|e| !e.trim().is_empty()),
        mobile: body.mobile,
        landline: body.landline,
        address: body.address,
        city: body.city,
        province: body.province,
        postal_code: body.postal_code,
        country: body.country.unwrap_or_else(|| "Canada".to_string()),
        is_active: true,
    })
}

/// Get the caller's donor profile with family members
#[utoipa::path(
    get,
    path = "/api/v1/donors/me",
    responses(
        (status = 200, description = "Donor profile", body = DonorProfile),
        (status = 404, description = "Donor profile not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donors"
)]
pub async fn get_my_profile(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<DonorProfile>>> {
    let donor = own_donor(&state, &auth).await?;
    Ok(Json(ApiResponse::ok(profile(&state, donor).await?)))
}

/// Update the caller's donor profile
#[utoipa::path(
    patch,
    path = "/api/v1/donors/me",
    request_body = UpdateDonorRequest,
    responses(
        (status = 200, description = "Profile updated", body = Donor),
        (status = 404, description = "Donor profile not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donors"
)]
pub async fn update_my_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<UpdateDonorRequest>,
) -> AppResult<Json<ApiResponse<Donor>>> {
    let donor = own_donor(&state, &auth).await?;
    let updated = state
        .store
        .update_donor(donor.id, body)
        .await?
        .ok_or_else(|| AppError::NotFound("Donor profile not found".to_string()))?;
    Ok(Json(ApiResponse::ok(updated)))
}

/// List donors
#[utoipa::path(
    get,
    path = "/api/v1/donors",
    params(DonorQuery),
    responses(
        (status = 200, description = "Donors ordered by name", body = Vec<Donor>),
        (status = 403, description = "Insufficient permissions"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donors"
)]
pub async fn list_donors(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DonorQuery>,
) -> AppResult<Json<ApiResponse<Vec<Donor>>>> {
    auth.require_role(STAFF)?;
    let donors = state
        .store
        .list_donors(query.active_only.unwrap_or(false))
        .await?;
    Ok(Json(ApiResponse::ok(donors)))
}

/// Create a donor profile without a login (walk-in or offline donors)
#[utoipa::path(
    post,
    path = "/api/v1/donors",
    request_body = CreateDonorRequest,
    responses(
        (status = 201, description = "Donor created", body = Donor),
        (status = 403, description = "Insufficient permissions"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donors"
)]
pub async fn create_donor(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateDonorRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Donor>>)> {
    auth.require_role(FINANCE)?;
    let donor = state.store.insert_donor(new_donor(body, None)?).await?;
    info!("Donor {} created by {}", donor.id, auth.id);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(donor))))
}

/// Get a donor with family members
#[utoipa::path(
    get,
    path = "/api/v1/donors/{donor_id}",
    params(("donor_id" = Uuid, Path, description = "Donor ID")),
    responses(
        (status = 200, description = "Donor profile", body = DonorProfile),
        (status = 404, description = "Donor not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donors"
)]
pub async fn get_donor(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(donor_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DonorProfile>>> {
    auth.require_role(STAFF)?;
    let donor = find_donor(&state, donor_id).await?;
    Ok(Json(ApiResponse::ok(profile(&state, donor).await?)))
}

/// Update a donor
#[utoipa::path(
    patch,
    path = "/api/v1/donors/{donor_id}",
    params(("donor_id" = Uuid, Path, description = "Donor ID")),
    request_body = UpdateDonorRequest,
    responses(
        (status = 200, description = "Donor updated", body = Donor),
        (status = 404, description = "Donor not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donors"
)]
pub async fn update_donor(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(donor_id): Path<Uuid>,
    Json(body): Json<UpdateDonorRequest>,
) -> AppResult<Json<ApiResponse<Donor>>> {
    auth.require_role(FINANCE)?;
    let donor = state
        .store
        .update_donor(donor_id, body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Donor {} not found", donor_id)))?;
    Ok(Json(ApiResponse::ok(donor)))
}

/// Delete a donor, or deactivate it when donations reference it
#[utoipa::path(
    delete,
    path = "/api/v1/donors/{donor_id}",
    params(("donor_id" = Uuid, Path, description = "Donor ID")),
    responses(
        (status = 200, description = "Donor deleted or deactivated", body = DonorRemoval),
        (status = 404, description = "Donor not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donors"
)]
pub async fn delete_donor(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(donor_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DonorRemoval>>> {
    auth.require_role(ADMIN)?;
    find_donor(&state, donor_id).await?;

    let removal = if state.store.count_donor_donations(donor_id).await? > 0 {
        state.store.set_donor_active(donor_id, false).await?;
        DonorRemoval::Deactivated
    } else {
        state.store.delete_donor(donor_id).await?;
        DonorRemoval::Deleted
    };
    info!("Donor {} {:?}", donor_id, removal);

    let message = match removal {
        DonorRemoval::Deleted => "Donor deleted",
        DonorRemoval::Deactivated => "Donor has donations and was deactivated instead",
    };
    Ok(Json(ApiResponse::with_message(removal, message)))
}

async fn check_family_access(
    state: &AppState,
    auth: &AuthUser,
    primary_id: Uuid,
    write: bool,
) -> AppResult<()> {
    let allowed_staff = if write { FINANCE } else { STAFF };
    if allowed_staff.contains(&auth.role) {
        return Ok(());
    }
    let (_, donor) = approved_donor(state, auth).await?;
    if donor.id != primary_id {
        return Err(AppError::Forbidden(
            "You can only manage your own family".to_string(),
        ));
    }
    Ok(())
}

/// List family members of a donor
#[utoipa::path(
    get,
    path = "/api/v1/donors/{donor_id}/family-members",
    params(("donor_id" = Uuid, Path, description = "Primary donor ID")),
    responses(
        (status = 200, description = "Family members", body = Vec<Donor>),
        (status = 403, description = "Not your family"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donors"
)]
pub async fn list_family_members(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(donor_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Donor>>>> {
    check_family_access(&state, &auth, donor_id, false).await?;
    find_donor(&state, donor_id).await?;
    Ok(Json(ApiResponse::ok(
        state.store.family_members(donor_id).await?,
    )))
}

/// Add a family member under a primary donor
#[utoipa::path(
    post,
    path = "/api/v1/donors/{donor_id}/family-members",
    params(("donor_id" = Uuid, Path, description = "Primary donor ID")),
    request_body = CreateDonorRequest,
    responses(
        (status = 201, description = "Family member added", body = Donor),
        (status = 400, description = "Family members cannot head a family"),
        (status = 403, description = "Not your family"),
    ),
    security(("bearer_auth" = [])),
    tag = "Donors"
)]
pub async fn add_family_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(donor_id): Path<Uuid>,
    Json(body): Json<CreateDonorRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Donor>>)> {
    check_family_access(&state, &auth, donor_id, true).await?;
    let primary = find_donor(&state, donor_id).await?;
    if primary.primary_donor_id.is_some() {
        return Err(AppError::BadRequest(
            "A family member cannot have family members of their own".to_string(),
        ));
    }

    let member = state
        .store
        .insert_donor(new_donor(body, Some(primary.id))?)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(member))))
}
