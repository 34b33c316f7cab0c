// src/handlers/aloka_puja.rs

use crate::{
    auth::{ADMIN, AuthUser, STAFF, approved_donor},
    errors::{AppError, AppResult},
    models::{
        AlokaPuja, ApiResponse, CreateAlokaPujaRequest, NewAlokaPuja, PujaFilter,
        ReminderRunQuery, ReminderSummary, UpdateAlokaPujaRequest, UserRole,
    },
    services::reminders::{send_puja_reminders, upcoming_pujas},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

const COORDINATORS: &[UserRole] = &[UserRole::Admin, UserRole::Volunteer];

/// Loads a booking the caller may manage: staff see all, donors their own.
async fn accessible_puja(state: &AppState, auth: &AuthUser, id: Uuid) -> AppResult<AlokaPuja> {
    let puja = state
        .store
        .find_puja(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Aloka puja {} not found", id)))?;

    if auth.is_staff() {
        return Ok(puja);
    }
    let (_, donor) = approved_donor(state, auth).await?;
    if puja.donor_id != donor.id {
        return Err(AppError::Forbidden(
            "You can only manage your own bookings".to_string(),
        ));
    }
    Ok(puja)
}

#[utoipa::path(
    get,
    path = "/api/v1/aloka-puja/my-pujas",
    responses((status = 200, description = "Bookings by date", body = Vec<AlokaPuja>)),
    security(("bearer_auth" = [])),
    tag = "Aloka Puja"
)]
pub async fn my_pujas(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<AlokaPuja>>>> {
    let (_, donor) = approved_donor(&state, &auth).await?;
    let pujas = state.store.list_pujas(Some(donor.id), None, None).await?;
    Ok(Json(ApiResponse::ok(pujas)))
}

/// Book an Aloka Puja. Staff may book on behalf of a donor with `donorId`.
#[utoipa::path(
    post,
    path = "/api/v1/aloka-puja",
    request_body = CreateAlokaPujaRequest,
    responses(
        (status = 201, description = "Booking created", body = AlokaPuja),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Donor not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Aloka Puja"
)]
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<CreateAlokaPujaRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AlokaPuja>>)> {
    if body.puja_type.trim().is_empty() {
        return Err(AppError::Validation("pujaType is required".to_string()));
    }

    let donor = match body.donor_id {
        Some(donor_id) if auth.is_staff() => state
            .store
            .find_donor(donor_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Donor {} not found", donor_id)))?,
        _ => approved_donor(&state, &auth).await?.1,
    };

    let puja = state
        .store
        .insert_puja(NewAlokaPuja {
            donor_id: donor.id,
            puja_date: body.puja_date,
            puja_type: body.puja_type.trim().to_string(),
            notes: body.notes,
            notify_staff: body.notify_staff.unwrap_or(false),
            remembered_persons: body.remembered_persons,
        })
        .await?;

    info!("Aloka puja {} booked for donor {}", puja.id, donor.id);
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(puja))))
}

#[utoipa::path(
    get,
    path = "/api/v1/aloka-puja",
    params(PujaFilter),
    responses(
        (status = 200, description = "Bookings by date", body = Vec<AlokaPuja>),
        (status = 403, description = "Insufficient permissions"),
    ),
    security(("bearer_auth" = [])),
    tag = "Aloka Puja"
)]
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<PujaFilter>,
) -> AppResult<Json<ApiResponse<Vec<AlokaPuja>>>> {
    auth.require_role(STAFF)?;
    let pujas = state
        .store
        .list_pujas(filter.donor_id, filter.from, filter.to)
        .await?;
    Ok(Json(ApiResponse::ok(pujas)))
}

#[utoipa::path(
    get,
    path = "/api/v1/aloka-puja/{puja_id}",
    params(("puja_id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = AlokaPuja),
        (status = 404, description = "Booking not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Aloka Puja"
)]
pub async fn get(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(puja_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AlokaPuja>>> {
    Ok(Json(ApiResponse::ok(
        accessible_puja(&state, &auth, puja_id).await?,
    )))
}

#[utoipa::path(
    patch,
    path = "/api/v1/aloka-puja/{puja_id}",
    params(("puja_id" = Uuid, Path, description = "Booking ID")),
    request_body = UpdateAlokaPujaRequest,
    responses(
        (status = 200, description = "Booking updated", body = AlokaPuja),
        (status = 404, description = "Booking not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Aloka Puja"
)]
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(puja_id): Path<Uuid>,
    Json(body): Json<UpdateAlokaPujaRequest>,
) -> AppResult<Json<ApiResponse<AlokaPuja>>> {
    accessible_puja(&state, &auth, puja_id).await?;
    if body.puja_type.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("pujaType cannot be empty".to_string()));
    }

    let puja = state
        .store
        .update_puja(puja_id, body)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Aloka puja {} not found", puja_id)))?;
    Ok(Json(ApiResponse::ok(puja)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/aloka-puja/{puja_id}",
    params(("puja_id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking deleted"),
        (status = 404, description = "Booking not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Aloka Puja"
)]
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(puja_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    accessible_puja(&state, &auth, puja_id).await?;
    state.store.delete_puja(puja_id).await?;
    Ok(Json(ApiResponse::message("Aloka puja deleted")))
}

/// Bookings in the next `days` days (0 to 365)
#[utoipa::path(
    get,
    path = "/api/v1/aloka-puja/upcoming/{days}",
    params(("days" = i64, Path, description = "Look-ahead window in days")),
    responses(
        (status = 200, description = "Upcoming bookings", body = Vec<AlokaPuja>),
        (status = 400, description = "days out of range"),
    ),
    security(("bearer_auth" = [])),
    tag = "Aloka Puja"
)]
pub async fn upcoming(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(days): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<AlokaPuja>>>> {
    auth.require_role(COORDINATORS)?;
    Ok(Json(ApiResponse::ok(
        upcoming_pujas(&state, days, Utc::now()).await?,
    )))
}

/// Send reminders now instead of waiting for the scheduler
#[utoipa::path(
    post,
    path = "/api/v1/aloka-puja/reminders/run",
    params(ReminderRunQuery),
    responses((status = 200, description = "Reminder run summary", body = ReminderSummary)),
    security(("bearer_auth" = [])),
    tag = "Aloka Puja"
)]
pub async fn run_reminders(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ReminderRunQuery>,
) -> AppResult<Json<ApiResponse<ReminderSummary>>> {
    auth.require_role(ADMIN)?;
    let days_ahead = query
        .days_ahead
        .unwrap_or(state.config.reminder_days_ahead);
    if !(0..=365).contains(&days_ahead) {
        return Err(AppError::Validation(
            "daysAhead must be between 0 and 365".to_string(),
        ));
    }
    let summary = send_puja_reminders(&state, days_ahead, Utc::now()).await?;
    Ok(Json(ApiResponse::ok(summary)))
}
