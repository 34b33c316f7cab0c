// src/handlers/account.rs

use crate::{
    auth::{ADMIN, AuthUser, FINANCE, generate_token},
    errors::{AppError, AppResult},
    models::{
        ApiResponse, AuthResponse, LoginRequest, NewDonor, NewUser, RegisterRequest, UserPublic,
        UserRole,
    },
    services::{
        email::preferred_contact,
        notifications::{account_approved, dispatch},
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bcrypt::{hash, verify};
use tracing::info;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Register a donor account; it stays inactive until an admin approves it
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, pending approval", body = AuthResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email, phone or username already registered"),
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    let email = clean(body.email).map(|e| e.to_lowercase());
    let phone = clean(body.phone);
    let username = clean(body.username);

    if email.is_none() && phone.is_none() && username.is_none() {
        return Err(AppError::Validation(
            "Provide an email, phone number or username".to_string(),
        ));
    }
    if let Some(email) = &email {
        if !email.contains('@') {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
    }
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if body.first_name.trim().is_empty() || body.last_name.trim().is_empty() {
        return Err(AppError::Validation(
            "First and last name are required".to_string(),
        ));
    }

    let password_hash = hash(&body.password, state.config.bcrypt_cost)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let (user, donor) = state
        .store
        .create_user_with_donor(
            NewUser {
                email: email.clone(),
                phone: phone.clone(),
                username,
                password_hash,
                role: UserRole::Donor,
                is_active: false,
            },
            NewDonor {
                user_id: None,
                primary_donor_id: None,
                first_name: body.first_name.trim().to_string(),
                last_name: body.last_name.trim().to_string(),
                email,
                mobile: phone,
                landline: clean(body.landline),
                address: body.address,
                city: body.city,
                province: body.province,
                postal_code: body.postal_code,
                country: "Canada".to_string(),
                is_active: false,
            },
        )
        .await?;

    info!("Donor account {} registered, awaiting approval", user.id);

    let token = generate_token(
        user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            AuthResponse {
                token,
                user: user.into(),
                donor: Some(donor),
            },
            "Registration successful. Your account is pending approval.",
        )),
    ))
}

/// Log in with email, phone number or username
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    let identifier = body.identifier.trim();
    let user = match state.store.find_user_by_identifier(identifier).await? {
        Some(user) => Some(user),
        // Emails are stored lowercased
        None => {
            state
                .store
                .find_user_by_identifier(&identifier.to_lowercase())
                .await?
        }
    }
    .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = verify(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = generate_token(
        user.id,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiry_hours,
    )?;
    let donor = state.store.find_donor_by_user(user.id).await?;

    Ok(Json(ApiResponse::ok(AuthResponse {
        token,
        user: user.into(),
        donor,
    })))
}

/// List all user accounts
#[utoipa::path(
    get,
    path = "/api/v1/auth/users",
    responses(
        (status = 200, description = "User accounts, newest first", body = Vec<UserPublic>),
        (status = 403, description = "Insufficient permissions"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<UserPublic>>>> {
    auth.require_role(FINANCE)?;
    let users = state.store.list_users().await?;
    Ok(Json(ApiResponse::ok(
        users.into_iter().map(UserPublic::from).collect(),
    )))
}

/// Approve a pending account and its donor profile
#[utoipa::path(
    patch,
    path = "/api/v1/auth/users/{user_id}/approve",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account approved", body = UserPublic),
        (status = 403, description = "Insufficient permissions"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn approve_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserPublic>>> {
    auth.require_role(ADMIN)?;

    let was_active = state
        .store
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?
        .is_active;

    let user = state
        .store
        .activate_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

    if !was_active {
        info!("User {} approved by {}", user.id, auth.id);
        let donor = state.store.find_donor_by_user(user.id).await?;
        dispatch(
            state.notifier.clone(),
            preferred_contact(Some(&user), donor.as_ref()),
            account_approved(&state.config.organization, donor.as_ref()),
        );
    }

    Ok(Json(ApiResponse::with_message(
        user.into(),
        "Account approved",
    )))
}
