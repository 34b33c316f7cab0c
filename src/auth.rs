use crate::{
    errors::{AppError, AppResult},
    models::{Claims, Donor, NewUser, User, UserRole},
    state::AppState,
};
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

pub const FINANCE: &[UserRole] = &[UserRole::Admin, UserRole::Accountant];
pub const STAFF: &[UserRole] = &[UserRole::Admin, UserRole::Accountant, UserRole::Volunteer];
pub const ADMIN: &[UserRole] = &[UserRole::Admin];

/// Authenticated user extractor.
/// Add `auth: AuthUser` as a parameter in any handler that requires a login.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let headers: &HeaderMap = &parts.headers;

        let auth_header = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization format".to_string()))?;

        let secret = state.config.jwt_secret.as_bytes();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let user_id = Uuid::parse_str(&token_data.claims.sub).map_err(|_| AppError::InvalidToken)?;

        Ok(AuthUser {
            id: user_id,
            role: token_data.claims.role,
        })
    }
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn require_role(&self, roles: &[UserRole]) -> AppResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".to_string()))
        }
    }
}

/// Loads the caller's account, refusing donor accounts that have not been
/// approved yet. Staff accounts pass regardless.
pub async fn approved_user(state: &AppState, auth: &AuthUser) -> AppResult<User> {
    let user = state
        .store
        .find_user(auth.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))?;

    if !user.is_active && !user.role.is_staff() {
        return Err(AppError::Forbidden("Account pending approval".to_string()));
    }
    Ok(user)
}

/// The caller's donor profile, for operations only approved donors may do.
pub async fn approved_donor(state: &AppState, auth: &AuthUser) -> AppResult<(User, Donor)> {
    let user = approved_user(state, auth).await?;
    let donor = state
        .store
        .find_donor_by_user(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Donor profile not found".to_string()))?;
    Ok((user, donor))
}

pub fn generate_token(
    user_id: Uuid,
    role: UserRole,
    secret: &str,
    expiry_hours: i64,
) -> Result<String, AppError> {
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    let now = Utc::now().timestamp() as usize;
    let exp = (Utc::now() + chrono::Duration::hours(expiry_hours)).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

/// Creates the configured admin account unless a user with that email
/// already exists. Returns whether an account was created.
pub async fn seed_admin(state: &AppState) -> AppResult<bool> {
    let (Some(email), Some(password)) = (&state.config.admin_email, &state.config.admin_password)
    else {
        return Ok(false);
    };
    let email = email.trim().to_lowercase();

    if state.store.find_user_by_identifier(&email).await?.is_some() {
        return Ok(false);
    }

    let password_hash = bcrypt::hash(password, state.config.bcrypt_cost)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    state
        .store
        .create_user(NewUser {
            email: Some(email),
            phone: None,
            username: None,
            password_hash,
            role: UserRole::Admin,
            is_active: true,
        })
        .await?;
    Ok(true)
}
