/// Authentication endpoints
///
/// This module provides account and session endpoints:
/// - Registration
/// - Login
/// - Token refresh
/// - Profile read, update and deletion
/// - Logout (refresh token revocation)
///
/// # Endpoints
///
/// - `POST /auth/register` - Register new user
/// - `POST /auth/login` - Login and get tokens
/// - `POST /auth/refresh` - Refresh access token
/// - `GET /auth/profile` - Current user (bearer)
/// - `PUT /auth/profile` - Update names and phone (bearer)
/// - `DELETE /auth/profile` - Delete own account (bearer)
/// - `POST /auth/logout` - Revoke a refresh token (bearer)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    response::{ApiResponse, Created},
};
use axum::extract::State;
use serde::{Deserialize, Serialize};
use studiobook_shared::{
    auth::{
        jwt::{self, Claims, TokenPair, TokenType},
        middleware::AuthContext,
        password,
    },
    models::{
        revoked_token::RevokedToken,
        user::{normalize_email, CreateUser, PublicUser, UpdateUser, User, UserRole},
    },
};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked for strength after the length rule
    #[validate(length(min = 8, max = 128, message = "Password must be 8 to 128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "First name must be 1 to 100 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1 to 100 characters"))]
    pub last_name: String,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    /// Defaults to `USER`; `ADMIN` is refused
    #[serde(default)]
    pub role: UserRole,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Refresh and logout request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "First name must be 1 to 100 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Last name must be 1 to 100 characters"))]
    pub last_name: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,
}

/// Register and login response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: PublicUser,

    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Refresh response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "artist@example.com",
///   "password": "SecureP@ss123",
///   "first_name": "Ada",
///   "last_name": "Lovelace",
///   "role": "ARTIST"
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "user": { "id": "uuid", "email": "artist@example.com", "role": "ARTIST", ... },
///     "access_token": "eyJ...",
///     "refresh_token": "eyJ...",
///     "token_type": "Bearer",
///     "expires_in": 86400
///   },
///   "message": "Account created"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, weak password or `ADMIN` role requested
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> ApiResult<Created<SessionResponse>> {
    if !req.role.is_self_assignable() {
        return Err(ApiError::validation("The ADMIN role cannot be self-assigned"));
    }

    password::validate_password_strength(&req.password)?;
    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: normalize_email(&req.email),
            password_hash,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            phone: req.phone,
            role: req.role,
        },
    )
    .await?;

    let tokens = jwt::issue_token_pair(user.id, user.role, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");

    Ok(Created(ApiResponse::with_message(
        SessionResponse {
            user: user.into(),
            tokens,
        },
        "Account created",
    )))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/login
/// Content-Type: application/json
///
/// { "email": "artist@example.com", "password": "SecureP@ss123" }
/// ```
///
/// # Response
///
/// Same shape as registration, with `200 OK`.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown email, wrong password or disabled account
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<ApiResponse<SessionResponse>> {
    let user = User::find_by_email(&state.db, &normalize_email(&req.email))
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is disabled".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, user.role, state.jwt_secret())?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(ApiResponse::ok(SessionResponse {
        user: user.into(),
        tokens,
    }))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token. The new token carries
/// the user's current role.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/refresh
/// Content-Type: application/json
///
/// { "refresh_token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired or revoked refresh token, or the
///   account no longer exists or is disabled
pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> ApiResult<ApiResponse<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    if RevokedToken::is_revoked(&state.db, &jwt::hash_token(&req.refresh_token)).await? {
        return Err(ApiError::Unauthorized("Refresh token has been revoked".to_string()));
    }

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized("Account is not available".to_string()))?;

    let access = Claims::new(user.id, user.role, TokenType::Access);
    let access_token = jwt::create_token(&access, state.jwt_secret())?;

    Ok(ApiResponse::ok(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    }))
}

/// Current user
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/auth/profile
/// Authorization: Bearer <access token>
/// ```
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<ApiResponse<PublicUser>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::ok(user.into()))
}

/// Updates first name, last name and phone; omitted fields are kept
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let user = User::update(
        &state.db,
        auth.user_id,
        UpdateUser {
            first_name: req.first_name.map(|name| name.trim().to_string()),
            last_name: req.last_name.map(|name| name.trim().to_string()),
            phone: req.phone,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::with_message(user.into(), "Profile updated"))
}

/// Deletes the caller's account
///
/// Owned studios, authored reservations and participations go with it.
pub async fn delete_profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<ApiResponse<()>> {
    if !User::delete(&state.db, auth.user_id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %auth.user_id, "User deleted own account");

    Ok(ApiResponse::message("Account deleted"))
}

/// Logout endpoint
///
/// Revokes the supplied refresh token until it would have expired. The
/// access token stays valid until its own expiry.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/logout
/// Authorization: Bearer <access token>
///
/// { "refresh_token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: The refresh token is invalid
/// - `403 Forbidden`: The refresh token belongs to another user
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> ApiResult<ApiResponse<()>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    if claims.sub != auth.user_id {
        return Err(ApiError::Forbidden(
            "Refresh token belongs to another user".to_string(),
        ));
    }

    RevokedToken::revoke(
        &state.db,
        &jwt::hash_token(&req.refresh_token),
        auth.user_id,
        claims.expires_at(),
    )
    .await?;

    Ok(ApiResponse::message("Logged out"))
}
