/// Error handling for the API server
///
/// Every handler returns [`ApiResult`]. Each [`ApiError`] variant maps to
/// exactly one HTTP status and one machine-readable code, rendered in the
/// envelope
///
/// ```json
/// { "success": false, "error": "<message>", "code": "<CODE>", "details": { ... } }
/// ```
///
/// Internal failures are logged and answered with a generic message; the
/// underlying detail is only added outside production when
/// [`set_expose_internal_errors`] enabled it.
///
/// # Example
///
/// ```
/// use studiobook_api::error::{ApiError, ApiResult};
///
/// fn find(id: u32) -> ApiResult<&'static str> {
///     if id == 1 { Ok("studio") } else { Err(ApiError::NotFound("Studio not found".into())) }
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use studiobook_shared::auth::{
    authorization::AuthzError, jwt::JwtError, middleware::AuthError, password::PasswordError,
};
use studiobook_shared::booking::AdmissionError;
use uuid::Uuid;

pub type ApiResult<T> = Result<T, ApiError>;

static EXPOSE_INTERNAL_ERRORS: AtomicBool = AtomicBool::new(false);

/// Includes internal error detail in 500 responses (development only)
pub fn set_expose_internal_errors(enabled: bool) {
    EXPOSE_INTERNAL_ERRORS.store(enabled, Ordering::Relaxed);
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 400 `VALIDATION_ERROR`
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Vec<ValidationErrorDetail>>,
    },

    /// 401 `UNAUTHORIZED`
    #[error("{0}")]
    Unauthorized(String),

    /// 403 `FORBIDDEN`
    #[error("{0}")]
    Forbidden(String),

    /// 404 `NOT_FOUND`
    #[error("{0}")]
    NotFound(String),

    /// 409 `DUPLICATE_ENTRY`
    #[error("{0}")]
    DuplicateEntry(String),

    /// 400 `INVALID_RANGE`
    #[error("{0}")]
    InvalidRange(String),

    /// 422 `STUDIO_UNAVAILABLE`
    #[error("{0}")]
    StudioUnavailable(String),

    /// 409 `STUDIO_CONFLICT`
    #[error("{message}")]
    StudioConflict { message: String, reservation_id: Uuid },

    /// 409 `EQUIPMENT_CONFLICT`
    #[error("{message}")]
    EquipmentConflict { message: String, equipment_id: Uuid },

    /// 408 `REQUEST_TIMEOUT`
    #[error("{0}")]
    RequestTimeout(String),

    /// 429 `RATE_LIMITED`, with `Retry-After`
    #[error("{message}")]
    RateLimited { retry_after: u64, message: String },

    /// 500 `INTERNAL_ERROR`
    #[error("{0}")]
    Internal(String),

    /// 503 `SERVICE_UNAVAILABLE`
    #[error("{0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Error envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::InvalidRange(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateEntry(_)
            | ApiError::StudioConflict { .. }
            | ApiError::EquipmentConflict { .. } => StatusCode::CONFLICT,
            ApiError::StudioUnavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RequestTimeout(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            ApiError::InvalidRange(_) => "INVALID_RANGE",
            ApiError::StudioUnavailable(_) => "STUDIO_UNAVAILABLE",
            ApiError::StudioConflict { .. } => "STUDIO_CONFLICT",
            ApiError::EquipmentConflict { .. } => "EQUIPMENT_CONFLICT",
            ApiError::RequestTimeout(_) => "REQUEST_TIMEOUT",
            ApiError::RateLimited { .. } => "RATE_LIMITED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Validation {
                details: Some(details),
                ..
            } => serde_json::to_value(details).ok(),
            ApiError::StudioConflict { reservation_id, .. } => {
                Some(serde_json::json!({ "reservation_id": reservation_id }))
            }
            ApiError::EquipmentConflict { equipment_id, .. } => {
                Some(serde_json::json!({ "equipment_id": equipment_id }))
            }
            ApiError::RateLimited { retry_after, .. } => {
                Some(serde_json::json!({ "retry_after": retry_after }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let mut details = self.details();

        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error");
                if EXPOSE_INTERNAL_ERRORS.load(Ordering::Relaxed) {
                    details = Some(serde_json::json!({ "detail": detail }));
                }
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
            details,
        });

        let mut response = (status, body).into_response();

        if let ApiError::RateLimited { retry_after, .. } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => ApiError::DuplicateEntry(duplicate_message(db_err.constraint())),
                Some("23503") => ApiError::NotFound("Referenced resource not found".to_string()),
                Some("23514") => ApiError::validation(format!(
                    "Check constraint violated: {}",
                    db_err.constraint().unwrap_or("unknown")
                )),
                _ => ApiError::Internal(format!("Database error: {}", db_err)),
            },
            sqlx::Error::PoolTimedOut => {
                ApiError::ServiceUnavailable("Database is not reachable".to_string())
            }
            other => ApiError::Internal(format!("Database error: {}", other)),
        }
    }
}

fn duplicate_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("users_email_key") => "Email already registered".to_string(),
        Some("payments_reservation_id_key") => {
            "A payment was already recorded for this reservation".to_string()
        }
        Some("availabilities_studio_day_key") => {
            "Availability for this weekday already exists".to_string()
        }
        Some("equipment_bookings_reservation_equipment_key") => {
            "Equipment already attached to this reservation".to_string()
        }
        Some(other) => format!("Duplicate entry violates {}", other),
        None => "Duplicate entry".to_string(),
    }
}

impl From<AdmissionError> for ApiError {
    fn from(err: AdmissionError) -> Self {
        let message = err.to_string();
        match err {
            AdmissionError::InvalidRange => ApiError::InvalidRange(message),
            AdmissionError::Validation(_) | AdmissionError::InvalidTransition { .. } => {
                ApiError::validation(message)
            }
            AdmissionError::StudioNotFound
            | AdmissionError::ReservationNotFound
            | AdmissionError::EquipmentNotFound(_) => ApiError::NotFound(message),
            AdmissionError::StudioUnavailable => ApiError::StudioUnavailable(message),
            AdmissionError::StudioConflict { reservation_id } => ApiError::StudioConflict {
                message,
                reservation_id,
            },
            AdmissionError::EquipmentConflict { equipment_id } => ApiError::EquipmentConflict {
                message,
                equipment_id,
            },
            AdmissionError::Forbidden(_) => ApiError::Forbidden(message),
            AdmissionError::Duplicate(_) => ApiError::DuplicateEntry(message),
            AdmissionError::Database(db) => db.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Weak(message) => ApiError::Validation {
                message: message.to_string(),
                details: Some(vec![ValidationErrorDetail {
                    field: "password".to_string(),
                    message: message.to_string(),
                }]),
            },
            other => ApiError::Internal(format!("Password operation failed: {}", other)),
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::Internal(format!("Token creation failed: {}", msg)),
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            other => ApiError::Unauthorized(format!("Invalid token: {}", other)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::Validation {
            message: "Request validation failed".to_string(),
            details: Some(details),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}
