/// Health check endpoints
///
/// - `GET /api/health`: liveness, never touches the store
/// - `GET /api/health/db`: runs `SELECT 1` and reports row counts
///
/// Both sit outside the rate limiter.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studiobook_shared::{
    db::pool::{self, PoolStats},
    models::{equipment::Equipment, reservation::Reservation, studio::Studio, user::User},
};

/// Liveness payload
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when the process answers
    pub status: String,

    /// Application version
    pub version: String,

    pub timestamp: DateTime<Utc>,
}

/// Row counts reported by the database check
#[derive(Debug, Serialize, Deserialize)]
pub struct Statistics {
    pub users: i64,
    pub studios: i64,
    pub equipment: i64,
    pub reservations: i64,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealthResponse {
    pub status: String,
    pub statistics: Statistics,
    pub pool: PoolStats,
}

/// Liveness handler
///
/// # Endpoint
///
/// ```text
/// GET /api/health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "data": { "status": "ok", "version": "0.1.0", "timestamp": "2025-06-02T10:00:00Z" }
/// }
/// ```
pub async fn health_check() -> ApiResponse<HealthResponse> {
    ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// Database health handler
///
/// # Endpoint
///
/// ```text
/// GET /api/health/db
/// ```
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "status": "connected",
///     "statistics": { "users": 12, "studios": 3, "equipment": 40, "reservations": 97 },
///     "pool": { "active_connections": 1, "idle_connections": 4, "total_connections": 5 }
///   }
/// }
/// ```
///
/// # Errors
///
/// - `503 Service Unavailable`: The store did not answer
pub async fn database_health(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<DatabaseHealthResponse>> {
    let statistics = collect_statistics(&state).await.map_err(|e| {
        tracing::error!(error = %e, "Database health check failed");
        ApiError::ServiceUnavailable("Database connection failed".to_string())
    })?;

    Ok(ApiResponse::ok(DatabaseHealthResponse {
        status: "connected".to_string(),
        statistics,
        pool: pool::get_pool_stats(&state.db),
    }))
}

async fn collect_statistics(state: &AppState) -> Result<Statistics, sqlx::Error> {
    pool::health_check(&state.db).await?;

    Ok(Statistics {
        users: User::count(&state.db).await?,
        studios: Studio::count_all(&state.db).await?,
        equipment: Equipment::count_all(&state.db).await?,
        reservations: Reservation::count_all(&state.db).await?,
    })
}
