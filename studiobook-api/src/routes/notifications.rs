/// Notification endpoints
///
/// Notifications are written by the booking flow; users only read them
/// and mark them read.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery},
    response::{ApiResponse, PageQuery, Paginated},
};
use axum::extract::State;
use serde::Deserialize;
use studiobook_shared::{auth::middleware::AuthContext, models::notification::Notification};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    /// Only unread notifications
    #[serde(default)]
    pub unread: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Caller's notifications, newest first
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/notifications?unread=true
/// Authorization: Bearer <access token>
/// ```
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> ApiResult<ApiResponse<Paginated<Notification>>> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let items = Notification::list_for_user(
        &state.db,
        auth.user_id,
        query.unread,
        page.limit(),
        page.offset(),
    )
    .await?;
    let total = Notification::count_for_user(&state.db, auth.user_id, query.unread).await?;

    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

/// Marks one of the caller's notifications read
///
/// # Errors
///
/// - `404 Not Found`: No such notification for this user
pub async fn mark_notification_read(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Notification>> {
    let notification = Notification::mark_read(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    Ok(ApiResponse::ok(notification))
}
