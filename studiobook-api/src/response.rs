/// Success envelope and pagination
///
/// Successful responses look like
///
/// ```json
/// { "success": true, "data": { ... }, "message": "optional" }
/// ```
///
/// Lists put their items and a `pagination` block inside `data`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    /// Envelope without a payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Same envelope answered with `201 Created`
pub struct Created<T>(pub ApiResponse<T>);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// `page` / `limit` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl PageQuery {
    /// Page numbers start at 1; the size is clamped to `1..=MAX_PAGE_SIZE`
    pub fn resolve(&self) -> Page {
        Page {
            page: self.page.unwrap_or(1).max(1),
            limit: self
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Page {
    pub fn limit(&self) -> i64 {
        i64::from(self.limit)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, page: Page, total: i64) -> Self {
        let limit = i64::from(page.limit);
        Self {
            items,
            pagination: Pagination {
                page: page.page,
                limit: page.limit,
                total,
                total_pages: (total + limit - 1) / limit,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_clamping() {
        let page = PageQuery::default().resolve();
        assert_eq!(page, Page { page: 1, limit: DEFAULT_PAGE_SIZE });
        assert_eq!(page.offset(), 0);

        let page = PageQuery { page: Some(0), limit: Some(1_000) }.resolve();
        assert_eq!(page, Page { page: 1, limit: MAX_PAGE_SIZE });

        let page = PageQuery { page: Some(3), limit: Some(10) }.resolve();
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Page { page: 1, limit: 10 };
        assert_eq!(Paginated::<u8>::new(vec![], page, 0).pagination.total_pages, 0);
        assert_eq!(Paginated::<u8>::new(vec![], page, 10).pagination.total_pages, 1);
        assert_eq!(Paginated::<u8>::new(vec![], page, 11).pagination.total_pages, 2);
    }

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok(42)).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": 42 }));

        let json = serde_json::to_value(ApiResponse::message("Logged out")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "message": "Logged out" }));
    }
}
