/// Studio endpoints
///
/// # Endpoints
///
/// - `GET /studios` - List studios (public)
/// - `GET /studios/:id` - Studio with weekly availability and equipment (public)
/// - `POST /studios` - Create a studio (`STUDIO_OWNER` or `ADMIN`)
/// - `PUT /studios/:id` - Update a studio (owner or admin)
/// - `DELETE /studios/:id` - Delete a studio (owner or admin)
///
/// Writes that touch the weekly schedule replace it as a whole, inside the
/// same transaction as the studio row.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    response::{ApiResponse, Created, PageQuery, Paginated},
};
use axum::extract::State;
use serde::{Deserialize, Serialize};
use studiobook_shared::{
    auth::{
        authorization::{require_owner_or_admin, require_studio_creator},
        middleware::AuthContext,
    },
    models::{
        availability::{validate_schedule, Availability, AvailabilityWindow},
        equipment::Equipment,
        studio::{CreateStudio, Studio, StudioFilter, UpdateStudio},
    },
};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_CURRENCY: &str = "EUR";

/// Create studio request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStudioRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Address must be 1 to 255 characters"))]
    pub address: String,

    #[validate(length(min = 1, max = 100, message = "City must be 1 to 100 characters"))]
    pub city: String,

    #[validate(length(min = 1, max = 20, message = "Postal code must be 1 to 20 characters"))]
    pub postal_code: String,

    #[validate(length(min = 1, max = 100, message = "Country must be 1 to 100 characters"))]
    pub country: String,

    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: i32,

    #[validate(range(min = 0, message = "Hourly rate cannot be negative"))]
    pub hourly_rate_cents: i64,

    /// ISO-4217 code, defaults to EUR
    pub currency: Option<String>,

    /// Weekly opening hours, at most one entry per weekday
    pub availability: Option<Vec<AvailabilityWindow>>,
}

/// Update studio request; omitted fields are kept
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStudioRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Address must be 1 to 255 characters"))]
    pub address: Option<String>,

    #[validate(length(min = 1, max = 100, message = "City must be 1 to 100 characters"))]
    pub city: Option<String>,

    #[validate(length(min = 1, max = 20, message = "Postal code must be 1 to 20 characters"))]
    pub postal_code: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Country must be 1 to 100 characters"))]
    pub country: Option<String>,

    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i32>,

    #[validate(range(min = 0, message = "Hourly rate cannot be negative"))]
    pub hourly_rate_cents: Option<i64>,

    pub currency: Option<String>,

    pub is_active: Option<bool>,

    /// Replaces the whole weekly schedule when present
    pub availability: Option<Vec<AvailabilityWindow>>,
}

/// Listing query
#[derive(Debug, Default, Deserialize)]
pub struct StudioQuery {
    pub city: Option<String>,
    pub owner_id: Option<Uuid>,
    pub min_capacity: Option<i32>,
    pub max_hourly_rate_cents: Option<i64>,
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Studio together with its schedule and equipment
#[derive(Debug, Serialize)]
pub struct StudioDetails {
    #[serde(flatten)]
    pub studio: Studio,
    pub availability: Vec<Availability>,
    pub equipment: Vec<Equipment>,
}

/// Uppercases a three-letter currency code
fn normalize_currency(currency: &str) -> ApiResult<String> {
    let code = currency.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::validation(
            "Currency must be a three-letter ISO-4217 code",
        ));
    }
    Ok(code.to_ascii_uppercase())
}

fn check_schedule(windows: Option<&[AvailabilityWindow]>) -> ApiResult<()> {
    match windows {
        Some(windows) => validate_schedule(windows).map_err(ApiError::validation),
        None => Ok(()),
    }
}

/// List studios
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/studios?city=Berlin&min_capacity=4&page=1&limit=20
/// ```
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "items": [ { "id": "uuid", "name": "Room A", ... } ],
///     "pagination": { "page": 1, "limit": 20, "total": 1, "total_pages": 1 }
///   }
/// }
/// ```
pub async fn list_studios(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StudioQuery>,
) -> ApiResult<ApiResponse<Paginated<Studio>>> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let filter = StudioFilter {
        city: query.city,
        owner_id: query.owner_id,
        min_capacity: query.min_capacity,
        max_hourly_rate_cents: query.max_hourly_rate_cents,
        is_active: query.is_active,
    };

    let studios = Studio::list(&state.db, &filter, page.limit(), page.offset()).await?;
    let total = Studio::count(&state.db, &filter).await?;

    Ok(ApiResponse::ok(Paginated::new(studios, page, total)))
}

/// Get one studio with its weekly availability and equipment
///
/// # Errors
///
/// - `404 Not Found`: No such studio
pub async fn get_studio(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<StudioDetails>> {
    let studio = Studio::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Studio not found".to_string()))?;

    let availability = Availability::list_for_studio(&state.db, id).await?;
    let equipment = Equipment::list_for_studio(&state.db, id).await?;

    Ok(ApiResponse::ok(StudioDetails {
        studio,
        availability,
        equipment,
    }))
}

/// Create a studio owned by the caller
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/studios
/// Authorization: Bearer <access token>
///
/// {
///   "name": "Room A",
///   "address": "1 Main St",
///   "city": "Berlin",
///   "postal_code": "10115",
///   "country": "DE",
///   "capacity": 6,
///   "hourly_rate_cents": 5000,
///   "availability": [
///     { "day_of_week": 1, "open_time": "09:00:00", "close_time": "22:00:00" }
///   ]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or malformed schedule
/// - `403 Forbidden`: Caller is neither `STUDIO_OWNER` nor `ADMIN`
pub async fn create_studio(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateStudioRequest>,
) -> ApiResult<Created<StudioDetails>> {
    require_studio_creator(&auth)?;
    check_schedule(req.availability.as_deref())?;

    let currency = normalize_currency(req.currency.as_deref().unwrap_or(DEFAULT_CURRENCY))?;

    let mut tx = state.db.begin().await?;

    let studio = Studio::create(
        &mut *tx,
        CreateStudio {
            owner_id: auth.user_id,
            name: req.name,
            description: req.description,
            address: req.address,
            city: req.city,
            postal_code: req.postal_code,
            country: req.country,
            capacity: req.capacity,
            hourly_rate_cents: req.hourly_rate_cents,
            currency,
        },
    )
    .await?;

    let availability = match &req.availability {
        Some(windows) => Availability::replace_for_studio(&mut *tx, studio.id, windows).await?,
        None => Vec::new(),
    };

    tx.commit().await?;

    tracing::info!(studio_id = %studio.id, owner_id = %auth.user_id, "Studio created");

    Ok(Created(ApiResponse::with_message(
        StudioDetails {
            studio,
            availability,
            equipment: Vec::new(),
        },
        "Studio created",
    )))
}

/// Update a studio
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or malformed schedule
/// - `403 Forbidden`: Caller neither owns the studio nor is an admin
/// - `404 Not Found`: No such studio
pub async fn update_studio(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateStudioRequest>,
) -> ApiResult<ApiResponse<StudioDetails>> {
    check_schedule(req.availability.as_deref())?;

    let currency = req.currency.as_deref().map(normalize_currency).transpose()?;

    let mut tx = state.db.begin().await?;

    let existing = Studio::lock_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Studio not found".to_string()))?;
    require_owner_or_admin(&auth, existing.owner_id)?;

    let studio = Studio::update(
        &mut *tx,
        id,
        UpdateStudio {
            name: req.name,
            description: req.description,
            address: req.address,
            city: req.city,
            postal_code: req.postal_code,
            country: req.country,
            capacity: req.capacity,
            hourly_rate_cents: req.hourly_rate_cents,
            currency,
            is_active: req.is_active,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Studio not found".to_string()))?;

    let availability = match &req.availability {
        Some(windows) => Availability::replace_for_studio(&mut *tx, id, windows).await?,
        None => Availability::list_for_studio_in(&mut *tx, id).await?,
    };

    tx.commit().await?;

    let equipment = Equipment::list_for_studio(&state.db, id).await?;

    Ok(ApiResponse::with_message(
        StudioDetails {
            studio,
            availability,
            equipment,
        },
        "Studio updated",
    ))
}

/// Delete a studio together with its equipment, schedule and reservations
pub async fn delete_studio(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let studio = Studio::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Studio not found".to_string()))?;
    require_owner_or_admin(&auth, studio.owner_id)?;

    Studio::delete(&state.db, id).await?;

    tracing::info!(studio_id = %id, deleted_by = %auth.user_id, "Studio deleted");

    Ok(ApiResponse::message("Studio deleted"))
}
