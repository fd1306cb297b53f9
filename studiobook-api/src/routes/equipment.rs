/// Equipment endpoints
///
/// Reading is public; writes require the owner of the equipment's studio
/// or an admin.
///
/// # Endpoints
///
/// - `GET /equipment` - List equipment
/// - `GET /equipment/:id` - One item
/// - `POST /equipment` - Add equipment to a studio
/// - `PUT /equipment/:id` - Update equipment
/// - `DELETE /equipment/:id` - Remove equipment

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    response::{ApiResponse, Created, PageQuery, Paginated},
};
use axum::extract::State;
use serde::Deserialize;
use studiobook_shared::{
    auth::{authorization::require_owner_or_admin, middleware::AuthContext},
    models::{
        equipment::{
            CreateEquipment, Equipment, EquipmentFilter, EquipmentStatus, EquipmentType,
            UpdateEquipment,
        },
        studio::Studio,
    },
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEquipmentRequest {
    pub studio_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 100, message = "Brand must be at most 100 characters"))]
    pub brand: Option<String>,

    #[validate(length(max = 100, message = "Model must be at most 100 characters"))]
    pub model: Option<String>,

    pub equipment_type: EquipmentType,

    /// Defaults to `AVAILABLE`
    #[serde(default)]
    pub status: EquipmentStatus,

    #[validate(range(min = 0, message = "Hourly rate cannot be negative"))]
    pub hourly_rate_cents: Option<i64>,

    #[validate(range(min = 0, message = "Daily rate cannot be negative"))]
    pub daily_rate_cents: Option<i64>,
}

/// Equipment changes; omitted fields are kept. Equipment cannot move
/// between studios.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEquipmentRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1 to 200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 100, message = "Brand must be at most 100 characters"))]
    pub brand: Option<String>,

    #[validate(length(max = 100, message = "Model must be at most 100 characters"))]
    pub model: Option<String>,

    pub equipment_type: Option<EquipmentType>,
    pub status: Option<EquipmentStatus>,

    #[validate(range(min = 0, message = "Hourly rate cannot be negative"))]
    pub hourly_rate_cents: Option<i64>,

    #[validate(range(min = 0, message = "Daily rate cannot be negative"))]
    pub daily_rate_cents: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EquipmentQuery {
    pub studio_id: Option<Uuid>,
    pub equipment_type: Option<EquipmentType>,
    pub status: Option<EquipmentStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Owner of the studio an item belongs to
async fn studio_owner(state: &AppState, studio_id: Uuid) -> ApiResult<Uuid> {
    Studio::find_by_id(&state.db, studio_id)
        .await?
        .map(|studio| studio.owner_id)
        .ok_or_else(|| ApiError::NotFound("Studio not found".to_string()))
}

async fn find_equipment(state: &AppState, id: Uuid) -> ApiResult<Equipment> {
    Equipment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Equipment not found".to_string()))
}

/// List equipment
///
/// # Endpoint
///
/// ```text
/// GET /api/v1/equipment?studio_id=uuid&equipment_type=MICROPHONE&status=AVAILABLE
/// ```
pub async fn list_equipment(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EquipmentQuery>,
) -> ApiResult<ApiResponse<Paginated<Equipment>>> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .resolve();

    let filter = EquipmentFilter {
        studio_id: query.studio_id,
        equipment_type: query.equipment_type,
        status: query.status,
    };

    let items = Equipment::list(&state.db, &filter, page.limit(), page.offset()).await?;
    let total = Equipment::count(&state.db, &filter).await?;

    Ok(ApiResponse::ok(Paginated::new(items, page, total)))
}

pub async fn get_equipment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Equipment>> {
    Ok(ApiResponse::ok(find_equipment(&state, id).await?))
}

/// Add equipment to a studio
///
/// # Errors
///
/// - `403 Forbidden`: Caller does not own the studio
/// - `404 Not Found`: No such studio
pub async fn create_equipment(
    State(state): State<AppState>,
    auth: AuthContext,
    ValidatedJson(req): ValidatedJson<CreateEquipmentRequest>,
) -> ApiResult<Created<Equipment>> {
    let owner_id = studio_owner(&state, req.studio_id).await?;
    require_owner_or_admin(&auth, owner_id)?;

    let equipment = Equipment::create(
        &state.db,
        CreateEquipment {
            studio_id: req.studio_id,
            name: req.name,
            description: req.description,
            brand: req.brand,
            model: req.model,
            equipment_type: req.equipment_type,
            status: req.status,
            hourly_rate_cents: req.hourly_rate_cents,
            daily_rate_cents: req.daily_rate_cents,
        },
    )
    .await?;

    tracing::info!(equipment_id = %equipment.id, studio_id = %equipment.studio_id, "Equipment created");

    Ok(Created(ApiResponse::with_message(equipment, "Equipment created")))
}

pub async fn update_equipment(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateEquipmentRequest>,
) -> ApiResult<ApiResponse<Equipment>> {
    let existing = find_equipment(&state, id).await?;
    let owner_id = studio_owner(&state, existing.studio_id).await?;
    require_owner_or_admin(&auth, owner_id)?;

    let equipment = Equipment::update(
        &state.db,
        id,
        UpdateEquipment {
            name: req.name,
            description: req.description,
            brand: req.brand,
            model: req.model,
            equipment_type: req.equipment_type,
            status: req.status,
            hourly_rate_cents: req.hourly_rate_cents,
            daily_rate_cents: req.daily_rate_cents,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Equipment not found".to_string()))?;

    Ok(ApiResponse::with_message(equipment, "Equipment updated"))
}

/// Remove equipment; its bookings go with it
pub async fn delete_equipment(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    let existing = find_equipment(&state, id).await?;
    let owner_id = studio_owner(&state, existing.studio_id).await?;
    require_owner_or_admin(&auth, owner_id)?;

    Equipment::delete(&state.db, id).await?;

    Ok(ApiResponse::message("Equipment deleted"))
}
