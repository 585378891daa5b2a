use axum::{extract::State, http::StatusCode, response::Json};
use model::entities::category;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, trace, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::schemas::{ApiResponse, AppState, ErrorResponse};

const DEFAULT_CATEGORY_COLOR: &str = "#6B7280";
const DEFAULT_CATEGORY_ICON: &str = "circle";

/// Request body for creating a category
#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub name: String,
    #[validate(length(min = 1, max = 20, message = "must be between 1 and 20 characters"))]
    pub color: Option<String>,
    #[validate(length(min = 1, max = 50, message = "must be between 1 and 50 characters"))]
    pub icon: Option<String>,
}

/// Category response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    pub color: String,
    pub icon: String,
    /// True for the categories every installation starts with
    pub is_default: bool,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            color: model.color,
            icon: model.icon,
            is_default: model.is_default,
        }
    }
}

/// List all categories
#[utoipa::path(
    get,
    path = "/api/categories",
    tag = "categories",
    responses(
        (status = 200, description = "List of categories", body = ApiResponse<Vec<CategoryResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state), fields(user_id = user.id))]
pub async fn get_categories(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Vec<CategoryResponse>>>, ApiError> {
    trace!("Entering get_categories function");
    let categories = category::Entity::find()
        .order_by_asc(category::Column::Name)
        .all(&state.db)
        .await?;

    info!("Retrieved {} categories", categories.len());
    let responses = categories.into_iter().map(CategoryResponse::from).collect();
    Ok(Json(ApiResponse::ok(
        responses,
        "Categories retrieved successfully",
    )))
}

/// Create a category
#[utoipa::path(
    post,
    path = "/api/categories",
    tag = "categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Category name already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []), ("cookie_auth" = []))
)]
#[instrument(skip(state, request), fields(user_id = user.id))]
pub async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), ApiError> {
    trace!("Entering create_category function");
    let name = request.name.trim().to_string();

    if category::Model::by_name(&state.db, &name).await?.is_some() {
        warn!("Category '{}' already exists", name);
        return Err(ApiError::conflict(
            "CATEGORY_EXISTS",
            format!("Category '{}' already exists", name),
        ));
    }

    let created = category::ActiveModel {
        name: Set(name),
        color: Set(request
            .color
            .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string())),
        icon: Set(request
            .icon
            .unwrap_or_else(|| DEFAULT_CATEGORY_ICON.to_string())),
        is_default: Set(false),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!("Category created with ID: {}", created.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            CategoryResponse::from(created),
            "Category created successfully",
        )),
    ))
}
