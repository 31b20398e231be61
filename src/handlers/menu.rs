//! Menu management for the authenticated restaurant.
//!
//! Every endpoint acts on the caller's own categories and dishes only.

use axum::{Extension, extract::State, http::StatusCode};

use crate::{
    error::AppError,
    extract::{Json, Path},
    models::{
        actor::Restaurant,
        catalog::{
            CategoryResponse, CreateCategoryRequest, CreateDishRequest, DishPatch, DishResponse,
        },
    },
    services::catalog_service,
    state::AppState,
};

/// `POST /api/restaurant/category` with `{"name": "Soups"}`.
///
/// **409** if the restaurant already has a category with that name.
pub async fn create_category(
    State(state): State<AppState>,
    Extension(restaurant): Extension<Restaurant>,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), AppError> {
    let category =
        catalog_service::create_category(state.store.as_ref(), &restaurant, request).await?;

    Ok((StatusCode::CREATED, Json(CategoryResponse::from(category))))
}

/// `DELETE /api/restaurant/category/{category_id}`. Dishes in the category go with it.
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(restaurant): Extension<Restaurant>,
    Path(category_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    catalog_service::delete_category(state.store.as_ref(), &restaurant, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a dish to one of the caller's categories.
///
/// # Endpoint
///
/// `POST /api/restaurant/dish`
///
/// # Response
///
/// - **201 Created**: the dish
/// - **400**: empty name, negative price, or a category the caller does not own
/// - **409**: the caller already has a dish with that name
pub async fn create_dish(
    State(state): State<AppState>,
    Extension(restaurant): Extension<Restaurant>,
    Json(request): Json<CreateDishRequest>,
) -> Result<(StatusCode, Json<DishResponse>), AppError> {
    let dish = catalog_service::create_dish(state.store.as_ref(), &restaurant, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(DishResponse::new(dish, &state.media_url)),
    ))
}

/// Partial edit of name, description and price.
///
/// Orders that contain the dish display the edited values afterwards.
pub async fn update_dish(
    State(state): State<AppState>,
    Extension(restaurant): Extension<Restaurant>,
    Path(dish_id): Path<i64>,
    Json(patch): Json<DishPatch>,
) -> Result<Json<DishResponse>, AppError> {
    let dish =
        catalog_service::update_dish(state.store.as_ref(), &restaurant, dish_id, patch).await?;

    Ok(Json(DishResponse::new(dish, &state.media_url)))
}

pub async fn delete_dish(
    State(state): State<AppState>,
    Extension(restaurant): Extension<Restaurant>,
    Path(dish_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    catalog_service::delete_dish(state.store.as_ref(), &restaurant, dish_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
