//! Restaurant registration, browsing and favorites.
//!
//! - POST /api/restaurant/join - Register a restaurant
//! - GET /api/cities - List cities
//! - GET /api/restaurant - Restaurants serving a city (anonymous allowed)
//! - GET /api/restaurant/{restaurant_id} - Restaurant with its menu (anonymous allowed)
//! - POST/DELETE /api/restaurant/{restaurant_id}/favorite - Customer favorites

use axum::{Extension, extract::State, http::StatusCode};

use crate::{
    error::AppError,
    extract::{Json, Path, Query},
    models::{
        actor::{Customer, JoinRestaurantRequest, MaybeActor, RestaurantResponse},
        catalog::{
            City, MenuQuery, RestaurantListQuery, RestaurantListingResponse,
            RestaurantMenuResponse,
        },
    },
    services::{account_service, catalog_service},
    state::AppState,
};

/// Register a restaurant serving one or more cities.
///
/// # Endpoint
///
/// `POST /api/restaurant/join`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Pelmeni",
///   "email": "kitchen@example.com",
///   "password": "secret1",
///   "description": "Dumplings",
///   "cities": [1, 2],
///   "open_time": "09:00:00",
///   "close_time": "22:00:00"
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: the restaurant
/// - **400**: invalid field, no cities, or unknown city
/// - **409**: email already registered as a restaurant
pub async fn join(
    State(state): State<AppState>,
    Json(request): Json<JoinRestaurantRequest>,
) -> Result<(StatusCode, Json<RestaurantResponse>), AppError> {
    let restaurant =
        account_service::register_restaurant(state.store.as_ref(), &state.passwords, request)
            .await?;

    Ok((
        StatusCode::CREATED,
        Json(RestaurantResponse::new(restaurant, &state.media_url)),
    ))
}

pub async fn list_cities(State(state): State<AppState>) -> Result<Json<Vec<City>>, AppError> {
    let cities = catalog_service::list_cities(state.store.as_ref()).await?;
    Ok(Json(cities))
}

/// Restaurants serving `city_id`, paged by `limit` (default 100) and `offset`.
///
/// `is_favorite` is `true`/`false` for an authenticated customer and `null`
/// otherwise.
pub async fn list_restaurants(
    State(state): State<AppState>,
    Extension(viewer): Extension<MaybeActor>,
    Query(query): Query<RestaurantListQuery>,
) -> Result<Json<Vec<RestaurantListingResponse>>, AppError> {
    let listings =
        catalog_service::list_restaurants(state.store.as_ref(), &viewer, query, &state.media_url)
            .await?;

    Ok(Json(listings))
}

/// One restaurant as served in `city_id`, with categories and dishes.
///
/// **404** if the restaurant does not exist or does not serve that city.
pub async fn get_menu(
    State(state): State<AppState>,
    Extension(viewer): Extension<MaybeActor>,
    Path(restaurant_id): Path<i64>,
    Query(query): Query<MenuQuery>,
) -> Result<Json<RestaurantMenuResponse>, AppError> {
    let menu = catalog_service::restaurant_menu(
        state.store.as_ref(),
        &viewer,
        restaurant_id,
        query.city_id,
        &state.media_url,
    )
    .await?;

    Ok(Json(menu))
}

pub async fn add_favorite(
    State(state): State<AppState>,
    Extension(customer): Extension<Customer>,
    Path(restaurant_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    catalog_service::add_favorite(state.store.as_ref(), &customer, restaurant_id).await?;
    Ok(StatusCode::CREATED)
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Extension(customer): Extension<Customer>,
    Path(restaurant_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    catalog_service::remove_favorite(state.store.as_ref(), &customer, restaurant_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
