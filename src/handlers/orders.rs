//! Order HTTP handlers.
//!
//! This module implements the order endpoints:
//! - POST /api/order - Place an order (customers)
//! - GET /api/order - List the caller's orders (customers and restaurants)
//! - PATCH /api/order/{order_id} - Advance an order's status (restaurants)

use axum::{Extension, extract::State, http::StatusCode};

use crate::{
    error::AppError,
    extract::{Json, Path},
    models::{
        actor::{Actor, Customer, Restaurant},
        order::{CreateOrderRequest, Order, OrderSnapshot, UpdateOrderStatusRequest},
    },
    services::order_service,
    state::AppState,
};

/// Place an order.
///
/// # Endpoint
///
/// `POST /api/order`
///
/// # Authentication
///
/// Customer token (`type: "user"`).
///
/// # Request Body
///
/// ```json
/// {
///   "restaurant_id": 1,
///   "address": "Lenina 1, apt 5",
///   "dishes": [{ "dish_id": 5, "amount": 2 }, { "dish_id": 7, "amount": 1 }]
/// }
/// ```
///
/// # Response
///
/// - **201 Created**: empty body
/// - **400**: malformed lines, unknown restaurant, or a dish of another restaurant
/// - **401**: missing token or not a customer token
/// - **409**: the same dish listed twice
pub async fn create_order(
    State(state): State<AppState>,
    Extension(customer): Extension<Customer>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<StatusCode, AppError> {
    order_service::place_order(state.store.as_ref(), &customer, request).await?;
    Ok(StatusCode::CREATED)
}

/// List the caller's orders, newest first.
///
/// A customer sees the orders they paid for; a restaurant sees the orders
/// placed with it. Line names, prices and images are the dishes' current
/// values.
///
/// # Response (200 OK)
///
/// ```json
/// [
///   {
///     "id": 12,
///     "status": "PENDING",
///     "delivery_address": "Lenina 1",
///     "placed_at": "2025-12-21T16:00:00Z",
///     "dishes": [
///       { "dish_id": 5, "name": "Borscht", "price_cents": 999, "image": "/images/empty.jpg", "count": 3 }
///     ],
///     "total_cents": 2997
///   }
/// ]
/// ```
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<OrderSnapshot>>, AppError> {
    let orders =
        order_service::list_for_actor(state.store.as_ref(), &actor, &state.media_url).await?;
    Ok(Json(orders))
}

/// Move an order to the next status.
///
/// # Endpoint
///
/// `PATCH /api/order/{order_id}` with `{"status": "COOKING"}`
///
/// # Response
///
/// - **200 OK**: the updated order
/// - **403**: the order belongs to another restaurant
/// - **404**: no such order
/// - **409**: the status changed concurrently
/// - **422**: not the next status in `PENDING -> COOKING -> DELIVERED -> COMPLETED`
pub async fn update_status(
    State(state): State<AppState>,
    Extension(restaurant): Extension<Restaurant>,
    Path(order_id): Path<i64>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let order =
        order_service::set_status(state.store.as_ref(), &restaurant, order_id, request.status)
            .await?;
    Ok(Json(order))
}
