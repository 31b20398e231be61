//! HTTP router construction.
//!
//! Routes are grouped by the actor they admit. Each group carries its own
//! authentication middleware as a route layer, so handlers only run after
//! the actor has been resolved and kind-checked. Groups sharing a path (for
//! example `GET` and `POST /api/order`) are merged into one method router.

use axum::{
    Router,
    http::StatusCode,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, health, menu, orders, restaurants, users},
    middleware::auth::{optional_actor, require_actor, require_customer, require_restaurant},
    state::AppState,
};

pub fn router(state: AppState) -> Router {
    // No credentials needed
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/auth/token", post(auth::issue_token))
        .route("/api/users/join", post(users::join))
        .route("/api/restaurant/join", post(restaurants::join))
        .route("/api/cities", get(restaurants::list_cities));

    // Anonymous allowed, customers see their favorites
    let browsing_routes = Router::new()
        .route("/api/restaurant", get(restaurants::list_restaurants))
        .route("/api/restaurant/{restaurant_id}", get(restaurants::get_menu))
        .route_layer(from_fn_with_state(state.clone(), optional_actor));

    let customer_routes = Router::new()
        .route(
            "/api/restaurant/{restaurant_id}/favorite",
            post(restaurants::add_favorite).delete(restaurants::remove_favorite),
        )
        .route("/api/order", post(orders::create_order))
        .route_layer(from_fn_with_state(state.clone(), require_customer));

    let restaurant_routes = Router::new()
        .route("/api/restaurant/category", post(menu::create_category))
        .route(
            "/api/restaurant/category/{category_id}",
            delete(menu::delete_category),
        )
        .route("/api/restaurant/dish", post(menu::create_dish))
        .route(
            "/api/restaurant/dish/{dish_id}",
            patch(menu::update_dish).delete(menu::delete_dish),
        )
        .route("/api/order/{order_id}", patch(orders::update_status))
        .route_layer(from_fn_with_state(state.clone(), require_restaurant));

    // Either kind, handlers branch on the actor
    let actor_routes = Router::new()
        .route("/api/order", get(orders::list_orders))
        .route_layer(from_fn_with_state(state.clone(), require_actor));

    let timeout = state.request_timeout;

    Router::new()
        .merge(public_routes)
        .merge(browsing_routes)
        .merge(customer_routes)
        .merge(restaurant_routes)
        .merge(actor_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    timeout,
                )),
        )
        .with_state(state)
}
