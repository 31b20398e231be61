//! Bearer token authentication middleware.
//!
//! Each protected route group is wrapped in one of these functions with
//! `axum::middleware::from_fn_with_state`. They:
//! 1. Extract the token from `Authorization: Bearer <token>`
//! 2. Resolve it to an active actor, enforcing the actor kind where required
//! 3. Inject the actor into the request extensions
//! 4. Reject with 401 (`WWW-Authenticate: Bearer`) when resolution fails
//!
//! Handlers then extract `Extension<Customer>`, `Extension<Restaurant>`,
//! `Extension<Actor>` or `Extension<MaybeActor>`.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::actor::{Actor, ActorKind, MaybeActor},
    state::AppState,
};

/// Token from the `Authorization` header, if it carries a bearer credential.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

async fn resolve(
    state: &AppState,
    headers: &HeaderMap,
    kind: Option<ActorKind>,
) -> Result<Actor, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthenticated)?;
    state.resolver.resolve(token, kind).await
}

/// Only customers (token kind `user`) pass. Injects `Customer`.
pub async fn require_customer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match resolve(&state, request.headers(), Some(ActorKind::Customer)).await? {
        Actor::Customer(customer) => {
            request.extensions_mut().insert(customer);
        }
        Actor::Restaurant(_) => return Err(AppError::Unauthenticated),
    }

    Ok(next.run(request).await)
}

/// Only restaurants pass. Injects `Restaurant`.
pub async fn require_restaurant(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match resolve(&state, request.headers(), Some(ActorKind::Restaurant)).await? {
        Actor::Restaurant(restaurant) => {
            request.extensions_mut().insert(restaurant);
        }
        Actor::Customer(_) => return Err(AppError::Unauthenticated),
    }

    Ok(next.run(request).await)
}

/// Either kind passes. Injects `Actor`.
pub async fn require_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = resolve(&state, request.headers(), None).await?;
    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}

/// Never rejects for credentials: a missing or unusable token is anonymous.
/// Injects `MaybeActor`.
pub async fn optional_actor(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = state
        .resolver
        .resolve_optional(bearer_token(request.headers()))
        .await?;
    request.extensions_mut().insert(MaybeActor(actor));

    Ok(next.run(request).await)
}
