//! Token endpoint.

use axum::extract::State;

use crate::{
    error::AppError,
    extract::{Form, Json},
    models::actor::{LoginForm, TokenResponse},
    services::auth_service,
    state::AppState,
};

/// Exchange credentials for an access token.
///
/// # Endpoint
///
/// `POST /api/auth/token` (`application/x-www-form-urlencoded`)
///
/// ```text
/// username=alice@example.com&password=secret1&scope=user
/// ```
///
/// # Response
///
/// - **200 OK**: `{"access_token": "...", "token_type": "bearer"}`
/// - **400**: wrong credentials, `Too many scopes`, or `Incorrect scope`
pub async fn issue_token(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, AppError> {
    let token = auth_service::login(&state, form).await?;
    Ok(Json(token))
}
