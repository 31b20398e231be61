//! Login: credentials plus scope in, access token out.

use crate::{
    error::AppError,
    models::actor::{Actor, ActorKind, LoginForm, TokenResponse},
    state::AppState,
};

/// Parse the whitespace separated `scope` field into exactly one actor kind.
///
/// # Errors
///
/// - `Validation("Too many scopes")`: more than one scope given
/// - `Validation("Incorrect scope")`: none given, or not a known kind
pub fn parse_scope(scope: &str) -> Result<ActorKind, AppError> {
    let mut scopes = scope.split_whitespace();

    let first = scopes.next();
    if scopes.next().is_some() {
        return Err(AppError::Validation("Too many scopes".to_string()));
    }

    first
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::Validation("Incorrect scope".to_string()))
}

/// Authenticate an actor of the requested kind and issue a bearer token.
///
/// Unknown email, wrong password and deactivated accounts all produce the
/// same `InvalidCredentials` error.
pub async fn login(state: &AppState, form: LoginForm) -> Result<TokenResponse, AppError> {
    let kind = parse_scope(&form.scope)?;

    let actor = match kind {
        ActorKind::Customer => state
            .store
            .find_customer_by_email(&form.username)
            .await?
            .map(Actor::Customer),
        ActorKind::Restaurant => state
            .store
            .find_restaurant_by_email(&form.username)
            .await?
            .map(Actor::Restaurant),
    };

    let active = actor.filter(|a| match a {
        Actor::Customer(c) => c.is_active,
        Actor::Restaurant(r) => r.is_active,
    });

    let Some(actor) = active else {
        state.passwords.reject(&form.password);
        tracing::info!(%kind, "login rejected: unknown or inactive account");
        return Err(AppError::InvalidCredentials);
    };

    let principal = actor.as_principal();
    if !principal.verify_password(&state.passwords, &form.password) {
        tracing::info!(%kind, actor_id = principal.id(), "login rejected: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(principal.email(), kind, state.token_ttl)?;
    tracing::info!(%kind, actor_id = principal.id(), "access token issued");

    Ok(TokenResponse::bearer(token))
}
