//! Token to actor resolution.
//!
//! Turns a bearer token into a loaded, active actor record. A token that is
//! valid but whose actor no longer exists (or was deactivated) is rejected the
//! same way as a forged token.

use std::sync::Arc;

use crate::{
    auth::token::TokenService,
    error::AppError,
    models::actor::{Actor, ActorKind},
    repository::Store,
};

#[derive(Clone)]
pub struct ActorResolver {
    tokens: Arc<TokenService>,
    store: Arc<dyn Store>,
}

impl ActorResolver {
    pub fn new(tokens: Arc<TokenService>, store: Arc<dyn Store>) -> Self {
        Self { tokens, store }
    }

    /// Resolve a token to its actor, optionally requiring one kind.
    ///
    /// # Errors
    ///
    /// - `Unauthenticated`: token invalid, expired, of another kind, or actor gone
    /// - `Database`: lookup failed
    pub async fn resolve(
        &self,
        token: &str,
        required_kind: Option<ActorKind>,
    ) -> Result<Actor, AppError> {
        let (email, kind) = self.tokens.parse(token, required_kind)?;

        self.load(&email, kind).await?.ok_or_else(|| {
            tracing::debug!(%email, %kind, "token subject no longer active");
            AppError::Unauthenticated
        })
    }

    /// Resolve a token if one is present, treating any rejection as anonymous.
    ///
    /// Only storage failures are reported as errors.
    pub async fn resolve_optional(&self, token: Option<&str>) -> Result<Option<Actor>, AppError> {
        let Some((email, kind)) = token.and_then(|t| self.tokens.try_parse(t)) else {
            return Ok(None);
        };

        self.load(&email, kind).await
    }

    async fn load(&self, email: &str, kind: ActorKind) -> Result<Option<Actor>, AppError> {
        let actor = match kind {
            ActorKind::Customer => self
                .store
                .find_customer_by_email(email)
                .await?
                .filter(|c| c.is_active)
                .map(Actor::Customer),
            ActorKind::Restaurant => self
                .store
                .find_restaurant_by_email(email)
                .await?
                .filter(|r| r.is_active)
                .map(Actor::Restaurant),
        };

        Ok(actor)
    }
}
