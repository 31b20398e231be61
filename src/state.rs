//! Shared, immutable application state handed to every handler.

use std::{sync::Arc, time::Duration};

use crate::{
    auth::{password::PasswordVerifier, resolver::ActorResolver, token::TokenService},
    config::Config,
    error::AppError,
    repository::Store,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
    pub passwords: Arc<PasswordVerifier>,
    pub resolver: ActorResolver,

    /// Lifetime of issued access tokens
    pub token_ttl: chrono::Duration,

    /// Prefix joined to stored image paths in responses
    pub media_url: Arc<str>,

    pub request_timeout: Duration,
}

impl AppState {
    /// Build the state from configuration.
    ///
    /// # Errors
    ///
    /// Fails when the configuration is out of range or the token or password
    /// settings are unusable.
    pub fn new(config: &Config, store: Arc<dyn Store>) -> Result<Self, AppError> {
        config
            .validate()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let token_ttl = config
            .token_ttl()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let tokens = Arc::new(TokenService::from_config(config)?);
        let passwords = Arc::new(PasswordVerifier::from_config(config)?);
        let resolver = ActorResolver::new(tokens.clone(), store.clone());

        Ok(Self {
            store,
            tokens,
            passwords,
            resolver,
            token_ttl,
            media_url: Arc::from(config.media_url.as_str()),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests(store: Arc<dyn Store>) -> Self {
        let tokens = Arc::new(
            TokenService::new(crate::auth::token::TEST_SECRET, "HS256").unwrap(),
        );
        let resolver = ActorResolver::new(tokens.clone(), store.clone());

        Self {
            store,
            tokens,
            passwords: Arc::new(crate::auth::password::test_verifier()),
            resolver,
            token_ttl: chrono::Duration::minutes(30),
            media_url: Arc::from("http://media.test"),
            request_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryStore;

    fn config(ttl_minutes: &str, timeout_secs: &str) -> Config {
        envy::from_iter(
            [
                ("DATABASE_URL", "postgres://unused"),
                ("JWT_SECRET", crate::auth::token::TEST_SECRET),
                ("ACCESS_TOKEN_EXPIRE_MINUTES", ttl_minutes),
                ("REQUEST_TIMEOUT_SECS", timeout_secs),
                ("PASSWORD_MEMORY_KIB", "8"),
                ("PASSWORD_ITERATIONS", "1"),
                ("PASSWORD_PARALLELISM", "1"),
            ]
            .map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn out_of_range_settings_fail_instead_of_panicking() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

        for (ttl, timeout) in [("9223372036854775807", "30"), ("0", "30"), ("60", "0")] {
            let result = AppState::new(&config(ttl, timeout), store.clone());
            assert!(matches!(result, Err(AppError::Internal(_))), "{ttl}/{timeout}");
        }

        let state = AppState::new(&config("60", "30"), store).unwrap();
        assert_eq!(state.token_ttl, chrono::Duration::hours(1));
        assert_eq!(state.request_timeout, Duration::from_secs(30));
    }
}
