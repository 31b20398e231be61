//! Access token issuing and parsing.
//!
//! Tokens are HMAC-signed JWTs with three claims:
//!
//! ```json
//! { "sub": "alice@example.com", "type": "user", "exp": 1767225600 }
//! ```
//!
//! There is no server-side revocation; a token is valid until `exp`.

use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, models::actor::ActorKind};

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "type")]
    kind: ActorKind,
    exp: i64,
}

/// Issues and validates access tokens with one process-wide secret.
pub struct TokenService {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Build the service from a signing secret and an HMAC algorithm name.
    ///
    /// # Errors
    ///
    /// `Internal` for a secret shorter than [`MIN_SECRET_LEN`], an unknown
    /// algorithm name, or an algorithm that is not HMAC based. Callers treat
    /// this as fatal at startup.
    pub fn new(secret: &str, algorithm: &str) -> Result<Self, AppError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AppError::Internal(format!(
                "JWT secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        let algorithm = Algorithm::from_str(algorithm)
            .map_err(|_| AppError::Internal(format!("unknown JWT algorithm {algorithm}")))?;

        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AppError::Internal(format!(
                "JWT algorithm {algorithm:?} is not an HMAC algorithm"
            )));
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            header: Header::new(algorithm),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(&config.jwt_secret, &config.jwt_algorithm)
    }

    /// Issue a token for `identity` of the given kind, expiring after `ttl`.
    pub fn issue(&self, identity: &str, kind: ActorKind, ttl: Duration) -> Result<String, AppError> {
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AppError::Internal("token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: identity.to_string(),
            kind,
            exp: expires_at.timestamp(),
        };

        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// Validate a token and return `(identity, kind)`.
    ///
    /// With `expected_kind = Some(k)` a token of any other kind is rejected the
    /// same way as a forged one. `None` accepts either kind.
    pub fn parse(
        &self,
        token: &str,
        expected_kind: Option<ActorKind>,
    ) -> Result<(String, ActorKind), AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected access token");
            AppError::Unauthenticated
        })?;

        let Claims { sub, kind, .. } = data.claims;

        match expected_kind {
            Some(expected) if expected != kind => {
                tracing::debug!(%expected, actual = %kind, "access token kind mismatch");
                Err(AppError::Unauthenticated)
            }
            _ => Ok((sub, kind)),
        }
    }

    /// Like [`parse`](Self::parse) with no kind filter, but yields `None` instead of failing.
    pub fn try_parse(&self, token: &str) -> Option<(String, ActorKind)> {
        self.parse(token, None).ok()
    }
}

#[cfg(test)]
pub(crate) const TEST_SECRET: &str = "test-secret-test-secret-test-secret!";

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(TEST_SECRET, "HS256").unwrap()
    }

    fn raw_token(claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn issued_token_parses_back_to_identity_and_kind() {
        let tokens = service();
        for kind in [ActorKind::Customer, ActorKind::Restaurant] {
            let token = tokens
                .issue("alice@example.com", kind, Duration::minutes(5))
                .unwrap();

            let (identity, parsed_kind) = tokens.parse(&token, Some(kind)).unwrap();
            assert_eq!(identity, "alice@example.com");
            assert_eq!(parsed_kind, kind);
        }
    }

    #[test]
    fn no_kind_filter_returns_embedded_kind() {
        let tokens = service();
        let token = tokens
            .issue("r@example.com", ActorKind::Restaurant, Duration::minutes(5))
            .unwrap();

        let (_, kind) = tokens.parse(&token, None).unwrap();
        assert_eq!(kind, ActorKind::Restaurant);
    }

    #[test]
    fn kind_mismatch_is_unauthenticated() {
        let tokens = service();
        let token = tokens
            .issue("alice@example.com", ActorKind::Customer, Duration::minutes(5))
            .unwrap();

        let err = tokens.parse(&token, Some(ActorKind::Restaurant)).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let tokens = service();
        let token = tokens
            .issue("alice@example.com", ActorKind::Customer, Duration::seconds(-5))
            .unwrap();

        assert!(matches!(
            tokens.parse(&token, Some(ActorKind::Customer)),
            Err(AppError::Unauthenticated)
        ));
        assert!(tokens.try_parse(&token).is_none());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = TokenService::new("another-secret-another-secret-another", "HS256").unwrap();
        let token = other
            .issue("alice@example.com", ActorKind::Customer, Duration::minutes(5))
            .unwrap();

        assert!(matches!(
            service().parse(&token, None),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn unknown_or_missing_kind_claim_is_rejected() {
        let exp = (Utc::now() + Duration::minutes(5)).timestamp();
        let tokens = service();

        let unknown = raw_token(serde_json::json!({ "sub": "a@b.c", "type": "admin", "exp": exp }));
        assert!(tokens.parse(&unknown, None).is_err());

        let missing = raw_token(serde_json::json!({ "sub": "a@b.c", "exp": exp }));
        assert!(tokens.parse(&missing, None).is_err());

        let no_subject = raw_token(serde_json::json!({ "type": "user", "exp": exp }));
        assert!(tokens.parse(&no_subject, None).is_err());
    }

    #[test]
    fn garbage_yields_none_from_try_parse() {
        assert!(service().try_parse("not.a.token").is_none());
    }

    #[test]
    fn rejects_unusable_configuration() {
        assert!(TokenService::new("short", "HS256").is_err());
        assert!(TokenService::new(TEST_SECRET, "RS256").is_err());
        assert!(TokenService::new(TEST_SECRET, "HS999").is_err());
        assert!(TokenService::new(TEST_SECRET, "HS512").is_ok());
    }
}
