//! Bearer-token gate for the read path.
//!
//! Tokens are HMAC-signed JWTs checked against the shared secret from
//! `[auth]`. Only the HS256/HS384/HS512 family is accepted and `exp` is
//! mandatory. Login passwords are stored as argon2 PHC strings.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context};
use argon2::{
    password_hash::{Error as PasswordHashError, PasswordHash, PasswordVerifier, SaltString},
    Argon2, PasswordHasher,
};
use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use solomon_core::AuthConfig;

use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

pub struct AccessGate {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl AccessGate {
    /// Builds the gate from the `[auth]` section.
    ///
    /// # Errors
    /// Returns an error if the shared secret is empty.
    pub fn new(config: &AuthConfig) -> anyhow::Result<Self> {
        if config.secret.trim().is_empty() {
            bail!("auth.secret cannot be empty");
        }

        let secret = config.secret.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.set_required_spec_claims(&["exp"]);
        validation.validate_exp = true;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            token_ttl: Duration::from_secs(config.token_ttl_minutes * 60),
        })
    }

    /// Signs an HS256 token for `subject`, valid for the configured TTL.
    ///
    /// # Errors
    /// Returns an error if the system clock is before the epoch or signing fails.
    pub fn issue_token(&self, subject: &str) -> anyhow::Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("system clock is before UNIX_EPOCH")?;
        let claims = Claims {
            sub: subject.to_string(),
            iat: Some(now.as_secs()),
            exp: (now + self.token_ttl).as_secs(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).context("failed to sign token")
    }

    /// Verifies signature, algorithm and expiry.
    ///
    /// # Errors
    /// Returns `AuthRejected` for any token that fails verification.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!(kind = ?err.kind(), "bearer token rejected");
                ApiError::AuthRejected("invalid or expired token")
            })
    }

    /// Checks `candidate` against a stored argon2 hash.
    ///
    /// # Errors
    /// Returns `AuthRejected` on a mismatch and `Internal` if the stored hash
    /// cannot be parsed.
    pub fn verify_password(&self, candidate: &str, stored_hash: &str) -> Result<(), ApiError> {
        let parsed = PasswordHash::new(stored_hash)
            .map_err(|e| ApiError::Internal(format!("invalid stored password hash: {e}")))?;
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .map_err(|err| match err {
                PasswordHashError::Password => ApiError::AuthRejected("invalid credentials"),
                other => ApiError::Internal(format!("password verification failed: {other}")),
            })
    }

    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }
}

/// Hashes `password` with argon2 defaults and a random salt.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("failed to hash password: {e}"))?;
    Ok(hash.to_string())
}

/// Extracts the token from an `Authorization: Bearer <token>` value.
fn bearer_token(value: &str) -> Option<&str> {
    let mut parts = value.splitn(2, ' ');
    let (Some(scheme), Some(token)) = (parts.next(), parts.next()) else {
        return None;
    };
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Rejects the request with 401 unless it carries a valid bearer token.
pub async fn require_bearer(
    State(gate): State<Arc<AccessGate>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(ApiError::AuthRejected("missing authorization header"))?
        .to_str()
        .map_err(|_| ApiError::AuthRejected("malformed authorization header"))?;

    let token =
        bearer_token(header).ok_or(ApiError::AuthRejected("malformed authorization header"))?;

    let claims = gate.validate_token(token)?;
    tracing::debug!(sub = %claims.sub, "bearer token accepted");

    Ok(next.run(request).await)
}
