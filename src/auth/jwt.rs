//! JWT Token Handler
//! Mission: Mint and validate signed bearer tokens with explicit expiry

use crate::auth::models::{Claims, Principal, User};
use crate::config::SigningSecret;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;

/// Why a presented token was rejected. Retained for diagnostics only;
/// the HTTP boundary collapses all of these to a single 401.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

/// Issues and validates HS256 bearer tokens. Both sides share the same
/// startup-validated secret; nothing here touches the store.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
    validation: Validation,
}

impl JwtHandler {
    /// Create a handler from validated key material and an explicit
    /// token lifetime.
    pub fn new(secret: &SigningSecret, lifetime_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact: a token is invalid the second it expires.
        validation.leeway = 0;
        // Single-tenant, single-audience deployment: issuer/audience
        // claims are not emitted and not checked. A multi-tenant
        // deployment must set both here and in `issue`.
        validation.validate_aud = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(lifetime_hours),
            validation,
        }
    }

    /// Mint a token for a user with a role snapshot taken by the caller.
    /// Stateless: no server-side record of the issued token exists.
    pub fn issue(&self, user: &User, roles: &[String]) -> Result<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.lifetime)
            .context("Token lifetime overflows timestamp")?;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            roles: roles.to_vec(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        debug!(username = %user.username, expires_at = %expires_at, "issuing token");

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .context("Failed to sign token")?;

        Ok((token, expires_at))
    }

    /// Verify structure, signature, then expiry, and reconstruct the
    /// principal embedded at issuance. The signature comparison inside
    /// jsonwebtoken is constant-time.
    pub fn validate(&self, token: &str) -> Result<Principal, TokenError> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(Principal::from_claims(data.claims)),
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            }),
        }
    }
}
