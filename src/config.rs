//! Startup Configuration
//! Mission: Load and validate all runtime configuration once, before serving

use crate::auth::password::PolicyConfig;
use std::env;
use std::fmt;
use thiserror::Error;

/// Environment variable holding the token signing secret.
pub const SECRET_VAR: &str = "GATEHOUSE_TOKEN_SECRET";

/// Fatal configuration errors. Any of these halts startup before a
/// listener is bound.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{SECRET_VAR} is not set")]
    MissingSecret,
    #[error("{SECRET_VAR} must not be blank")]
    BlankSecret,
    #[error("{SECRET_VAR} is too short: {have} bytes, need at least {need}")]
    ShortSecret { have: usize, need: usize },
    #[error("invalid value for {key}: {value:?}")]
    BadValue { key: &'static str, value: String },
}

/// Symmetric signing key material, validated at construction and shared
/// read-only by the token issuer and validator. Never logged.
#[derive(Clone)]
pub struct SigningSecret(String);

impl SigningSecret {
    /// Hardening floor on top of the non-blank check: HS256 keys shorter
    /// than the hash output are trivially brute-forceable.
    pub const MIN_LENGTH: usize = 32;

    pub fn new(raw: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(ConfigError::BlankSecret);
        }
        if raw.len() < Self::MIN_LENGTH {
            return Err(ConfigError::ShortSecret {
                have: raw.len(),
                need: Self::MIN_LENGTH,
            });
        }
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Immutable runtime configuration, loaded once in `main`.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_path: String,
    pub signing_secret: SigningSecret,
    /// Bearer token lifetime in hours. Explicit, not a framework default.
    pub token_lifetime_hours: i64,
    pub password_policy: PolicyConfig,
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// The signing secret is the only required value; everything else
    /// falls back to documented defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let signing_secret = match env::var(SECRET_VAR) {
            Ok(raw) => SigningSecret::new(raw)?,
            Err(_) => return Err(ConfigError::MissingSecret),
        };

        let bind_addr =
            env::var("GATEHOUSE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let database_path =
            env::var("GATEHOUSE_DB_PATH").unwrap_or_else(|_| "gatehouse.db".to_string());

        let token_lifetime_hours = parse_var("GATEHOUSE_TOKEN_LIFETIME_HOURS", 24)?;
        if token_lifetime_hours <= 0 {
            return Err(ConfigError::BadValue {
                key: "GATEHOUSE_TOKEN_LIFETIME_HOURS",
                value: token_lifetime_hours.to_string(),
            });
        }

        // The minimum length default of 4 mirrors the reference deployment
        // and is deliberately weak. Raise it via the environment.
        let password_policy = PolicyConfig {
            min_length: parse_var("GATEHOUSE_PASSWORD_MIN_LENGTH", 4)?,
            require_digit: flag_var("GATEHOUSE_PASSWORD_REQUIRE_DIGIT"),
            require_uppercase: flag_var("GATEHOUSE_PASSWORD_REQUIRE_UPPERCASE"),
            require_symbol: flag_var("GATEHOUSE_PASSWORD_REQUIRE_SYMBOL"),
        };

        Ok(Self {
            bind_addr,
            database_path,
            signing_secret,
            token_lifetime_hours,
            password_policy,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::BadValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}

fn flag_var(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(false)
}
