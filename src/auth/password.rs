//! Password Policy
//! Mission: Validate, hash, and verify credentials according to configured rules

use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use thiserror::Error;

/// Password policy configuration. Every rule is independently toggleable.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub min_length: usize,
    pub require_digit: bool,
    pub require_uppercase: bool,
    pub require_symbol: bool,
}

impl Default for PolicyConfig {
    /// Reference defaults: minimum length 4, all character-class rules off.
    /// Deliberately weak; production deployments should raise these.
    fn default() -> Self {
        Self {
            min_length: 4,
            require_digit: false,
            require_uppercase: false,
            require_symbol: false,
        }
    }
}

/// A password rejected by policy. The violated rule is reported verbatim
/// as registration-time feedback.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("password must be at least {0} characters")]
    TooShort(usize),
    #[error("password must contain a digit")]
    MissingDigit,
    #[error("password must contain an uppercase letter")]
    MissingUppercase,
    #[error("password must contain a symbol")]
    MissingSymbol,
}

/// Validates submitted passwords and owns the hashing scheme.
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    config: PolicyConfig,
}

impl PasswordPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Check a raw password against the configured rules.
    pub fn validate(&self, raw: &str) -> Result<(), PolicyViolation> {
        if raw.chars().count() < self.config.min_length {
            return Err(PolicyViolation::TooShort(self.config.min_length));
        }
        if self.config.require_digit && !raw.chars().any(|c| c.is_ascii_digit()) {
            return Err(PolicyViolation::MissingDigit);
        }
        if self.config.require_uppercase && !raw.chars().any(|c| c.is_uppercase()) {
            return Err(PolicyViolation::MissingUppercase);
        }
        if self.config.require_symbol && !raw.chars().any(|c| !c.is_alphanumeric()) {
            return Err(PolicyViolation::MissingSymbol);
        }
        Ok(())
    }

    /// Produce a salted one-way hash of the password.
    pub fn hash(&self, raw: &str) -> Result<String> {
        hash(raw, DEFAULT_COST).context("Failed to hash password")
    }

    /// Verify a raw password against a stored hash. bcrypt performs the
    /// comparison in constant time.
    pub fn verify(&self, raw: &str, stored_hash: &str) -> Result<bool> {
        verify(raw, stored_hash).context("Failed to verify password")
    }
}
