//! Authentication Pipeline
//! Mission: Orchestrate login, registration, and per-request verification

use crate::auth::jwt::JwtHandler;
use crate::auth::models::{Principal, User, DEFAULT_USER_ROLE};
use crate::auth::password::{PasswordPolicy, PolicyViolation};
use crate::auth::user_store::{StoreError, UserStore};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

/// Login failure. Unknown-user and wrong-password collapse into the one
/// `InvalidCredentials` variant so the response cannot be used as a
/// username oracle.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Registration failure.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error("username already taken")]
    UsernameConflict,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Token-check failure as seen by callers. The underlying reason is
/// logged, never returned.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unauthorized")]
pub struct Unauthorized;

/// A freshly minted token plus the issuance context.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
    pub roles: Vec<String>,
}

/// Explicit composition of the identity store, password policy, and token
/// handler. Components are constructed independently and wired here.
pub struct AuthPipeline {
    store: UserStore,
    policy: PasswordPolicy,
    tokens: JwtHandler,
}

impl AuthPipeline {
    pub fn new(store: UserStore, policy: PasswordPolicy, tokens: JwtHandler) -> Self {
        Self {
            store,
            policy,
            tokens,
        }
    }

    pub fn store(&self) -> &UserStore {
        &self.store
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Verify credentials and mint a token carrying the user's current
    /// role snapshot.
    pub fn login(&self, username: &str, password: &str) -> Result<IssuedToken, LoginError> {
        let user = self
            .store
            .find_by_username(username)
            .map_err(|e| LoginError::Internal(e.into()))?;

        let Some(user) = user else {
            debug!(username, "login rejected: unknown user");
            return Err(LoginError::InvalidCredentials);
        };

        let valid = self.policy.verify(password, &user.password_hash)?;
        if !valid {
            debug!(username, "login rejected: wrong password");
            return Err(LoginError::InvalidCredentials);
        }

        let roles = self
            .store
            .roles_of(&user.id)
            .map_err(|e| LoginError::Internal(e.into()))?;

        let (token, expires_at) = self.tokens.issue(&user, &roles)?;

        Ok(IssuedToken {
            token,
            expires_at,
            user,
            roles,
        })
    }

    /// Create an account: policy check, hash, store insert, default role.
    pub fn register(&self, username: &str, password: &str) -> Result<User, RegisterError> {
        self.policy.validate(password)?;
        let password_hash = self.policy.hash(password)?;

        let user = match self.store.create_user(username, &password_hash) {
            Ok(user) => user,
            Err(StoreError::UsernameConflict) => {
                warn!(username, "registration rejected: username taken");
                return Err(RegisterError::UsernameConflict);
            }
            Err(e) => return Err(RegisterError::Internal(e.into())),
        };

        self.store
            .assign_role(&user.id, DEFAULT_USER_ROLE)
            .map_err(|e| RegisterError::Internal(e.into()))?;

        Ok(user)
    }

    /// Validate a presented token. Malformed, bad-signature, and expired
    /// tokens are indistinguishable to the caller.
    pub fn authenticate(&self, token: &str) -> Result<Principal, Unauthorized> {
        self.tokens.validate(token).map_err(|reason| {
            debug!(%reason, "token rejected");
            Unauthorized
        })
    }
}
