//! Authentication Models
//! Mission: Define user, role, claim, and request/response data structures

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role name granted full administrative access.
pub const ADMIN_ROLE: &str = "Admin";

/// Role name assigned to every account at registration.
pub const DEFAULT_USER_ROLE: &str = "User";

/// User account. Role membership lives in the store's join table and is
/// fetched separately as a snapshot at token issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub created_at: String,
}

/// Named permission group. Referenced, never owned, by users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
}

/// JWT claims payload. The role list is a snapshot of store state at
/// issuance time, not a live view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject (user id)
    pub username: String,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Verified identity reconstructed from a valid token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username,
            roles: claims.roles,
        }
    }
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// RFC 3339 expiry of the returned token.
    pub expires_at: String,
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// User response (sanitized - no password hash)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub roles: Vec<String>,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_user(user: &User, roles: Vec<String>) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            roles,
            created_at: user.created_at.clone(),
        }
    }
}

/// Role creation request (admin surface)
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
}

/// Role assignment request (admin surface)
#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub role: String,
}
