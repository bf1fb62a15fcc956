//! Authentication API Endpoints
//! Mission: Expose login, registration, and role administration over HTTP

use crate::auth::{
    gate,
    models::{
        AssignRoleRequest, CreateRoleRequest, LoginRequest, LoginResponse, Principal,
        RegisterRequest, Role, UserResponse, ADMIN_ROLE,
    },
    pipeline::{AuthPipeline, LoginError, RegisterError},
    user_store::{StoreError, UserStore},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub pipeline: Arc<AuthPipeline>,
    pub store: Arc<UserStore>,
}

/// Liveness probe - GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Login endpoint - POST /auth/login
pub async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    let issued = state
        .pipeline
        .login(&payload.username, &payload.password)
        .map_err(|e| match e {
            LoginError::InvalidCredentials => {
                warn!(username = %payload.username, "failed login attempt");
                AuthApiError::InvalidCredentials
            }
            LoginError::Internal(e) => {
                error!(error = %e, "login failed internally");
                AuthApiError::InternalError
            }
        })?;

    info!(username = %issued.user.username, "login successful");

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at.to_rfc3339(),
    }))
}

/// Registration endpoint - POST /auth/register
pub async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AuthApiError> {
    let user = state
        .pipeline
        .register(&payload.username, &payload.password)
        .map_err(|e| match e {
            RegisterError::Policy(v) => AuthApiError::PolicyViolation(v.to_string()),
            RegisterError::UsernameConflict => AuthApiError::UsernameConflict,
            RegisterError::Internal(e) => {
                error!(error = %e, "registration failed internally");
                AuthApiError::InternalError
            }
        })?;

    let roles = state.store.roles_of(&user.id)?;

    info!(username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::from_user(&user, roles)),
    ))
}

/// Current principal - GET /auth/me
///
/// Built entirely from the verified token; no store lookup.
pub async fn me(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}

/// List all users - GET /admin/users (Admin only)
pub async fn list_users(
    State(state): State<AuthState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<UserResponse>>, AuthApiError> {
    require_role(&principal, ADMIN_ROLE)?;

    let users = state.store.list_users()?;
    let mut response = Vec::with_capacity(users.len());
    for user in &users {
        let roles = state.store.roles_of(&user.id)?;
        response.push(UserResponse::from_user(user, roles));
    }

    Ok(Json(response))
}

/// Create role - POST /admin/roles (Admin only)
pub async fn create_role(
    State(state): State<AuthState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>), AuthApiError> {
    require_role(&principal, ADMIN_ROLE)?;

    let role = state.store.create_role(&payload.name)?;
    info!(role = %role.name, created_by = %principal.username, "role created");

    Ok((StatusCode::CREATED, Json(role)))
}

/// Assign role to user - POST /admin/users/:id/roles (Admin only)
pub async fn assign_role(
    State(state): State<AuthState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
    Json(payload): Json<AssignRoleRequest>,
) -> Result<StatusCode, AuthApiError> {
    require_role(&principal, ADMIN_ROLE)?;

    let user_id = Uuid::parse_str(&user_id).map_err(|_| AuthApiError::InvalidUserId)?;

    state.store.assign_role(&user_id, &payload.role)?;
    info!(user = %user_id, role = %payload.role, assigned_by = %principal.username, "role assigned");

    Ok(StatusCode::NO_CONTENT)
}

fn require_role(principal: &Principal, role: &str) -> Result<(), AuthApiError> {
    if gate::authorize(principal, Some(role)) {
        Ok(())
    } else {
        warn!(username = %principal.username, required = role, "authorization denied");
        Err(AuthApiError::Forbidden)
    }
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    InvalidCredentials,
    Forbidden,
    PolicyViolation(String),
    UsernameConflict,
    RoleConflict,
    UserNotFound,
    RoleNotFound,
    InvalidUserId,
    InternalError,
}

impl From<StoreError> for AuthApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UsernameConflict => AuthApiError::UsernameConflict,
            StoreError::RoleConflict => AuthApiError::RoleConflict,
            StoreError::UserNotFound => AuthApiError::UserNotFound,
            StoreError::RoleNotFound => AuthApiError::RoleNotFound,
            StoreError::Db(e) => {
                error!(error = %e, "store query failed");
                AuthApiError::InternalError
            }
        }
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid username or password".to_string(),
            ),
            AuthApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Insufficient permissions".to_string(),
            ),
            AuthApiError::PolicyViolation(rule) => (StatusCode::BAD_REQUEST, rule),
            AuthApiError::UsernameConflict => {
                (StatusCode::CONFLICT, "Username already exists".to_string())
            }
            AuthApiError::RoleConflict => {
                (StatusCode::CONFLICT, "Role already exists".to_string())
            }
            AuthApiError::UserNotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
            AuthApiError::RoleNotFound => (StatusCode::NOT_FOUND, "Role not found".to_string()),
            AuthApiError::InvalidUserId => (
                StatusCode::BAD_REQUEST,
                "Invalid user ID format".to_string(),
            ),
            AuthApiError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, message).into_response()
    }
}
