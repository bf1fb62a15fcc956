//! Authentication Middleware
//! Mission: Protect routes by turning bearer tokens into request principals

use crate::auth::api::AuthState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Validates the `Authorization: Bearer` header and stashes the resulting
/// principal in request extensions for handlers to extract.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.to_string())
        .ok_or(AuthError::MissingToken)?;

    let principal = state
        .pipeline
        .authenticate(&token)
        .map_err(|_| AuthError::InvalidToken)?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Middleware-level auth failures. Both 401 variants render the same
/// body so the response never reveals why a token was rejected.
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "Authentication required").into_response()
    }
}
