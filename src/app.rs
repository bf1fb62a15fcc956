//! Application Router
//! Mission: Wire public, auth, and protected route groups into one service

use crate::auth::{api, auth_middleware, AuthState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Bound on any single request, including its store I/O.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the full application router around a shared auth state.
pub fn build_router(state: AuthState) -> Router {
    let public_routes = Router::new().route("/health", get(api::health));

    let auth_routes = Router::new()
        .route("/auth/login", post(api::login))
        .route("/auth/register", post(api::register))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(api::me))
        .route("/admin/users", get(api::list_users))
        .route("/admin/roles", post(api::create_role))
        .route("/admin/users/:id/roles", post(api::assign_role))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
