//! Gatehouse - Authentication backbone for the client application API
//! Mission: Verify credentials, issue bearer tokens, gate access by role

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse_backend::{
    app::build_router,
    auth::{
        models::{ADMIN_ROLE, DEFAULT_USER_ROLE},
        user_store::StoreError,
        AuthPipeline, AuthState, JwtHandler, PasswordPolicy, UserStore,
    },
    config::Config,
};

/// Seeded on first run so the admin surface is reachable out of the box.
const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    init_tracing();

    // Fail fast: a missing, blank, or weak signing secret halts startup
    // before anything else is constructed.
    let config = Config::from_env().context("Invalid configuration")?;

    info!("🔐 Gatehouse starting");

    let store = UserStore::new(&config.database_path)
        .with_context(|| format!("Failed to open identity store at {}", config.database_path))?;
    let policy = PasswordPolicy::new(config.password_policy.clone());
    let tokens = JwtHandler::new(&config.signing_secret, config.token_lifetime_hours);

    seed_identity_defaults(&store, &policy)?;

    let pipeline = Arc::new(AuthPipeline::new(store.clone(), policy, tokens));
    let state = AuthState {
        pipeline,
        store: Arc::new(store),
    };

    let app = build_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Create the built-in roles and the bootstrap admin account if absent.
fn seed_identity_defaults(store: &UserStore, policy: &PasswordPolicy) -> Result<()> {
    for role in [ADMIN_ROLE, DEFAULT_USER_ROLE] {
        match store.create_role(role) {
            Ok(_) => {}
            Err(StoreError::RoleConflict) => {}
            Err(e) => return Err(e).context("Failed to seed roles"),
        }
    }

    if store.find_by_username(DEFAULT_ADMIN_USERNAME)?.is_none() {
        let password_hash = policy.hash(DEFAULT_ADMIN_PASSWORD)?;
        let admin = store.create_user(DEFAULT_ADMIN_USERNAME, &password_hash)?;
        store.assign_role(&admin.id, ADMIN_ROLE)?;

        info!(
            "🔐 Default admin user created (username: {})",
            DEFAULT_ADMIN_USERNAME
        );
        warn!("⚠️  CHANGE DEFAULT ADMIN PASSWORD IN PRODUCTION!");
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatehouse_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
