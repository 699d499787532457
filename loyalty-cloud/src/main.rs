//! loyalty-cloud: coffee shop loyalty and gift card service
//!
//! Long-running service that:
//! - Lets customers collect points and hold their card in Apple / Google Wallet
//! - Issues gift cards and tracks their balance ledger
//! - Serves the employee admin API (purchases, redemptions, staff, analytics)
//! - Implements the Apple Wallet web service and pushes pass updates over APNs

mod analytics;
mod api;
mod auth;
mod config;
mod db;
mod email;
mod error;
mod services;
mod state;
mod util;
mod wallet;

use std::net::SocketAddr;

use config::Config;
use error::BoxError;
use shared::models::EmployeeRole;
use state::AppState;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "loyalty_cloud=info,tower_http=info".into());
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting loyalty-cloud (env: {})", config.environment);

    let http_port = config.http_port;
    let state = AppState::new(config).await?;

    bootstrap_admin(&state).await?;

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let app = api::build_app(state);

    let http_addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    tracing::info!("loyalty-cloud HTTP listening on {http_addr}");

    // Rate limiting keys on the peer address
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("loyalty-cloud stopped");
    Ok(())
}

/// Create the first administrator when the employees table is empty.
async fn bootstrap_admin(state: &AppState) -> Result<(), BoxError> {
    let Some(admin) = &state.config.bootstrap_admin else {
        return Ok(());
    };
    if db::employees::count(&state.pool).await? > 0 {
        return Ok(());
    }

    let email = shared::util::normalize_email(&admin.email)
        .ok_or("BOOTSTRAP_ADMIN_EMAIL is not a valid email address")?;
    if admin.password.chars().count() < util::MIN_PASSWORD_LEN {
        return Err(format!(
            "BOOTSTRAP_ADMIN_PASSWORD must be at least {} characters",
            util::MIN_PASSWORD_LEN
        )
        .into());
    }
    let hashed = util::hash_password(&admin.password).map_err(|e| e.to_string())?;

    let employee = db::employees::create(
        &state.pool,
        &email,
        "Administrator",
        &hashed,
        EmployeeRole::Admin,
        shared::util::now_millis(),
    )
    .await?;
    tracing::info!(employee_id = %employee.id, email = %employee.email, "Bootstrap admin created");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
