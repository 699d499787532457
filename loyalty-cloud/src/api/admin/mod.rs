//! Employee API: authentication, customers, gift cards, staff management

mod analytics;
mod audit;
mod auth;
mod customers;
mod employees;
mod gift_cards;
mod invitations;

use axum::routing::{delete, get, patch, post};
use axum::{Router, middleware};
use shared::util::now_millis;
use uuid::Uuid;

use crate::auth::employee_auth::{employee_auth_middleware, require_admin};
use crate::auth::rate_limit::login_rate_limit;
use crate::db;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let login = Router::new()
        .route("/api/admin/login", post(auth::login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            login_rate_limit,
        ));

    // Any active employee
    let staff = Router::new()
        .route("/api/admin/me", get(auth::me))
        .route("/api/admin/customers", get(customers::list))
        .route("/api/admin/customers/{id}", get(customers::detail))
        .route(
            "/api/admin/customers/{id}/purchases",
            post(customers::record_purchase),
        )
        .route("/api/admin/customers/{id}/redeem", post(customers::redeem))
        .route(
            "/api/admin/gift-cards",
            get(gift_cards::list).post(gift_cards::issue),
        )
        .route("/api/admin/gift-cards/{serial}", get(gift_cards::detail))
        .route(
            "/api/admin/gift-cards/{serial}/redeem",
            post(gift_cards::redeem),
        )
        .route(
            "/api/admin/gift-cards/{serial}/reload",
            post(gift_cards::reload),
        );

    let admin_only = Router::new()
        .route("/api/admin/customers/{id}/adjust", post(customers::adjust))
        .route(
            "/api/admin/gift-cards/{serial}/deactivate",
            post(gift_cards::deactivate),
        )
        .route(
            "/api/admin/invitations",
            get(invitations::list).post(invitations::create),
        )
        .route("/api/admin/invitations/{id}", delete(invitations::revoke))
        .route("/api/admin/employees", get(employees::list))
        .route("/api/admin/employees/{id}", patch(employees::update))
        .route("/api/admin/analytics/overview", get(analytics::overview))
        .route("/api/admin/analytics/daily", get(analytics::daily))
        .route(
            "/api/admin/analytics/top-customers",
            get(analytics::top_customers),
        )
        .route("/api/admin/audit", get(audit::audit_log))
        .layer(middleware::from_fn(require_admin));

    staff
        .merge(admin_only)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            employee_auth_middleware,
        ))
        .merge(login)
}

/// Record an employee action. Failures are logged, never surfaced.
async fn audit(state: &AppState, employee_id: Uuid, action: &str, detail: serde_json::Value) {
    if let Err(e) =
        db::audit::log(&state.pool, employee_id, action, Some(&detail), now_millis()).await
    {
        tracing::warn!(action, error = %e, "Failed to write audit log");
    }
}
