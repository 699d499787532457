//! Customer self-service API

mod account;
mod passes;

use axum::routing::{get, post};
use axum::{Router, middleware};

use crate::auth::customer_auth::customer_auth_middleware;
use crate::auth::rate_limit::{login_rate_limit, register_rate_limit};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let register = Router::new()
        .route("/api/customers/register", post(account::register))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            register_rate_limit,
        ));

    let login = Router::new()
        .route("/api/customers/login", post(account::login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            login_rate_limit,
        ));

    let authenticated = Router::new()
        .route("/api/me", get(account::me))
        .route("/api/me/purchases", get(account::purchases))
        .route("/api/me/gift-cards", get(account::gift_cards))
        .route("/api/gift-cards/claim", post(account::claim_gift_card))
        .route("/api/me/pass/apple", get(passes::apple_pass))
        .route("/api/me/pass/google", get(passes::google_pass))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            customer_auth_middleware,
        ));

    register.merge(login).merge(authenticated)
}
