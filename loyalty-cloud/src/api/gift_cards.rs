//! Public gift card routes, authorized by the card's claim token

use axum::routing::get;
use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{GiftCard, GiftCardBalance};
use shared::util::is_well_formed_token;

use crate::api::extract::{ApiPath, ApiQuery};
use crate::api::{ApiResult, ok, path_serial};
use crate::db;
use crate::error::internal;
use crate::state::AppState;
use crate::wallet::apple::PKPASS_CONTENT_TYPE;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/gift-cards/{serial}/balance", get(balance))
        .route("/api/gift-cards/{serial}/pass/apple", get(apple_pass))
        .route("/api/gift-cards/{serial}/pass/google", get(google_pass))
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

/// Load a card and check the claim token; any mismatch looks like a missing card.
async fn authorized_card(state: &AppState, serial: &str, token: &str) -> AppResult<GiftCard> {
    let serial = path_serial(serial)?;
    if !is_well_formed_token(token) {
        return Err(AppError::new(ErrorCode::GiftCardNotFound));
    }
    db::gift_cards::find_by_serial(&state.pool, &serial)
        .await
        .map_err(internal)?
        .filter(|card| card.claim_token == token)
        .ok_or_else(|| AppError::new(ErrorCode::GiftCardNotFound))
}

/// GET /api/gift-cards/{serial}/balance?token=
pub async fn balance(
    State(state): State<AppState>,
    ApiPath(serial): ApiPath<String>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> ApiResult<GiftCardBalance> {
    let card = authorized_card(&state, &serial, &query.token).await?;
    ok(GiftCardBalance::from(&card))
}

/// GET /api/gift-cards/{serial}/pass/apple?token=
pub async fn apple_pass(
    State(state): State<AppState>,
    ApiPath(serial): ApiPath<String>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> Result<Response, AppError> {
    let apple = state
        .apple
        .as_ref()
        .ok_or_else(|| AppError::new(ErrorCode::WalletNotConfigured))?;
    let card = authorized_card(&state, &serial, &query.token).await?;

    let pkpass = apple.gift_card_pkpass(&card).map_err(|e| {
        tracing::error!(serial = %card.serial_number, error = %e, "Pass generation failed");
        AppError::new(ErrorCode::PassGenerationFailed)
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, PKPASS_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"gift-card.pkpass\"",
            ),
        ],
        pkpass,
    )
        .into_response())
}

#[derive(Serialize)]
pub struct SaveLink {
    pub save_url: String,
}

/// GET /api/gift-cards/{serial}/pass/google?token=
pub async fn google_pass(
    State(state): State<AppState>,
    ApiPath(serial): ApiPath<String>,
    ApiQuery(query): ApiQuery<TokenQuery>,
) -> ApiResult<SaveLink> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::new(ErrorCode::WalletNotConfigured))?;
    let card = authorized_card(&state, &serial, &query.token).await?;

    let save_url = google.gift_card_save_link(&card).map_err(|e| {
        tracing::error!(serial = %card.serial_number, error = %e, "Google save link failed");
        AppError::new(ErrorCode::PassGenerationFailed)
    })?;
    ok(SaveLink { save_url })
}
