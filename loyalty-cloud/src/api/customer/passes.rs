//! Wallet pass downloads for the signed-in customer

use axum::{
    Extension,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use shared::error::{AppError, ErrorCode};

use crate::api::gift_cards::SaveLink;
use crate::api::{ApiResult, ok};
use crate::auth::CustomerIdentity;
use crate::db;
use crate::error::internal;
use crate::state::AppState;
use crate::wallet::apple::PKPASS_CONTENT_TYPE;

/// GET /api/me/pass/apple
pub async fn apple_pass(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
) -> Result<Response, AppError> {
    let apple = state
        .apple
        .as_ref()
        .ok_or_else(|| AppError::new(ErrorCode::WalletNotConfigured))?;

    let (customer, auth_token) = tokio::try_join!(
        db::profiles::find(&state.pool, identity.id),
        db::profiles::find_pass_auth_token(&state.pool, identity.id),
    )
    .map_err(internal)?;
    let (customer, auth_token) = customer
        .zip(auth_token)
        .ok_or_else(|| AppError::new(ErrorCode::CustomerNotFound))?;

    let pkpass = apple
        .loyalty_pkpass(&customer, &state.config.rewards, &auth_token)
        .map_err(|e| {
            tracing::error!(customer_id = %customer.id, error = %e, "Pass generation failed");
            AppError::new(ErrorCode::PassGenerationFailed)
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, PKPASS_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"loyalty.pkpass\"",
            ),
        ],
        pkpass,
    )
        .into_response())
}

/// GET /api/me/pass/google
pub async fn google_pass(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
) -> ApiResult<SaveLink> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AppError::new(ErrorCode::WalletNotConfigured))?;

    let customer = db::profiles::find(&state.pool, identity.id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CustomerNotFound))?;

    let save_url = google
        .loyalty_save_link(&customer, &state.config.rewards)
        .map_err(|e| {
            tracing::error!(customer_id = %customer.id, error = %e, "Google save link failed");
            AppError::new(ErrorCode::PassGenerationFailed)
        })?;
    ok(SaveLink { save_url })
}
