//! Registration, login and the customer's own data

use axum::{Extension, extract::State};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CustomerDetail, CustomerRegister, GiftCard, GiftCardBalance, GiftCardClaim, Purchase,
};
use shared::util::{generate_token, is_well_formed_token, now_millis};

use crate::api::extract::ApiJson;
use crate::api::{ApiResult, clean_text, ok, require_email};
use crate::auth::CustomerIdentity;
use crate::auth::token::{TokenKind, create_token};
use crate::db;
use crate::error::{internal, is_unique_violation};
use crate::state::AppState;
use crate::util::{check_password_strength, hash_or_internal, verify_password};

const PURCHASE_HISTORY_LIMIT: i64 = 100;

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: i64,
    pub customer: CustomerDetail,
}

/// POST /api/customers/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CustomerRegister>,
) -> ApiResult<SessionResponse> {
    let email = require_email(&req.email)?;
    let full_name = clean_text(Some(&req.full_name))
        .ok_or_else(|| AppError::validation("full_name is required"))?;
    check_password_strength(&req.password)?;
    let hashed = hash_or_internal(&req.password)?;

    let customer = db::profiles::create(
        &state.pool,
        &email,
        &full_name,
        &hashed,
        &generate_token(),
        now_millis(),
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::new(ErrorCode::EmailAlreadyRegistered)
        } else {
            internal(e)
        }
    })?;

    let issued = create_token(
        TokenKind::Customer,
        &customer.id.to_string(),
        &customer.email,
        None,
        &state.config.jwt_secret,
    )
    .map_err(internal)?;

    tracing::info!(customer_id = %customer.id, "Customer registered");
    ok(SessionResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        customer: CustomerDetail {
            rewards: customer.reward_status(&state.config.rewards),
            customer,
        },
    })
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /api/customers/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<SessionResponse> {
    let email = req.email.trim().to_lowercase();
    let auth = db::profiles::find_auth_by_email(&state.pool, &email)
        .await
        .map_err(internal)?
        .ok_or_else(AppError::invalid_credentials)?;

    if !verify_password(&req.password, &auth.hashed_password) {
        return Err(AppError::invalid_credentials());
    }

    let customer = db::profiles::find(&state.pool, auth.id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CustomerNotFound))?;

    let issued = create_token(
        TokenKind::Customer,
        &auth.id.to_string(),
        &auth.email,
        None,
        &state.config.jwt_secret,
    )
    .map_err(internal)?;

    ok(SessionResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        customer: CustomerDetail {
            rewards: customer.reward_status(&state.config.rewards),
            customer,
        },
    })
}

/// GET /api/me
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
) -> ApiResult<CustomerDetail> {
    let customer = db::profiles::find(&state.pool, identity.id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CustomerNotFound))?;
    ok(CustomerDetail {
        rewards: customer.reward_status(&state.config.rewards),
        customer,
    })
}

/// GET /api/me/purchases
pub async fn purchases(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
) -> ApiResult<Vec<Purchase>> {
    ok(
        db::profiles::list_purchases(&state.pool, identity.id, PURCHASE_HISTORY_LIMIT)
            .await
            .map_err(internal)?,
    )
}

/// GET /api/me/gift-cards
pub async fn gift_cards(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
) -> ApiResult<Vec<GiftCard>> {
    ok(db::gift_cards::list_claimed_by(&state.pool, identity.id)
        .await
        .map_err(internal)?)
}

/// POST /api/gift-cards/claim
pub async fn claim_gift_card(
    State(state): State<AppState>,
    Extension(identity): Extension<CustomerIdentity>,
    ApiJson(req): ApiJson<GiftCardClaim>,
) -> ApiResult<GiftCardBalance> {
    let token = req.claim_token.trim();
    if !is_well_formed_token(token) {
        return Err(AppError::new(ErrorCode::GiftCardNotFound));
    }

    let card = db::gift_cards::claim(&state.pool, token, identity.id, now_millis()).await?;
    tracing::info!(serial = %card.serial_number, customer_id = %identity.id, "Gift card claimed");
    ok(GiftCardBalance::from(&card))
}
