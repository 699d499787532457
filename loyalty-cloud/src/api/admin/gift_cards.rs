//! Gift card issuing and counter operations

use axum::{Extension, extract::State};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    GiftCard, GiftCardAmount, GiftCardDetail, GiftCardIssue, GiftCardTransaction,
    TransactionKind,
};
use shared::response::{PageQuery, PaginatedResponse};
use shared::util::now_millis;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::{ApiResult, clean_text, ok, path_serial, require_email};
use crate::auth::EmployeeIdentity;
use crate::db;
use crate::db::gift_cards::NewGiftCard;
use crate::email;
use crate::error::internal;
use crate::services::pass_updates;
use crate::state::AppState;

const MAX_MESSAGE_LEN: usize = 500;

#[derive(Serialize)]
pub struct GiftCardIssued {
    #[serde(flatten)]
    pub card: GiftCard,
    /// Link the recipient opens to attach the card to an account
    pub claim_link: String,
}

/// POST /api/admin/gift-cards
pub async fn issue(
    State(state): State<AppState>,
    Extension(identity): Extension<EmployeeIdentity>,
    ApiJson(req): ApiJson<GiftCardIssue>,
) -> ApiResult<GiftCardIssued> {
    let purchaser_email = clean_text(req.purchaser_email.as_deref())
        .map(|e| require_email(&e))
        .transpose()?;
    let recipient_email = clean_text(req.recipient_email.as_deref())
        .map(|e| require_email(&e))
        .transpose()?;
    let message = clean_text(req.message.as_deref());
    if message
        .as_ref()
        .is_some_and(|m| m.chars().count() > MAX_MESSAGE_LEN)
    {
        return Err(AppError::validation("Message is too long")
            .with_detail("max", MAX_MESSAGE_LEN));
    }

    let card = db::gift_cards::issue(
        &state.pool,
        &NewGiftCard {
            amount_cents: req.amount_cents,
            purchaser_email: purchaser_email.as_deref(),
            recipient_email: recipient_email.as_deref(),
            message: message.as_deref(),
            issued_by: identity.id,
        },
        now_millis(),
    )
    .await?;

    let claim_link = format!(
        "{}/gift-cards/claim?token={}",
        state.config.app_base_url, card.claim_token
    );

    if let Some(to) = &card.recipient_email {
        email::send_in_background(
            state.ses.clone(),
            state.config.ses_from_email.clone(),
            to.clone(),
            email::gift_card_email(
                &state.config.shop_name,
                card.balance,
                &card.serial_number,
                card.message.as_deref(),
                &claim_link,
            ),
        );
    }

    super::audit(
        &state,
        identity.id,
        audit_action(TransactionKind::Issue),
        serde_json::json!({ "serial_number": card.serial_number, "amount_cents": card.balance }),
    )
    .await;
    tracing::info!(serial = %card.serial_number, amount = card.balance, "Gift card issued");

    ok(GiftCardIssued { card, claim_link })
}

/// GET /api/admin/gift-cards?page=&per_page=
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<PaginatedResponse<GiftCard>> {
    let (cards, total) = db::gift_cards::list(&state.pool, &page)
        .await
        .map_err(internal)?;
    ok(PaginatedResponse::new(cards, &page, total.max(0) as u64))
}

/// GET /api/admin/gift-cards/{serial}
pub async fn detail(
    State(state): State<AppState>,
    ApiPath(serial): ApiPath<String>,
) -> ApiResult<GiftCardDetail> {
    let serial = path_serial(&serial)?;
    let card = db::gift_cards::find_by_serial(&state.pool, &serial)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::GiftCardNotFound))?;
    let transactions = db::gift_cards::list_transactions(&state.pool, card.id)
        .await
        .map_err(internal)?;
    ok(GiftCardDetail { card, transactions })
}

#[derive(Serialize)]
pub struct GiftCardUpdated {
    pub card: GiftCard,
    pub transaction: GiftCardTransaction,
}

fn audit_action(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Issue => "gift_card_issued",
        TransactionKind::Redeem => "gift_card_redeemed",
        TransactionKind::Reload => "gift_card_reloaded",
        TransactionKind::Adjust => "gift_card_adjusted",
    }
}

async fn apply(
    state: &AppState,
    identity: &EmployeeIdentity,
    serial: &str,
    kind: TransactionKind,
    req: GiftCardAmount,
) -> ApiResult<GiftCardUpdated> {
    let serial = path_serial(serial)?;
    let note = clean_text(req.note.as_deref());
    let (card, transaction) = db::gift_cards::apply(
        &state.pool,
        &serial,
        kind,
        req.amount_cents,
        identity.id,
        note.as_deref(),
        now_millis(),
    )
    .await?;

    tracing::info!(
        serial = %card.serial_number,
        kind = kind.as_str(),
        amount = req.amount_cents,
        balance = card.balance,
        "Gift card transaction"
    );
    super::audit(
        state,
        identity.id,
        audit_action(kind),
        serde_json::json!({
            "serial_number": card.serial_number,
            "amount_cents": req.amount_cents,
            "balance": card.balance,
        }),
    )
    .await;
    pass_updates::gift_card_pass_changed(state, &card).await;

    ok(GiftCardUpdated { card, transaction })
}

/// POST /api/admin/gift-cards/{serial}/redeem
pub async fn redeem(
    State(state): State<AppState>,
    Extension(identity): Extension<EmployeeIdentity>,
    ApiPath(serial): ApiPath<String>,
    ApiJson(req): ApiJson<GiftCardAmount>,
) -> ApiResult<GiftCardUpdated> {
    apply(&state, &identity, &serial, TransactionKind::Redeem, req).await
}

/// POST /api/admin/gift-cards/{serial}/reload
pub async fn reload(
    State(state): State<AppState>,
    Extension(identity): Extension<EmployeeIdentity>,
    ApiPath(serial): ApiPath<String>,
    ApiJson(req): ApiJson<GiftCardAmount>,
) -> ApiResult<GiftCardUpdated> {
    apply(&state, &identity, &serial, TransactionKind::Reload, req).await
}

/// POST /api/admin/gift-cards/{serial}/deactivate
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(identity): Extension<EmployeeIdentity>,
    ApiPath(serial): ApiPath<String>,
) -> ApiResult<GiftCard> {
    let serial = path_serial(&serial)?;
    let card = db::gift_cards::deactivate(&state.pool, &serial, now_millis())
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::GiftCardNotFound))?;

    super::audit(
        &state,
        identity.id,
        "gift_card_deactivated",
        serde_json::json!({ "serial_number": card.serial_number }),
    )
    .await;
    pass_updates::gift_card_pass_changed(&state, &card).await;

    ok(card)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_action() {
        assert_eq!(audit_action(TransactionKind::Redeem), "gift_card_redeemed");
        assert_eq!(audit_action(TransactionKind::Reload), "gift_card_reloaded");
        assert_eq!(audit_action(TransactionKind::Issue), "gift_card_issued");
    }
}
