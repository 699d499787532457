//! Gift cards and their transaction ledger

use shared::models::{GiftCard, GiftCardTransaction, TransactionKind};
use shared::models::{apply_transaction, signed_amount};
use shared::response::PageQuery;
use shared::util::{generate_serial_number, generate_token};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{ServiceResult, is_unique_violation};
use shared::error::{AppError, ErrorCode};

const GIFT_CARD_COLUMNS: &str = "id, serial_number, initial_balance, balance, purchaser_email, \
     recipient_email, message, claim_token, claimed_by, claimed_at, pass_auth_token, issued_by, \
     is_active, created_at, updated_at";

const TRANSACTION_COLUMNS: &str =
    "id, gift_card_id, kind, amount, balance_after, employee_id, note, created_at";

/// Attempts at finding an unused serial number before giving up.
const MAX_SERIAL_ATTEMPTS: usize = 5;

pub struct NewGiftCard<'a> {
    pub amount_cents: i64,
    pub purchaser_email: Option<&'a str>,
    pub recipient_email: Option<&'a str>,
    pub message: Option<&'a str>,
    pub issued_by: Uuid,
}

/// Issue a card and write its `issue` ledger row.
///
/// Serial numbers and tokens are random; a collision on any UNIQUE column
/// is retried with fresh values.
pub async fn issue(pool: &PgPool, card: &NewGiftCard<'_>, now: i64) -> ServiceResult<GiftCard> {
    let balance = apply_transaction(0, TransactionKind::Issue, card.amount_cents)?;

    for attempt in 1..=MAX_SERIAL_ATTEMPTS {
        match try_issue(pool, card, balance, now).await {
            Ok(issued) => return Ok(issued),
            Err(e) if is_unique_violation(&e) => {
                tracing::warn!(attempt, "Gift card serial collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::with_message(
        ErrorCode::InternalError,
        "Could not allocate a gift card serial number",
    )
    .into())
}

async fn try_issue(
    pool: &PgPool,
    card: &NewGiftCard<'_>,
    balance: i64,
    now: i64,
) -> Result<GiftCard, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let issued: GiftCard = sqlx::query_as(&format!(
        "INSERT INTO gift_cards (id, serial_number, initial_balance, balance, purchaser_email,
            recipient_email, message, claim_token, pass_auth_token, issued_by, is_active,
            created_at, updated_at)
         VALUES ($1, $2, $3, $3, $4, $5, $6, $7, $8, $9, TRUE, $10, $10)
         RETURNING {GIFT_CARD_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(generate_serial_number())
    .bind(balance)
    .bind(card.purchaser_email)
    .bind(card.recipient_email)
    .bind(card.message)
    .bind(generate_token())
    .bind(generate_token())
    .bind(card.issued_by)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    insert_transaction(
        &mut tx,
        issued.id,
        TransactionKind::Issue,
        balance,
        balance,
        Some(card.issued_by),
        None,
        now,
    )
    .await?;

    tx.commit().await?;
    Ok(issued)
}

#[allow(clippy::too_many_arguments)]
async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    gift_card_id: Uuid,
    kind: TransactionKind,
    amount: i64,
    balance_after: i64,
    employee_id: Option<Uuid>,
    note: Option<&str>,
    now: i64,
) -> Result<GiftCardTransaction, sqlx::Error> {
    sqlx::query_as(&format!(
        "INSERT INTO gift_card_transactions
            (gift_card_id, kind, amount, balance_after, employee_id, note, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {TRANSACTION_COLUMNS}"
    ))
    .bind(gift_card_id)
    .bind(kind.as_str())
    .bind(signed_amount(kind, amount))
    .bind(balance_after)
    .bind(employee_id)
    .bind(note)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_serial(
    pool: &PgPool,
    serial_number: &str,
) -> Result<Option<GiftCard>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {GIFT_CARD_COLUMNS} FROM gift_cards WHERE serial_number = $1"
    ))
    .bind(serial_number)
    .fetch_optional(pool)
    .await
}

pub async fn list(pool: &PgPool, page: &PageQuery) -> Result<(Vec<GiftCard>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gift_cards")
        .fetch_one(pool)
        .await?;
    let rows = sqlx::query_as(&format!(
        "SELECT {GIFT_CARD_COLUMNS} FROM gift_cards ORDER BY created_at DESC LIMIT $1 OFFSET $2"
    ))
    .bind(i64::from(page.per_page()))
    .bind(page.offset())
    .fetch_all(pool)
    .await?;
    Ok((rows, total))
}

pub async fn list_claimed_by(pool: &PgPool, profile_id: Uuid) -> Result<Vec<GiftCard>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {GIFT_CARD_COLUMNS} FROM gift_cards
         WHERE claimed_by = $1
         ORDER BY claimed_at DESC"
    ))
    .bind(profile_id)
    .fetch_all(pool)
    .await
}

pub async fn list_transactions(
    pool: &PgPool,
    gift_card_id: Uuid,
) -> Result<Vec<GiftCardTransaction>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM gift_card_transactions
         WHERE gift_card_id = $1
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(gift_card_id)
    .fetch_all(pool)
    .await
}

/// Redeem from or reload a card. The row is locked for the whole update.
pub async fn apply(
    pool: &PgPool,
    serial_number: &str,
    kind: TransactionKind,
    amount: i64,
    employee_id: Uuid,
    note: Option<&str>,
    now: i64,
) -> ServiceResult<(GiftCard, GiftCardTransaction)> {
    let mut tx = pool.begin().await?;

    let card: GiftCard = sqlx::query_as(&format!(
        "SELECT {GIFT_CARD_COLUMNS} FROM gift_cards WHERE serial_number = $1 FOR UPDATE"
    ))
    .bind(serial_number)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::GiftCardNotFound))?;

    if !card.is_active {
        return Err(AppError::new(ErrorCode::GiftCardInactive).into());
    }

    let next = apply_transaction(card.balance, kind, amount)?;

    let updated: GiftCard = sqlx::query_as(&format!(
        "UPDATE gift_cards SET balance = $1, updated_at = $2 WHERE id = $3
         RETURNING {GIFT_CARD_COLUMNS}"
    ))
    .bind(next)
    .bind(now)
    .bind(card.id)
    .fetch_one(&mut *tx)
    .await?;

    let entry = insert_transaction(
        &mut tx,
        card.id,
        kind,
        amount,
        next,
        Some(employee_id),
        note,
        now,
    )
    .await?;

    tx.commit().await?;
    Ok((updated, entry))
}

pub async fn deactivate(
    pool: &PgPool,
    serial_number: &str,
    now: i64,
) -> Result<Option<GiftCard>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE gift_cards SET is_active = FALSE, updated_at = $1 WHERE serial_number = $2
         RETURNING {GIFT_CARD_COLUMNS}"
    ))
    .bind(now)
    .bind(serial_number)
    .fetch_optional(pool)
    .await
}

/// Attach a card to a customer. Claiming again as the same customer is a no-op.
pub async fn claim(
    pool: &PgPool,
    claim_token: &str,
    profile_id: Uuid,
    now: i64,
) -> ServiceResult<GiftCard> {
    let mut tx = pool.begin().await?;

    let card: GiftCard = sqlx::query_as(&format!(
        "SELECT {GIFT_CARD_COLUMNS} FROM gift_cards WHERE claim_token = $1 FOR UPDATE"
    ))
    .bind(claim_token)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::GiftCardNotFound))?;

    match card.claimed_by {
        Some(owner) if owner == profile_id => return Ok(card),
        Some(_) => return Err(AppError::new(ErrorCode::GiftCardAlreadyClaimed).into()),
        None => {}
    }

    if !card.is_active {
        return Err(AppError::new(ErrorCode::GiftCardInactive).into());
    }

    let claimed: GiftCard = sqlx::query_as(&format!(
        "UPDATE gift_cards SET claimed_by = $1, claimed_at = $2, updated_at = $2 WHERE id = $3
         RETURNING {GIFT_CARD_COLUMNS}"
    ))
    .bind(profile_id)
    .bind(now)
    .bind(card.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(claimed)
}
