//! Dashboard queries

use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Overview {
    pub customers: i64,
    pub outstanding_points: i64,
    pub rewards_redeemed: i64,
    pub purchases_today: i64,
    pub active_gift_cards: i64,
    pub gift_card_liability_cents: i64,
    pub registered_devices: i64,
}

/// Customer totals: (count, outstanding points, rewards redeemed)
pub async fn customer_totals(pool: &PgPool) -> Result<(i64, i64, i64), sqlx::Error> {
    sqlx::query_as(
        "SELECT COUNT(*),
                COALESCE(SUM(points_balance), 0)::BIGINT,
                COALESCE(SUM(rewards_redeemed), 0)::BIGINT
         FROM profiles",
    )
    .fetch_one(pool)
    .await
}

pub async fn purchases_since(pool: &PgPool, since: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM purchases WHERE created_at >= $1")
        .bind(since)
        .fetch_one(pool)
        .await
}

/// Active gift cards: (count, outstanding balance)
pub async fn gift_card_totals(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(balance), 0)::BIGINT FROM gift_cards WHERE is_active",
    )
    .fetch_one(pool)
    .await
}

pub async fn registered_devices(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(DISTINCT device_library_identifier) FROM pass_registrations")
        .fetch_one(pool)
        .await
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PurchaseEvent {
    pub created_at: i64,
    pub quantity: i64,
    pub points_earned: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GiftCardEvent {
    pub created_at: i64,
    pub kind: String,
    pub amount: i64,
}

pub async fn purchase_events(
    pool: &PgPool,
    from: i64,
    to: i64,
) -> Result<Vec<PurchaseEvent>, sqlx::Error> {
    sqlx::query_as(
        "SELECT created_at, quantity, points_earned FROM purchases
         WHERE created_at >= $1 AND created_at < $2",
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

pub async fn signup_times(pool: &PgPool, from: i64, to: i64) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT created_at FROM profiles WHERE created_at >= $1 AND created_at < $2")
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
}

pub async fn gift_card_events(
    pool: &PgPool,
    from: i64,
    to: i64,
) -> Result<Vec<GiftCardEvent>, sqlx::Error> {
    sqlx::query_as(
        "SELECT created_at, kind, amount FROM gift_card_transactions
         WHERE created_at >= $1 AND created_at < $2",
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TopCustomer {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub lifetime_points: i64,
    pub total_purchases: i64,
    pub points_balance: i64,
}

pub async fn top_customers(pool: &PgPool, limit: i64) -> Result<Vec<TopCustomer>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, email, full_name, lifetime_points, total_purchases, points_balance
         FROM profiles
         ORDER BY lifetime_points DESC, created_at
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
