//! Customer profiles and purchase history

use shared::loyalty::RewardRules;
use shared::models::{Customer, Purchase};
use shared::response::PageQuery;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ServiceResult;
use shared::error::{AppError, ErrorCode};

const CUSTOMER_COLUMNS: &str = "id, email, full_name, points_balance, lifetime_points, \
     total_purchases, rewards_redeemed, created_at, updated_at";

/// Credentials row used by login
#[derive(sqlx::FromRow)]
pub struct ProfileAuth {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

pub async fn create(
    pool: &PgPool,
    email: &str,
    full_name: &str,
    hashed_password: &str,
    pass_auth_token: &str,
    now: i64,
) -> Result<Customer, sqlx::Error> {
    sqlx::query_as(&format!(
        "INSERT INTO profiles (id, email, full_name, hashed_password, pass_auth_token, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(full_name)
    .bind(hashed_password)
    .bind(pass_auth_token)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn find_auth_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<ProfileAuth>, sqlx::Error> {
    sqlx::query_as("SELECT id, email, hashed_password FROM profiles WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Customer>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {CUSTOMER_COLUMNS} FROM profiles WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Pass authentication token of a loyalty pass
pub async fn find_pass_auth_token(pool: &PgPool, id: Uuid) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT pass_auth_token FROM profiles WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Paginated list with optional case-insensitive search on email / name
pub async fn list(
    pool: &PgPool,
    search: Option<&str>,
    page: &PageQuery,
) -> Result<(Vec<Customer>, i64), sqlx::Error> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM profiles
         WHERE $1::TEXT IS NULL OR email ILIKE $1 OR full_name ILIKE $1",
    )
    .bind(&pattern)
    .fetch_one(pool)
    .await?;

    let rows: Vec<Customer> = sqlx::query_as(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM profiles
         WHERE $1::TEXT IS NULL OR email ILIKE $1 OR full_name ILIKE $1
         ORDER BY created_at DESC
         LIMIT $2 OFFSET $3"
    ))
    .bind(&pattern)
    .bind(i64::from(page.per_page()))
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok((rows, total))
}

/// Escape `%`, `_` and `\` so user input is matched literally by ILIKE.
fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub async fn list_purchases(
    pool: &PgPool,
    profile_id: Uuid,
    limit: i64,
) -> Result<Vec<Purchase>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, profile_id, employee_id, quantity, points_earned, note, created_at
         FROM purchases WHERE profile_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2",
    )
    .bind(profile_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

async fn lock_balance(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    profile_id: Uuid,
) -> ServiceResult<i64> {
    let balance: Option<i64> =
        sqlx::query_scalar("SELECT points_balance FROM profiles WHERE id = $1 FOR UPDATE")
            .bind(profile_id)
            .fetch_optional(&mut **tx)
            .await?;
    balance.ok_or_else(|| AppError::new(ErrorCode::CustomerNotFound).into())
}

/// Record a purchase: earn points and append to the purchase history.
pub async fn record_purchase(
    pool: &PgPool,
    rules: &RewardRules,
    profile_id: Uuid,
    employee_id: Uuid,
    quantity: i64,
    note: Option<&str>,
    now: i64,
) -> ServiceResult<(Customer, Purchase)> {
    let points = rules.points_for_purchase(quantity)?;
    let mut tx = pool.begin().await?;

    lock_balance(&mut tx, profile_id).await?;

    let customer: Customer = sqlx::query_as(&format!(
        "UPDATE profiles SET
            points_balance = points_balance + $1,
            lifetime_points = lifetime_points + $1,
            total_purchases = total_purchases + $2,
            updated_at = $3
         WHERE id = $4
         RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(points)
    .bind(quantity)
    .bind(now)
    .bind(profile_id)
    .fetch_one(&mut *tx)
    .await?;

    let purchase: Purchase = sqlx::query_as(
        "INSERT INTO purchases (profile_id, employee_id, quantity, points_earned, note, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING id, profile_id, employee_id, quantity, points_earned, note, created_at",
    )
    .bind(profile_id)
    .bind(employee_id)
    .bind(quantity)
    .bind(points)
    .bind(note)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((customer, purchase))
}

/// Exchange points for `count` free drinks.
pub async fn redeem_rewards(
    pool: &PgPool,
    rules: &RewardRules,
    profile_id: Uuid,
    count: i64,
    now: i64,
) -> ServiceResult<Customer> {
    let mut tx = pool.begin().await?;
    let balance = lock_balance(&mut tx, profile_id).await?;
    let next = rules.redeem(balance, count)?;

    let customer: Customer = sqlx::query_as(&format!(
        "UPDATE profiles SET
            points_balance = $1,
            rewards_redeemed = rewards_redeemed + $2,
            updated_at = $3
         WHERE id = $4
         RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(next)
    .bind(count)
    .bind(now)
    .bind(profile_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(customer)
}

/// Manual correction of the points balance.
pub async fn adjust_points(
    pool: &PgPool,
    rules: &RewardRules,
    profile_id: Uuid,
    delta: i64,
    now: i64,
) -> ServiceResult<Customer> {
    let mut tx = pool.begin().await?;
    let balance = lock_balance(&mut tx, profile_id).await?;
    let next = rules.adjust(balance, delta)?;

    let customer: Customer = sqlx::query_as(&format!(
        "UPDATE profiles SET points_balance = $1, updated_at = $2
         WHERE id = $3
         RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(next)
    .bind(now)
    .bind(profile_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(customer)
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("ann"), "ann");
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
