//! Wallet device registrations and pass update stamps

use shared::models::PassRegistration;
use sqlx::PgPool;

/// Register a device for pushes of one pass.
///
/// Returns `true` when the registration is new. Re-registering refreshes
/// the push token.
pub async fn register(
    pool: &PgPool,
    device_library_identifier: &str,
    push_token: &str,
    pass_type_identifier: &str,
    serial_number: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO pass_registrations
            (device_library_identifier, push_token, pass_type_identifier, serial_number, created_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (device_library_identifier, pass_type_identifier, serial_number)
         DO UPDATE SET push_token = EXCLUDED.push_token
         RETURNING (xmax = 0)",
    )
    .bind(device_library_identifier)
    .bind(push_token)
    .bind(pass_type_identifier)
    .bind(serial_number)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn unregister(
    pool: &PgPool,
    device_library_identifier: &str,
    pass_type_identifier: &str,
    serial_number: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM pass_registrations
         WHERE device_library_identifier = $1 AND pass_type_identifier = $2 AND serial_number = $3",
    )
    .bind(device_library_identifier)
    .bind(pass_type_identifier)
    .bind(serial_number)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Serial number of a registered pass with the time it last changed.
#[derive(Debug, sqlx::FromRow)]
pub struct UpdatedSerial {
    pub serial_number: String,
    pub updated_at: i64,
}

/// Passes registered on a device, optionally only those changed after `since`.
pub async fn serials_for_device(
    pool: &PgPool,
    device_library_identifier: &str,
    pass_type_identifier: &str,
    since: Option<i64>,
) -> Result<Vec<UpdatedSerial>, sqlx::Error> {
    sqlx::query_as(
        "SELECT r.serial_number, COALESCE(u.updated_at, r.created_at) AS updated_at
         FROM pass_registrations r
         LEFT JOIN pass_updates u
           ON u.pass_type_identifier = r.pass_type_identifier
          AND u.serial_number = r.serial_number
         WHERE r.device_library_identifier = $1
           AND r.pass_type_identifier = $2
           AND ($3::BIGINT IS NULL OR COALESCE(u.updated_at, r.created_at) > $3)
         ORDER BY r.serial_number",
    )
    .bind(device_library_identifier)
    .bind(pass_type_identifier)
    .bind(since)
    .fetch_all(pool)
    .await
}

pub async fn registrations_for_pass(
    pool: &PgPool,
    pass_type_identifier: &str,
    serial_number: &str,
) -> Result<Vec<PassRegistration>, sqlx::Error> {
    sqlx::query_as(
        "SELECT device_library_identifier, push_token, pass_type_identifier, serial_number, created_at
         FROM pass_registrations
         WHERE pass_type_identifier = $1 AND serial_number = $2",
    )
    .bind(pass_type_identifier)
    .bind(serial_number)
    .fetch_all(pool)
    .await
}

/// Drop every registration, on any pass, that uses a dead push token.
pub async fn remove_push_token(pool: &PgPool, push_token: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM pass_registrations WHERE push_token = $1")
        .bind(push_token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Record that a pass changed so Wallet picks it up on the next sync.
pub async fn touch(
    pool: &PgPool,
    pass_type_identifier: &str,
    serial_number: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO pass_updates (pass_type_identifier, serial_number, updated_at)
         VALUES ($1, $2, $3)
         ON CONFLICT (pass_type_identifier, serial_number)
         DO UPDATE SET updated_at = GREATEST(pass_updates.updated_at, EXCLUDED.updated_at)",
    )
    .bind(pass_type_identifier)
    .bind(serial_number)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn last_updated(
    pool: &PgPool,
    pass_type_identifier: &str,
    serial_number: &str,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT updated_at FROM pass_updates WHERE pass_type_identifier = $1 AND serial_number = $2",
    )
    .bind(pass_type_identifier)
    .bind(serial_number)
    .fetch_optional(pool)
    .await
}
