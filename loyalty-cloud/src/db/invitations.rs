//! Employee invitations

use shared::models::{Employee, EmployeeRole, Invitation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ServiceResult;
use shared::error::{AppError, ErrorCode};

const INVITATION_COLUMNS: &str =
    "id, token, email, role, invited_by, expires_at, used_at, created_at";

pub async fn create(
    pool: &PgPool,
    token: &str,
    email: &str,
    role: EmployeeRole,
    invited_by: Uuid,
    expires_at: i64,
    now: i64,
) -> Result<Invitation, sqlx::Error> {
    sqlx::query_as(&format!(
        "INSERT INTO employee_invitations (token, email, role, invited_by, expires_at, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {INVITATION_COLUMNS}"
    ))
    .bind(token)
    .bind(email)
    .bind(role.as_str())
    .bind(invited_by)
    .bind(expires_at)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn find_by_token(pool: &PgPool, token: &str) -> Result<Option<Invitation>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {INVITATION_COLUMNS} FROM employee_invitations WHERE token = $1"
    ))
    .bind(token)
    .fetch_optional(pool)
    .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Invitation>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {INVITATION_COLUMNS} FROM employee_invitations ORDER BY created_at DESC LIMIT 200"
    ))
    .fetch_all(pool)
    .await
}

/// Delete an unused invitation. Returns false when nothing was deleted.
pub async fn revoke(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM employee_invitations WHERE id = $1 AND used_at IS NULL")
            .bind(id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Consume an invitation and create the employee atomically.
pub async fn accept(
    pool: &PgPool,
    token: &str,
    email: &str,
    full_name: &str,
    hashed_password: &str,
    now: i64,
) -> ServiceResult<Employee> {
    let mut tx = pool.begin().await?;

    let invitation: Invitation = sqlx::query_as(&format!(
        "SELECT {INVITATION_COLUMNS} FROM employee_invitations WHERE token = $1 FOR UPDATE"
    ))
    .bind(token)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::new(ErrorCode::InvitationNotFound))?;

    invitation.validate_for(email, now)?;

    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM employees WHERE email = $1)")
        .bind(&invitation.email)
        .fetch_one(&mut *tx)
        .await?;
    if taken {
        return Err(AppError::new(ErrorCode::EmployeeAlreadyExists).into());
    }

    let employee = super::employees::create(
        &mut *tx,
        &invitation.email,
        full_name,
        hashed_password,
        invitation.role,
        now,
    )
    .await?;

    sqlx::query("UPDATE employee_invitations SET used_at = $1 WHERE id = $2")
        .bind(now)
        .bind(invitation.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(employee)
}
