//! Audit log of employee actions

use sqlx::PgPool;
use uuid::Uuid;

/// Write an audit log entry
pub async fn log(
    pool: &PgPool,
    employee_id: Uuid,
    action: &str,
    detail: Option<&serde_json::Value>,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_logs (employee_id, action, detail, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(employee_id)
    .bind(action)
    .bind(detail)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow, serde::Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub employee_id: Option<Uuid>,
    pub employee_email: Option<String>,
    pub action: String,
    pub detail: Option<serde_json::Value>,
    pub created_at: i64,
}

pub async fn query(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<AuditEntry>, sqlx::Error> {
    sqlx::query_as(
        "SELECT a.id, a.employee_id, e.email AS employee_email, a.action, a.detail, a.created_at
         FROM audit_logs a
         LEFT JOIN employees e ON e.id = a.employee_id
         ORDER BY a.created_at DESC, a.id DESC
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
