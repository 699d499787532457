//! Employee accounts

use shared::models::{Employee, EmployeeRole};
use sqlx::PgPool;
use uuid::Uuid;

const EMPLOYEE_COLUMNS: &str = "id, email, full_name, role, is_active, created_at";

#[derive(sqlx::FromRow)]
pub struct EmployeeAuth {
    pub id: Uuid,
    pub email: String,
    pub hashed_password: String,
    #[sqlx(try_from = "String")]
    pub role: EmployeeRole,
    pub is_active: bool,
}

pub async fn find_auth_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<EmployeeAuth>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, email, hashed_password, role, is_active FROM employees WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn exists_by_email(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM employees WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Employee>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await
}

/// Insert an employee. Runs on any executor so invitation acceptance can
/// create the account inside its own transaction.
pub async fn create<'e, E>(
    executor: E,
    email: &str,
    full_name: &str,
    hashed_password: &str,
    role: EmployeeRole,
    now: i64,
) -> Result<Employee, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as(&format!(
        "INSERT INTO employees (id, email, full_name, hashed_password, role, is_active, created_at)
         VALUES ($1, $2, $3, $4, $5, TRUE, $6)
         RETURNING {EMPLOYEE_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(full_name)
    .bind(hashed_password)
    .bind(role.as_str())
    .bind(now)
    .fetch_one(executor)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    role: Option<EmployeeRole>,
    is_active: Option<bool>,
    full_name: Option<&str>,
) -> Result<Option<Employee>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE employees SET
            role = COALESCE($1, role),
            is_active = COALESCE($2, is_active),
            full_name = COALESCE($3, full_name)
         WHERE id = $4
         RETURNING {EMPLOYEE_COLUMNS}"
    ))
    .bind(role.map(|r| r.as_str()))
    .bind(is_active)
    .bind(full_name)
    .bind(id)
    .fetch_optional(pool)
    .await
}
