//! Employee login

use axum::{Extension, extract::State};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Employee, EmployeeRole};
use uuid::Uuid;

use crate::api::extract::ApiJson;
use crate::api::{ApiResult, ok};
use crate::auth::EmployeeIdentity;
use crate::auth::token::{TokenKind, create_token};
use crate::db;
use crate::error::internal;
use crate::state::AppState;
use crate::util::verify_password;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub employee_id: Uuid,
    pub email: String,
    pub role: EmployeeRole,
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let email = req.email.trim().to_lowercase();
    let employee = db::employees::find_auth_by_email(&state.pool, &email)
        .await
        .map_err(internal)?
        .ok_or_else(AppError::invalid_credentials)?;

    if !verify_password(&req.password, &employee.hashed_password) {
        return Err(AppError::invalid_credentials());
    }
    if !employee.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let issued = create_token(
        TokenKind::Employee,
        &employee.id.to_string(),
        &employee.email,
        Some(employee.role),
        &state.config.jwt_secret,
    )
    .map_err(internal)?;

    super::audit(&state, employee.id, "login", serde_json::json!({})).await;
    tracing::info!(employee_id = %employee.id, "Employee logged in");

    ok(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        employee_id: employee.id,
        email: employee.email,
        role: employee.role,
    })
}

/// GET /api/admin/me
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<EmployeeIdentity>,
) -> ApiResult<Employee> {
    let employee = db::employees::find(&state.pool, identity.id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::EmployeeNotFound))?;
    ok(employee)
}
