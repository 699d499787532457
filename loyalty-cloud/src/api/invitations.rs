//! Public invitation routes: inspect and accept

use axum::routing::{get, post};
use axum::{
    Router, middleware,
    extract::State,
};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Employee, EmployeeRole, InvitationAccept};
use shared::util::{is_well_formed_token, now_millis};

use crate::api::extract::{ApiJson, ApiPath};
use crate::api::{ApiResult, clean_text, ok, require_email};
use crate::auth::rate_limit::register_rate_limit;
use crate::db;
use crate::error::internal;
use crate::state::AppState;
use crate::util::{check_password_strength, hash_or_internal};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/invitations/{token}", get(inspect))
        .merge(
            Router::new()
                .route("/api/invitations/accept", post(accept))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    register_rate_limit,
                )),
        )
}

#[derive(Serialize)]
pub struct InvitationInfo {
    pub email: String,
    pub role: EmployeeRole,
    pub expires_at: i64,
}

/// GET /api/invitations/{token}
pub async fn inspect(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> ApiResult<InvitationInfo> {
    if !is_well_formed_token(&token) {
        return Err(AppError::new(ErrorCode::InvitationNotFound));
    }
    let invitation = db::invitations::find_by_token(&state.pool, &token)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::InvitationNotFound))?;

    // Email match is checked on accept; here only usability matters.
    invitation.validate_for(&invitation.email, now_millis())?;

    ok(InvitationInfo {
        email: invitation.email,
        role: invitation.role,
        expires_at: invitation.expires_at,
    })
}

/// POST /api/invitations/accept
pub async fn accept(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<InvitationAccept>,
) -> ApiResult<Employee> {
    let token = req.token.trim();
    if !is_well_formed_token(token) {
        return Err(AppError::new(ErrorCode::InvitationNotFound));
    }
    let email = require_email(&req.email)?;
    let full_name = clean_text(Some(&req.full_name))
        .ok_or_else(|| AppError::validation("full_name is required"))?;
    check_password_strength(&req.password)?;
    let hashed = hash_or_internal(&req.password)?;

    let employee =
        db::invitations::accept(&state.pool, token, &email, &full_name, &hashed, now_millis())
            .await?;

    tracing::info!(employee_id = %employee.id, role = employee.role.as_str(), "Invitation accepted");
    ok(employee)
}
