//! Employee invitations (admin only)

use axum::{Extension, extract::State};
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{InvitationCreate, InvitationSummary};
use shared::util::{generate_token, now_millis};

use crate::api::extract::{ApiJson, ApiPath};
use crate::api::{ApiResult, ok, require_email};
use crate::auth::EmployeeIdentity;
use crate::db;
use crate::email;
use crate::error::internal;
use crate::state::AppState;

const HOUR_MS: i64 = 3_600_000;

/// Expiry timestamp for an invitation created at `now`.
fn expires_at(now: i64, ttl_hours: i64) -> i64 {
    now.saturating_add(ttl_hours.saturating_mul(HOUR_MS))
}

#[derive(Serialize)]
pub struct InvitationCreated {
    #[serde(flatten)]
    pub invitation: InvitationSummary,
    pub link: String,
}

/// POST /api/admin/invitations
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<EmployeeIdentity>,
    ApiJson(req): ApiJson<InvitationCreate>,
) -> ApiResult<InvitationCreated> {
    let email_addr = require_email(&req.email)?;

    if db::employees::exists_by_email(&state.pool, &email_addr)
        .await
        .map_err(internal)?
    {
        return Err(AppError::new(ErrorCode::EmployeeAlreadyExists));
    }

    let now = now_millis();
    let ttl_hours = state.config.invitation_ttl_hours;
    let token = generate_token();
    let invitation = db::invitations::create(
        &state.pool,
        &token,
        &email_addr,
        req.role,
        identity.id,
        expires_at(now, ttl_hours),
        now,
    )
    .await
    .map_err(internal)?;

    let link = format!("{}/invite/{token}", state.config.app_base_url);
    email::send_in_background(
        state.ses.clone(),
        state.config.ses_from_email.clone(),
        email_addr.clone(),
        email::invitation_email(&state.config.shop_name, req.role, &link, ttl_hours),
    );

    super::audit(
        &state,
        identity.id,
        "invitation_created",
        serde_json::json!({ "email": email_addr, "role": req.role }),
    )
    .await;

    ok(InvitationCreated {
        invitation: InvitationSummary {
            status: invitation.status(now),
            invitation,
        },
        link,
    })
}

/// GET /api/admin/invitations
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<InvitationSummary>> {
    let now = now_millis();
    let invitations = db::invitations::list(&state.pool)
        .await
        .map_err(internal)?
        .into_iter()
        .map(|invitation| InvitationSummary {
            status: invitation.status(now),
            invitation,
        })
        .collect();
    ok(invitations)
}

/// DELETE /api/admin/invitations/{id}
pub async fn revoke(
    State(state): State<AppState>,
    Extension(identity): Extension<EmployeeIdentity>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    if !db::invitations::revoke(&state.pool, id)
        .await
        .map_err(internal)?
    {
        return Err(AppError::new(ErrorCode::InvitationNotFound));
    }

    super::audit(
        &state,
        identity.id,
        "invitation_revoked",
        serde_json::json!({ "invitation_id": id }),
    )
    .await;

    ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_at() {
        assert_eq!(expires_at(1_000, 168), 1_000 + 168 * HOUR_MS);
        assert_eq!(expires_at(1_000, i64::MAX), i64::MAX);
        assert_eq!(expires_at(i64::MAX - 1, 1), i64::MAX);
    }
}
