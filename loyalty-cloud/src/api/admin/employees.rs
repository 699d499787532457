//! Staff management (admin only)

use axum::{Extension, extract::State};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Employee, EmployeeUpdate};
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath};
use crate::api::{ApiResult, clean_text, ok};
use crate::auth::EmployeeIdentity;
use crate::db;
use crate::error::internal;
use crate::state::AppState;

/// GET /api/admin/employees
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Employee>> {
    ok(db::employees::list(&state.pool).await.map_err(internal)?)
}

/// An admin may rename themself but not lock themself out.
fn check_self_update(actor: Uuid, target: Uuid, update: &EmployeeUpdate) -> AppResult<()> {
    if actor != target {
        return Ok(());
    }
    let demotes = update.role.is_some_and(|role| !role.is_admin());
    let deactivates = update.is_active == Some(false);
    if demotes || deactivates {
        return Err(AppError::new(ErrorCode::CannotModifySelf));
    }
    Ok(())
}

/// PATCH /api/admin/employees/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<EmployeeIdentity>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<EmployeeUpdate>,
) -> ApiResult<Employee> {
    check_self_update(identity.id, id, &req)?;

    let full_name = clean_text(req.full_name.as_deref());
    let employee = db::employees::update(&state.pool, id, req.role, req.is_active, full_name.as_deref())
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::EmployeeNotFound))?;

    super::audit(
        &state,
        identity.id,
        "employee_updated",
        serde_json::json!({
            "employee_id": id,
            "role": req.role,
            "is_active": req.is_active,
        }),
    )
    .await;

    ok(employee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::EmployeeRole;

    fn update(role: Option<EmployeeRole>, is_active: Option<bool>) -> EmployeeUpdate {
        EmployeeUpdate {
            role,
            is_active,
            full_name: None,
        }
    }

    #[test]
    fn test_admin_cannot_lock_out_self() {
        let me = Uuid::new_v4();
        let err = check_self_update(me, me, &update(Some(EmployeeRole::Staff), None)).unwrap_err();
        assert_eq!(err.code, ErrorCode::CannotModifySelf);
        assert!(check_self_update(me, me, &update(None, Some(false))).is_err());
        assert!(check_self_update(me, me, &update(Some(EmployeeRole::Admin), Some(true))).is_ok());
    }

    #[test]
    fn test_admin_can_change_others() {
        let other = Uuid::new_v4();
        assert!(
            check_self_update(Uuid::new_v4(), other, &update(Some(EmployeeRole::Staff), Some(false)))
                .is_ok()
        );
    }
}
