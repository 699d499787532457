//! Audit log endpoint

use axum::extract::State;
use shared::response::PageQuery;

use crate::api::extract::ApiQuery;
use crate::api::{ApiResult, ok};
use crate::db::audit::AuditEntry;
use crate::error::internal;
use crate::state::AppState;

/// GET /api/admin/audit?page=&per_page=
pub async fn audit_log(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Vec<AuditEntry>> {
    let entries =
        crate::db::audit::query(&state.pool, i64::from(page.per_page()), page.offset())
            .await
            .map_err(internal)?;
    ok(entries)
}
