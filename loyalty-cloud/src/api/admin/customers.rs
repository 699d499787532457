//! Customer lookup and point operations at the counter

use axum::{Extension, extract::State};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CustomerDetail, PointsAdjustment, Purchase, PurchaseCreate, RedeemRequest,
};
use shared::response::{PageQuery, PaginatedResponse};
use shared::util::now_millis;
use uuid::Uuid;

use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::{ApiResult, clean_text, ok};
use crate::auth::EmployeeIdentity;
use crate::db;
use crate::error::internal;
use crate::services::pass_updates;
use crate::state::AppState;

const RECENT_PURCHASES: i64 = 20;

#[derive(Deserialize)]
pub struct CustomerListQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// GET /api/admin/customers?search=&page=&per_page=
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CustomerListQuery>,
) -> ApiResult<PaginatedResponse<CustomerDetail>> {
    let page = PageQuery {
        page: query.page,
        per_page: query.per_page,
    };
    let (rows, total) = db::profiles::list(&state.pool, query.search.as_deref(), &page)
        .await
        .map_err(internal)?;

    let rules = state.config.rewards;
    let items = rows
        .into_iter()
        .map(|customer| CustomerDetail {
            rewards: customer.reward_status(&rules),
            customer,
        })
        .collect();
    ok(PaginatedResponse::new(items, &page, total.max(0) as u64))
}

#[derive(Serialize)]
pub struct CustomerWithPurchases {
    #[serde(flatten)]
    pub customer: CustomerDetail,
    pub recent_purchases: Vec<Purchase>,
}

/// GET /api/admin/customers/{id}
pub async fn detail(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<CustomerWithPurchases> {
    let (customer, purchases) = tokio::try_join!(
        db::profiles::find(&state.pool, id),
        db::profiles::list_purchases(&state.pool, id, RECENT_PURCHASES),
    )
    .map_err(internal)?;
    let customer = customer.ok_or_else(|| AppError::new(ErrorCode::CustomerNotFound))?;

    ok(CustomerWithPurchases {
        customer: CustomerDetail {
            rewards: customer.reward_status(&state.config.rewards),
            customer,
        },
        recent_purchases: purchases,
    })
}

#[derive(Serialize)]
pub struct PurchaseRecorded {
    pub customer: CustomerDetail,
    pub purchase: Purchase,
}

/// POST /api/admin/customers/{id}/purchases
pub async fn record_purchase(
    State(state): State<AppState>,
    Extension(identity): Extension<EmployeeIdentity>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<PurchaseCreate>,
) -> ApiResult<PurchaseRecorded> {
    let rules = state.config.rewards;
    let note = clean_text(req.note.as_deref());
    let (customer, purchase) = db::profiles::record_purchase(
        &state.pool,
        &rules,
        id,
        identity.id,
        req.quantity,
        note.as_deref(),
        now_millis(),
    )
    .await?;

    tracing::info!(
        customer_id = %id,
        employee_id = %identity.id,
        points = purchase.points_earned,
        "Purchase recorded"
    );
    pass_updates::loyalty_pass_changed(&state, &customer).await;

    ok(PurchaseRecorded {
        customer: CustomerDetail {
            rewards: customer.reward_status(&rules),
            customer,
        },
        purchase,
    })
}

/// POST /api/admin/customers/{id}/redeem
pub async fn redeem(
    State(state): State<AppState>,
    Extension(identity): Extension<EmployeeIdentity>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<RedeemRequest>,
) -> ApiResult<CustomerDetail> {
    let rules = state.config.rewards;
    let customer =
        db::profiles::redeem_rewards(&state.pool, &rules, id, req.count, now_millis()).await?;

    super::audit(
        &state,
        identity.id,
        "rewards_redeemed",
        serde_json::json!({ "customer_id": id, "count": req.count }),
    )
    .await;
    pass_updates::loyalty_pass_changed(&state, &customer).await;

    ok(CustomerDetail {
        rewards: customer.reward_status(&rules),
        customer,
    })
}

/// POST /api/admin/customers/{id}/adjust
pub async fn adjust(
    State(state): State<AppState>,
    Extension(identity): Extension<EmployeeIdentity>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<PointsAdjustment>,
) -> ApiResult<CustomerDetail> {
    if req.delta == 0 {
        return Err(AppError::validation("delta must not be zero"));
    }
    let rules = state.config.rewards;
    let customer =
        db::profiles::adjust_points(&state.pool, &rules, id, req.delta, now_millis()).await?;

    super::audit(
        &state,
        identity.id,
        "points_adjusted",
        serde_json::json!({
            "customer_id": id,
            "delta": req.delta,
            "note": clean_text(req.note.as_deref()),
        }),
    )
    .await;
    pass_updates::loyalty_pass_changed(&state, &customer).await;

    ok(CustomerDetail {
        rewards: customer.reward_status(&rules),
        customer,
    })
}
