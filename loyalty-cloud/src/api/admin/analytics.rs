//! Dashboard analytics (admin only)

use axum::extract::State;
use serde::Deserialize;
use shared::util::now_millis;

use crate::analytics::{DailyStats, DayRange, aggregate_daily, today_start_millis};
use crate::api::extract::ApiQuery;
use crate::api::{ApiResult, ok};
use crate::db;
use crate::db::analytics::{Overview, TopCustomer};
use crate::error::internal;
use crate::state::AppState;

/// GET /api/admin/analytics/overview
pub async fn overview(State(state): State<AppState>) -> ApiResult<Overview> {
    let pool = &state.pool;
    let (
        (customers, outstanding_points, rewards_redeemed),
        purchases_today,
        (active_gift_cards, gift_card_liability_cents),
        registered_devices,
    ) = tokio::try_join!(
        db::analytics::customer_totals(pool),
        db::analytics::purchases_since(pool, today_start_millis(now_millis())),
        db::analytics::gift_card_totals(pool),
        db::analytics::registered_devices(pool),
    )
    .map_err(internal)?;

    ok(Overview {
        customers,
        outstanding_points,
        rewards_redeemed,
        purchases_today,
        active_gift_cards,
        gift_card_liability_cents,
        registered_devices,
    })
}

#[derive(Deserialize)]
pub struct DailyQuery {
    pub from: String,
    pub to: String,
}

/// GET /api/admin/analytics/daily?from=YYYY-MM-DD&to=YYYY-MM-DD
pub async fn daily(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DailyQuery>,
) -> ApiResult<Vec<DailyStats>> {
    let range = DayRange::parse(&query.from, &query.to)?;
    let (from, to) = (range.start_millis(), range.end_millis());
    let pool = &state.pool;

    let (purchases, signups, gift_card_events) = tokio::try_join!(
        db::analytics::purchase_events(pool, from, to),
        db::analytics::signup_times(pool, from, to),
        db::analytics::gift_card_events(pool, from, to),
    )
    .map_err(internal)?;

    ok(aggregate_daily(&range, &purchases, &signups, &gift_card_events))
}

#[derive(Deserialize)]
pub struct TopQuery {
    pub limit: Option<i64>,
}

/// GET /api/admin/analytics/top-customers?limit=
pub async fn top_customers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TopQuery>,
) -> ApiResult<Vec<TopCustomer>> {
    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    ok(db::analytics::top_customers(&state.pool, limit)
        .await
        .map_err(internal)?)
}
