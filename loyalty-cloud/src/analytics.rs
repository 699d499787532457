//! Daily activity aggregation for the admin dashboard

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use shared::error::{AppError, AppResult};

use crate::db::analytics::{GiftCardEvent, PurchaseEvent};

/// Longest range served by the daily endpoint.
pub const MAX_RANGE_DAYS: i64 = 366;

const DAY_MS: i64 = 86_400_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub date: String,
    pub purchases: i64,
    pub drinks: i64,
    pub points_earned: i64,
    pub new_customers: i64,
    pub gift_cards_issued_cents: i64,
    pub gift_cards_redeemed_cents: i64,
    pub gift_cards_reloaded_cents: i64,
}

/// Inclusive UTC day range resolved to a half-open millisecond window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DayRange {
    pub fn parse(from: &str, to: &str) -> AppResult<Self> {
        let parse = |field: &str, value: &str| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
                AppError::validation(format!("{field} must be a date in YYYY-MM-DD format"))
                    .with_detail("field", field.to_string())
            })
        };
        let range = Self {
            from: parse("from", from)?,
            to: parse("to", to)?,
        };
        if range.from > range.to {
            return Err(AppError::validation("from must not be after to"));
        }
        if range.days() > MAX_RANGE_DAYS {
            return Err(AppError::validation(format!(
                "Date range is limited to {MAX_RANGE_DAYS} days"
            )));
        }
        Ok(range)
    }

    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    pub fn start_millis(&self) -> i64 {
        day_start_millis(self.from)
    }

    pub fn end_millis(&self) -> i64 {
        self.start_millis() + self.days() * DAY_MS
    }

    fn index_of(&self, millis: i64) -> Option<usize> {
        if millis < self.start_millis() || millis >= self.end_millis() {
            return None;
        }
        usize::try_from((millis - self.start_millis()) / DAY_MS).ok()
    }
}

fn day_start_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default()
}

/// Bucket raw events into one row per UTC day, zero-filling quiet days.
pub fn aggregate_daily(
    range: &DayRange,
    purchases: &[PurchaseEvent],
    signups: &[i64],
    gift_card_events: &[GiftCardEvent],
) -> Vec<DailyStats> {
    let mut days: Vec<DailyStats> = range
        .from
        .iter_days()
        .take(range.days() as usize)
        .map(|date| DailyStats {
            date: date.format("%Y-%m-%d").to_string(),
            ..Default::default()
        })
        .collect();

    for p in purchases {
        if let Some(day) = range.index_of(p.created_at).and_then(|i| days.get_mut(i)) {
            day.purchases += 1;
            day.drinks += p.quantity;
            day.points_earned += p.points_earned;
        }
    }

    for &created_at in signups {
        if let Some(day) = range.index_of(created_at).and_then(|i| days.get_mut(i)) {
            day.new_customers += 1;
        }
    }

    for event in gift_card_events {
        let Some(day) = range.index_of(event.created_at).and_then(|i| days.get_mut(i)) else {
            continue;
        };
        match event.kind.as_str() {
            "issue" => day.gift_cards_issued_cents += event.amount,
            "redeem" => day.gift_cards_redeemed_cents += event.amount.abs(),
            "reload" => day.gift_cards_reloaded_cents += event.amount,
            _ => {}
        }
    }

    days
}

/// Start of the current UTC day in milliseconds.
pub fn today_start_millis(now: i64) -> i64 {
    DateTime::from_timestamp_millis(now)
        .map(|dt| day_start_millis(dt.date_naive()))
        .unwrap_or_else(|| now - now.rem_euclid(DAY_MS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    fn range(from: &str, to: &str) -> DayRange {
        DayRange::parse(from, to).unwrap()
    }

    #[test]
    fn test_range_validation() {
        assert_eq!(range("2024-03-01", "2024-03-01").days(), 1);
        assert_eq!(range("2024-01-01", "2024-12-31").days(), 366);
        assert_eq!(
            DayRange::parse("2024-03-02", "2024-03-01").unwrap_err().code,
            ErrorCode::ValidationFailed
        );
        assert!(DayRange::parse("2024-01-01", "2025-01-01").is_err());
        assert!(DayRange::parse("03/01/2024", "2024-03-02").is_err());
    }

    #[test]
    fn test_aggregate_fills_missing_days() {
        let r = range("2024-03-01", "2024-03-03");
        let day2 = r.start_millis() + DAY_MS + 3_600_000;
        let purchases = vec![
            PurchaseEvent {
                created_at: r.start_millis(),
                quantity: 2,
                points_earned: 2,
            },
            PurchaseEvent {
                created_at: day2,
                quantity: 1,
                points_earned: 1,
            },
            PurchaseEvent {
                created_at: r.end_millis(),
                quantity: 9,
                points_earned: 9,
            },
        ];
        let events = vec![
            GiftCardEvent {
                created_at: day2,
                kind: "issue".into(),
                amount: 2_500,
            },
            GiftCardEvent {
                created_at: day2,
                kind: "redeem".into(),
                amount: -400,
            },
        ];

        let days = aggregate_daily(&r, &purchases, &[day2], &events);
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].date, "2024-03-01");
        assert_eq!(days[0].drinks, 2);
        assert_eq!(days[1].purchases, 1);
        assert_eq!(days[1].new_customers, 1);
        assert_eq!(days[1].gift_cards_issued_cents, 2_500);
        assert_eq!(days[1].gift_cards_redeemed_cents, 400);
        assert_eq!(days[2], DailyStats {
            date: "2024-03-03".into(),
            ..Default::default()
        });
    }

    #[test]
    fn test_today_start() {
        let noon = range("2024-03-05", "2024-03-05").start_millis() + DAY_MS / 2;
        assert_eq!(
            today_start_millis(noon),
            range("2024-03-05", "2024-03-05").start_millis()
        );
    }
}
