//! Customer (profile) Model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::loyalty::{RewardRules, RewardStatus};

/// Customer profile as exposed over the API (no password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub points_balance: i64,
    pub lifetime_points: i64,
    pub total_purchases: i64,
    pub rewards_redeemed: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Customer {
    /// Serial number of this customer's loyalty pass
    pub fn pass_serial(&self) -> String {
        loyalty_pass_serial(self.id)
    }

    pub fn reward_status(&self, rules: &RewardRules) -> RewardStatus {
        RewardStatus::of(rules, self.points_balance)
    }
}

/// Loyalty pass serial numbers are derived from the profile id.
pub fn loyalty_pass_serial(profile_id: Uuid) -> String {
    format!("L-{profile_id}")
}

/// Inverse of [`loyalty_pass_serial`].
pub fn parse_loyalty_pass_serial(serial: &str) -> Option<Uuid> {
    serial
        .strip_prefix("L-")
        .and_then(|id| Uuid::parse_str(id).ok())
}

/// Customer with reward progress (detail views)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: Customer,
    #[serde(flatten)]
    pub rewards: RewardStatus,
}

/// Registration payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRegister {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

/// One recorded purchase (purchase history)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: i64,
    pub profile_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub quantity: i64,
    pub points_earned: i64,
    pub note: Option<String>,
    pub created_at: i64,
}

/// Record purchase payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseCreate {
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    pub note: Option<String>,
}

fn default_quantity() -> i64 {
    1
}

/// Redeem rewards payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemRequest {
    #[serde(default = "default_quantity")]
    pub count: i64,
}

/// Manual points adjustment payload (admin only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsAdjustment {
    pub delta: i64,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_serial_roundtrip() {
        let id = Uuid::new_v4();
        let serial = loyalty_pass_serial(id);
        assert!(serial.starts_with("L-"));
        assert_eq!(parse_loyalty_pass_serial(&serial), Some(id));
        assert_eq!(parse_loyalty_pass_serial("G-ABCD-EFGH-JKMN"), None);
        assert_eq!(parse_loyalty_pass_serial("L-not-a-uuid"), None);
    }

    #[test]
    fn test_purchase_defaults() {
        let req: PurchaseCreate = serde_json::from_str("{}").unwrap();
        assert_eq!(req.quantity, 1);
        let req: RedeemRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.count, 1);
    }
}
