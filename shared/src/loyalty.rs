//! Points and reward rules
//!
//! A customer earns `points_per_purchase` for every drink bought. Every
//! `reward_threshold` points can be exchanged for one free drink.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ErrorCode};

/// Largest number of drinks recorded in one purchase.
pub const MAX_PURCHASE_QUANTITY: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardRules {
    pub points_per_purchase: i64,
    pub reward_threshold: i64,
}

impl Default for RewardRules {
    fn default() -> Self {
        Self {
            points_per_purchase: 1,
            reward_threshold: 10,
        }
    }
}

impl RewardRules {
    /// Build rules, falling back to defaults for non-positive values.
    pub fn new(points_per_purchase: i64, reward_threshold: i64) -> Self {
        let defaults = Self::default();
        Self {
            points_per_purchase: if points_per_purchase > 0 {
                points_per_purchase
            } else {
                defaults.points_per_purchase
            },
            reward_threshold: if reward_threshold > 0 {
                reward_threshold
            } else {
                defaults.reward_threshold
            },
        }
    }

    /// Points earned for `quantity` drinks.
    pub fn points_for_purchase(&self, quantity: i64) -> AppResult<i64> {
        if !(1..=MAX_PURCHASE_QUANTITY).contains(&quantity) {
            return Err(AppError::new(ErrorCode::InvalidQuantity)
                .with_detail("max", MAX_PURCHASE_QUANTITY));
        }
        Ok(quantity * self.points_per_purchase)
    }

    /// Number of free drinks the balance is worth.
    pub fn rewards_available(&self, balance: i64) -> i64 {
        balance.max(0) / self.reward_threshold
    }

    /// Points still missing until the next free drink.
    pub fn points_to_next_reward(&self, balance: i64) -> i64 {
        self.reward_threshold - balance.max(0) % self.reward_threshold
    }

    /// Human readable progress line shown on passes and in the app.
    pub fn progress_text(&self, balance: i64) -> String {
        match self.rewards_available(balance) {
            0 => {
                let missing = self.points_to_next_reward(balance);
                let unit = if missing == 1 { "stamp" } else { "stamps" };
                format!("{missing} more {unit} until your free drink")
            }
            1 => "Free drink ready!".to_string(),
            n => format!("{n} free drinks ready!"),
        }
    }

    /// "How it works" text on the back of the loyalty pass.
    pub fn terms_text(&self) -> String {
        let earn = match self.points_per_purchase {
            1 => "Earn 1 stamp per drink.".to_string(),
            n => format!("Earn {n} stamps per drink."),
        };
        let reward = match self.reward_threshold {
            1 => "Every stamp gets you a free drink.".to_string(),
            n => format!("Every {n} stamps get you a free drink."),
        };
        format!("{earn} {reward}")
    }

    /// Balance after redeeming `count` rewards.
    pub fn redeem(&self, balance: i64, count: i64) -> AppResult<i64> {
        if count <= 0 {
            return Err(AppError::validation("Reward count must be at least 1"));
        }
        let cost = count
            .checked_mul(self.reward_threshold)
            .ok_or_else(|| AppError::new(ErrorCode::ValueOutOfRange))?;
        if cost > balance {
            return Err(AppError::new(ErrorCode::InsufficientPoints)
                .with_detail("balance", balance)
                .with_detail("required", cost));
        }
        Ok(balance - cost)
    }

    /// Balance after a manual adjustment by an administrator.
    pub fn adjust(&self, balance: i64, delta: i64) -> AppResult<i64> {
        match balance.checked_add(delta) {
            Some(next) if next >= 0 => Ok(next),
            Some(_) => Err(AppError::new(ErrorCode::InsufficientPoints)
                .with_detail("balance", balance)),
            None => Err(AppError::new(ErrorCode::ValueOutOfRange)),
        }
    }
}

/// Snapshot of a customer's reward progress, returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardStatus {
    pub points_balance: i64,
    pub rewards_available: i64,
    pub points_to_next_reward: i64,
    pub reward_text: String,
}

impl RewardStatus {
    pub fn of(rules: &RewardRules, balance: i64) -> Self {
        Self {
            points_balance: balance,
            rewards_available: rules.rewards_available(balance),
            points_to_next_reward: rules.points_to_next_reward(balance),
            reward_text: rules.progress_text(balance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_text() {
        assert_eq!(
            RewardRules::default().terms_text(),
            "Earn 1 stamp per drink. Every 10 stamps get you a free drink."
        );
        assert_eq!(
            RewardRules::new(2, 1).terms_text(),
            "Earn 2 stamps per drink. Every stamp gets you a free drink."
        );
    }

    fn rules() -> RewardRules {
        RewardRules::default()
    }

    #[test]
    fn test_points_for_purchase() {
        assert_eq!(rules().points_for_purchase(1).unwrap(), 1);
        assert_eq!(RewardRules::new(2, 10).points_for_purchase(3).unwrap(), 6);
        assert_eq!(
            rules().points_for_purchase(0).unwrap_err().code,
            ErrorCode::InvalidQuantity
        );
        assert_eq!(
            rules().points_for_purchase(51).unwrap_err().code,
            ErrorCode::InvalidQuantity
        );
    }

    #[test]
    fn test_progress_text() {
        assert_eq!(rules().progress_text(0), "10 more stamps until your free drink");
        assert_eq!(rules().progress_text(9), "1 more stamp until your free drink");
        assert_eq!(rules().progress_text(10), "Free drink ready!");
        assert_eq!(rules().progress_text(19), "Free drink ready!");
        assert_eq!(rules().progress_text(25), "2 free drinks ready!");
    }

    #[test]
    fn test_points_to_next_reward_at_multiple() {
        assert_eq!(rules().points_to_next_reward(10), 10);
        assert_eq!(rules().points_to_next_reward(13), 7);
        assert_eq!(rules().points_to_next_reward(-5), 10);
    }

    #[test]
    fn test_redeem() {
        assert_eq!(rules().redeem(25, 2).unwrap(), 5);
        assert_eq!(rules().redeem(10, 1).unwrap(), 0);

        let err = rules().redeem(9, 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientPoints);
        assert_eq!(
            err.details.unwrap().get("required"),
            Some(&serde_json::Value::from(10))
        );

        assert_eq!(
            rules().redeem(100, 0).unwrap_err().code,
            ErrorCode::ValidationFailed
        );
        assert_eq!(
            rules().redeem(100, i64::MAX).unwrap_err().code,
            ErrorCode::ValueOutOfRange
        );
    }

    #[test]
    fn test_adjust_never_negative() {
        assert_eq!(rules().adjust(5, 3).unwrap(), 8);
        assert_eq!(rules().adjust(5, -5).unwrap(), 0);
        assert_eq!(
            rules().adjust(5, -6).unwrap_err().code,
            ErrorCode::InsufficientPoints
        );
    }

    #[test]
    fn test_new_falls_back_on_invalid_values() {
        assert_eq!(RewardRules::new(0, -3), RewardRules::default());
        assert_eq!(RewardRules::new(2, 8).reward_threshold, 8);
    }

    #[test]
    fn test_reward_status() {
        let status = RewardStatus::of(&rules(), 23);
        assert_eq!(status.rewards_available, 2);
        assert_eq!(status.points_to_next_reward, 7);
        assert_eq!(status.reward_text, "2 free drinks ready!");
    }
}
