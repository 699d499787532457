//! Gift Card & Transaction Models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ErrorCode};

/// Smallest amount a card can be issued, redeemed or reloaded with (cents)
pub const MIN_AMOUNT_CENTS: i64 = 1;
/// Smallest issue amount ($1.00)
pub const MIN_ISSUE_CENTS: i64 = 100;
/// Largest issue amount ($500.00)
pub const MAX_ISSUE_CENTS: i64 = 50_000;
/// Largest balance a card can hold ($1000.00)
pub const MAX_BALANCE_CENTS: i64 = 100_000;

/// Gift card row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct GiftCard {
    pub id: Uuid,
    pub serial_number: String,
    pub initial_balance: i64,
    pub balance: i64,
    pub purchaser_email: Option<String>,
    pub recipient_email: Option<String>,
    pub message: Option<String>,
    #[serde(skip_serializing)]
    pub claim_token: String,
    pub claimed_by: Option<Uuid>,
    pub claimed_at: Option<i64>,
    #[serde(skip_serializing)]
    pub pass_auth_token: String,
    pub issued_by: Option<Uuid>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl GiftCard {
    pub fn pass_serial(&self) -> String {
        gift_card_pass_serial(&self.serial_number)
    }
}

/// Gift card pass serial numbers are derived from the card serial.
pub fn gift_card_pass_serial(serial_number: &str) -> String {
    format!("G-{serial_number}")
}

/// Inverse of [`gift_card_pass_serial`].
pub fn parse_gift_card_pass_serial(serial: &str) -> Option<&str> {
    serial.strip_prefix("G-")
}

/// Ledger entry kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Issue,
    Redeem,
    Reload,
    Adjust,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Redeem => "redeem",
            Self::Reload => "reload",
            Self::Adjust => "adjust",
        }
    }
}

impl TryFrom<String> for TransactionKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "issue" => Ok(Self::Issue),
            "redeem" => Ok(Self::Redeem),
            "reload" => Ok(Self::Reload),
            "adjust" => Ok(Self::Adjust),
            other => Err(format!("unknown transaction kind: {other}")),
        }
    }
}

/// Gift card ledger row. `amount` is signed: redemptions are negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct GiftCardTransaction {
    pub id: i64,
    pub gift_card_id: Uuid,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub kind: TransactionKind,
    pub amount: i64,
    pub balance_after: i64,
    pub employee_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: i64,
}

/// Compute the balance after a ledger operation.
///
/// `amount` is always given as a positive number of cents; the kind decides
/// the direction. Returns the new balance or the rule that was violated.
pub fn apply_transaction(balance: i64, kind: TransactionKind, amount: i64) -> AppResult<i64> {
    if amount < MIN_AMOUNT_CENTS {
        return Err(AppError::new(ErrorCode::GiftCardInvalidAmount)
            .with_detail("min", MIN_AMOUNT_CENTS));
    }
    match kind {
        TransactionKind::Issue => {
            if !(MIN_ISSUE_CENTS..=MAX_ISSUE_CENTS).contains(&amount) {
                return Err(AppError::new(ErrorCode::GiftCardInvalidAmount)
                    .with_detail("min", MIN_ISSUE_CENTS)
                    .with_detail("max", MAX_ISSUE_CENTS));
            }
            Ok(amount)
        }
        TransactionKind::Redeem => {
            if amount > balance {
                return Err(AppError::new(ErrorCode::GiftCardInsufficientBalance)
                    .with_detail("balance", balance));
            }
            Ok(balance - amount)
        }
        TransactionKind::Reload | TransactionKind::Adjust => {
            let next = balance.saturating_add(amount);
            if next > MAX_BALANCE_CENTS {
                return Err(AppError::new(ErrorCode::GiftCardBalanceLimit)
                    .with_detail("max", MAX_BALANCE_CENTS));
            }
            Ok(next)
        }
    }
}

/// Signed ledger amount for a positive operation amount.
pub fn signed_amount(kind: TransactionKind, amount: i64) -> i64 {
    match kind {
        TransactionKind::Redeem => -amount,
        _ => amount,
    }
}

/// Issue gift card payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCardIssue {
    pub amount_cents: i64,
    pub purchaser_email: Option<String>,
    pub recipient_email: Option<String>,
    pub message: Option<String>,
}

/// Redeem / reload payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCardAmount {
    pub amount_cents: i64,
    pub note: Option<String>,
}

/// Claim payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCardClaim {
    pub claim_token: String,
}

/// Card with its ledger (admin detail view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCardDetail {
    #[serde(flatten)]
    pub card: GiftCard,
    pub transactions: Vec<GiftCardTransaction>,
}

/// Public balance lookup result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCardBalance {
    pub serial_number: String,
    pub balance: i64,
    pub formatted_balance: String,
    pub is_active: bool,
}

impl From<&GiftCard> for GiftCardBalance {
    fn from(card: &GiftCard) -> Self {
        Self {
            serial_number: card.serial_number.clone(),
            balance: card.balance,
            formatted_balance: crate::util::format_cents(card.balance),
            is_active: card.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_bounds() {
        assert_eq!(apply_transaction(0, TransactionKind::Issue, 2_500).unwrap(), 2_500);
        assert_eq!(
            apply_transaction(0, TransactionKind::Issue, 99).unwrap_err().code,
            ErrorCode::GiftCardInvalidAmount
        );
        assert_eq!(
            apply_transaction(0, TransactionKind::Issue, MAX_ISSUE_CENTS + 1)
                .unwrap_err()
                .code,
            ErrorCode::GiftCardInvalidAmount
        );
    }

    #[test]
    fn test_redeem_never_overdraws() {
        assert_eq!(apply_transaction(1_000, TransactionKind::Redeem, 450).unwrap(), 550);
        assert_eq!(apply_transaction(1_000, TransactionKind::Redeem, 1_000).unwrap(), 0);
        assert_eq!(
            apply_transaction(1_000, TransactionKind::Redeem, 1_001)
                .unwrap_err()
                .code,
            ErrorCode::GiftCardInsufficientBalance
        );
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        for kind in [
            TransactionKind::Issue,
            TransactionKind::Redeem,
            TransactionKind::Reload,
        ] {
            assert_eq!(
                apply_transaction(500, kind, 0).unwrap_err().code,
                ErrorCode::GiftCardInvalidAmount
            );
            assert_eq!(
                apply_transaction(500, kind, -10).unwrap_err().code,
                ErrorCode::GiftCardInvalidAmount
            );
        }
    }

    #[test]
    fn test_reload_limit() {
        assert_eq!(
            apply_transaction(90_000, TransactionKind::Reload, 10_000).unwrap(),
            MAX_BALANCE_CENTS
        );
        assert_eq!(
            apply_transaction(90_000, TransactionKind::Reload, 10_001)
                .unwrap_err()
                .code,
            ErrorCode::GiftCardBalanceLimit
        );
    }

    #[test]
    fn test_signed_amount() {
        assert_eq!(signed_amount(TransactionKind::Redeem, 300), -300);
        assert_eq!(signed_amount(TransactionKind::Reload, 300), 300);
    }

    #[test]
    fn test_pass_serial() {
        assert_eq!(gift_card_pass_serial("7KQF-M2XD-9RTA"), "G-7KQF-M2XD-9RTA");
        assert_eq!(
            parse_gift_card_pass_serial("G-7KQF-M2XD-9RTA"),
            Some("7KQF-M2XD-9RTA")
        );
        assert_eq!(parse_gift_card_pass_serial("L-123"), None);
    }

    #[test]
    fn test_transaction_kind_from_db() {
        assert_eq!(
            TransactionKind::try_from("redeem".to_string()),
            Ok(TransactionKind::Redeem)
        );
        assert!(TransactionKind::try_from("refund".to_string()).is_err());
    }
}
