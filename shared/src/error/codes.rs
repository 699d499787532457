//! Unified error codes for the loyalty service
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Customer / loyalty errors
//! - 4xxx: Gift card errors
//! - 5xxx: Invitation and employee errors
//! - 6xxx: Wallet pass errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the admin dashboard and
/// the customer app can switch on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid format
    InvalidFormat = 6,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (email/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1007,
    /// Too many requests from the same client
    RateLimited = 1008,

    // ==================== 2xxx: Permission ====================
    /// Admin role required
    AdminRequired = 2003,
    /// An employee cannot demote or deactivate themself
    CannotModifySelf = 2004,

    // ==================== 3xxx: Customer ====================
    /// Customer profile not found
    CustomerNotFound = 3001,
    /// Email already registered
    EmailAlreadyRegistered = 3002,
    /// Points balance too low for the requested redemption
    InsufficientPoints = 3003,
    /// Purchase quantity out of range
    InvalidQuantity = 3004,
    /// Password too short
    PasswordTooShort = 3005,
    /// Email address is malformed
    InvalidEmail = 3006,

    // ==================== 4xxx: Gift card ====================
    /// Gift card not found
    GiftCardNotFound = 4001,
    /// Gift card balance too low
    GiftCardInsufficientBalance = 4002,
    /// Gift card is deactivated
    GiftCardInactive = 4003,
    /// Gift card already claimed by another customer
    GiftCardAlreadyClaimed = 4004,
    /// Amount outside of the allowed range
    GiftCardInvalidAmount = 4005,
    /// Reload would exceed the maximum balance
    GiftCardBalanceLimit = 4006,

    // ==================== 5xxx: Invitation / Employee ====================
    /// Invitation not found
    InvitationNotFound = 5001,
    /// Invitation has expired
    InvitationExpired = 5002,
    /// Invitation was already used
    InvitationUsed = 5003,
    /// Email does not match the invited address
    InvitationEmailMismatch = 5004,
    /// Employee not found
    EmployeeNotFound = 5101,
    /// Employee with this email already exists
    EmployeeAlreadyExists = 5102,

    // ==================== 6xxx: Wallet ====================
    /// Wallet integration not configured on this server
    WalletNotConfigured = 6001,
    /// Pass could not be generated
    PassGenerationFailed = 6002,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::RateLimited => "Too many requests, try again later",

            // Permission
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::CannotModifySelf => "You cannot change your own role or status",

            // Customer
            ErrorCode::CustomerNotFound => "Customer not found",
            ErrorCode::EmailAlreadyRegistered => "Email already registered",
            ErrorCode::InsufficientPoints => "Not enough points for this reward",
            ErrorCode::InvalidQuantity => "Quantity must be between 1 and 50",
            ErrorCode::PasswordTooShort => "Password must be at least 8 characters",
            ErrorCode::InvalidEmail => "Invalid email address",

            // Gift card
            ErrorCode::GiftCardNotFound => "Gift card not found",
            ErrorCode::GiftCardInsufficientBalance => "Gift card balance is too low",
            ErrorCode::GiftCardInactive => "Gift card is inactive",
            ErrorCode::GiftCardAlreadyClaimed => "Gift card already claimed",
            ErrorCode::GiftCardInvalidAmount => "Invalid gift card amount",
            ErrorCode::GiftCardBalanceLimit => "Gift card balance limit exceeded",

            // Invitation / Employee
            ErrorCode::InvitationNotFound => "Invitation not found",
            ErrorCode::InvitationExpired => "Invitation has expired",
            ErrorCode::InvitationUsed => "Invitation has already been used",
            ErrorCode::InvitationEmailMismatch => "Email does not match the invitation",
            ErrorCode::EmployeeNotFound => "Employee not found",
            ErrorCode::EmployeeAlreadyExists => "An employee with this email already exists",

            // Wallet
            ErrorCode::WalletNotConfigured => "Wallet passes are not configured",
            ErrorCode::PassGenerationFailed => "Failed to generate wallet pass",

            // System
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            6 => Ok(ErrorCode::InvalidFormat),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1007 => Ok(ErrorCode::AccountDisabled),
            1008 => Ok(ErrorCode::RateLimited),

            // Permission
            2003 => Ok(ErrorCode::AdminRequired),
            2004 => Ok(ErrorCode::CannotModifySelf),

            // Customer
            3001 => Ok(ErrorCode::CustomerNotFound),
            3002 => Ok(ErrorCode::EmailAlreadyRegistered),
            3003 => Ok(ErrorCode::InsufficientPoints),
            3004 => Ok(ErrorCode::InvalidQuantity),
            3005 => Ok(ErrorCode::PasswordTooShort),
            3006 => Ok(ErrorCode::InvalidEmail),

            // Gift card
            4001 => Ok(ErrorCode::GiftCardNotFound),
            4002 => Ok(ErrorCode::GiftCardInsufficientBalance),
            4003 => Ok(ErrorCode::GiftCardInactive),
            4004 => Ok(ErrorCode::GiftCardAlreadyClaimed),
            4005 => Ok(ErrorCode::GiftCardInvalidAmount),
            4006 => Ok(ErrorCode::GiftCardBalanceLimit),

            // Invitation / Employee
            5001 => Ok(ErrorCode::InvitationNotFound),
            5002 => Ok(ErrorCode::InvitationExpired),
            5003 => Ok(ErrorCode::InvitationUsed),
            5004 => Ok(ErrorCode::InvitationEmailMismatch),
            5101 => Ok(ErrorCode::EmployeeNotFound),
            5102 => Ok(ErrorCode::EmployeeAlreadyExists),

            // Wallet
            6001 => Ok(ErrorCode::WalletNotConfigured),
            6002 => Ok(ErrorCode::PassGenerationFailed),

            // System
            9001 => Ok(ErrorCode::InternalError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::InvalidCredentials.code(), 1002);
        assert_eq!(ErrorCode::AdminRequired.code(), 2003);
        assert_eq!(ErrorCode::InsufficientPoints.code(), 3003);
        assert_eq!(ErrorCode::GiftCardAlreadyClaimed.code(), 4004);
        assert_eq!(ErrorCode::InvitationExpired.code(), 5002);
        assert_eq!(ErrorCode::WalletNotConfigured.code(), 6001);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_roundtrips_known_codes() {
        for code in [
            ErrorCode::Success,
            ErrorCode::RateLimited,
            ErrorCode::CannotModifySelf,
            ErrorCode::InvalidEmail,
            ErrorCode::GiftCardBalanceLimit,
            ErrorCode::EmployeeAlreadyExists,
            ErrorCode::PassGenerationFailed,
            ErrorCode::InternalError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_unknown() {
        assert_eq!(ErrorCode::try_from(7777), Err(InvalidErrorCode(7777)));
        assert_eq!(
            InvalidErrorCode(42).to_string(),
            "invalid error code: 42".to_string()
        );
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::GiftCardNotFound).unwrap();
        assert_eq!(json, "4001");
        let code: ErrorCode = serde_json::from_str("5003").unwrap();
        assert_eq!(code, ErrorCode::InvitationUsed);
        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::NotFound.is_success());
    }
}
