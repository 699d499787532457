//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            // 404 Not Found
            Self::NotFound
            | Self::CustomerNotFound
            | Self::GiftCardNotFound
            | Self::InvitationNotFound
            | Self::EmployeeNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::EmailAlreadyRegistered
            | Self::GiftCardAlreadyClaimed
            | Self::EmployeeAlreadyExists => StatusCode::CONFLICT,

            // 410 Gone
            Self::InvitationExpired | Self::InvitationUsed => StatusCode::GONE,

            // 401 Unauthorized
            Self::NotAuthenticated
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::AccountDisabled => StatusCode::UNAUTHORIZED,

            // 403 Forbidden
            Self::AdminRequired | Self::CannotModifySelf => StatusCode::FORBIDDEN,

            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,

            // 503 Service Unavailable (integration missing)
            Self::WalletNotConfigured => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::InternalError | Self::PassGenerationFailed => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation/business errors)
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::CustomerNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::GiftCardNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::InvitationNotFound.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflict_and_gone_status() {
        assert_eq!(
            ErrorCode::EmailAlreadyRegistered.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::GiftCardAlreadyClaimed.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::InvitationExpired.http_status(), StatusCode::GONE);
        assert_eq!(ErrorCode::InvitationUsed.http_status(), StatusCode::GONE);
    }

    #[test]
    fn test_auth_status() {
        assert_eq!(
            ErrorCode::InvalidCredentials.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ErrorCode::AdminRequired.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::RateLimited.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_server_status() {
        assert_eq!(
            ErrorCode::InternalError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::WalletNotConfigured.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_bad_request_status() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ErrorCode::InvalidFormat.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::InsufficientPoints.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::GiftCardInsufficientBalance.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::InvitationEmailMismatch.http_status(),
            StatusCode::BAD_REQUEST
        );
    }
}
