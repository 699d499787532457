//! HS256 session tokens for employees and customers

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::EmployeeRole;

const EMPLOYEE_TOKEN_HOURS: i64 = 12;
const CUSTOMER_TOKEN_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Employee,
    Customer,
}

/// JWT claims shared by both token kinds
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Employee or profile id
    pub sub: String,
    pub email: String,
    /// Only set for employees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<EmployeeRole>,
    pub kind: TokenKind,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Token handed back by login / register endpoints
#[derive(Debug, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: i64,
}

pub fn create_token(
    kind: TokenKind,
    sub: &str,
    email: &str,
    role: Option<EmployeeRole>,
    secret: &str,
) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let ttl = match kind {
        TokenKind::Employee => chrono::Duration::hours(EMPLOYEE_TOKEN_HOURS),
        TokenKind::Customer => chrono::Duration::days(CUSTOMER_TOKEN_DAYS),
    };
    let exp = now + ttl;
    let claims = Claims {
        sub: sub.to_string(),
        email: email.to_string(),
        role,
        kind,
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(IssuedToken {
        token,
        expires_at: exp.timestamp_millis(),
    })
}

/// Verify signature, expiry and token kind.
pub fn decode_token(token: &str, secret: &str, expected: TokenKind) -> AppResult<Claims> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::new(ErrorCode::TokenExpired),
            _ => AppError::new(ErrorCode::TokenInvalid),
        }
    })?;

    if data.claims.kind != expected {
        return Err(AppError::new(ErrorCode::TokenInvalid));
    }
    Ok(data.claims)
}

/// Extract the token of an `Authorization: Bearer …` header.
pub fn bearer_token(headers: &http::HeaderMap) -> AppResult<&str> {
    let value = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(AppError::not_authenticated)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_employee_token_round_trip() {
        let issued = create_token(
            TokenKind::Employee,
            "emp-1",
            "barista@example.com",
            Some(EmployeeRole::Admin),
            SECRET,
        )
        .unwrap();
        let claims = decode_token(&issued.token, SECRET, TokenKind::Employee).unwrap();
        assert_eq!(claims.sub, "emp-1");
        assert_eq!(claims.role, Some(EmployeeRole::Admin));
        assert!(issued.expires_at > shared::util::now_millis());
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let issued =
            create_token(TokenKind::Customer, "c-1", "ann@example.com", None, SECRET).unwrap();
        let err = decode_token(&issued.token, SECRET, TokenKind::Employee).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issued =
            create_token(TokenKind::Customer, "c-1", "ann@example.com", None, SECRET).unwrap();
        let err = decode_token(&issued.token, "other", TokenKind::Customer).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[test]
    fn test_expired_token() {
        let past = (chrono::Utc::now() - chrono::Duration::hours(2)).timestamp() as usize;
        let claims = Claims {
            sub: "c-1".into(),
            email: "ann@example.com".into(),
            role: None,
            kind: TokenKind::Customer,
            exp: past,
            iat: past - 60,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        let err = decode_token(&token, SECRET, TokenKind::Customer).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = http::HeaderMap::new();
        assert_eq!(
            bearer_token(&headers).unwrap_err().code,
            ErrorCode::NotAuthenticated
        );

        headers.insert(http::header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap_err().code, ErrorCode::TokenInvalid);

        headers.insert(http::header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }
}
