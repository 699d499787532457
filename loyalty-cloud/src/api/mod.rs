//! HTTP API for loyalty-cloud
//!
//! - `/api/admin/*`: employee API (JWT, some routes admin-only)
//! - `/api/customers/*`, `/api/me/*`: customer accounts
//! - `/api/invitations/*`, `/api/gift-cards/*`: public token-based routes
//! - `/api/passkit/v1/*`: Apple Wallet web service

pub mod admin;
pub mod customer;
pub mod extract;
pub mod gift_cards;
pub mod health;
pub mod invitations;
pub mod passkit;

use axum::routing::get;
use axum::{Json, Router};
use http::{HeaderName, HeaderValue};
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::AppState;

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// Wrap data in the success envelope.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Validate and normalize an email from a request body.
pub fn require_email(input: &str) -> AppResult<String> {
    shared::util::normalize_email(input).ok_or_else(|| AppError::new(ErrorCode::InvalidEmail))
}

/// Normalize a serial number from the path; malformed serials cannot exist.
pub fn path_serial(input: &str) -> AppResult<String> {
    shared::util::normalize_serial(input).ok_or_else(|| AppError::new(ErrorCode::GiftCardNotFound))
}

/// Trimmed optional text, with blank input treated as absent.
pub fn clean_text(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Build all routes (no middleware, no state)
pub fn build_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(admin::router(state))
        .merge(customer::router(state))
        .merge(invitations::router(state))
        .merge(gift_cards::router())
        .merge(passkit::router())
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::new(ErrorCode::NotFound)
}

/// Build the application with tower middleware and state
pub fn build_app(state: AppState) -> Router {
    build_router(&state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{StatusCode, header};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::auth::token::{TokenKind, create_token};
    use crate::config::Config;

    const PASS_TYPE: &str = "pass.com.example.coffee";
    const CUSTOMER_ID: &str = "6f1c2a52-3f7e-4b0a-9d62-0c1f5f0e4a11";

    fn state() -> AppState {
        AppState::for_tests(Config::for_tests())
    }

    fn customer_bearer(state: &AppState) -> String {
        let issued = create_token(
            TokenKind::Customer,
            CUSTOMER_ID,
            "a@b.co",
            None,
            &state.config.jwt_secret,
        )
        .unwrap();
        format!("Bearer {}", issued.token)
    }

    async fn send(state: AppState, request: http::Request<Body>) -> (StatusCode, Value) {
        let resp = build_app(state).oneshot(request).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get(uri: &str) -> http::Request<Body> {
        http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_claim_with_missing_field_is_enveloped_400() {
        let state = state();
        let request = http::Request::builder()
            .method("POST")
            .uri("/api/gift-cards/claim")
            .header(header::AUTHORIZATION, customer_bearer(&state))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], ErrorCode::InvalidFormat.code());
        assert!(body["error"].as_str().unwrap().contains("claim_token"));
    }

    #[tokio::test]
    async fn test_mistyped_body_field_is_enveloped_400() {
        let request = http::Request::builder()
            .method("POST")
            .uri("/api/invitations/accept")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::from(r#"{"token": 5}"#))
            .unwrap();
        let (status, body) = send(state(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ErrorCode::InvalidFormat.code());
    }

    #[tokio::test]
    async fn test_apple_pass_without_wallet_is_503() {
        let state = state();
        let request = http::Request::builder()
            .uri("/api/me/pass/apple")
            .header(header::AUTHORIZATION, customer_bearer(&state))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(state, request).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], ErrorCode::WalletNotConfigured.code());
    }

    #[tokio::test]
    async fn test_gift_card_google_pass_without_wallet_is_503() {
        let uri = format!(
            "/api/gift-cards/7KQF-M2XD-9RTA/pass/google?token={}",
            shared::util::generate_token()
        );
        let (status, body) = send(state(), get(&uri)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], ErrorCode::WalletNotConfigured.code());
    }

    #[tokio::test]
    async fn test_malformed_invitation_token_is_404() {
        let (status, body) = send(state(), get("/api/invitations/not-a-token")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], ErrorCode::InvitationNotFound.code());
    }

    #[tokio::test]
    async fn test_passkit_unconfigured_wallet_is_404() {
        let uri = format!("/api/passkit/v1/devices/device-1/registrations/{PASS_TYPE}");
        let (status, _) = send(state(), get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_passkit_pass_type_mismatch_is_404() {
        let mut state = state();
        state.apple = Some(std::sync::Arc::new(crate::wallet::apple::testing::wallet(
            PASS_TYPE,
        )));

        let uri = "/api/passkit/v1/devices/device-1/registrations/pass.com.other";
        let (status, _) = send(state.clone(), get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let request = http::Request::builder()
            .method("POST")
            .uri("/api/passkit/v1/devices/device-1/registrations/pass.com.other/L-1")
            .header(header::AUTHORIZATION, "ApplePass token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"pushToken":"abc"}"#))
            .unwrap();
        let (status, _) = send(state, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_is_enveloped_404() {
        let (status, body) = send(state(), get("/api/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], ErrorCode::NotFound.code());
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(Some("  hi ")).as_deref(), Some("hi"));
        assert_eq!(clean_text(Some("   ")), None);
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn test_path_serial() {
        assert_eq!(path_serial("7kqf-m2xd-9rta").unwrap(), "7KQF-M2XD-9RTA");
        assert_eq!(
            path_serial("nope").unwrap_err().code,
            ErrorCode::GiftCardNotFound
        );
    }

    #[test]
    fn test_require_email() {
        assert_eq!(require_email(" A@B.co ").unwrap(), "a@b.co");
        assert_eq!(require_email("x").unwrap_err().code, ErrorCode::InvalidEmail);
    }
}
