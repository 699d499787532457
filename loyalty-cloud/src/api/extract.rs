//! Request extractors that reject with the JSON error envelope
//!
//! axum's own `Json`, `Path` and `Query` answer malformed input with a
//! plain-text 400/422. These wrappers turn every rejection into an
//! `AppError` with `InvalidFormat` (400).

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::Json;
use http::request::Parts;
use serde::de::DeserializeOwned;
use shared::error::{AppError, ErrorCode};

fn invalid_format(message: String) -> AppError {
    AppError::with_message(ErrorCode::InvalidFormat, message)
}

/// JSON request body.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    invalid_format(rejection.body_text())
}

/// Path parameters.
pub struct ApiPath<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(path_rejection(rejection)),
        }
    }
}

fn path_rejection(rejection: PathRejection) -> AppError {
    invalid_format(rejection.body_text())
}

/// Query string.
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(query_rejection(rejection)),
        }
    }
}

fn query_rejection(rejection: QueryRejection) -> AppError {
    invalid_format(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::Router;
    use http::StatusCode;
    use serde::Deserialize;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[derive(Deserialize)]
    struct Claim {
        claim_token: String,
    }

    #[derive(Deserialize)]
    struct Paging {
        page: u32,
    }

    async fn handler(
        ApiPath(id): ApiPath<Uuid>,
        ApiQuery(paging): ApiQuery<Paging>,
        ApiJson(claim): ApiJson<Claim>,
    ) -> impl IntoResponse {
        format!("{id} {} {}", paging.page, claim.claim_token)
    }

    fn app() -> Router {
        Router::new().route("/items/{id}", post(handler))
    }

    async fn call(uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let resp = app()
            .oneshot(
                http::Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(http::header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    const ID: &str = "6f1c2a52-3f7e-4b0a-9d62-0c1f5f0e4a11";

    #[tokio::test]
    async fn test_missing_body_field_is_json_400() {
        let (status, body) = call(&format!("/items/{ID}?page=1"), "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], ErrorCode::InvalidFormat.code());
        assert!(body["error"].as_str().unwrap().contains("claim_token"));
    }

    #[tokio::test]
    async fn test_malformed_path_is_json_400() {
        let (status, body) = call("/items/not-a-uuid?page=1", r#"{"claim_token":"x"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], ErrorCode::InvalidFormat.code());
    }

    #[tokio::test]
    async fn test_malformed_query_is_json_400() {
        let (status, body) = call(&format!("/items/{ID}?page=abc"), r#"{"claim_token":"x"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_valid_request_passes_through() {
        let resp = app()
            .oneshot(
                http::Request::builder()
                    .method("POST")
                    .uri(format!("/items/{ID}?page=2"))
                    .header(http::header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"claim_token":"abc"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
