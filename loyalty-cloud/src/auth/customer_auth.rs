//! Customer JWT authentication

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::{AppError, ErrorCode};
use uuid::Uuid;

use super::token::{TokenKind, bearer_token, decode_token};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct CustomerIdentity {
    pub id: Uuid,
    pub email: String,
}

pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let claims = bearer_token(request.headers())
        .and_then(|token| decode_token(token, &state.config.jwt_secret, TokenKind::Customer))
        .map_err(IntoResponse::into_response)?;

    let id: Uuid = claims
        .sub
        .parse()
        .map_err(|_| AppError::new(ErrorCode::TokenInvalid).into_response())?;

    request.extensions_mut().insert(CustomerIdentity {
        id,
        email: claims.email,
    });

    Ok(next.run(request).await)
}
