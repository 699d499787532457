//! Employee JWT authentication for the admin API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::error::{AppError, ErrorCode};
use shared::models::EmployeeRole;
use uuid::Uuid;

use super::token::{TokenKind, bearer_token, decode_token};
use crate::db;
use crate::state::AppState;

/// Authenticated employee extracted from JWT
#[derive(Debug, Clone)]
pub struct EmployeeIdentity {
    pub id: Uuid,
    pub email: String,
    pub role: EmployeeRole,
}

/// Verify the employee token and that the account is still active.
///
/// Role and status are re-read from the database so that deactivation and
/// demotion take effect before the token expires.
pub async fn employee_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let claims = bearer_token(request.headers())
        .and_then(|token| decode_token(token, &state.config.jwt_secret, TokenKind::Employee))
        .map_err(IntoResponse::into_response)?;

    let id: Uuid = claims
        .sub
        .parse()
        .map_err(|_| AppError::new(ErrorCode::TokenInvalid).into_response())?;

    let employee = db::employees::find(&state.pool, id)
        .await
        .map_err(|e| crate::error::internal(e).into_response())?
        .ok_or_else(|| AppError::new(ErrorCode::TokenInvalid).into_response())?;

    if !employee.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled).into_response());
    }

    request.extensions_mut().insert(EmployeeIdentity {
        id: employee.id,
        email: employee.email,
        role: employee.role,
    });

    Ok(next.run(request).await)
}

/// Layered after [`employee_auth_middleware`]: only administrators pass.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, Response> {
    let is_admin = request
        .extensions()
        .get::<EmployeeIdentity>()
        .is_some_and(|identity| identity.role.is_admin());
    if !is_admin {
        return Err(AppError::new(ErrorCode::AdminRequired).into_response());
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware, routing::get};
    use tower::ServiceExt;

    fn app(identity: Option<EmployeeIdentity>) -> Router {
        let router = Router::new()
            .route("/admin-only", get(|| async { "ok" }))
            .layer(middleware::from_fn(require_admin));
        match identity {
            Some(identity) => router.layer(axum::Extension(identity)),
            None => router,
        }
    }

    fn identity(role: EmployeeRole) -> EmployeeIdentity {
        EmployeeIdentity {
            id: Uuid::nil(),
            email: "e@example.com".into(),
            role,
        }
    }

    async fn status(app: Router) -> u16 {
        let request = http::Request::builder()
            .uri("/admin-only")
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap().status().as_u16()
    }

    #[tokio::test]
    async fn test_require_admin() {
        assert_eq!(status(app(Some(identity(EmployeeRole::Admin)))).await, 200);
        assert_eq!(status(app(Some(identity(EmployeeRole::Staff)))).await, 403);
        assert_eq!(status(app(None)).await, 403);
    }
}
