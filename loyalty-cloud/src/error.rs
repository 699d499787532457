//! Service-layer error type
//!
//! `ServiceError` bridges DB-layer errors (`sqlx::Error`, `BoxError`) and the
//! API-layer error (`AppError`), so handlers can use `?` on both.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error.
///
/// - `Db`: Database/infrastructure errors (logged, mapped to InternalError)
/// - `App`: Business-rule errors (passed through to the client)
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Db(BoxError),
    #[error(transparent)]
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Log an infrastructure error and map it to a 500.
pub fn internal(e: impl std::fmt::Display) -> AppError {
    tracing::error!("Internal error: {e}");
    AppError::new(ErrorCode::InternalError)
}

/// True when the database rejected a row because of a UNIQUE constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_maps_to_internal() {
        let err = ServiceError::Db("connection reset".into());
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::InternalError);
        assert!(!app.message.contains("connection reset"));
    }

    #[test]
    fn test_app_error_passes_through() {
        let err = ServiceError::from(AppError::new(ErrorCode::GiftCardInactive));
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::GiftCardInactive);
    }

    #[test]
    fn test_display() {
        let err = ServiceError::Db("connection reset".into());
        assert_eq!(err.to_string(), "database error: connection reset");
    }

    #[test]
    fn test_row_not_found_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
