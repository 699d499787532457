//! Employee Invitation Model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::employee::EmployeeRole;
use crate::error::{AppError, AppResult, ErrorCode};

/// Invitation row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Invitation {
    pub id: i64,
    #[serde(skip_serializing)]
    pub token: String,
    pub email: String,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub role: EmployeeRole,
    pub invited_by: Option<Uuid>,
    pub expires_at: i64,
    pub used_at: Option<i64>,
    pub created_at: i64,
}

/// Derived invitation state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Used,
    Expired,
}

impl InvitationStatus {
    /// `used` takes precedence over `expired`; expiry is reached at `expires_at`.
    pub fn of(used_at: Option<i64>, expires_at: i64, now: i64) -> Self {
        if used_at.is_some() {
            Self::Used
        } else if now >= expires_at {
            Self::Expired
        } else {
            Self::Pending
        }
    }
}

impl Invitation {
    pub fn status(&self, now: i64) -> InvitationStatus {
        InvitationStatus::of(self.used_at, self.expires_at, now)
    }

    /// Check the invitation can be accepted by `email` at `now`.
    pub fn validate_for(&self, email: &str, now: i64) -> AppResult<()> {
        match self.status(now) {
            InvitationStatus::Used => return Err(AppError::new(ErrorCode::InvitationUsed)),
            InvitationStatus::Expired => {
                return Err(AppError::new(ErrorCode::InvitationExpired));
            }
            InvitationStatus::Pending => {}
        }
        if !self.email.eq_ignore_ascii_case(email.trim()) {
            return Err(AppError::new(ErrorCode::InvitationEmailMismatch));
        }
        Ok(())
    }
}

/// Invitation as listed in the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationSummary {
    #[serde(flatten)]
    pub invitation: Invitation,
    pub status: InvitationStatus,
}

/// Create invitation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationCreate {
    pub email: String,
    #[serde(default = "default_role")]
    pub role: EmployeeRole,
}

fn default_role() -> EmployeeRole {
    EmployeeRole::Staff
}

/// Accept invitation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationAccept {
    pub token: String,
    pub email: String,
    pub full_name: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation(used_at: Option<i64>, expires_at: i64) -> Invitation {
        Invitation {
            id: 1,
            token: crate::util::generate_token(),
            email: "new.barista@example.com".into(),
            role: EmployeeRole::Staff,
            invited_by: None,
            expires_at,
            used_at,
            created_at: 0,
        }
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(InvitationStatus::of(None, 100, 99), InvitationStatus::Pending);
        assert_eq!(InvitationStatus::of(None, 100, 100), InvitationStatus::Expired);
        assert_eq!(InvitationStatus::of(Some(50), 100, 200), InvitationStatus::Used);
        assert_eq!(InvitationStatus::of(Some(50), 100, 60), InvitationStatus::Used);
    }

    #[test]
    fn test_validate_for() {
        let inv = invitation(None, 1_000);
        assert!(inv.validate_for("New.Barista@example.com ", 10).is_ok());
        assert_eq!(
            inv.validate_for("someone@example.com", 10).unwrap_err().code,
            ErrorCode::InvitationEmailMismatch
        );
        assert_eq!(
            inv.validate_for("new.barista@example.com", 1_000).unwrap_err().code,
            ErrorCode::InvitationExpired
        );
        let used = invitation(Some(5), 1_000);
        assert_eq!(
            used.validate_for("new.barista@example.com", 10).unwrap_err().code,
            ErrorCode::InvitationUsed
        );
    }

    #[test]
    fn test_token_never_serialized() {
        let json = serde_json::to_value(invitation(None, 1)).unwrap();
        assert!(json.get("token").is_none());
        assert_eq!(json["role"], "staff");
    }

    #[test]
    fn test_create_defaults_to_staff() {
        let req: InvitationCreate = serde_json::from_str(r#"{"email":"a@b.co"}"#).unwrap();
        assert_eq!(req.role, EmployeeRole::Staff);
    }
}
