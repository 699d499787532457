//! Employee Model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Employee role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeRole {
    Admin,
    Staff,
}

impl EmployeeRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::str::FromStr for EmployeeRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "staff" => Ok(Self::Staff),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl TryFrom<String> for EmployeeRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Employee response (without password)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Employee {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub role: EmployeeRole,
    pub is_active: bool,
    pub created_at: i64,
}

/// Update employee payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeUpdate {
    pub role: Option<EmployeeRole>,
    pub is_active: Option<bool>,
    pub full_name: Option<String>,
}
