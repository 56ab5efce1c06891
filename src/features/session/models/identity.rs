use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::AppError;

/// Account role enum matching the service's role column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Institution,
    Admin,
}

impl Role {
    /// Institutions and admins may triage issues and moderate content.
    pub fn can_triage(&self) -> bool {
        matches!(self, Role::Institution | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Citizen => write!(f, "citizen"),
            Role::Institution => write!(f, "institution"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "citizen" => Ok(Role::Citizen),
            "institution" => Ok(Role::Institution),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::Validation(format!("Unknown role: {}", other))),
        }
    }
}

/// Authenticated account record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    /// Always the deterministic function of `xp`; the two never diverge
    pub level: i64,
    pub xp: i64,
    pub external_auth_id: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data for registering a new identity
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}
