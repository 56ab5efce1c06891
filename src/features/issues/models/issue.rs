use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::AppError;
use crate::modules::backend::{RemoteRecord, TableKind};

/// Issue category enum matching the service's category column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Traffic,
    Environment,
    Economy,
    Living,
    Damage,
    Heritage,
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueCategory::Traffic => write!(f, "traffic"),
            IssueCategory::Environment => write!(f, "environment"),
            IssueCategory::Economy => write!(f, "economy"),
            IssueCategory::Living => write!(f, "living"),
            IssueCategory::Damage => write!(f, "damage"),
            IssueCategory::Heritage => write!(f, "heritage"),
        }
    }
}

impl std::str::FromStr for IssueCategory {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "traffic" => Ok(IssueCategory::Traffic),
            "environment" => Ok(IssueCategory::Environment),
            "economy" => Ok(IssueCategory::Economy),
            "living" => Ok(IssueCategory::Living),
            "damage" => Ok(IssueCategory::Damage),
            "heritage" => Ok(IssueCategory::Heritage),
            other => Err(AppError::Validation(format!(
                "Unknown issue category: {}",
                other
            ))),
        }
    }
}

/// Issue status enum. Transitions are free: any status may move to any
/// other, this is not a strict progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    InProgress,
    Resolved,
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueStatus::Open => write!(f, "open"),
            IssueStatus::InProgress => write!(f, "in_progress"),
            IssueStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl std::str::FromStr for IssueStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "open" => Ok(IssueStatus::Open),
            "in_progress" => Ok(IssueStatus::InProgress),
            "resolved" => Ok(IssueStatus::Resolved),
            other => Err(AppError::Validation(format!(
                "Unknown issue status: {}",
                other
            ))),
        }
    }
}

/// Issue record as returned by the service, author name denormalized in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub category: IssueCategory,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: IssueStatus,
    pub author_id: i64,
    pub author_name: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the validated report procedure
#[derive(Debug, Clone)]
pub struct IssueDraft {
    pub author_id: i64,
    pub category: IssueCategory,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub image_url: Option<String>,
}

/// Partial update for an issue; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct IssuePatch {
    pub status: Option<IssueStatus>,
    pub category: Option<IssueCategory>,
    pub description: Option<String>,
}

impl RemoteRecord for Issue {
    type Id = Uuid;
    type Draft = IssueDraft;
    type Patch = IssuePatch;

    const TABLE: TableKind = TableKind::Issues;

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, patch: &IssuePatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(ref description) = patch.description {
            self.description = description.clone();
        }
    }
}
