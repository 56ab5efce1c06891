use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::backend::{RemoteRecord, TableKind};

/// One field transition on an issue, recorded when an institution
/// triages a report. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    pub actor_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an audit entry
#[derive(Debug, Clone)]
pub struct AuditDraft {
    pub issue_id: Uuid,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    pub actor_id: i64,
}

/// The audit log is append-only; entries are never patched
#[derive(Debug, Clone, Default)]
pub struct AuditPatch {}

impl RemoteRecord for AuditEntry {
    type Id = Uuid;
    type Draft = AuditDraft;
    type Patch = AuditPatch;

    const TABLE: TableKind = TableKind::AuditLog;

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, _patch: &AuditPatch) {}
}
