use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::backend::{RemoteRecord, TableKind};

/// Comment record, author name denormalized in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub issue_id: Uuid,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the validated comment procedure
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub issue_id: Uuid,
    pub author_id: i64,
    pub content: String,
}

/// Comments are never edited, only created and (by institutions) deleted
#[derive(Debug, Clone, Default)]
pub struct CommentPatch {}

impl RemoteRecord for Comment {
    type Id = Uuid;
    type Draft = CommentDraft;
    type Patch = CommentPatch;

    const TABLE: TableKind = TableKind::Comments;

    fn id(&self) -> Uuid {
        self.id
    }

    fn apply(&mut self, _patch: &CommentPatch) {}
}
