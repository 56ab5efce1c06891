//! In-memory backend
//!
//! Reference implementation of every capability trait, used by tests and
//! local development. Mirrors the hosted service's semantics: validated
//! insert procedures, server-assigned ids and timestamps, an atomic like
//! toggle, and a broadcast-based change feed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::audit::models::{AuditDraft, AuditEntry, AuditPatch};
use crate::features::comments::models::{Comment, CommentDraft, CommentPatch};
use crate::features::issues::models::{Issue, IssueDraft, IssuePatch, IssueStatus};
use crate::features::session::models::{Identity, NewIdentity};

use super::changes::{ChangeEvent, ChangeKind, ChangeSubscription, TableKind};
use super::gateway::{
    BlobStorage, ChangeFeed, EntityGateway, IdentityApi, LikeApi, LikeState, RemoteRecord,
};

const CHANGE_FEED_CAPACITY: usize = 64;

#[derive(Default)]
struct Tables {
    identities: Vec<Identity>,
    passwords: HashMap<i64, String>,
    session: Option<i64>,
    issues: Vec<Issue>,
    comments: Vec<Comment>,
    likes: HashSet<(Uuid, i64)>,
    audit: Vec<AuditEntry>,
    blobs: HashMap<String, Vec<u8>>,
}

pub struct MemoryBackend {
    tables: Mutex<Tables>,
    next_identity_id: AtomicI64,
    changes_tx: broadcast::Sender<ChangeEvent>,
    /// Tables whose next `list` call fails once (test fault injection)
    failing_lists: Mutex<HashSet<TableKind>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (changes_tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            tables: Mutex::new(Tables::default()),
            next_identity_id: AtomicI64::new(1),
            changes_tx,
            failing_lists: Mutex::new(HashSet::new()),
        }
    }

    /// Make the next `list` call on `table` fail with an external service
    /// error. One-shot; later calls succeed again.
    pub fn fail_next_list(&self, table: TableKind) {
        self.failing_lists.lock().unwrap().insert(table);
    }

    /// Number of blobs currently stored (for upload assertions)
    pub fn blob_count(&self) -> usize {
        self.tables.lock().unwrap().blobs.len()
    }

    fn check_list_failure(&self, table: TableKind) -> Result<()> {
        if self.failing_lists.lock().unwrap().remove(&table) {
            return Err(AppError::ExternalService(format!(
                "transient failure listing {}",
                table
            )));
        }
        Ok(())
    }

    fn emit<T: serde::Serialize>(&self, table: TableKind, kind: ChangeKind, record: Option<&T>) {
        let event = ChangeEvent {
            table,
            kind,
            record: record.and_then(|r| serde_json::to_value(r).ok()),
        };
        // No subscribers is fine
        let _ = self.changes_tx.send(event);
    }

    fn display_name_of(tables: &Tables, identity_id: i64) -> Result<String> {
        tables
            .identities
            .iter()
            .find(|i| i.id == identity_id)
            .map(|i| i.display_name.clone())
            .ok_or_else(|| AppError::NotFound(format!("Identity {} not found", identity_id)))
    }
}

#[async_trait]
impl IdentityApi for MemoryBackend {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity> {
        let mut tables = self.tables.lock().unwrap();
        let identity = tables
            .identities
            .iter()
            .find(|i| i.email == email)
            .cloned()
            .ok_or_else(|| AppError::Auth("Invalid email or password".to_string()))?;

        let stored = tables.passwords.get(&identity.id);
        if stored.map(String::as_str) != Some(password) {
            return Err(AppError::Auth("Invalid email or password".to_string()));
        }

        tables.session = Some(identity.id);
        Ok(identity)
    }

    async fn register(&self, data: NewIdentity) -> Result<Identity> {
        let mut tables = self.tables.lock().unwrap();
        if tables.identities.iter().any(|i| i.email == data.email) {
            return Err(AppError::Conflict(format!(
                "Email {} is already registered",
                data.email
            )));
        }

        let id = self.next_identity_id.fetch_add(1, Ordering::SeqCst);
        let identity = Identity {
            id,
            display_name: data.display_name,
            email: data.email,
            role: data.role,
            level: 1,
            xp: 0,
            external_auth_id: None,
            avatar_url: None,
            created_at: Utc::now(),
        };
        tables.passwords.insert(id, data.password);
        tables.identities.push(identity.clone());
        tables.session = Some(id);
        drop(tables);

        self.emit(TableKind::Identities, ChangeKind::Insert, Some(&identity));
        Ok(identity)
    }

    async fn restore_session(&self) -> Result<Option<Identity>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .session
            .and_then(|id| tables.identities.iter().find(|i| i.id == id).cloned()))
    }

    async fn sign_out(&self) -> Result<()> {
        self.tables.lock().unwrap().session = None;
        Ok(())
    }

    async fn update_xp(&self, identity_id: i64, xp: i64, level: i64) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let identity = tables
            .identities
            .iter_mut()
            .find(|i| i.id == identity_id)
            .ok_or_else(|| AppError::NotFound(format!("Identity {} not found", identity_id)))?;
        identity.xp = xp;
        identity.level = level;
        let snapshot = identity.clone();
        drop(tables);

        self.emit(TableKind::Identities, ChangeKind::Update, Some(&snapshot));
        Ok(())
    }

    async fn identity_by_id(&self, identity_id: i64) -> Result<Identity> {
        self.tables
            .lock()
            .unwrap()
            .identities
            .iter()
            .find(|i| i.id == identity_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Identity {} not found", identity_id)))
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .identities
            .iter()
            .find(|i| i.email == email)
            .cloned())
    }
}

#[async_trait]
impl EntityGateway<Issue> for MemoryBackend {
    async fn list(&self) -> Result<Vec<Issue>> {
        self.check_list_failure(TableKind::Issues)?;
        let tables = self.tables.lock().unwrap();
        let mut issues: Vec<Issue> = tables
            .issues
            .iter()
            .map(|issue| {
                let mut issue = issue.clone();
                // Re-join the display name so profile edits show through
                if let Ok(name) = Self::display_name_of(&tables, issue.author_id) {
                    issue.author_name = name;
                }
                issue
            })
            .collect();
        issues.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(issues)
    }

    async fn insert(&self, draft: IssueDraft) -> Result<Issue> {
        if draft.description.trim().is_empty() {
            return Err(AppError::Validation(
                "Issue description must not be empty".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&draft.latitude) {
            return Err(AppError::Validation(
                "Latitude must be between -90 and 90".to_string(),
            ));
        }
        if !(-180.0..=180.0).contains(&draft.longitude) {
            return Err(AppError::Validation(
                "Longitude must be between -180 and 180".to_string(),
            ));
        }

        let mut tables = self.tables.lock().unwrap();
        let author_name = Self::display_name_of(&tables, draft.author_id)?;
        let issue = Issue {
            id: Uuid::now_v7(),
            category: draft.category,
            description: draft.description,
            latitude: draft.latitude,
            longitude: draft.longitude,
            status: IssueStatus::Open,
            author_id: draft.author_id,
            author_name,
            image_url: draft.image_url,
            created_at: Utc::now(),
        };
        tables.issues.push(issue.clone());
        drop(tables);

        self.emit(TableKind::Issues, ChangeKind::Insert, Some(&issue));
        Ok(issue)
    }

    async fn update(&self, id: Uuid, patch: IssuePatch) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let issue = tables
            .issues
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", id)))?;
        issue.apply(&patch);
        let snapshot = issue.clone();
        drop(tables);

        self.emit(TableKind::Issues, ChangeKind::Update, Some(&snapshot));
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.issues.len();
        tables.issues.retain(|i| i.id != id);
        if tables.issues.len() == before {
            return Err(AppError::NotFound(format!("Issue {} not found", id)));
        }
        // Cascade the relation tables, as the service's schema does
        tables.likes.retain(|(issue_id, _)| *issue_id != id);
        tables.comments.retain(|c| c.issue_id != id);
        drop(tables);

        self.emit::<Issue>(TableKind::Issues, ChangeKind::Delete, None);
        Ok(())
    }
}

#[async_trait]
impl EntityGateway<Comment> for MemoryBackend {
    async fn list(&self) -> Result<Vec<Comment>> {
        self.check_list_failure(TableKind::Comments)?;
        let tables = self.tables.lock().unwrap();
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .map(|comment| {
                let mut comment = comment.clone();
                if let Ok(name) = Self::display_name_of(&tables, comment.author_id) {
                    comment.author_name = name;
                }
                comment
            })
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }

    async fn insert(&self, draft: CommentDraft) -> Result<Comment> {
        if draft.content.trim().is_empty() {
            return Err(AppError::Validation(
                "Comment content must not be empty".to_string(),
            ));
        }

        let mut tables = self.tables.lock().unwrap();
        if !tables.issues.iter().any(|i| i.id == draft.issue_id) {
            return Err(AppError::NotFound(format!(
                "Issue {} not found",
                draft.issue_id
            )));
        }
        let author_name = Self::display_name_of(&tables, draft.author_id)?;
        let comment = Comment {
            id: Uuid::now_v7(),
            issue_id: draft.issue_id,
            author_id: draft.author_id,
            author_name,
            content: draft.content,
            created_at: Utc::now(),
        };
        tables.comments.push(comment.clone());
        drop(tables);

        self.emit(TableKind::Comments, ChangeKind::Insert, Some(&comment));
        Ok(comment)
    }

    async fn update(&self, _id: Uuid, _patch: CommentPatch) -> Result<()> {
        Err(AppError::Forbidden(
            "Comments cannot be edited".to_string(),
        ))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        if tables.comments.len() == before {
            return Err(AppError::NotFound(format!("Comment {} not found", id)));
        }
        drop(tables);

        self.emit::<Comment>(TableKind::Comments, ChangeKind::Delete, None);
        Ok(())
    }
}

#[async_trait]
impl EntityGateway<AuditEntry> for MemoryBackend {
    async fn list(&self) -> Result<Vec<AuditEntry>> {
        self.check_list_failure(TableKind::AuditLog)?;
        let tables = self.tables.lock().unwrap();
        let mut entries = tables.audit.clone();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn insert(&self, draft: AuditDraft) -> Result<AuditEntry> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.issues.iter().any(|i| i.id == draft.issue_id) {
            return Err(AppError::NotFound(format!(
                "Issue {} not found",
                draft.issue_id
            )));
        }
        let entry = AuditEntry {
            id: Uuid::now_v7(),
            issue_id: draft.issue_id,
            field: draft.field,
            old_value: draft.old_value,
            new_value: draft.new_value,
            actor_id: draft.actor_id,
            created_at: Utc::now(),
        };
        tables.audit.push(entry.clone());
        drop(tables);

        self.emit(TableKind::AuditLog, ChangeKind::Insert, Some(&entry));
        Ok(entry)
    }

    async fn update(&self, _id: Uuid, _patch: AuditPatch) -> Result<()> {
        Err(AppError::Forbidden("Audit log is append-only".to_string()))
    }

    async fn delete(&self, _id: Uuid) -> Result<()> {
        Err(AppError::Forbidden("Audit log is append-only".to_string()))
    }
}

#[async_trait]
impl LikeApi for MemoryBackend {
    async fn toggle_like(&self, issue_id: Uuid, identity_id: i64) -> Result<LikeState> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.issues.iter().any(|i| i.id == issue_id) {
            return Err(AppError::NotFound(format!("Issue {} not found", issue_id)));
        }

        let key = (issue_id, identity_id);
        let liked = if tables.likes.contains(&key) {
            tables.likes.remove(&key);
            false
        } else {
            tables.likes.insert(key);
            true
        };
        let count = tables.likes.iter().filter(|(i, _)| *i == issue_id).count() as i64;
        drop(tables);

        self.emit::<LikeState>(
            TableKind::Likes,
            if liked {
                ChangeKind::Insert
            } else {
                ChangeKind::Delete
            },
            None,
        );
        Ok(LikeState { count, liked })
    }

    async fn like_state(&self, issue_id: Uuid, viewer: Option<i64>) -> Result<LikeState> {
        let tables = self.tables.lock().unwrap();
        let count = tables.likes.iter().filter(|(i, _)| *i == issue_id).count() as i64;
        let liked = viewer
            .map(|id| tables.likes.contains(&(issue_id, id)))
            .unwrap_or(false);
        Ok(LikeState { count, liked })
    }
}

#[async_trait]
impl BlobStorage for MemoryBackend {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        if bytes.is_empty() {
            return Err(AppError::Storage("Upload payload is empty".to_string()));
        }
        self.tables
            .lock()
            .unwrap()
            .blobs
            .insert(key.to_string(), bytes);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://storage/{}", key)
    }
}

impl ChangeFeed for MemoryBackend {
    fn subscribe(&self, table: TableKind) -> ChangeSubscription {
        ChangeSubscription::new(table, self.changes_tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::issues::models::IssueCategory;
    use crate::features::session::models::Role;

    fn citizen(name: &str, email: &str) -> NewIdentity {
        NewIdentity {
            display_name: name.to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
            role: Role::Citizen,
        }
    }

    async fn seeded_issue(backend: &MemoryBackend, author_id: i64) -> Issue {
        EntityGateway::<Issue>::insert(
            backend,
            IssueDraft {
                author_id,
                category: IssueCategory::Damage,
                description: "Broken streetlight".to_string(),
                latitude: 42.66,
                longitude: 21.17,
                image_url: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let backend = MemoryBackend::new();
        backend
            .register(citizen("Jane", "jane@example.com"))
            .await
            .unwrap();

        let err = backend
            .register(citizen("Other Jane", "jane@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_wrong_password() {
        let backend = MemoryBackend::new();
        backend
            .register(citizen("Jane", "jane@example.com"))
            .await
            .unwrap();

        let err = backend
            .authenticate("jane@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[tokio::test]
    async fn test_like_toggle_round_trip() {
        let backend = MemoryBackend::new();
        let jane = backend
            .register(citizen("Jane", "jane@example.com"))
            .await
            .unwrap();
        let issue = seeded_issue(&backend, jane.id).await;

        let first = backend.toggle_like(issue.id, jane.id).await.unwrap();
        assert_eq!(first, LikeState { count: 1, liked: true });

        let second = backend.toggle_like(issue.id, jane.id).await.unwrap();
        assert_eq!(second, LikeState { count: 0, liked: false });
    }

    #[tokio::test]
    async fn test_insert_issue_assigns_server_fields() {
        let backend = MemoryBackend::new();
        let jane = backend
            .register(citizen("Jane", "jane@example.com"))
            .await
            .unwrap();
        let issue = seeded_issue(&backend, jane.id).await;

        assert_eq!(issue.status, IssueStatus::Open);
        assert_eq!(issue.author_name, "Jane");
        assert!(!issue.id.is_nil());
    }

    #[tokio::test]
    async fn test_insert_issue_validates_coordinates() {
        let backend = MemoryBackend::new();
        let jane = backend
            .register(citizen("Jane", "jane@example.com"))
            .await
            .unwrap();

        let err = EntityGateway::<Issue>::insert(
            &backend,
            IssueDraft {
                author_id: jane.id,
                category: IssueCategory::Traffic,
                description: "Out of range".to_string(),
                latitude: 120.0,
                longitude: 21.17,
                image_url: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_fail_next_list_is_one_shot() {
        let backend = MemoryBackend::new();
        backend.fail_next_list(TableKind::Issues);

        let err = EntityGateway::<Issue>::list(&backend).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));

        assert!(EntityGateway::<Issue>::list(&backend).await.is_ok());
    }
}
