use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::core::config::StorageConfig;
use crate::core::error::{AppError, Result};
use crate::features::audit::models::{AuditDraft, AuditEntry};
use crate::features::issues::dtos::{ReportIssueDto, UpdateIssueDto};
use crate::features::issues::models::{Issue, IssueDraft, IssuePatch, IssueStatus};
use crate::features::session::models::Identity;
use crate::modules::backend::{Backend, EntityGateway, TableKind};
use crate::shared::collection::{RemoteCollection, WatchHandle};

/// Store for reported issues.
///
/// Cached collection over the issues table plus the report/triage
/// operations around it. Triage mutations (status, fields, delete) are
/// restricted to triaging roles and leave an audit trail.
pub struct IssueService {
    backend: Arc<dyn Backend>,
    storage: StorageConfig,
    collection: Arc<RemoteCollection<Issue>>,
}

impl IssueService {
    pub fn new<B: Backend + 'static>(backend: Arc<B>, storage: StorageConfig) -> Self {
        let gateway: Arc<dyn EntityGateway<Issue>> = backend.clone();
        Self {
            backend,
            storage,
            collection: Arc::new(RemoteCollection::new(gateway)),
        }
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.collection.items()
    }

    pub fn get(&self, id: Uuid) -> Option<Issue> {
        self.collection.get(id)
    }

    pub fn is_loading(&self) -> bool {
        self.collection.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.collection.error()
    }

    pub async fn fetch_all(&self) -> Result<()> {
        self.collection.fetch_all().await
    }

    /// Report a new issue.
    ///
    /// A pending photo is uploaded to blob storage first and its public
    /// URL substituted into the draft; the record itself is created
    /// through the validated server procedure, so id, owner and
    /// timestamp are authoritative. On failure the error re-throws so
    /// the form can keep the user's input for retry.
    pub async fn report(&self, dto: ReportIssueDto, author: &Identity) -> Result<Issue> {
        dto.validate()?;

        let image_url = match dto.image {
            Some(image) => {
                let key = self.storage.issue_image_key(&image.file_name);
                self.backend.upload(&key, image.bytes).await?;
                Some(self.backend.public_url(&key))
            }
            None => None,
        };

        let issue = self
            .collection
            .create(IssueDraft {
                author_id: author.id,
                category: dto.category,
                description: dto.description,
                latitude: dto.latitude,
                longitude: dto.longitude,
                image_url,
            })
            .await?;
        tracing::info!("Reported issue {} by identity {}", issue.id, author.id);
        Ok(issue)
    }

    /// Move an issue to a new status. Transitions are free; any status
    /// may follow any other.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: IssueStatus,
        actor: &Identity,
    ) -> Result<()> {
        self.require_triage(actor)?;
        let previous = self
            .collection
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", id)))?;

        self.collection
            .update(
                id,
                IssuePatch {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;

        self.append_audit(id, "status", previous.status.to_string(), status.to_string(), actor)
            .await;
        Ok(())
    }

    /// Edit issue fields. One audit entry per changed field.
    pub async fn update_fields(&self, id: Uuid, dto: UpdateIssueDto, actor: &Identity) -> Result<()> {
        self.require_triage(actor)?;
        dto.validate()?;
        let previous = self
            .collection
            .get(id)
            .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", id)))?;

        let patch = IssuePatch {
            status: dto.status,
            category: dto.category,
            description: dto.description,
        };
        self.collection.update(id, patch.clone()).await?;

        if let Some(status) = patch.status {
            self.append_audit(id, "status", previous.status.to_string(), status.to_string(), actor)
                .await;
        }
        if let Some(category) = patch.category {
            self.append_audit(
                id,
                "category",
                previous.category.to_string(),
                category.to_string(),
                actor,
            )
            .await;
        }
        if let Some(ref description) = patch.description {
            self.append_audit(
                id,
                "description",
                previous.description.clone(),
                description.clone(),
                actor,
            )
            .await;
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid, actor: &Identity) -> Result<()> {
        self.require_triage(actor)?;
        self.collection.delete(id).await?;
        tracing::info!("Deleted issue {} by identity {}", id, actor.id);
        Ok(())
    }

    /// Passive refresh for the lifetime of the owning view. The handle
    /// must be unsubscribed on teardown.
    pub fn watch(&self) -> WatchHandle {
        self.collection
            .watch(self.backend.subscribe(TableKind::Issues))
    }

    fn require_triage(&self, actor: &Identity) -> Result<()> {
        if actor.role.can_triage() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only institutional accounts may triage issues".to_string(),
            ))
        }
    }

    /// Best effort: a failed audit write never rolls back the confirmed
    /// primary mutation.
    async fn append_audit(
        &self,
        issue_id: Uuid,
        field: &str,
        old_value: String,
        new_value: String,
        actor: &Identity,
    ) {
        let draft = AuditDraft {
            issue_id,
            field: field.to_string(),
            old_value,
            new_value,
            actor_id: actor.id,
        };
        if let Err(e) = EntityGateway::<AuditEntry>::insert(&*self.backend, draft).await {
            tracing::warn!("Failed to append audit entry for issue {}: {}", issue_id, e);
        }
    }
}
