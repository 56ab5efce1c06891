use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::comments::dtos::PostCommentDto;
use crate::features::comments::models::{Comment, CommentDraft};
use crate::features::session::models::Identity;
use crate::features::session::services::SessionService;
use crate::modules::backend::{Backend, EntityGateway, TableKind};
use crate::shared::collection::{RemoteCollection, WatchHandle};
use crate::shared::constants::XP_FOR_COMMENT;

/// Store for issue comments.
pub struct CommentService {
    backend: Arc<dyn Backend>,
    session: Arc<SessionService>,
    collection: Arc<RemoteCollection<Comment>>,
}

impl CommentService {
    pub fn new<B: Backend + 'static>(backend: Arc<B>, session: Arc<SessionService>) -> Self {
        let gateway: Arc<dyn EntityGateway<Comment>> = backend.clone();
        Self {
            backend,
            session,
            collection: Arc::new(RemoteCollection::new(gateway)),
        }
    }

    pub fn comments(&self) -> Vec<Comment> {
        self.collection.items()
    }

    /// Cached comments for one issue, newest first.
    pub fn for_issue(&self, issue_id: Uuid) -> Vec<Comment> {
        self.collection
            .items()
            .into_iter()
            .filter(|c| c.issue_id == issue_id)
            .collect()
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

    /// Post a comment and award engagement XP to the author.
    ///
    /// The XP award is a best-effort side channel: its failure is logged
    /// and does not fail the comment.
    pub async fn post(&self, dto: PostCommentDto, author: &Identity) -> Result<Comment> {
        dto.validate()?;
        let comment = self
            .collection
            .create(CommentDraft {
                issue_id: dto.issue_id,
                author_id: author.id,
                content: dto.content,
            })
            .await?;
        tracing::info!("Posted comment {} on issue {}", comment.id, comment.issue_id);

        if let Err(e) = self.session.award_xp(author.id, XP_FOR_COMMENT).await {
            tracing::warn!("XP award for comment {} failed: {}", comment.id, e);
        }
        Ok(comment)
    }

    pub async fn delete(&self, id: Uuid, actor: &Identity) -> Result<()> {
        if !actor.role.can_triage() {
            return Err(AppError::Forbidden(
                "Only institutional accounts may delete comments".to_string(),
            ));
        }
        self.collection.delete(id).await
    }

    /// Passive refresh for the lifetime of the owning view.
    pub fn watch(&self) -> WatchHandle {
        self.collection
            .watch(self.backend.subscribe(TableKind::Comments))
    }
}
