//! Capability traits for the hosted backend service
//!
//! The client core never talks to a database or wire protocol directly;
//! everything goes through these seams. Production wires an HTTP client,
//! tests and local development wire [`super::memory::MemoryBackend`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::session::models::{Identity, NewIdentity};

use super::changes::{ChangeSubscription, TableKind};

/// A record kind synchronized through a remote-backed collection.
pub trait RemoteRecord: Clone + Send + Sync + 'static {
    type Id: Copy + PartialEq + Send + Sync + std::fmt::Display;
    /// Insert payload handed to the server-side validated procedure
    type Draft: Send + Sync + 'static;
    /// Partial update merged into the cached record after a confirmed write
    type Patch: Clone + Send + Sync + 'static;

    const TABLE: TableKind;

    fn id(&self) -> Self::Id;

    /// Merge a confirmed patch into this record in place.
    fn apply(&mut self, patch: &Self::Patch);
}

/// Identity operations on the hosted auth service
#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity>;

    async fn register(&self, data: NewIdentity) -> Result<Identity>;

    /// Restore a previously persisted session, if any.
    async fn restore_session(&self) -> Result<Option<Identity>>;

    async fn sign_out(&self) -> Result<()>;

    /// Persist XP and level together. Both fields land atomically or
    /// not at all.
    async fn update_xp(&self, identity_id: i64, xp: i64, level: i64) -> Result<()>;

    async fn identity_by_id(&self, identity_id: i64) -> Result<Identity>;

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>>;
}

/// CRUD over one record kind, backed by server-side validated procedures.
#[async_trait]
pub trait EntityGateway<R: RemoteRecord>: Send + Sync {
    /// Full collection, newest first, with denormalized display fields
    /// (e.g. author name) joined in.
    async fn list(&self) -> Result<Vec<R>>;

    /// Insert through the validated procedure. Server-assigned fields
    /// (id, timestamps) are authoritative; the returned record is re-read
    /// with denormalized fields.
    async fn insert(&self, draft: R::Draft) -> Result<R>;

    async fn update(&self, id: R::Id, patch: R::Patch) -> Result<()>;

    async fn delete(&self, id: R::Id) -> Result<()>;
}

/// Authoritative result of the atomic like toggle procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub count: i64,
    pub liked: bool,
}

/// Like relation operations. The toggle is a single server-side atomic
/// procedure so two tabs or a rapid double-click cannot race a
/// check-then-act sequence on the client.
#[async_trait]
pub trait LikeApi: Send + Sync {
    async fn toggle_like(&self, issue_id: Uuid, identity_id: i64) -> Result<LikeState>;

    /// Current count for an issue, and whether `viewer` has liked it.
    async fn like_state(&self, issue_id: Uuid, viewer: Option<i64>) -> Result<LikeState>;
}

/// Blob storage for issue photos
#[async_trait]
pub trait BlobStorage: Send + Sync {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    fn public_url(&self, key: &str) -> String;
}

/// Realtime change feed over the backing tables
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, table: TableKind) -> ChangeSubscription;
}

/// Umbrella over every capability group the core consumes, so stores can
/// hold a single `Arc<dyn Backend>`.
pub trait Backend:
    IdentityApi
    + EntityGateway<crate::features::issues::models::Issue>
    + EntityGateway<crate::features::comments::models::Comment>
    + EntityGateway<crate::features::audit::models::AuditEntry>
    + LikeApi
    + BlobStorage
    + ChangeFeed
{
}

impl<T> Backend for T where
    T: IdentityApi
        + EntityGateway<crate::features::issues::models::Issue>
        + EntityGateway<crate::features::comments::models::Comment>
        + EntityGateway<crate::features::audit::models::AuditEntry>
        + LikeApi
        + BlobStorage
        + ChangeFeed
{
}
