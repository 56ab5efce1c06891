//! Client core for the Ndreqe civic issue reporting app.
//!
//! Citizens post geotagged issue reports onto a map, other users like
//! and comment, and institutional accounts triage. This crate is the
//! state layer under that UI: session and identity, the gamification
//! ledger and its notification bus, and remote-backed entity stores
//! synchronized with a hosted backend service behind the capability
//! traits in [`modules::backend`].

pub mod core;
pub mod features;
pub mod modules;
pub mod shared;

use std::sync::Arc;

use crate::core::config::Config;
use crate::features::comments::CommentService;
use crate::features::gamification::NotificationBus;
use crate::features::issues::IssueService;
use crate::features::likes::LikeService;
use crate::features::session::SessionService;
use crate::modules::backend::{Backend, MemoryBackend};

/// Application context: one instance per application root, passed to
/// views explicitly. There is no process-wide mutable singleton; the
/// stores share the backend and the notification bus through this
/// struct.
pub struct App {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub bus: Arc<NotificationBus>,
    pub session: Arc<SessionService>,
    pub issues: Arc<IssueService>,
    pub comments: Arc<CommentService>,
    pub likes: Arc<LikeService>,
}

impl App {
    pub fn new<B: Backend + 'static>(backend: Arc<B>, config: Config) -> Self {
        let bus = Arc::new(NotificationBus::new());
        let session = Arc::new(SessionService::new(backend.clone(), bus.clone()));
        let issues = Arc::new(IssueService::new(backend.clone(), config.storage.clone()));
        let comments = Arc::new(CommentService::new(backend.clone(), session.clone()));
        let likes = Arc::new(LikeService::new(backend.clone(), session.clone()));

        Self {
            config,
            backend,
            bus,
            session,
            issues,
            comments,
            likes,
        }
    }

    /// Context backed by the in-memory service, for tests and local
    /// development.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()), Config::default())
    }
}
