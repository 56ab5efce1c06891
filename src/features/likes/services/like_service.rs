use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use futures::future::join_all;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::session::models::Identity;
use crate::features::session::services::SessionService;
use crate::modules::backend::{Backend, LikeState, TableKind};
use crate::shared::collection::WatchHandle;
use crate::shared::constants::XP_FOR_LIKE;

/// Store for like counts and membership, keyed per issue.
///
/// There is no client-side check-then-act: the toggle goes through a
/// single atomic server procedure and local state is set directly from
/// the authoritative `(count, liked)` it returns.
pub struct LikeService {
    backend: Arc<dyn Backend>,
    session: Arc<SessionService>,
    states: RwLock<HashMap<Uuid, LikeState>>,
}

impl LikeService {
    pub fn new<B: Backend + 'static>(backend: Arc<B>, session: Arc<SessionService>) -> Self {
        Self {
            backend,
            session,
            states: RwLock::new(HashMap::new()),
        }
    }

    pub fn state_for(&self, issue_id: Uuid) -> Option<LikeState> {
        self.states.read().unwrap().get(&issue_id).copied()
    }

    /// Toggle the actor's like on an issue. A successful like (not an
    /// unlike) awards engagement XP, best-effort.
    pub async fn toggle(&self, issue_id: Uuid, actor: &Identity) -> Result<LikeState> {
        let state = self.backend.toggle_like(issue_id, actor.id).await?;
        self.states.write().unwrap().insert(issue_id, state);

        if state.liked {
            if let Err(e) = self.session.award_xp(actor.id, XP_FOR_LIKE).await {
                tracing::warn!("XP award for liking issue {} failed: {}", issue_id, e);
            }
        }
        Ok(state)
    }

    /// Fetch counts for many issues in parallel. Each response writes to
    /// its own key, so ordering between issues does not matter; a failed
    /// fetch leaves that key's previous state in place.
    pub async fn fetch_states(&self, issue_ids: &[Uuid]) -> Result<()> {
        let viewer = self.session.current().map(|identity| identity.id);

        let fetches = issue_ids.iter().map(|&issue_id| async move {
            (issue_id, self.backend.like_state(issue_id, viewer).await)
        });

        for (issue_id, fetched) in join_all(fetches).await {
            match fetched {
                Ok(state) => {
                    self.states.write().unwrap().insert(issue_id, state);
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch like state for issue {}: {}", issue_id, e);
                }
            }
        }
        Ok(())
    }

    /// Passive refresh: re-fetch every cached key when the likes table
    /// changes (another client toggled).
    pub fn watch(self: &Arc<Self>) -> WatchHandle {
        let subscription = Arc::new(self.backend.subscribe(TableKind::Likes));
        let feed = Arc::clone(&subscription);
        let service = Arc::clone(self);

        let task = tokio::spawn(async move {
            while feed.next().await.is_some() {
                let cached: Vec<Uuid> = service.states.read().unwrap().keys().copied().collect();
                if let Err(e) = service.fetch_states(&cached).await {
                    tracing::warn!("Passive like refresh failed: {}", e);
                }
            }
        });

        WatchHandle::new(subscription, task)
    }
}
