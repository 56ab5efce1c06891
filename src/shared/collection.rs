//! Remote-backed collection
//!
//! One generic reconciliation core shared by every entity store: an
//! in-memory cache synchronized with the hosted service. Local state is
//! only mutated after the server confirms a write, a failed refetch keeps
//! stale-but-present data, and a monotonically increasing fetch token
//! discards out-of-order responses so a slow stale refetch cannot
//! overwrite a newer cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::task::JoinHandle;

use crate::core::error::Result;
use crate::modules::backend::{ChangeSubscription, EntityGateway, RemoteRecord};

struct CollectionState<R> {
    items: Vec<R>,
    loading: bool,
    error: Option<String>,
    /// Fetch token of the last applied `fetch_all` response
    last_applied: u64,
}

pub struct RemoteCollection<R: RemoteRecord> {
    gateway: Arc<dyn EntityGateway<R>>,
    state: RwLock<CollectionState<R>>,
    fetch_seq: AtomicU64,
}

impl<R: RemoteRecord> RemoteCollection<R> {
    pub fn new(gateway: Arc<dyn EntityGateway<R>>) -> Self {
        Self {
            gateway,
            state: RwLock::new(CollectionState {
                items: Vec::new(),
                loading: false,
                error: None,
                last_applied: 0,
            }),
            fetch_seq: AtomicU64::new(0),
        }
    }

    /// Snapshot of the cached collection, newest first.
    pub fn items(&self) -> Vec<R> {
        self.state.read().unwrap().items.clone()
    }

    pub fn get(&self, id: R::Id) -> Option<R> {
        self.state
            .read()
            .unwrap()
            .items
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().unwrap().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().unwrap().error.clone()
    }

    /// Replace the cache wholesale from the service.
    ///
    /// On failure the previous cache is kept and the error recorded; the
    /// loading flag is cleared on every path.
    pub async fn fetch_all(&self) -> Result<()> {
        let token = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.write().unwrap();
            state.loading = true;
            state.error = None;
        }

        let fetched = self.gateway.list().await;

        let mut state = self.state.write().unwrap();
        state.loading = false;
        match fetched {
            Ok(items) => {
                if token > state.last_applied {
                    state.last_applied = token;
                    state.items = items;
                } else {
                    tracing::debug!(
                        "Discarding stale {} fetch response (token {} <= {})",
                        R::TABLE,
                        token,
                        state.last_applied
                    );
                }
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to fetch {}: {}", R::TABLE, e);
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Insert through the server-side validated procedure; the returned
    /// record is prepended to the cache. On failure the error is recorded
    /// and re-thrown so the calling form can keep the user's input.
    pub async fn create(&self, draft: R::Draft) -> Result<R> {
        match self.gateway.insert(draft).await {
            Ok(record) => {
                let mut state = self.state.write().unwrap();
                state.error = None;
                state.items.insert(0, record.clone());
                Ok(record)
            }
            Err(e) => {
                tracing::error!("Failed to create {} record: {}", R::TABLE, e);
                self.state.write().unwrap().error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Patch a record; the cached copy is merged in place only after the
    /// server write succeeds, never before.
    pub async fn update(&self, id: R::Id, patch: R::Patch) -> Result<()> {
        if let Err(e) = self.gateway.update(id, patch.clone()).await {
            tracing::error!("Failed to update {} {}: {}", R::TABLE, id, e);
            self.state.write().unwrap().error = Some(e.to_string());
            return Err(e);
        }

        let mut state = self.state.write().unwrap();
        state.error = None;
        if let Some(item) = state.items.iter_mut().find(|item| item.id() == id) {
            item.apply(&patch);
        }
        Ok(())
    }

    /// Remove from the service first, then from the cache on success only.
    pub async fn delete(&self, id: R::Id) -> Result<()> {
        if let Err(e) = self.gateway.delete(id).await {
            tracing::error!("Failed to delete {} {}: {}", R::TABLE, id, e);
            self.state.write().unwrap().error = Some(e.to_string());
            return Err(e);
        }

        let mut state = self.state.write().unwrap();
        state.error = None;
        state.items.retain(|item| item.id() != id);
        Ok(())
    }

    /// Passive refresh: refetch the whole collection on every change feed
    /// event until the returned handle is unsubscribed. Deliberately
    /// coarse (refetch-everything rather than patch-in-place).
    pub fn watch(self: &Arc<Self>, subscription: ChangeSubscription) -> WatchHandle {
        let subscription = Arc::new(subscription);
        let collection = Arc::clone(self);
        let feed = Arc::clone(&subscription);

        let task = tokio::spawn(async move {
            while let Some(event) = feed.next().await {
                tracing::debug!("Change on {}: {:?}, refetching", event.table, event.kind);
                if let Err(e) = collection.fetch_all().await {
                    // Error already recorded on the collection; refetch
                    // again on the next event
                    tracing::warn!("Passive refresh of {} failed: {}", R::TABLE, e);
                }
            }
        });

        WatchHandle::new(subscription, task)
    }
}

/// Handle pairing a change feed subscription with its refetch task.
/// Every `watch` must be matched by one `unsubscribe` on view teardown;
/// extra calls are no-ops, and dropping the handle unsubscribes too.
pub struct WatchHandle {
    subscription: Arc<ChangeSubscription>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl WatchHandle {
    pub(crate) fn new(subscription: Arc<ChangeSubscription>, task: JoinHandle<()>) -> Self {
        Self {
            subscription,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn unsubscribe(&self) {
        self.subscription.unsubscribe();
        // The task drains on its own once the subscription closes; drop
        // our handle to it so repeated calls stay cheap
        let _ = self.task.lock().unwrap().take();
    }

    pub fn is_active(&self) -> bool {
        !self.subscription.is_closed()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::core::error::AppError;
    use crate::modules::backend::TableKind;

    #[derive(Debug, Clone, PartialEq)]
    struct Marker {
        id: Uuid,
        label: String,
    }

    #[derive(Debug, Clone)]
    struct MarkerPatch {
        label: String,
    }

    impl RemoteRecord for Marker {
        type Id = Uuid;
        type Draft = String;
        type Patch = MarkerPatch;

        const TABLE: TableKind = TableKind::Issues;

        fn id(&self) -> Uuid {
            self.id
        }

        fn apply(&mut self, patch: &MarkerPatch) {
            self.label = patch.label.clone();
        }
    }

    /// Gateway whose `list` responses resolve in a scripted order.
    struct ScriptedGateway {
        pending: Mutex<VecDeque<tokio::sync::oneshot::Receiver<Result<Vec<Marker>>>>>,
    }

    impl ScriptedGateway {
        fn with_scripts(n: usize) -> (Arc<Self>, Vec<tokio::sync::oneshot::Sender<Result<Vec<Marker>>>>) {
            let mut senders = Vec::new();
            let mut receivers = VecDeque::new();
            for _ in 0..n {
                let (tx, rx) = tokio::sync::oneshot::channel();
                senders.push(tx);
                receivers.push_back(rx);
            }
            (
                Arc::new(Self {
                    pending: Mutex::new(receivers),
                }),
                senders,
            )
        }
    }

    #[async_trait]
    impl EntityGateway<Marker> for ScriptedGateway {
        async fn list(&self) -> Result<Vec<Marker>> {
            let rx = self
                .pending
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted list call");
            rx.await
                .map_err(|_| AppError::ExternalService("script dropped".to_string()))?
        }

        async fn insert(&self, draft: String) -> Result<Marker> {
            Ok(Marker {
                id: Uuid::now_v7(),
                label: draft,
            })
        }

        async fn update(&self, _id: Uuid, _patch: MarkerPatch) -> Result<()> {
            Ok(())
        }

        async fn delete(&self, _id: Uuid) -> Result<()> {
            Ok(())
        }
    }

    fn marker(label: &str) -> Marker {
        Marker {
            id: Uuid::now_v7(),
            label: label.to_string(),
        }
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_cache() {
        let (gateway, mut scripts) = ScriptedGateway::with_scripts(2);
        let gateway: Arc<dyn EntityGateway<Marker>> = gateway;
        let collection = RemoteCollection::new(gateway);

        let a = marker("A");
        let b = marker("B");
        scripts
            .remove(0)
            .send(Ok(vec![a.clone(), b.clone()]))
            .unwrap();
        collection.fetch_all().await.unwrap();
        assert_eq!(collection.items(), vec![a.clone(), b.clone()]);

        scripts
            .remove(0)
            .send(Err(AppError::ExternalService("offline".to_string())))
            .unwrap();
        assert!(collection.fetch_all().await.is_err());

        assert_eq!(collection.items(), vec![a, b]);
        assert!(collection.error().is_some());
        assert!(!collection.is_loading());
    }

    #[tokio::test]
    async fn test_stale_fetch_response_is_discarded() {
        let (gateway, mut scripts) = ScriptedGateway::with_scripts(2);
        let gateway: Arc<dyn EntityGateway<Marker>> = gateway;
        let collection = Arc::new(RemoteCollection::new(gateway));

        let older = marker("stale");
        let newer = marker("fresh");

        let first = {
            let collection = collection.clone();
            tokio::spawn(async move { collection.fetch_all().await })
        };
        // Make sure the first fetch has claimed its token
        tokio::task::yield_now().await;
        let second = {
            let collection = collection.clone();
            tokio::spawn(async move { collection.fetch_all().await })
        };

        // Resolve the newer request first, then let the older response land
        let second_script = scripts.pop().unwrap();
        let first_script = scripts.pop().unwrap();
        second_script.send(Ok(vec![newer.clone()])).unwrap();
        second.await.unwrap().unwrap();
        first_script.send(Ok(vec![older])).unwrap();
        first.await.unwrap().unwrap();

        // Last-started fetch wins regardless of resolution order
        assert_eq!(collection.items(), vec![newer]);
    }

    #[tokio::test]
    async fn test_create_prepends_and_update_merges() {
        let (gateway, _scripts) = ScriptedGateway::with_scripts(0);
        let gateway: Arc<dyn EntityGateway<Marker>> = gateway;
        let collection = RemoteCollection::new(gateway);

        let first = collection.create("first".to_string()).await.unwrap();
        let second = collection.create("second".to_string()).await.unwrap();
        assert_eq!(collection.items()[0], second);
        assert_eq!(collection.items()[1], first);

        collection
            .update(
                first.id,
                MarkerPatch {
                    label: "renamed".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(collection.get(first.id).unwrap().label, "renamed");

        collection.delete(second.id).await.unwrap();
        assert_eq!(collection.items().len(), 1);
    }
}
