//! Realtime change feed types
//!
//! The hosted service pushes row-level change notifications per table.
//! Stores subscribe for the lifetime of the owning view and must
//! unsubscribe on teardown; `unsubscribe` is idempotent.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Notify};

/// Backing tables exposed on the change feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Identities,
    Issues,
    Likes,
    Comments,
    AuditLog,
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableKind::Identities => write!(f, "identities"),
            TableKind::Issues => write!(f, "issues"),
            TableKind::Likes => write!(f, "likes"),
            TableKind::Comments => write!(f, "comments"),
            TableKind::AuditLog => write!(f, "audit_log"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row-level change notification
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub table: TableKind,
    pub kind: ChangeKind,
    /// Raw record payload as sent by the service, when available
    pub record: Option<serde_json::Value>,
}

/// Handle for one table subscription on the change feed.
///
/// `next()` yields events for the subscribed table until `unsubscribe()`
/// is called or the feed closes.
pub struct ChangeSubscription {
    table: TableKind,
    rx: tokio::sync::Mutex<broadcast::Receiver<ChangeEvent>>,
    closed: AtomicBool,
    notify: Notify,
}

impl ChangeSubscription {
    pub fn new(table: TableKind, rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self {
            table,
            rx: tokio::sync::Mutex::new(rx),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn table(&self) -> TableKind {
        self.table
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait for the next event on the subscribed table.
    ///
    /// Returns `None` once unsubscribed or when the feed shuts down.
    /// Lagged events are skipped; the caller refetches wholesale anyway.
    pub async fn next(&self) -> Option<ChangeEvent> {
        loop {
            if self.is_closed() {
                return None;
            }

            let mut rx = self.rx.lock().await;
            tokio::select! {
                _ = self.notify.notified() => return None,
                received = rx.recv() => match received {
                    Ok(event) if event.table == self.table => return Some(event),
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!("Change feed lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }

    /// Stop receiving events. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // notify_one stores a permit, so a wake issued before next()
            // registers its waiter is not lost
            self.notify.notify_one();
        }
    }
}
