//! Notification bus
//!
//! Typed publish/subscribe channels decoupling XP mutation from whatever
//! UI wants to react to it (popups, header badges). Two channels:
//! level-up and xp-change. Delivery is synchronous, in registration
//! order, against a snapshot of the listener list taken at publish time.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use rand::seq::SliceRandom;

use crate::shared::constants::{LEVEL_UP_MESSAGES, XP_MESSAGES};

/// Payload for the level-up channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelUpEvent {
    pub level: i64,
    pub message: String,
}

/// Payload for the xp-change channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpChangeEvent {
    pub xp: i64,
    pub message: String,
}

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ListenerList<T> = Arc<Mutex<Vec<(u64, Listener<T>)>>>;

/// Capability returned by a subscribe call. Removes exactly the listener
/// it was created for; `unsubscribe` is idempotent and safe to call after
/// the bus has delivered further events.
pub struct Subscription {
    cancel: Box<dyn Fn() + Send + Sync>,
    done: AtomicBool,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if !self.done.swap(true, Ordering::SeqCst) {
            (self.cancel)();
        }
    }
}

struct EventChannel<T> {
    listeners: ListenerList<T>,
}

impl<T: 'static> EventChannel<T> {
    fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn subscribe(&self, id: u64, listener: Listener<T>) -> Subscription {
        self.listeners.lock().unwrap().push((id, listener));

        let slot: Weak<Mutex<Vec<(u64, Listener<T>)>>> = Arc::downgrade(&self.listeners);
        Subscription {
            cancel: Box::new(move || {
                if let Some(listeners) = slot.upgrade() {
                    listeners.lock().unwrap().retain(|(lid, _)| *lid != id);
                }
            }),
            done: AtomicBool::new(false),
        }
    }

    fn publish(&self, event: &T) {
        // Snapshot: listeners added during delivery do not see this event
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in snapshot {
            // One misbehaving listener must not starve the rest
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::warn!("Notification listener panicked during delivery");
            }
        }
    }
}

/// Process-wide bus instance. Constructed once per application root and
/// passed around explicitly; there is no hidden global.
pub struct NotificationBus {
    next_id: AtomicU64,
    level_up: EventChannel<LevelUpEvent>,
    xp_change: EventChannel<XpChangeEvent>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            level_up: EventChannel::new(),
            xp_change: EventChannel::new(),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn on_level_up<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LevelUpEvent) + Send + Sync + 'static,
    {
        self.level_up.subscribe(self.next_id(), Arc::new(listener))
    }

    pub fn on_xp_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&XpChangeEvent) + Send + Sync + 'static,
    {
        self.xp_change.subscribe(self.next_id(), Arc::new(listener))
    }

    /// Publish a level-up with a freshly drawn motivational message.
    pub fn publish_level_up(&self, level: i64) {
        let event = LevelUpEvent {
            level,
            message: draw_message(LEVEL_UP_MESSAGES),
        };
        tracing::debug!("Publishing level-up: level={}", level);
        self.level_up.publish(&event);
    }

    /// Publish an xp-change with a freshly drawn motivational message.
    pub fn publish_xp_change(&self, xp: i64) {
        let event = XpChangeEvent {
            xp,
            message: draw_message(XP_MESSAGES),
        };
        tracing::debug!("Publishing xp-change: xp={}", xp);
        self.xp_change.publish(&event);
    }
}

/// Independent draw per event; repeats across a session are fine.
fn draw_message(pool: &[&str]) -> String {
    pool.choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> (Arc<Mutex<Vec<i64>>>, Arc<Mutex<Vec<i64>>>) {
        (Arc::new(Mutex::new(Vec::new())), Arc::new(Mutex::new(Vec::new())))
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = NotificationBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = order.clone();
        let _a = bus.on_xp_change(move |_| first.lock().unwrap().push("a"));
        let second = order.clone();
        let _b = bus.on_xp_change(move |_| second.lock().unwrap().push("b"));
        let third = order.clone();
        let _c = bus.on_xp_change(move |_| third.lock().unwrap().push("c"));

        bus.publish_xp_change(10);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_each_listener_receives_exactly_once() {
        let bus = NotificationBus::new();
        let (seen, _) = collector();

        let sink = seen.clone();
        let _sub = bus.on_level_up(move |event| sink.lock().unwrap().push(event.level));

        bus.publish_level_up(2);
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_unsubscribe_excludes_future_publishes_only() {
        let bus = NotificationBus::new();
        let (seen, other) = collector();

        let sink = seen.clone();
        let sub = bus.on_xp_change(move |event| sink.lock().unwrap().push(event.xp));
        let sink = other.clone();
        let _keep = bus.on_xp_change(move |event| sink.lock().unwrap().push(event.xp));

        bus.publish_xp_change(5);
        sub.unsubscribe();
        bus.publish_xp_change(10);

        assert_eq!(*seen.lock().unwrap(), vec![5]);
        assert_eq!(*other.lock().unwrap(), vec![5, 10]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus = NotificationBus::new();
        let (seen, _) = collector();

        let sink = seen.clone();
        let sub = bus.on_xp_change(move |event| sink.lock().unwrap().push(event.xp));

        sub.unsubscribe();
        bus.publish_xp_change(1);
        sub.unsubscribe();
        bus.publish_xp_change(2);

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_listener_added_during_delivery_misses_inflight_event() {
        let bus = Arc::new(NotificationBus::new());
        let (seen, _) = collector();

        let registered: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));
        let inner_bus = bus.clone();
        let inner_seen = seen.clone();
        let inner_subs = registered.clone();
        let _outer = bus.on_xp_change(move |_| {
            let sink = inner_seen.clone();
            let sub = inner_bus.on_xp_change(move |event| sink.lock().unwrap().push(event.xp));
            inner_subs.lock().unwrap().push(sub);
        });

        bus.publish_xp_change(7);
        // New listener must not have seen the event that registered it
        assert!(seen.lock().unwrap().is_empty());

        bus.publish_xp_change(9);
        assert_eq!(*seen.lock().unwrap(), vec![9]);
    }

    #[test]
    fn test_panicking_listener_does_not_block_later_listeners() {
        let bus = NotificationBus::new();
        let (seen, _) = collector();

        let _bad = bus.on_level_up(|_| panic!("listener bug"));
        let sink = seen.clone();
        let _good = bus.on_level_up(move |event| sink.lock().unwrap().push(event.level));

        bus.publish_level_up(3);
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_message_drawn_from_pool() {
        let bus = NotificationBus::new();
        let messages = Arc::new(Mutex::new(Vec::new()));

        let sink = messages.clone();
        let _sub = bus.on_level_up(move |event| sink.lock().unwrap().push(event.message.clone()));

        for _ in 0..10 {
            bus.publish_level_up(2);
        }
        for message in messages.lock().unwrap().iter() {
            assert!(LEVEL_UP_MESSAGES.contains(&message.as_str()));
        }
    }
}
