//! Subscriber lists for session events.
//!
//! Each event kind keeps its own ordered list of callbacks. Subscribing returns
//! a [`SubscriptionId`] that can later be passed to `unsubscribe`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Handle returned by a subscription, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SubscriptionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

type Callback<T> = Box<dyn FnMut(&T)>;

/// Ordered callbacks for one event kind.
pub struct Subscribers<T: ?Sized> {
    callbacks: Vec<(SubscriptionId, Callback<T>)>,
}

impl<T: ?Sized> Default for Subscribers<T> {
    fn default() -> Self {
        Self { callbacks: Vec::new() }
    }
}

impl<T: ?Sized> std::fmt::Debug for Subscribers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers").field("count", &self.callbacks.len()).finish()
    }
}

impl<T: ?Sized> Subscribers<T> {
    pub fn subscribe(&mut self, callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if `id` was not subscribed here.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    /// Call every subscriber in subscription order.
    pub fn notify(&mut self, event: &T) {
        for (_, callback) in &mut self.callbacks {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}
