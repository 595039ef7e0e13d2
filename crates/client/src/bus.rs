//! The "tasks changed" notification channel.
//!
//! An injectable pub/sub handle: clones share one listener registry, so the
//! facade can hand the same bus to every board while tests substitute their
//! own instance. `emit` carries no payload and fans out synchronously; a
//! listener that panics is logged and the remaining listeners still run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, Listener>>,
}

#[derive(Clone, Default)]
pub struct TaskChangeBus {
    inner: Arc<BusInner>,
}

/// Guard for one subscription; dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl TaskChangeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.insert(id, Arc::new(callback));
        }
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Notify every subscriber. Fan-out is synchronous; the registry lock is
    /// released before any callback runs so listeners may subscribe or
    /// unsubscribe freely.
    pub fn emit(&self) {
        let snapshot: Vec<(u64, Listener)> = match self.inner.listeners.lock() {
            Ok(listeners) => listeners.iter().map(|(id, l)| (*id, l.clone())).collect(),
            Err(_) => return,
        };

        for (id, listener) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                log::error!("tasks-changed listener {id} panicked; continuing fan-out");
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .map(|listeners| listeners.len())
            .unwrap_or(0)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            if let Ok(mut listeners) = inner.listeners.lock() {
                listeners.remove(&self.id);
            }
        }
    }
}
