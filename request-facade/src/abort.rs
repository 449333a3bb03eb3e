use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

#[derive(Debug, Default)]
struct SignalState {
    aborted: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation signal shared by every request registered under
/// the same abort key. Firing it never unwinds a request by itself; the
/// holder has to observe it.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    state: Arc<SignalState>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        if !self.state.aborted.swap(true, Ordering::SeqCst) {
            self.state.notify.notify_waiters();
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.state.aborted.load(Ordering::SeqCst)
    }

    /// Completes once the signal has fired, immediately if it already has.
    pub async fn aborted(&self) {
        loop {
            // Register interest before checking the flag so a concurrent
            // `abort` between the check and the await is not lost.
            let notified = self.state.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }

    /// Whether both handles observe the same underlying signal.
    pub fn same_as(&self, other: &AbortSignal) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

#[derive(Debug)]
struct AbortEntry {
    signal: AbortSignal,
    count: usize,
}

/// Reference-counted map from abort key to a shared [`AbortSignal`].
///
/// Every `register` must be paired with one `release`; `force_cancel` drops
/// the entry regardless of how many holders are left and fires the signal.
#[derive(Debug, Default)]
pub struct AbortRegistry {
    records: DashMap<String, AbortEntry>,
}

impl AbortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh key for an ad-hoc cancellation group.
    pub fn new_key() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn register(&self, key: &str) -> AbortSignal {
        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let entry = entry.get_mut();
                entry.count += 1;
                log::debug!("Abort key {} now held by {} requests", key, entry.count);
                entry.signal.clone()
            }
            Entry::Vacant(entry) => {
                let signal = AbortSignal::new();
                entry.insert(AbortEntry {
                    signal: signal.clone(),
                    count: 1,
                });
                log::debug!("Registered abort key {}", key);
                signal
            }
        }
    }

    pub fn release(&self, key: &str) {
        self.release_if(key, |_| true);
    }

    /// Like [`release`](Self::release), but only when the entry still holds
    /// `signal`. A holder whose key was force-cancelled and then registered
    /// again by someone else must not release the newer entry.
    pub fn release_holder(&self, key: &str, signal: &AbortSignal) {
        self.release_if(key, |entry| entry.signal.same_as(signal));
    }

    fn release_if(&self, key: &str, holds: impl FnOnce(&AbortEntry) -> bool) {
        if let Entry::Occupied(mut entry) = self.records.entry(key.to_string()) {
            if !holds(entry.get()) {
                return;
            }
            let record = entry.get_mut();
            record.count = record.count.saturating_sub(1);
            if record.count == 0 {
                entry.remove();
                log::debug!("Released last holder of abort key {}", key);
            }
        }
    }

    /// Fires the signal for `key` and forgets the entry. Returns whether an
    /// entry existed.
    pub fn force_cancel(&self, key: &str) -> bool {
        match self.records.remove(key) {
            Some((_, entry)) => {
                log::debug!(
                    "Force-cancelling abort key {} with {} holders",
                    key,
                    entry.count
                );
                entry.signal.abort();
                true
            }
            None => false,
        }
    }

    /// Pairs a fresh key with a handle that force-cancels it.
    pub fn create_abort(self: &Arc<Self>) -> (String, AbortHandle) {
        let key = Self::new_key();
        let handle = AbortHandle {
            key: key.clone(),
            registry: Arc::clone(self),
        };
        (key, handle)
    }

    pub fn signal(&self, key: &str) -> Option<AbortSignal> {
        self.records.get(key).map(|entry| entry.signal.clone())
    }

    pub fn ref_count(&self, key: &str) -> usize {
        self.records.get(key).map_or(0, |entry| entry.count)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> AbortStats {
        AbortStats {
            active_keys: self.records.len(),
            total_holders: self.records.iter().map(|entry| entry.value().count).sum(),
        }
    }

    /// Drops every entry without firing any signal.
    pub fn clear(&self) {
        self.records.clear();
        log::info!("Abort registry cleared");
    }
}

/// Cancels one ad-hoc group created by [`AbortRegistry::create_abort`].
#[derive(Debug, Clone)]
pub struct AbortHandle {
    key: String,
    registry: SharedAbortRegistry,
}

impl AbortHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn abort(&self) -> bool {
        self.registry.force_cancel(&self.key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct AbortStats {
    pub active_keys: usize,
    pub total_holders: usize,
}

pub type SharedAbortRegistry = Arc<AbortRegistry>;
