//! Singleflight deduplication of concurrent work keyed by `K`.
//!
//! When several tasks ask for the same key at once, only the leader runs the
//! work and every follower receives a clone of its result. A follower whose
//! leader was cancelled retries and may become the next leader.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use tokio::sync::broadcast;

/// Result of trying to acquire a slot for a key
enum Slot<V> {
    /// We won the race and must run the work
    Leader(broadcast::Sender<V>),
    /// Another task is running it; wait for its result
    Follower(broadcast::Receiver<V>),
}

/// Deduplicates concurrent executions per key
pub struct Singleflight<K, V> {
    in_flight: Mutex<HashMap<K, broadcast::Sender<V>>>,
}

impl<K, V> Singleflight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create an empty singleflight group
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` for `key` unless a run for the same key is already in
    /// flight, in which case wait for and share its result.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let tx = loop {
            match self.acquire(key.clone()) {
                Slot::Leader(tx) => break tx,
                Slot::Follower(mut rx) => {
                    if let Ok(value) = rx.recv().await {
                        return value;
                    }
                    // Leader dropped without a result.
                }
            }
        };

        let guard = Guard { group: self, key };
        let value = work().await;
        // Release the key before broadcasting so late arrivals start a fresh
        // run instead of subscribing to an already sent value.
        drop(guard);
        let _ = tx.send(value.clone());
        value
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    fn acquire(&self, key: K) -> Slot<V> {
        use std::collections::hash_map::Entry;

        match self.in_flight.lock().entry(key) {
            Entry::Occupied(entry) => Slot::Follower(entry.get().subscribe()),
            Entry::Vacant(entry) => {
                let (tx, _rx) = broadcast::channel(1);
                entry.insert(tx.clone());
                Slot::Leader(tx)
            }
        }
    }

    fn complete(&self, key: &K) {
        self.in_flight.lock().remove(key);
    }
}

impl<K, V> Default for Singleflight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Removes the in-flight slot even if the leader's future is dropped
struct Guard<'a, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    group: &'a Singleflight<K, V>,
    key: K,
}

impl<K, V> Drop for Guard<'_, K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn drop(&mut self) {
        self.group.complete(&self.key);
    }
}
