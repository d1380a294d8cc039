// Request Coalescing Module
//
// Deduplicates concurrent transforms for the same cache key.
// When multiple clients request the same artifact simultaneously:
// - First request (leader): fetches, transforms and stores, then signals completion
// - Subsequent requests (followers): wait for the leader, then re-check the cache
// - A follower that still misses (leader failed) does the work itself

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::cache::CacheKey;

struct InFlight {
    id: u64,
    sender: watch::Sender<bool>,
}

/// Request coalescing manager
/// Tracks in-flight transforms and deduplicates concurrent requests for the same key
#[derive(Clone, Default)]
pub struct RequestCoalescer {
    in_flight: Arc<Mutex<HashMap<String, InFlight>>>,
    next_id: Arc<AtomicU64>,
}

impl std::fmt::Debug for RequestCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoalescer")
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

impl RequestCoalescer {
    /// Create a new request coalescer
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a coalescing slot for a request
    ///
    /// Returns `CoalescingSlot::Leader` if this is the first request for the key.
    /// The leader should produce the artifact, then drop the guard.
    ///
    /// Returns `CoalescingSlot::Follower` after waiting for the leader to finish.
    /// The follower should read from cache.
    pub async fn acquire(&self, key: &CacheKey) -> CoalescingSlot {
        // Check and insert under one lock so exactly one caller leads
        let receiver = {
            let mut in_flight = self.lock();
            match in_flight.get(key.as_str()) {
                Some(entry) => entry.sender.subscribe(),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let (sender, _rx) = watch::channel(false);
                    in_flight.insert(key.as_str().to_string(), InFlight { id, sender });
                    return CoalescingSlot::Leader(LeaderGuard {
                        key: key.as_str().to_string(),
                        id,
                        coalescer: self.clone(),
                    });
                }
            }
        };

        let mut rx = receiver;
        // A closed channel means the leader is gone either way
        let _ = rx.wait_for(|&completed| completed).await;
        CoalescingSlot::Follower
    }

    /// Get current number of in-flight requests
    pub fn in_flight_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, InFlight>> {
        // The map stays consistent even if a holder panicked
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Remove the leader's entry and wake its followers
    fn finish(&self, key: &str, id: u64) {
        let mut in_flight = self.lock();
        if in_flight.get(key).map(|e| e.id) == Some(id) {
            if let Some(entry) = in_flight.remove(key) {
                let _ = entry.sender.send(true);
            }
        }
    }
}

/// Result of acquiring a coalescing slot
#[derive(Debug)]
pub enum CoalescingSlot {
    /// This is the first request (leader) - produce the artifact.
    /// When the guard is dropped, all waiting followers will be notified.
    Leader(LeaderGuard),

    /// Another request was in-flight and has now completed.
    /// The result should be available in cache - read from there.
    Follower,
}

impl CoalescingSlot {
    /// Check if this is the leader
    pub fn is_leader(&self) -> bool {
        matches!(self, CoalescingSlot::Leader(_))
    }

    /// Check if this is a follower (waited for leader, should read from cache)
    pub fn is_follower(&self) -> bool {
        matches!(self, CoalescingSlot::Follower)
    }
}

/// Guard held by the leader request
/// When dropped, notifies all waiting followers that the request is complete
#[derive(Debug)]
pub struct LeaderGuard {
    key: String,
    id: u64,
    coalescer: RequestCoalescer,
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        self.coalescer.finish(&self.key, self.id);
    }
}
