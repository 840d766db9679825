//! Per-request async mutexes.
//!
//! Entries are created on first use and dropped once no task holds or awaits them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use harvest_fetch_core::RequestId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots = HashMap<RequestId, Arc<AsyncMutex<()>>>;

/// Keyed mutex serialising all work on one request id.
#[derive(Default)]
pub struct RequestLocks {
    slots: Mutex<Slots>,
}

impl RequestLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn acquire(&self, id: RequestId) -> RequestGuard<'_> {
        let slot = Arc::clone(self.slots().entry(id).or_default());
        let guard = slot.lock_owned().await;
        RequestGuard {
            locks: self,
            id,
            guard: Some(guard),
        }
    }

    /// Number of ids currently held or awaited.
    #[must_use]
    pub fn active(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, id: RequestId) {
        let mut slots = self.slots();
        if slots
            .get(&id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&id);
        }
    }
}

/// Exclusive access to one request id; released on drop.
pub struct RequestGuard<'a> {
    locks: &'a RequestLocks,
    id: RequestId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn entries_are_dropped_after_release() {
        let locks = RequestLocks::new();
        let id = Uuid::new_v4();
        {
            let _guard = locks.acquire(id).await;
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn same_id_is_serialised_and_distinct_ids_are_not() {
        let locks = Arc::new(RequestLocks::new());
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let id = Uuid::new_v4();

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..4 {
            let locks = Arc::clone(&locks);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            tasks.spawn(async move {
                let _guard = locks.acquire(id).await;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while tasks.join_next().await.is_some() {}
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);

        let first = locks.acquire(Uuid::new_v4()).await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(Uuid::new_v4()))
            .await;
        assert!(second.is_ok(), "distinct ids must not block each other");
        drop(second);
        drop(first);
    }
}
