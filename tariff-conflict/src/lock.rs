use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tariff_core::{CoreResult, ScopeKey, ScopeLock};
use uuid::Uuid;

/// Process-local scope leases.
///
/// An expired lease is free for the next caller even if its holder never
/// released it.
#[derive(Debug, Default)]
pub struct InMemoryScopeLock {
    leases: DashMap<ScopeKey, (Uuid, Instant)>,
}

impl InMemoryScopeLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, key: &ScopeKey) -> bool {
        self.leases
            .get(key)
            .is_some_and(|lease| lease.1 > Instant::now())
    }
}

#[async_trait]
impl ScopeLock for InMemoryScopeLock {
    async fn try_acquire(&self, key: &ScopeKey, holder: Uuid, lease: Duration) -> CoreResult<bool> {
        let now = Instant::now();
        match self.leases.entry(*key) {
            Entry::Occupied(mut held) => {
                let (owner, expires_at) = *held.get();
                if owner != holder && expires_at > now {
                    return Ok(false);
                }
                held.insert((holder, now + lease));
                Ok(true)
            }
            Entry::Vacant(slot) => {
                slot.insert((holder, now + lease));
                Ok(true)
            }
        }
    }

    async fn release(&self, key: &ScopeKey, holder: Uuid) -> CoreResult<()> {
        self.leases.remove_if(key, |_, (owner, _)| *owner == holder);
        Ok(())
    }
}
