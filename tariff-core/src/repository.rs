use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tariff_shared::Scope;
use uuid::Uuid;

use crate::batch::WriteBatch;
use crate::snapshot::PricingSnapshot;
use crate::CoreResult;

/// Storage collaborator: hands out consistent snapshots and applies batches
/// atomically, enforcing the uniqueness constraints of each collection.
#[async_trait]
pub trait PricingStore: Send + Sync {
    async fn snapshot(&self) -> CoreResult<Arc<PricingSnapshot>>;

    /// Either every op lands or none does (`AtomicWriteFailure`).
    async fn commit(&self, batch: WriteBatch) -> CoreResult<()>;
}

/// Logical write scope `(product, zone, segment)`.
///
/// Book-level writes (creating a price book) leave `product_id` unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey {
    pub product_id: Option<Uuid>,
    pub zone_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
}

impl ScopeKey {
    pub fn for_product(product_id: Uuid, scope: &Scope) -> Self {
        Self {
            product_id: Some(product_id),
            zone_id: scope.zone_id,
            segment_id: scope.segment_id,
        }
    }

    pub fn for_book(scope: &Scope) -> Self {
        Self {
            product_id: None,
            zone_id: scope.zone_id,
            segment_id: scope.segment_id,
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = |id: Option<Uuid>| id.map(|u| u.to_string()).unwrap_or_else(|| "*".to_string());
        write!(
            f,
            "scope:{}:{}:{}",
            part(self.product_id),
            part(self.zone_id),
            part(self.segment_id)
        )
    }
}

/// Single-writer lease per scope key
#[async_trait]
pub trait ScopeLock: Send + Sync {
    /// Take the lease if free (or expired). Returns false when held by someone else.
    async fn try_acquire(&self, key: &ScopeKey, holder: Uuid, lease: Duration) -> CoreResult<bool>;

    /// Release the lease, only if `holder` still owns it.
    async fn release(&self, key: &ScopeKey, holder: Uuid) -> CoreResult<()>;
}
