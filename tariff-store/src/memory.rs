use async_trait::async_trait;
use std::sync::Arc;
use tariff_core::validation::validate_modifier;
use tariff_core::{CoreError, CoreResult, PricingSnapshot, PricingStore, WriteBatch, WriteOp};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Copy-on-write store: readers share the current snapshot, commits build the
/// next one and swap it in only if every op applies cleanly.
pub struct InMemoryStore {
    current: RwLock<Arc<PricingSnapshot>>,
}

impl InMemoryStore {
    pub fn new(snapshot: PricingSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(PricingSnapshot::default())
    }
}

#[async_trait]
impl PricingStore for InMemoryStore {
    async fn snapshot(&self) -> CoreResult<Arc<PricingSnapshot>> {
        Ok(self.current.read().await.clone())
    }

    async fn commit(&self, batch: WriteBatch) -> CoreResult<()> {
        let mut current = self.current.write().await;
        let mut next = PricingSnapshot::clone(&current);
        let op_count = batch.len();

        for (idx, op) in batch.into_ops().into_iter().enumerate() {
            if let Err(reason) = apply(&mut next, op) {
                warn!("Rolling back batch at op {}/{}: {}", idx + 1, op_count, reason);
                return Err(CoreError::AtomicWriteFailure(reason));
            }
        }

        *current = Arc::new(next);
        debug!("Committed batch of {} op(s)", op_count);
        Ok(())
    }
}

/// One op against the working copy, enforcing per-collection uniqueness.
fn apply(snapshot: &mut PricingSnapshot, op: WriteOp) -> Result<(), String> {
    match op {
        WriteOp::CreateBook(book) => {
            if snapshot.books.contains_key(&book.id) {
                return Err(format!("price book {} already exists", book.id));
            }
            if book.is_master {
                if !book.scope().is_master() {
                    return Err("master price book cannot carry a zone or segment".to_string());
                }
                if snapshot.master_book().is_some() {
                    return Err("a master price book already exists".to_string());
                }
            } else if book.scope().is_master() || snapshot.book_for_scope(&book.scope()).is_some() {
                return Err(format!("a price book already exists for {}", book.scope()));
            }
            if let Some(zone_id) = book.zone_id {
                let zone = snapshot
                    .zones
                    .get(&zone_id)
                    .ok_or_else(|| format!("zone {} does not exist", zone_id))?;
                if zone.currency != book.currency {
                    return Err(format!(
                        "price book {} is in {} but zone {} prices in {}",
                        book.id, book.currency, zone.code, zone.currency
                    ));
                }
            }
            if let Some(segment_id) = book.segment_id {
                if !snapshot.segments.contains_key(&segment_id) {
                    return Err(format!("segment {} does not exist", segment_id));
                }
            }
            snapshot.insert_book(book);
        }
        WriteOp::UpsertEntry(entry) => {
            if !snapshot.books.contains_key(&entry.price_book_id) {
                return Err(format!("price book {} does not exist", entry.price_book_id));
            }
            if let Some(existing) = snapshot.entry(entry.price_book_id, entry.product_id) {
                if existing.id != entry.id {
                    return Err(format!(
                        "product {} already priced in book {}",
                        entry.product_id, entry.price_book_id
                    ));
                }
            }
            if !entry.base_price.is_finite() || entry.base_price < 0.0 {
                return Err(format!("invalid base price {}", entry.base_price));
            }
            snapshot.insert_entry(entry);
        }
        WriteOp::DeleteEntry { price_book_id, product_id } => {
            if snapshot.entries.remove(&(price_book_id, product_id)).is_none() {
                return Err(format!(
                    "no entry for product {} in book {}",
                    product_id, price_book_id
                ));
            }
        }
        WriteOp::UpsertModifier(modifier) => {
            validate_modifier(&modifier)
                .map_err(|e| format!("modifier {}: {}", modifier.id, e))?;
            snapshot.insert_modifier(modifier);
        }
    }
    Ok(())
}
