use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tariff_core::validation::{validate_modifier, Violations};
use tariff_core::{
    CoreError, CoreResult, PricingSnapshot, PricingStore, ScopeKey, ScopeLock, WriteBatch, WriteOp,
};
use tariff_shared::{
    PriceBook, PriceConflict, PriceModifier, ResolutionOutcome, ResolutionStrategy, Scope,
};
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use crate::detector::ConflictDetector;
use crate::resolver::{ConflictResolver, PriceEdit};

/// Timing knobs for the write path
#[derive(Debug, Clone, Copy)]
pub struct WriterSettings {
    /// How long to wait for contended scope locks
    pub lock_timeout: Duration,
    /// Whole-operation budget; checked before commit
    pub write_timeout: Duration,
    pub poll_interval: Duration,
    pub lease: Duration,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(2000),
            write_timeout: Duration::from_millis(5000),
            poll_interval: Duration::from_millis(10),
            lease: Duration::from_secs(30),
        }
    }
}

/// New price book as submitted by an admin
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPriceBook {
    pub name: String,
    pub currency: Option<String>,
    pub zone_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
    #[serde(default)]
    pub is_master: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Serialized write path: every mutation runs under the scope locks it
/// touches and lands as one atomic batch.
pub struct PriceWriter {
    store: Arc<dyn PricingStore>,
    lock: Arc<dyn ScopeLock>,
    settings: WriterSettings,
}

impl PriceWriter {
    pub fn new(store: Arc<dyn PricingStore>, lock: Arc<dyn ScopeLock>, settings: WriterSettings) -> Self {
        Self { store, lock, settings }
    }

    /// Write a price at `scope`, or hand back the conflict report when finer
    /// overrides would mask it.
    pub async fn set_price(
        &self,
        product_id: Uuid,
        scope: Scope,
        new_price: f64,
        compare_at_price: Option<f64>,
    ) -> CoreResult<ResolutionOutcome> {
        let deadline = Instant::now() + self.settings.write_timeout;
        let keys = vec![ScopeKey::for_product(product_id, &scope)];

        self.locked(&keys, deadline, async {
            let snapshot = self.store.snapshot().await?;
            let report = ConflictDetector::detect(&snapshot, &scope, product_id, new_price);
            if report.has_conflict {
                return Err(CoreError::ConflictRequiresResolution(Box::new(report)));
            }

            let edit = PriceEdit {
                product_id,
                scope,
                old_price: report.impact_summary.current_master_price.unwrap_or(0.0),
                new_price,
                compare_at_price,
            };
            let batch = ConflictResolver::plan(&snapshot, ResolutionStrategy::Preserve, &edit, &[])?;
            self.commit(batch, deadline).await
        })
        .await
    }

    /// Apply a reconciliation strategy chosen against an earlier report.
    ///
    /// `conflicts` must still describe the store; if another writer has
    /// changed the overrides since, nothing is written.
    pub async fn resolve_conflict(
        &self,
        strategy: ResolutionStrategy,
        edit: PriceEdit,
        conflicts: Vec<PriceConflict>,
    ) -> CoreResult<ResolutionOutcome> {
        let deadline = Instant::now() + self.settings.write_timeout;
        let mut keys: Vec<ScopeKey> = conflicts
            .iter()
            .map(|c| ScopeKey::for_product(edit.product_id, &c.scope_ref.scope()))
            .collect();
        keys.push(ScopeKey::for_product(edit.product_id, &edit.scope));

        self.locked(&keys, deadline, async {
            let snapshot = self.store.snapshot().await?;
            let report = ConflictDetector::detect(&snapshot, &edit.scope, edit.product_id, edit.new_price);
            if !same_conflicts(&conflicts, &report.conflicts) {
                return Err(CoreError::ConcurrentModification(format!(
                    "overrides for product {} changed since detection",
                    edit.product_id
                )));
            }

            let batch = ConflictResolver::plan(&snapshot, strategy, &edit, &report.conflicts)?;
            self.commit(batch, deadline).await
        })
        .await
    }

    pub async fn create_price_book(&self, request: NewPriceBook) -> CoreResult<PriceBook> {
        let deadline = Instant::now() + self.settings.write_timeout;
        let scope = Scope::new(request.zone_id, request.segment_id);
        let keys = vec![ScopeKey::for_book(&scope)];

        self.locked(&keys, deadline, async {
            let snapshot = self.store.snapshot().await?;
            let book = validate_new_book(&snapshot, &request)?;

            let mut batch = WriteBatch::new();
            batch.push(WriteOp::CreateBook(book.clone()));
            self.commit(batch, deadline).await?;
            tracing::info!("Created price book {} ({}) at {}", book.name, book.id, scope);
            Ok(book)
        })
        .await
    }

    /// Create a modifier; an `id` already in use is rejected.
    pub async fn save_modifier(&self, modifier: PriceModifier) -> CoreResult<PriceModifier> {
        self.write_modifier(modifier, false).await
    }

    /// Replace an existing modifier; `NotFound` if `id` is unknown.
    pub async fn update_modifier(&self, id: Uuid, mut modifier: PriceModifier) -> CoreResult<PriceModifier> {
        modifier.id = id;
        self.write_modifier(modifier, true).await
    }

    async fn write_modifier(&self, modifier: PriceModifier, must_exist: bool) -> CoreResult<PriceModifier> {
        validate_modifier(&modifier)?;
        let deadline = Instant::now() + self.settings.write_timeout;
        let keys = vec![ScopeKey {
            product_id: modifier.product,
            zone_id: modifier.geo_zone,
            segment_id: modifier.user_segment,
        }];

        self.locked(&keys, deadline, async {
            let snapshot = self.store.snapshot().await?;
            let exists = snapshot.modifiers.contains_key(&modifier.id);
            if must_exist && !exists {
                return Err(CoreError::NotFound(format!("modifier {}", modifier.id)));
            }
            if !must_exist && exists {
                return Err(CoreError::invalid("id", format!("modifier {} already exists", modifier.id)));
            }
            validate_modifier_refs(&snapshot, &modifier)?;

            let mut batch = WriteBatch::new();
            batch.push(WriteOp::UpsertModifier(modifier.clone()));
            self.commit(batch, deadline).await?;
            tracing::info!("Saved modifier {} ({})", modifier.name, modifier.id);
            Ok(modifier)
        })
        .await
    }

    async fn commit(&self, batch: WriteBatch, deadline: Instant) -> CoreResult<ResolutionOutcome> {
        if Instant::now() >= deadline {
            tracing::warn!("Write deadline passed, dropping batch of {} op(s)", batch.len());
            return Err(CoreError::DeadlineExceeded);
        }
        let updated_count = batch.entry_writes();
        self.store.commit(batch).await?;
        Ok(ResolutionOutcome { updated_count })
    }

    /// Run `body` while holding every key, releasing them whatever the outcome.
    async fn locked<T, F>(&self, keys: &[ScopeKey], deadline: Instant, body: F) -> CoreResult<T>
    where
        F: std::future::Future<Output = CoreResult<T>>,
    {
        let holder = Uuid::new_v4();
        let mut keys = keys.to_vec();
        // a fixed order keeps overlapping writers from deadlocking
        keys.sort();
        keys.dedup();

        let mut held = Vec::with_capacity(keys.len());
        let acquired = self.acquire_all(&keys, holder, deadline, &mut held).await;
        let result = match acquired {
            Ok(()) => body.await,
            Err(e) => Err(e),
        };

        for key in &held {
            if let Err(e) = self.lock.release(key, holder).await {
                tracing::error!("Failed to release {}: {}", key, e);
            }
        }
        result
    }

    async fn acquire_all(
        &self,
        keys: &[ScopeKey],
        holder: Uuid,
        deadline: Instant,
        held: &mut Vec<ScopeKey>,
    ) -> CoreResult<()> {
        let give_up = (Instant::now() + self.settings.lock_timeout).min(deadline);
        for key in keys {
            loop {
                if self.lock.try_acquire(key, holder, self.settings.lease).await? {
                    held.push(*key);
                    break;
                }
                if Instant::now() >= give_up {
                    tracing::warn!("Timed out waiting for {}", key);
                    return Err(CoreError::ConcurrentModification(format!(
                        "{} is being edited by another writer",
                        key
                    )));
                }
                sleep(self.settings.poll_interval).await;
            }
        }
        Ok(())
    }
}

/// Same override books at the same prices, order ignored
fn same_conflicts(expected: &[PriceConflict], actual: &[PriceConflict]) -> bool {
    let key = |c: &PriceConflict| (c.scope_ref.book_id, c.current_price.to_bits());
    let mut a: Vec<_> = expected.iter().map(key).collect();
    let mut b: Vec<_> = actual.iter().map(key).collect();
    a.sort();
    b.sort();
    a == b
}

fn validate_new_book(snapshot: &PricingSnapshot, request: &NewPriceBook) -> CoreResult<PriceBook> {
    let scope = Scope::new(request.zone_id, request.segment_id);
    let zone = request.zone_id.and_then(|id| snapshot.zones.get(&id));
    let mut v = Violations::new();

    v.check(!request.name.trim().is_empty(), "name", "is required");
    if request.is_master {
        v.check(scope.is_master(), "isMaster", "the master price book cannot have a zone or segment");
        v.check(
            snapshot.master_book().is_none(),
            "isMaster",
            "a master price book already exists",
        );
        v.check(request.currency.is_some(), "currency", "is required for the master price book");
    } else {
        v.check(!scope.is_master(), "zoneId", "a zone or segment is required");
        v.check(
            request.zone_id.is_none() || zone.is_some(),
            "zoneId",
            "unknown zone",
        );
        v.check(
            request
                .segment_id
                .map_or(true, |id| snapshot.segments.contains_key(&id)),
            "segmentId",
            "unknown segment",
        );
        v.check(
            scope.is_master() || snapshot.book_for_scope(&scope).is_none(),
            "segmentId",
            "a price book for this zone and segment already exists",
        );
        if let (Some(z), Some(currency)) = (zone, request.currency.as_deref()) {
            v.check(z.currency == currency, "currency", "must match the zone currency");
        }
    }
    v.into_result()?;

    let currency = match (zone, request.currency.clone()) {
        (Some(z), _) => z.currency.clone(),
        (None, Some(c)) => c,
        (None, None) => snapshot
            .master_book()
            .map(|m| m.currency.clone())
            .ok_or_else(|| CoreError::invalid("currency", "is required when no master book exists"))?,
    };

    Ok(PriceBook {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        currency,
        zone_id: request.zone_id,
        segment_id: request.segment_id,
        is_master: request.is_master,
        is_active: request.is_active,
    })
}

fn validate_modifier_refs(snapshot: &PricingSnapshot, modifier: &PriceModifier) -> CoreResult<()> {
    let mut v = Violations::new();
    v.check(
        modifier.geo_zone.map_or(true, |id| snapshot.zones.contains_key(&id)),
        "geoZone",
        "unknown zone",
    );
    v.check(
        modifier
            .user_segment
            .map_or(true, |id| snapshot.segments.contains_key(&id)),
        "userSegment",
        "unknown segment",
    );
    v.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::InMemoryScopeLock;
    use tariff_catalog::PriceBookResolver;
    use tariff_core::testing::SnapshotBuilder;
    use tariff_shared::{ModifierScope, ModifierType};
    use tariff_store::InMemoryStore;

    struct Harness {
        writer: PriceWriter,
        store: Arc<InMemoryStore>,
        lock: Arc<InMemoryScopeLock>,
        product: Uuid,
        zone: Uuid,
        segment: Uuid,
        pair_book: Uuid,
    }

    fn settings() -> WriterSettings {
        WriterSettings {
            lock_timeout: Duration::from_millis(50),
            write_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(5),
            lease: Duration::from_secs(30),
        }
    }

    fn harness() -> Harness {
        let mut b = SnapshotBuilder::new();
        let zone = b.zone("KA", "INR");
        let segment = b.segment("WHOLESALE");
        let product = b.product();
        let master = b.master();
        let pair_book = b.book(Some(zone), Some(segment));
        b.price(master, product, 100.0).price(pair_book, product, 80.0);

        let store = Arc::new(InMemoryStore::new(b.build()));
        let lock = Arc::new(InMemoryScopeLock::new());
        let writer = PriceWriter::new(store.clone(), lock.clone(), settings());
        Harness {
            writer,
            store,
            lock,
            product,
            zone,
            segment,
            pair_book,
        }
    }

    async fn resolved(h: &Harness, zone: Option<Uuid>, segment: Option<Uuid>) -> f64 {
        let snapshot = h.store.snapshot().await.unwrap();
        PriceBookResolver::new(&snapshot)
            .base_price(h.product, zone, segment)
            .unwrap()
            .amount
    }

    #[tokio::test]
    async fn test_clean_edit_commits_directly() {
        let h = harness();
        let outcome = h
            .writer
            .set_price(h.product, Scope::new(Some(h.zone), Some(h.segment)), 75.0, None)
            .await
            .unwrap();
        assert_eq!(outcome.updated_count, 1);
        assert_eq!(resolved(&h, Some(h.zone), Some(h.segment)).await, 75.0);
    }

    #[tokio::test]
    async fn test_masked_edit_returns_report_and_writes_nothing() {
        let h = harness();
        let err = h
            .writer
            .set_price(h.product, Scope::MASTER, 120.0, None)
            .await
            .unwrap_err();

        match err {
            CoreError::ConflictRequiresResolution(report) => {
                assert_eq!(report.affected_count, 1);
                assert_eq!(report.conflicts[0].scope_ref.book_id, h.pair_book);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(resolved(&h, None, None).await, 100.0);
        assert!(!h.lock.is_held(&ScopeKey::for_product(h.product, &Scope::MASTER)));
    }

    #[tokio::test]
    async fn test_relative_resolution_end_to_end() {
        let h = harness();
        let report = match h.writer.set_price(h.product, Scope::MASTER, 120.0, None).await {
            Err(CoreError::ConflictRequiresResolution(report)) => report,
            other => panic!("expected conflict, got {:?}", other),
        };

        let edit = PriceEdit {
            product_id: h.product,
            scope: Scope::MASTER,
            old_price: 100.0,
            new_price: 120.0,
            compare_at_price: None,
        };
        let outcome = h
            .writer
            .resolve_conflict(ResolutionStrategy::Relative, edit, report.conflicts.clone())
            .await
            .unwrap();

        assert_eq!(outcome.updated_count, 2);
        assert_eq!(resolved(&h, None, None).await, 120.0);
        assert_eq!(resolved(&h, Some(h.zone), Some(h.segment)).await, 96.0);
    }

    #[tokio::test]
    async fn test_overwrite_resolution_removes_override() {
        let h = harness();
        let snapshot = h.store.snapshot().await.unwrap();
        let report = ConflictDetector::detect(&snapshot, &Scope::MASTER, h.product, 110.0);
        let edit = PriceEdit {
            product_id: h.product,
            scope: Scope::MASTER,
            old_price: 100.0,
            new_price: 110.0,
            compare_at_price: None,
        };

        h.writer
            .resolve_conflict(ResolutionStrategy::Overwrite, edit, report.conflicts)
            .await
            .unwrap();
        assert_eq!(resolved(&h, Some(h.zone), Some(h.segment)).await, 110.0);
    }

    #[tokio::test]
    async fn test_stale_conflicts_are_rejected() {
        let h = harness();
        let snapshot = h.store.snapshot().await.unwrap();
        let report = ConflictDetector::detect(&snapshot, &Scope::MASTER, h.product, 120.0);

        // someone else edits the override in between
        h.writer
            .set_price(h.product, Scope::new(Some(h.zone), Some(h.segment)), 70.0, None)
            .await
            .unwrap();

        let edit = PriceEdit {
            product_id: h.product,
            scope: Scope::MASTER,
            old_price: 100.0,
            new_price: 120.0,
            compare_at_price: None,
        };
        let err = h
            .writer
            .resolve_conflict(ResolutionStrategy::Relative, edit, report.conflicts)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ConcurrentModification(_)));
        assert!(err.is_retryable());
        assert_eq!(resolved(&h, None, None).await, 100.0);
    }

    #[tokio::test]
    async fn test_contended_scope_times_out() {
        let h = harness();
        let key = ScopeKey::for_product(h.product, &Scope::MASTER);
        h.lock
            .try_acquire(&key, Uuid::new_v4(), Duration::from_secs(30))
            .await
            .unwrap();

        let err = h
            .writer
            .set_price(h.product, Scope::MASTER, 100.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ConcurrentModification(_)));
    }

    #[tokio::test]
    async fn test_concurrent_writers_on_one_scope_serialize() {
        let h = Arc::new(harness());
        let scope = Scope::new(Some(h.zone), Some(h.segment));
        let mut writer_settings = settings();
        writer_settings.lock_timeout = Duration::from_secs(2);
        let writer = Arc::new(PriceWriter::new(h.store.clone(), h.lock.clone(), writer_settings));

        let mut tasks = Vec::new();
        for price in [60.0, 61.0, 62.0, 63.0] {
            let writer = writer.clone();
            let product = h.product;
            tasks.push(tokio::spawn(async move {
                writer.set_price(product, scope, price, None).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let final_price = resolved(&h, Some(h.zone), Some(h.segment)).await;
        assert!([60.0, 61.0, 62.0, 63.0].contains(&final_price));
        let snapshot = h.store.snapshot().await.unwrap();
        assert_eq!(snapshot.books_pricing(h.product).count(), 2);
    }

    #[tokio::test]
    async fn test_zero_write_budget_aborts_before_commit() {
        let h = harness();
        let mut tight = settings();
        tight.write_timeout = Duration::ZERO;
        let writer = PriceWriter::new(h.store.clone(), h.lock.clone(), tight);

        let err = writer
            .set_price(h.product, Scope::new(Some(h.zone), Some(h.segment)), 75.0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::DeadlineExceeded));
        assert_eq!(resolved(&h, Some(h.zone), Some(h.segment)).await, 80.0);
    }

    #[tokio::test]
    async fn test_price_book_creation_rules() {
        let h = harness();
        let second_master = NewPriceBook {
            name: "Another master".to_string(),
            currency: Some("INR".to_string()),
            zone_id: None,
            segment_id: None,
            is_master: true,
            is_active: true,
        };
        assert!(matches!(
            h.writer.create_price_book(second_master).await,
            Err(CoreError::ValidationError(_))
        ));

        let duplicate_pair = NewPriceBook {
            name: "KA wholesale again".to_string(),
            currency: None,
            zone_id: Some(h.zone),
            segment_id: Some(h.segment),
            is_master: false,
            is_active: true,
        };
        assert!(matches!(
            h.writer.create_price_book(duplicate_pair).await,
            Err(CoreError::ValidationError(_))
        ));

        let zone_book = NewPriceBook {
            name: "Karnataka".to_string(),
            currency: None,
            zone_id: Some(h.zone),
            segment_id: None,
            is_master: false,
            is_active: true,
        };
        let book = h.writer.create_price_book(zone_book).await.unwrap();
        assert_eq!(book.currency, "INR");
        let snapshot = h.store.snapshot().await.unwrap();
        assert_eq!(
            snapshot.book_for_scope(&Scope::new(Some(h.zone), None)).map(|b| b.id),
            Some(book.id)
        );
    }

    #[tokio::test]
    async fn test_modifier_save_and_update() {
        let h = harness();
        let mut surcharge = PriceModifier::new(ModifierScope::Zone, ModifierType::FlatInc, 15.0);
        surcharge.geo_zone = Some(h.zone);
        let saved = h.writer.save_modifier(surcharge).await.unwrap();

        let mut changed = saved.clone();
        changed.value = 20.0;
        h.writer.update_modifier(saved.id, changed).await.unwrap();
        let snapshot = h.store.snapshot().await.unwrap();
        assert_eq!(snapshot.modifiers[&saved.id].value, 20.0);

        let ghost = PriceModifier::new(ModifierScope::Global, ModifierType::FlatInc, 1.0);
        assert!(matches!(
            h.writer.update_modifier(Uuid::new_v4(), ghost).await,
            Err(CoreError::NotFound(_))
        ));

        let mut dangling = PriceModifier::new(ModifierScope::Zone, ModifierType::FlatInc, 1.0);
        dangling.geo_zone = Some(Uuid::new_v4());
        assert!(matches!(
            h.writer.save_modifier(dangling).await,
            Err(CoreError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_create_with_existing_modifier_id_is_rejected() {
        let h = harness();
        let first = PriceModifier::new(ModifierScope::Global, ModifierType::FlatInc, 5.0);
        let saved = h.writer.save_modifier(first).await.unwrap();

        let mut clash = PriceModifier::new(ModifierScope::Global, ModifierType::FlatInc, 50.0);
        clash.id = saved.id;
        match h.writer.save_modifier(clash).await {
            Err(CoreError::ValidationError(fields)) => assert_eq!(fields[0].field, "id"),
            other => panic!("expected validation error, got {:?}", other),
        }
        let snapshot = h.store.snapshot().await.unwrap();
        assert_eq!(snapshot.modifiers[&saved.id].value, 5.0);
    }

    #[tokio::test]
    async fn test_zone_edit_masked_by_segment_book() {
        let mut b = SnapshotBuilder::new();
        let zone = b.zone("KA", "INR");
        let segment = b.segment("WHOLESALE");
        let product = b.product();
        let master = b.master();
        let zone_book = b.book(Some(zone), None);
        let segment_book = b.book(None, Some(segment));
        b.price(master, product, 100.0)
            .price(zone_book, product, 100.0)
            .price(segment_book, product, 80.0);
        let store = Arc::new(InMemoryStore::new(b.build()));
        let writer = PriceWriter::new(store.clone(), Arc::new(InMemoryScopeLock::new()), settings());

        let err = writer
            .set_price(product, Scope::new(Some(zone), None), 150.0, None)
            .await
            .unwrap_err();
        match err {
            CoreError::ConflictRequiresResolution(report) => {
                assert_eq!(report.affected_count, 1);
                assert_eq!(report.conflicts[0].scope_ref.book_id, segment_book);
            }
            other => panic!("expected conflict, got {:?}", other),
        }

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.entry(zone_book, product).map(|e| e.base_price), Some(100.0));
    }
}
