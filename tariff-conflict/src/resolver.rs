use rust_decimal::Decimal;
use tariff_catalog::money::{to_decimal, to_f64};
use tariff_core::validation::validate_price;
use tariff_core::{CoreError, CoreResult, PricingSnapshot, WriteBatch, WriteOp};
use tariff_shared::{PriceBook, PriceBookEntry, PriceConflict, ResolutionStrategy, Scope};
use uuid::Uuid;

/// A price edit at one scope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceEdit {
    pub product_id: Uuid,
    pub scope: Scope,
    pub old_price: f64,
    pub new_price: f64,
    /// Written as-is when set, otherwise an existing one is kept while still valid
    pub compare_at_price: Option<f64>,
}

/// Plans the write batch for a price edit under a reconciliation strategy.
///
/// Planning is pure: nothing touches the store until the batch is committed.
pub struct ConflictResolver;

impl ConflictResolver {
    pub fn plan(
        snapshot: &PricingSnapshot,
        strategy: ResolutionStrategy,
        edit: &PriceEdit,
        conflicts: &[PriceConflict],
    ) -> CoreResult<WriteBatch> {
        validate_price(edit.new_price, edit.compare_at_price)?;
        if !(edit.old_price.is_finite() && edit.old_price >= 0.0) {
            return Err(CoreError::invalid("oldPrice", "must be a non-negative number"));
        }

        let mut batch = WriteBatch::new();
        let book_id = match snapshot.book_for_scope(&edit.scope) {
            Some(book) => book.id,
            None => {
                let book = new_book_for(snapshot, &edit.scope)?;
                let id = book.id;
                batch.push(WriteOp::CreateBook(book));
                id
            }
        };
        batch.push(WriteOp::UpsertEntry(entry_at(snapshot, book_id, edit)));

        for conflict in conflicts {
            let child = snapshot
                .entry(conflict.scope_ref.book_id, edit.product_id)
                .ok_or_else(|| {
                    CoreError::ConcurrentModification(format!(
                        "override in book {} no longer exists",
                        conflict.scope_ref.book_id
                    ))
                })?;

            match strategy {
                ResolutionStrategy::Overwrite => {
                    batch.push(WriteOp::DeleteEntry {
                        price_book_id: child.price_book_id,
                        product_id: child.product_id,
                    });
                }
                ResolutionStrategy::Preserve => {}
                ResolutionStrategy::Relative => {
                    // ratio of 1: the override stays as it is
                    let Some(ratio) = ratio(edit.old_price, edit.new_price) else {
                        continue;
                    };
                    let mut scaled = child.clone();
                    scaled.base_price = to_f64(to_decimal(child.base_price) * ratio);
                    scaled.compare_at_price = child
                        .compare_at_price
                        .map(|c| to_f64(to_decimal(c) * ratio));
                    batch.push(WriteOp::UpsertEntry(scaled));
                }
            }
        }

        tracing::debug!(
            "Planned {:?} for product {} at {}: {} op(s)",
            strategy,
            edit.product_id,
            edit.scope,
            batch.len()
        );
        Ok(batch)
    }
}

/// `new / old`, or None when the old price is zero
fn ratio(old_price: f64, new_price: f64) -> Option<Decimal> {
    let old = to_decimal(old_price);
    if old.is_zero() {
        return None;
    }
    Some(to_decimal(new_price) / old)
}

/// Entry carrying the edited price, reusing the existing row id.
///
/// An existing `compareAt` survives only while it still sits at or above
/// the new price.
fn entry_at(snapshot: &PricingSnapshot, book_id: Uuid, edit: &PriceEdit) -> PriceBookEntry {
    let price = to_f64(to_decimal(edit.new_price));
    let compare_at = edit.compare_at_price.map(|c| to_f64(to_decimal(c)));
    match snapshot.entry(book_id, edit.product_id) {
        Some(existing) => PriceBookEntry {
            base_price: price,
            compare_at_price: compare_at
                .or_else(|| existing.compare_at_price.filter(|c| *c >= price)),
            ..existing.clone()
        },
        None => PriceBookEntry {
            id: Uuid::new_v4(),
            price_book_id: book_id,
            product_id: edit.product_id,
            base_price: price,
            compare_at_price: compare_at,
        },
    }
}

/// Book created on demand for a scope that has none yet.
///
/// Currency follows the zone, otherwise the master book.
pub fn new_book_for(snapshot: &PricingSnapshot, scope: &Scope) -> CoreResult<PriceBook> {
    if scope.is_master() {
        return Err(CoreError::NotFound("master price book".to_string()));
    }
    let zone = match scope.zone_id {
        Some(id) => Some(
            snapshot
                .zones
                .get(&id)
                .ok_or_else(|| CoreError::invalid("zoneId", format!("unknown zone {}", id)))?,
        ),
        None => None,
    };
    let segment = match scope.segment_id {
        Some(id) => Some(
            snapshot
                .segments
                .get(&id)
                .ok_or_else(|| CoreError::invalid("segmentId", format!("unknown segment {}", id)))?,
        ),
        None => None,
    };

    let currency = match zone {
        Some(z) => z.currency.clone(),
        None => snapshot
            .master_book()
            .map(|m| m.currency.clone())
            .ok_or_else(|| CoreError::NotFound("master price book".to_string()))?,
    };
    let name = match (zone, segment) {
        (Some(z), Some(s)) => format!("{} / {}", z.name, s.name),
        (Some(z), None) => z.name.clone(),
        (None, Some(s)) => s.name.clone(),
        (None, None) => "Master".to_string(),
    };

    Ok(PriceBook {
        id: Uuid::new_v4(),
        name,
        currency,
        zone_id: scope.zone_id,
        segment_id: scope.segment_id,
        is_master: false,
        is_active: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::ConflictDetector;
    use tariff_core::testing::SnapshotBuilder;

    struct Fixture {
        snapshot: PricingSnapshot,
        product: Uuid,
        master: Uuid,
        pair_book: Uuid,
    }

    fn fixture(child_price: f64) -> Fixture {
        let mut b = SnapshotBuilder::new();
        let zone = b.zone("KA", "INR");
        let segment = b.segment("WHOLESALE");
        let product = b.product();
        let master = b.master();
        let pair_book = b.book(Some(zone), Some(segment));
        b.price(master, product, 100.0).price(pair_book, product, child_price);
        Fixture {
            snapshot: b.build(),
            product,
            master,
            pair_book,
        }
    }

    fn master_edit(f: &Fixture, old_price: f64, new_price: f64) -> PriceEdit {
        PriceEdit {
            product_id: f.product,
            scope: Scope::MASTER,
            old_price,
            new_price,
            compare_at_price: None,
        }
    }

    fn plan(f: &Fixture, strategy: ResolutionStrategy, edit: PriceEdit) -> WriteBatch {
        let report = ConflictDetector::detect(&f.snapshot, &edit.scope, edit.product_id, edit.new_price);
        ConflictResolver::plan(&f.snapshot, strategy, &edit, &report.conflicts).unwrap()
    }

    fn upserted(batch: &WriteBatch, book: Uuid) -> Option<f64> {
        batch.ops().iter().find_map(|op| match op {
            WriteOp::UpsertEntry(e) if e.price_book_id == book => Some(e.base_price),
            _ => None,
        })
    }

    #[test]
    fn test_relative_scales_children() {
        let f = fixture(80.0);
        let batch = plan(&f, ResolutionStrategy::Relative, master_edit(&f, 100.0, 120.0));

        assert_eq!(upserted(&batch, f.master), Some(120.0));
        assert_eq!(upserted(&batch, f.pair_book), Some(96.0));
        assert_eq!(batch.entry_writes(), 2);
    }

    #[test]
    fn test_relative_with_zero_old_price_leaves_child() {
        let f = fixture(80.0);
        let batch = plan(&f, ResolutionStrategy::Relative, master_edit(&f, 0.0, 120.0));

        assert_eq!(upserted(&batch, f.master), Some(120.0));
        assert_eq!(upserted(&batch, f.pair_book), None);
        assert_eq!(batch.entry_writes(), 1);
    }

    #[test]
    fn test_overwrite_deletes_children() {
        let f = fixture(80.0);
        let batch = plan(&f, ResolutionStrategy::Overwrite, master_edit(&f, 100.0, 120.0));

        assert!(batch.ops().contains(&WriteOp::DeleteEntry {
            price_book_id: f.pair_book,
            product_id: f.product,
        }));
        assert_eq!(batch.entry_writes(), 2);
    }

    #[test]
    fn test_preserve_writes_only_edited_scope() {
        let f = fixture(80.0);
        let batch = plan(&f, ResolutionStrategy::Preserve, master_edit(&f, 100.0, 120.0));

        assert_eq!(batch.len(), 1);
        assert_eq!(upserted(&batch, f.master), Some(120.0));
    }

    #[test]
    fn test_existing_entry_keeps_id_and_valid_compare_at() {
        let mut f = fixture(80.0);
        let key = (f.master, f.product);
        f.snapshot.entries.get_mut(&key).unwrap().compare_at_price = Some(150.0);
        let original_id = f.snapshot.entries[&key].id;

        let raised = plan(&f, ResolutionStrategy::Preserve, master_edit(&f, 100.0, 120.0));
        match &raised.ops()[0] {
            WriteOp::UpsertEntry(e) => {
                assert_eq!(e.id, original_id);
                assert_eq!(e.compare_at_price, Some(150.0));
            }
            other => panic!("unexpected op {:?}", other),
        }

        let above = plan(&f, ResolutionStrategy::Preserve, master_edit(&f, 100.0, 160.0));
        match &above.ops()[0] {
            WriteOp::UpsertEntry(e) => assert_eq!(e.compare_at_price, None),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_missing_book_is_created_in_batch() {
        let mut b = SnapshotBuilder::new();
        let zone = b.zone("DXB", "AED");
        let product = b.product();
        let master = b.master();
        b.price(master, product, 100.0);
        let snapshot = b.build();

        let edit = PriceEdit {
            product_id: product,
            scope: Scope::new(Some(zone), None),
            old_price: 100.0,
            new_price: 30.0,
            compare_at_price: Some(35.0),
        };
        let batch = ConflictResolver::plan(&snapshot, ResolutionStrategy::Preserve, &edit, &[]).unwrap();

        let book = match &batch.ops()[0] {
            WriteOp::CreateBook(book) => book.clone(),
            other => panic!("unexpected op {:?}", other),
        };
        assert_eq!(book.currency, "AED");
        assert_eq!(book.zone_id, Some(zone));
        assert_eq!(upserted(&batch, book.id), Some(30.0));
        match &batch.ops()[1] {
            WriteOp::UpsertEntry(e) => assert_eq!(e.compare_at_price, Some(35.0)),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_unknown_segment_is_rejected() {
        let f = fixture(80.0);
        let edit = PriceEdit {
            product_id: f.product,
            scope: Scope::new(None, Some(Uuid::new_v4())),
            old_price: 100.0,
            new_price: 90.0,
            compare_at_price: None,
        };
        let err = ConflictResolver::plan(&f.snapshot, ResolutionStrategy::Preserve, &edit, &[]).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let f = fixture(80.0);
        let err = ConflictResolver::plan(
            &f.snapshot,
            ResolutionStrategy::Overwrite,
            &master_edit(&f, 100.0, -1.0),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn test_negative_old_price_is_rejected() {
        let f = fixture(80.0);
        let report = ConflictDetector::detect(&f.snapshot, &Scope::MASTER, f.product, 120.0);
        let err = ConflictResolver::plan(
            &f.snapshot,
            ResolutionStrategy::Relative,
            &master_edit(&f, -100.0, 120.0),
            &report.conflicts,
        )
        .unwrap_err();

        match err {
            CoreError::ValidationError(fields) => assert_eq!(fields[0].field, "oldPrice"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
