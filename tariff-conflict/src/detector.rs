use rust_decimal::Decimal;
use tariff_catalog::money::{to_decimal, to_f64};
use tariff_catalog::PriceBookResolver;
use tariff_core::PricingSnapshot;
use tariff_shared::{
    ConflictReport, ImpactSummary, PriceConflict, ResolutionStrategy, Scope, ScopeRef,
};
use uuid::Uuid;

/// Finds finer-scope overrides that would mask a price edit
pub struct ConflictDetector;

impl ConflictDetector {
    /// Report for writing `new_price` for `product_id` at `scope`.
    ///
    /// Every book finer than `scope` that already prices the product is a
    /// conflict, active or not.
    pub fn detect(
        snapshot: &PricingSnapshot,
        scope: &Scope,
        product_id: Uuid,
        new_price: f64,
    ) -> ConflictReport {
        let mut conflicts: Vec<PriceConflict> = snapshot
            .books_pricing(product_id)
            .filter(|(book, _)| !book.is_master && book.scope().is_finer_than(scope))
            .map(|(book, entry)| PriceConflict {
                level: book.scope().level(),
                scope_ref: ScopeRef {
                    book_id: book.id,
                    book_name: book.name.clone(),
                    zone_id: book.zone_id,
                    segment_id: book.segment_id,
                },
                current_price: entry.base_price,
            })
            .collect();
        conflicts.sort_by(|a, b| {
            a.scope_ref
                .scope()
                .cmp(&b.scope_ref.scope())
                .then_with(|| a.scope_ref.book_id.cmp(&b.scope_ref.book_id))
        });

        let current = PriceBookResolver::new(snapshot)
            .price_at(product_id, scope)
            .ok()
            .map(|base| base.amount);
        let impact_summary = impact(scope, current, new_price);

        let has_conflict = !conflicts.is_empty();
        if has_conflict {
            tracing::info!(
                "Edit of product {} at {} masked by {} finer override(s)",
                product_id,
                scope,
                conflicts.len()
            );
        }

        ConflictReport {
            has_conflict,
            affected_count: conflicts.len(),
            conflicts,
            impact_summary,
            resolution_options: if has_conflict {
                ResolutionStrategy::ALL.iter().map(|s| s.option()).collect()
            } else {
                Vec::new()
            },
        }
    }
}

fn impact(scope: &Scope, current: Option<f64>, new_price: f64) -> ImpactSummary {
    let new = to_decimal(new_price);
    let change = current.map(|c| new - to_decimal(c));
    let percent = current
        .map(to_decimal)
        .zip(change)
        .filter(|(c, _)| !c.is_zero())
        .map(|(c, delta)| to_f64(delta / c * Decimal::ONE_HUNDRED));

    ImpactSummary {
        edited_level: scope.level(),
        current_master_price: current,
        new_price,
        price_change: change.map(to_f64),
        percent_change: percent,
    }
}
