use serde::{Deserialize, Serialize};
use tariff_core::{CoreError, CoreResult, PricingSnapshot};
use tariff_shared::{PriceBook, PriceBookEntry, Scope, ScopeLevel};
use uuid::Uuid;

/// Base price found for a product, with the book it came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BasePrice {
    pub amount: f64,
    pub compare_at: Option<f64>,
    pub source_book_id: Uuid,
    pub level: ScopeLevel,
    pub currency: String,
}

impl BasePrice {
    fn from_entry(book: &PriceBook, entry: &PriceBookEntry) -> Self {
        Self {
            amount: entry.base_price,
            compare_at: entry.compare_at_price,
            source_book_id: book.id,
            level: book.scope().level(),
            currency: book.currency.clone(),
        }
    }
}

/// Walks the price-book hierarchy, most specific book first
pub struct PriceBookResolver<'a> {
    snapshot: &'a PricingSnapshot,
}

impl<'a> PriceBookResolver<'a> {
    pub fn new(snapshot: &'a PricingSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn base_price(
        &self,
        product_id: Uuid,
        zone_id: Option<Uuid>,
        segment_id: Option<Uuid>,
    ) -> CoreResult<BasePrice> {
        for scope in lookup_chain(zone_id, segment_id) {
            let Some(book) = self.snapshot.book_for_scope(&scope) else {
                continue;
            };
            if !book.is_active {
                continue;
            }
            if let Some(entry) = self.snapshot.entry(book.id, product_id) {
                tracing::debug!("Product {} priced by {:?} book {}", product_id, scope.level(), book.id);
                return Ok(BasePrice::from_entry(book, entry));
            }
        }

        // The master is the foundation layer and is consulted even when inactive
        let master = self
            .snapshot
            .master_book()
            .ok_or(CoreError::ProductNotPriced(product_id))?;
        let entry = self
            .snapshot
            .entry(master.id, product_id)
            .ok_or(CoreError::ProductNotPriced(product_id))?;
        Ok(BasePrice::from_entry(master, entry))
    }

    /// Price a write at `scope` would replace: resolution as seen from that scope.
    pub fn price_at(&self, product_id: Uuid, scope: &Scope) -> CoreResult<BasePrice> {
        self.base_price(product_id, scope.zone_id, scope.segment_id)
    }
}

/// Non-master scopes to try, in order: zone+segment, segment, zone.
pub fn lookup_chain(zone_id: Option<Uuid>, segment_id: Option<Uuid>) -> Vec<Scope> {
    let mut chain = Vec::with_capacity(3);
    if let (Some(z), Some(s)) = (zone_id, segment_id) {
        chain.push(Scope::new(Some(z), Some(s)));
    }
    if let Some(s) = segment_id {
        chain.push(Scope::new(None, Some(s)));
    }
    if let Some(z) = zone_id {
        chain.push(Scope::new(Some(z), None));
    }
    chain
}
