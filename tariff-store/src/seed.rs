use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tariff_core::validation::validate_zone;
use tariff_core::{CoreError, CoreResult, PricingSnapshot, WriteBatch, WriteOp};
use tariff_shared::{GeoZone, PriceBook, PriceBookEntry, PriceModifier, ProductProfile, UserSegment};

use crate::memory::InMemoryStore;

/// On-disk layout of every collection the engine reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSeed {
    pub zones: Vec<GeoZone>,
    pub segments: Vec<UserSegment>,
    pub products: Vec<ProductProfile>,
    pub price_books: Vec<PriceBook>,
    pub entries: Vec<PriceBookEntry>,
    pub modifiers: Vec<PriceModifier>,
}

impl StoreSeed {
    pub fn from_json(raw: &str) -> CoreResult<Self> {
        serde_json::from_str(raw).map_err(|e| CoreError::InternalError(format!("Invalid seed: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::InternalError(format!("Cannot read seed {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Build a store, routing books, entries and modifiers through the same
    /// checks as any other commit. Zone and segment codes must be unique.
    pub async fn into_store(self) -> CoreResult<InMemoryStore> {
        let mut base = PricingSnapshot::default();
        let mut zone_codes = HashSet::new();
        for zone in self.zones {
            validate_zone(&zone)?;
            if !zone_codes.insert(zone.code.clone()) {
                return Err(CoreError::invalid("code", format!("duplicate zone code {}", zone.code)));
            }
            base.zones.insert(zone.id, zone);
        }
        let mut segment_codes = HashSet::new();
        for segment in self.segments {
            if !segment_codes.insert(segment.code.clone()) {
                return Err(CoreError::invalid(
                    "code",
                    format!("duplicate segment code {}", segment.code),
                ));
            }
            base.segments.insert(segment.id, segment);
        }
        for product in self.products {
            base.products.insert(product.id, product);
        }

        let store = InMemoryStore::new(base);
        let mut batch = WriteBatch::new();
        for book in self.price_books {
            batch.push(WriteOp::CreateBook(book));
        }
        for entry in self.entries {
            batch.push(WriteOp::UpsertEntry(entry));
        }
        for modifier in self.modifiers {
            batch.push(WriteOp::UpsertModifier(modifier));
        }
        if !batch.is_empty() {
            tariff_core::PricingStore::commit(&store, batch).await?;
        }
        Ok(store)
    }
}
