//! Fixture helpers for building snapshots in tests.

use std::collections::BTreeMap;
use tariff_shared::{
    GeoZone, PriceBook, PriceBookEntry, PriceModifier, ProductProfile, UserSegment, ZoneLevel,
};
use uuid::Uuid;

use crate::snapshot::PricingSnapshot;

#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    snapshot: PricingSnapshot,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zone(&mut self, code: &str, currency: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.snapshot.zones.insert(
            id,
            GeoZone {
                id,
                name: code.to_string(),
                code: code.to_string(),
                level: ZoneLevel::State,
                pincode_ranges: Vec::new(),
                currency: currency.to_string(),
                is_active: true,
            },
        );
        id
    }

    pub fn segment(&mut self, code: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.snapshot.segments.insert(
            id,
            UserSegment {
                id,
                name: code.to_string(),
                code: code.to_string(),
            },
        );
        id
    }

    pub fn product(&mut self) -> Uuid {
        self.product_with_attributes(BTreeMap::new())
    }

    pub fn product_with_attributes(&mut self, attributes: BTreeMap<String, Vec<String>>) -> Uuid {
        let id = Uuid::new_v4();
        self.snapshot.products.insert(
            id,
            ProductProfile {
                id,
                name: format!("product-{}", id),
                category_id: None,
                attributes,
            },
        );
        id
    }

    pub fn master(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.snapshot.insert_book(PriceBook {
            id,
            name: "Master".to_string(),
            currency: "INR".to_string(),
            zone_id: None,
            segment_id: None,
            is_master: true,
            is_active: true,
        });
        id
    }

    pub fn book(&mut self, zone_id: Option<Uuid>, segment_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        let currency = zone_id
            .and_then(|z| self.snapshot.zones.get(&z))
            .map(|z| z.currency.clone())
            .unwrap_or_else(|| "INR".to_string());
        self.snapshot.insert_book(PriceBook {
            id,
            name: format!("book-{}", id),
            currency,
            zone_id,
            segment_id,
            is_master: false,
            is_active: true,
        });
        id
    }

    pub fn price(&mut self, book_id: Uuid, product_id: Uuid, amount: f64) -> &mut Self {
        self.snapshot.insert_entry(PriceBookEntry {
            id: Uuid::new_v4(),
            price_book_id: book_id,
            product_id,
            base_price: amount,
            compare_at_price: None,
        });
        self
    }

    pub fn modifier(&mut self, modifier: PriceModifier) -> &mut Self {
        self.snapshot.insert_modifier(modifier);
        self
    }

    pub fn snapshot_mut(&mut self) -> &mut PricingSnapshot {
        &mut self.snapshot
    }

    pub fn build(&self) -> PricingSnapshot {
        self.snapshot.clone()
    }
}
