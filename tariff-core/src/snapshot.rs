use std::collections::HashMap;
use tariff_shared::{
    GeoZone, PriceBook, PriceBookEntry, PriceModifier, ProductProfile, Scope, UserSegment,
};
use uuid::Uuid;

/// Point-in-time, in-memory view of every collection the engine reads.
///
/// Reads never mutate a snapshot; the store hands out a fresh one per call.
#[derive(Debug, Clone, Default)]
pub struct PricingSnapshot {
    pub zones: HashMap<Uuid, GeoZone>,
    pub segments: HashMap<Uuid, UserSegment>,
    pub products: HashMap<Uuid, ProductProfile>,
    pub books: HashMap<Uuid, PriceBook>,
    /// Keyed by (price book, product)
    pub entries: HashMap<(Uuid, Uuid), PriceBookEntry>,
    pub modifiers: HashMap<Uuid, PriceModifier>,
}

impl PricingSnapshot {
    pub fn master_book(&self) -> Option<&PriceBook> {
        self.books.values().find(|b| b.is_master)
    }

    /// The non-master book for exactly this (zone, segment) pair.
    pub fn book_for_scope(&self, scope: &Scope) -> Option<&PriceBook> {
        if scope.is_master() {
            return self.master_book();
        }
        self.books
            .values()
            .find(|b| !b.is_master && b.scope() == *scope)
    }

    pub fn entry(&self, book_id: Uuid, product_id: Uuid) -> Option<&PriceBookEntry> {
        self.entries.get(&(book_id, product_id))
    }

    /// Books (master included) that carry an entry for the product.
    pub fn books_pricing(&self, product_id: Uuid) -> impl Iterator<Item = (&PriceBook, &PriceBookEntry)> {
        self.entries
            .values()
            .filter(move |e| e.product_id == product_id)
            .filter_map(|e| self.books.get(&e.price_book_id).map(|b| (b, e)))
    }

    pub fn modifiers(&self) -> impl Iterator<Item = &PriceModifier> {
        self.modifiers.values()
    }

    pub fn insert_book(&mut self, book: PriceBook) {
        self.books.insert(book.id, book);
    }

    pub fn insert_entry(&mut self, entry: PriceBookEntry) {
        self.entries.insert((entry.price_book_id, entry.product_id), entry);
    }

    pub fn insert_modifier(&mut self, modifier: PriceModifier) {
        self.modifiers.insert(modifier.id, modifier);
    }
}
