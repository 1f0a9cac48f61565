use tariff_shared::{PriceBook, PriceBookEntry, PriceModifier};
use uuid::Uuid;

/// One planned mutation
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    CreateBook(PriceBook),
    UpsertEntry(PriceBookEntry),
    DeleteEntry { price_book_id: Uuid, product_id: Uuid },
    UpsertModifier(PriceModifier),
}

/// Writes collected by the write path and applied all-or-nothing by the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Entry upserts and deletes, the count reported back as `updatedCount`
    pub fn entry_writes(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, WriteOp::UpsertEntry(_) | WriteOp::DeleteEntry { .. }))
            .count()
    }
}
