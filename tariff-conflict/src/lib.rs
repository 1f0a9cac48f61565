//! Write path for price edits: conflict detection, reconciliation planning
//! and the scope-locked writer that commits the result.

pub mod detector;
pub mod lock;
pub mod resolver;
pub mod writer;

pub use detector::ConflictDetector;
pub use lock::InMemoryScopeLock;
pub use resolver::{ConflictResolver, PriceEdit};
pub use writer::{NewPriceBook, PriceWriter, WriterSettings};
