pub mod batch;
pub mod repository;
pub mod snapshot;
pub mod validation;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use batch::{WriteBatch, WriteOp};
pub use repository::{PricingStore, ScopeKey, ScopeLock};
pub use snapshot::PricingSnapshot;
pub use validation::FieldError;

use tariff_shared::ConflictReport;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {}", validation::summarize(.0))]
    ValidationError(Vec<FieldError>),
    #[error("Product not priced: {0}")]
    ProductNotPriced(Uuid),
    /// Not a failure: the write was withheld until the caller picks a strategy
    #[error("Conflict requires resolution: {} finer-scope override(s)", .0.affected_count)]
    ConflictRequiresResolution(Box<ConflictReport>),
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),
    #[error("Atomic write failed, batch rolled back: {0}")]
    AtomicWriteFailure(String),
    #[error("Deadline exceeded before commit")]
    DeadlineExceeded,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl CoreError {
    /// Whether the caller may safely retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::ConcurrentModification(_)
                | CoreError::AtomicWriteFailure(_)
                | CoreError::DeadlineExceeded
        )
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        CoreError::ValidationError(vec![FieldError::new(field, message)])
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
