pub mod matcher;
pub mod money;
pub mod pricing;
pub mod resolver;

pub use matcher::{MatchContext, ModifierMatcher};
pub use pricing::{Adjustment, PriceBreakdown, PriceQuery, PriceResolutionEngine};
pub use resolver::{BasePrice, PriceBookResolver};
