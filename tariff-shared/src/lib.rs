pub mod models;

pub use models::attribute::{
    AttributeRule, AttributeState, ProductAttribute, QuantityConstraint, RuleAction,
    RuleActionKind, RuleCondition, RuleOutcome,
};
pub use models::condition::{Condition, ConditionNode, Operator};
pub use models::conflict::{
    ConflictReport, ImpactSummary, PriceConflict, ResolutionOption, ResolutionOutcome,
    ResolutionStrategy, ScopeRef,
};
pub use models::modifier::{ModifierScope, ModifierType, PriceModifier};
pub use models::pricebook::{PriceBook, PriceBookEntry, Scope, ScopeLevel};
pub use models::product::ProductProfile;
pub use models::zone::{GeoZone, PincodeRange, UserSegment, ZoneLevel};
