pub mod attributes;
pub mod condition;

pub use attributes::AttributeRuleEngine;
pub use condition::{ConditionContext, ConditionEvaluator};
