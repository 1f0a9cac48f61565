use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::condition::ConditionNode;
use super::default_true;

/// What a modifier is restricted to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierScope {
    Global,
    Zone,
    Segment,
    Product,
    Attribute,
    Combination,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierType {
    PercentInc,
    PercentDec,
    FlatInc,
    FlatDec,
}

impl ModifierType {
    pub fn is_percent(&self) -> bool {
        matches!(self, ModifierType::PercentInc | ModifierType::PercentDec)
    }

    pub fn is_increase(&self) -> bool {
        matches!(self, ModifierType::PercentInc | ModifierType::FlatInc)
    }
}

/// Price adjustment applied on top of the resolved base price
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceModifier {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub applies_to: ModifierScope,
    pub modifier_type: ModifierType,
    /// Percentage (30 = 30%) or flat amount
    pub value: f64,
    #[serde(default)]
    pub geo_zone: Option<Uuid>,
    #[serde(default)]
    pub user_segment: Option<Uuid>,
    #[serde(default)]
    pub product: Option<Uuid>,
    #[serde(default)]
    pub attribute_type: Option<String>,
    #[serde(default)]
    pub attribute_value: Option<String>,
    #[serde(default)]
    pub min_quantity: Option<u32>,
    #[serde(default)]
    pub max_quantity: Option<u32>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_to: Option<DateTime<Utc>>,
    /// Higher is evaluated first
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_stackable: bool,
    #[serde(default)]
    pub conditions: Option<ConditionNode>,
}

impl PriceModifier {
    /// A bare active, stackable modifier with no scope refs or windows.
    pub fn new(applies_to: ModifierScope, modifier_type: ModifierType, value: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            applies_to,
            modifier_type,
            value,
            geo_zone: None,
            user_segment: None,
            product: None,
            attribute_type: None,
            attribute_value: None,
            min_quantity: None,
            max_quantity: None,
            valid_from: None,
            valid_to: None,
            priority: 0,
            is_active: true,
            is_stackable: true,
            conditions: None,
        }
    }
}
