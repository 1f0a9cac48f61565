//! Field-tagged validation run at the write boundary, before anything is
//! planned or committed.

use serde::Serialize;
use tariff_shared::{
    AttributeRule, GeoZone, ModifierScope, PriceModifier, ProductAttribute,
};

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub(crate) fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects violations and turns them into a single `ValidationError`
#[derive(Debug, Default)]
pub struct Violations(Vec<FieldError>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.0.push(FieldError::new(field, message));
        }
    }

    pub fn into_result(self) -> CoreResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(CoreError::ValidationError(self.0))
        }
    }
}

pub fn validate_modifier(modifier: &PriceModifier) -> CoreResult<()> {
    let mut v = Violations::new();

    if modifier.modifier_type.is_percent() {
        v.check(
            (0.0..=100.0).contains(&modifier.value),
            "value",
            "percentage must be between 0 and 100",
        );
    } else {
        v.check(modifier.value >= 0.0, "value", "flat amount must not be negative");
    }
    v.check(modifier.value.is_finite(), "value", "must be a finite number");

    if let (Some(min), Some(max)) = (modifier.min_quantity, modifier.max_quantity) {
        v.check(max >= min, "maxQuantity", "must be greater than or equal to minQuantity");
    }
    if let (Some(from), Some(to)) = (modifier.valid_from, modifier.valid_to) {
        v.check(to > from, "validTo", "must be after validFrom");
    }

    match modifier.applies_to {
        ModifierScope::Global => {}
        ModifierScope::Zone => {
            v.check(modifier.geo_zone.is_some(), "geoZone", "required for ZONE modifiers")
        }
        ModifierScope::Segment => v.check(
            modifier.user_segment.is_some(),
            "userSegment",
            "required for SEGMENT modifiers",
        ),
        ModifierScope::Product => {
            v.check(modifier.product.is_some(), "product", "required for PRODUCT modifiers")
        }
        ModifierScope::Attribute => v.check(
            modifier
                .attribute_type
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty()),
            "attributeType",
            "required for ATTRIBUTE modifiers",
        ),
        ModifierScope::Combination => v.check(
            modifier.conditions.is_some(),
            "conditions",
            "required for COMBINATION modifiers",
        ),
    }
    if modifier.applies_to != ModifierScope::Combination {
        v.check(
            modifier.conditions.is_none(),
            "conditions",
            "only allowed on COMBINATION modifiers",
        );
    }

    v.into_result()
}

pub fn validate_price(base_price: f64, compare_at_price: Option<f64>) -> CoreResult<()> {
    let mut v = Violations::new();
    v.check(
        base_price.is_finite() && base_price >= 0.0,
        "basePrice",
        "must be a non-negative number",
    );
    if let Some(compare_at) = compare_at_price {
        v.check(
            compare_at >= base_price,
            "compareAtPrice",
            "must be greater than or equal to basePrice",
        );
    }
    v.into_result()
}

pub fn validate_zone(zone: &GeoZone) -> CoreResult<()> {
    let mut v = Violations::new();
    v.check(!zone.code.trim().is_empty(), "code", "must not be empty");
    v.check(
        zone.pincode_ranges.iter().all(|r| r.start <= r.end),
        "pincodeRanges",
        "range start must not exceed its end",
    );
    v.check(
        zone.overlapping_ranges().is_none(),
        "pincodeRanges",
        "ranges within a zone must not overlap",
    );
    v.into_result()
}

/// Every rule action must target a known attribute.
pub fn validate_rules(attributes: &[ProductAttribute], rules: &[AttributeRule]) -> CoreResult<()> {
    let mut errors = Vec::new();
    for (i, rule) in rules.iter().enumerate() {
        if !rule.when.is_quantity_condition {
            let known = rule
                .when
                .attribute
                .as_deref()
                .is_some_and(|a| attributes.iter().any(|attr| attr.id == a));
            if !known {
                errors.push(FieldError::new(
                    &format!("rules[{}].when.attribute", i),
                    "must reference an existing attribute",
                ));
            }
        }
        for (j, action) in rule.then.iter().enumerate() {
            if !attributes.iter().any(|a| a.id == action.target_attribute) {
                errors.push(FieldError::new(
                    &format!("rules[{}].then[{}].targetAttribute", i, j),
                    "must reference an existing attribute",
                ));
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CoreError::ValidationError(errors))
    }
}
