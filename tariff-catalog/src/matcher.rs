//! Modifier matching
//!
//! Decides which price modifiers apply to a resolution context: active flag,
//! validity window, quantity window, then scope.

use chrono::{DateTime, Datelike, Utc};
use serde_json::json;
use std::collections::BTreeMap;
use tariff_rules::{ConditionContext, ConditionEvaluator};
use tariff_shared::{ModifierScope, PriceModifier};
use uuid::Uuid;

/// Everything a modifier may be matched against
#[derive(Debug, Clone)]
pub struct MatchContext {
    pub product_id: Uuid,
    pub zone_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub quantity: u32,
    pub order_value: f64,
    pub as_of: DateTime<Utc>,
    /// attribute type -> values carried by the product
    pub product_attributes: BTreeMap<String, Vec<String>>,
}

impl MatchContext {
    /// Field map exposed to COMBINATION condition trees.
    ///
    /// `day_of_week` is 0 = Sunday .. 6 = Saturday. Product attributes are
    /// exposed as `attributes.<type>` with comma-joined values.
    pub fn condition_context(&self) -> ConditionContext {
        let mut ctx = ConditionContext::new();
        ctx.insert("productId".to_string(), json!(self.product_id.to_string()));
        if let Some(zone) = self.zone_id {
            ctx.insert("zoneId".to_string(), json!(zone.to_string()));
        }
        if let Some(segment) = self.segment_id {
            ctx.insert("segmentId".to_string(), json!(segment.to_string()));
        }
        if let Some(category) = self.category_id {
            ctx.insert("categoryId".to_string(), json!(category.to_string()));
        }
        ctx.insert("quantity".to_string(), json!(self.quantity));
        ctx.insert("orderValue".to_string(), json!(self.order_value));
        ctx.insert("asOfDate".to_string(), json!(self.as_of.to_rfc3339()));
        ctx.insert(
            "day_of_week".to_string(),
            json!(self.as_of.weekday().num_days_from_sunday()),
        );
        for (kind, values) in &self.product_attributes {
            ctx.insert(format!("attributes.{}", kind), json!(values.join(",")));
        }
        ctx
    }
}

pub struct ModifierMatcher;

impl ModifierMatcher {
    /// Candidates for `ctx`, highest priority first, ties broken by id.
    pub fn applicable<'m, I>(modifiers: I, ctx: &MatchContext) -> Vec<&'m PriceModifier>
    where
        I: IntoIterator<Item = &'m PriceModifier>,
    {
        let condition_ctx = ctx.condition_context();
        let mut matched: Vec<&PriceModifier> = modifiers
            .into_iter()
            .filter(|m| {
                m.is_active
                    && is_time_valid(m, ctx.as_of)
                    && is_quantity_valid(m, ctx.quantity)
                    && matches_scope(m, ctx, &condition_ctx)
            })
            .collect();

        matched.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        tracing::debug!(
            "{} modifier(s) matched product {} at {}",
            matched.len(),
            ctx.product_id,
            ctx.as_of
        );
        matched
    }
}

/// Inclusive `[validFrom, validTo]`, either bound optional
pub fn is_time_valid(modifier: &PriceModifier, as_of: DateTime<Utc>) -> bool {
    modifier.valid_from.map_or(true, |from| as_of >= from)
        && modifier.valid_to.map_or(true, |to| as_of <= to)
}

/// Inclusive `[minQuantity, maxQuantity]`, either bound optional
pub fn is_quantity_valid(modifier: &PriceModifier, quantity: u32) -> bool {
    modifier.min_quantity.map_or(true, |min| quantity >= min)
        && modifier.max_quantity.map_or(true, |max| quantity <= max)
}

pub fn matches_scope(
    modifier: &PriceModifier,
    ctx: &MatchContext,
    condition_ctx: &ConditionContext,
) -> bool {
    match modifier.applies_to {
        ModifierScope::Global => true,
        ModifierScope::Zone => modifier.geo_zone.is_some() && modifier.geo_zone == ctx.zone_id,
        ModifierScope::Segment => {
            modifier.user_segment.is_some() && modifier.user_segment == ctx.segment_id
        }
        ModifierScope::Product => modifier.product == Some(ctx.product_id),
        ModifierScope::Attribute => matches_attribute(modifier, &ctx.product_attributes),
        ModifierScope::Combination => modifier
            .conditions
            .as_ref()
            .is_some_and(|node| ConditionEvaluator::evaluate(node, condition_ctx)),
    }
}

fn matches_attribute(modifier: &PriceModifier, attributes: &BTreeMap<String, Vec<String>>) -> bool {
    let Some(kind) = modifier.attribute_type.as_deref() else {
        return false;
    };
    let Some(values) = attributes.get(kind) else {
        return false;
    };
    match modifier.attribute_value.as_deref() {
        None | Some("") => true,
        Some(wanted) => values.iter().any(|v| v == wanted),
    }
}
