use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tariff_core::{CoreResult, PricingSnapshot};
use tariff_shared::{ModifierType, PriceModifier};
use uuid::Uuid;

use crate::matcher::{MatchContext, ModifierMatcher};
use crate::money::{to_decimal, to_f64};
use crate::resolver::{BasePrice, PriceBookResolver};

/// Read-time pricing request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuery {
    pub product_id: Uuid,
    pub zone_id: Option<Uuid>,
    pub segment_id: Option<Uuid>,
    pub quantity: u32,
    pub as_of: DateTime<Utc>,
}

/// One applied modifier step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub modifier_id: Uuid,
    pub name: String,
    pub modifier_type: ModifierType,
    pub value: f64,
    /// Signed change to the running price
    pub delta: f64,
    pub resulting_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base: BasePrice,
    pub quantity: u32,
    pub adjustments: Vec<Adjustment>,
    /// Unit price after modifiers
    pub final_price: f64,
    pub line_total: f64,
}

/// Composes base price resolution with modifier stacking.
///
/// Pure over the snapshot it is built from.
pub struct PriceResolutionEngine<'a> {
    snapshot: &'a PricingSnapshot,
}

impl<'a> PriceResolutionEngine<'a> {
    pub fn new(snapshot: &'a PricingSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn resolve(&self, query: &PriceQuery) -> CoreResult<PriceBreakdown> {
        let base = PriceBookResolver::new(self.snapshot).base_price(
            query.product_id,
            query.zone_id,
            query.segment_id,
        )?;

        let profile = self.snapshot.products.get(&query.product_id);
        let ctx = MatchContext {
            product_id: query.product_id,
            zone_id: query.zone_id,
            segment_id: query.segment_id,
            category_id: profile.and_then(|p| p.category_id),
            quantity: query.quantity,
            order_value: to_f64(to_decimal(base.amount) * Decimal::from(query.quantity)),
            as_of: query.as_of,
            product_attributes: profile.map(|p| p.attributes.clone()).unwrap_or_default(),
        };
        let candidates = ModifierMatcher::applicable(self.snapshot.modifiers(), &ctx);
        let to_apply = select_by_stacking(candidates);

        let mut running = to_decimal(base.amount);
        let mut adjustments = Vec::with_capacity(to_apply.len());
        for modifier in to_apply {
            let next = apply_modifier(running, modifier);
            adjustments.push(Adjustment {
                modifier_id: modifier.id,
                name: modifier.name.clone(),
                modifier_type: modifier.modifier_type,
                value: modifier.value,
                delta: to_f64(next - running),
                resulting_price: to_f64(next),
            });
            running = next;
        }

        tracing::debug!(
            "Resolved product {}: base {} -> final {} ({} adjustment(s))",
            query.product_id,
            base.amount,
            to_f64(running),
            adjustments.len()
        );

        Ok(PriceBreakdown {
            base,
            quantity: query.quantity,
            adjustments,
            final_price: to_f64(running),
            line_total: to_f64(running * Decimal::from(query.quantity)),
        })
    }
}

/// Stacking policy over priority-ordered candidates.
///
/// Any non-stackable candidate wins alone (the highest-priority one);
/// otherwise every stackable candidate applies, in order.
pub fn select_by_stacking(candidates: Vec<&PriceModifier>) -> Vec<&PriceModifier> {
    let (non_stackable, stackable): (Vec<&PriceModifier>, Vec<&PriceModifier>) =
        candidates.into_iter().partition(|m| !m.is_stackable);

    match non_stackable.first() {
        Some(winner) => vec![*winner],
        None => stackable,
    }
}

/// One modifier step against the running price, clamped at zero.
pub fn apply_modifier(running: Decimal, modifier: &PriceModifier) -> Decimal {
    let value = to_decimal(modifier.value);
    let magnitude = if modifier.modifier_type.is_percent() {
        running * value / Decimal::ONE_HUNDRED
    } else {
        value
    };
    let next = if modifier.modifier_type.is_increase() {
        running + magnitude
    } else {
        running - magnitude
    };
    next.max(Decimal::ZERO)
}
