use std::collections::BTreeMap;
use tariff_shared::{
    AttributeRule, AttributeState, ProductAttribute, QuantityConstraint, RuleAction,
    RuleActionKind, RuleCondition, RuleOutcome,
};

/// Applies show/hide/restrict/default/quantity rules to a product's options.
///
/// Rules run highest priority first and every matching action overwrites
/// the field it targets, so a lower-priority rule that also matches has the
/// final say on that field.
pub struct AttributeRuleEngine {
    rules: Vec<AttributeRule>,
}

impl AttributeRuleEngine {
    pub fn new(rules: Vec<AttributeRule>) -> Self {
        let mut rules = rules;
        // stable: equal priorities keep authoring order
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { rules }
    }

    pub fn apply(
        &self,
        attributes: &[ProductAttribute],
        selected_values: &BTreeMap<String, String>,
        quantity: u32,
    ) -> RuleOutcome {
        let mut states: Vec<AttributeState> = attributes.iter().map(initial_state).collect();

        for rule in &self.rules {
            if !condition_holds(&rule.when, attributes, selected_values, quantity) {
                continue;
            }

            for action in &rule.then {
                let Some(idx) = attributes.iter().position(|a| a.id == action.target_attribute)
                else {
                    tracing::warn!(
                        "Rule {:?} targets unknown attribute {}, skipping action",
                        rule.name,
                        action.target_attribute
                    );
                    continue;
                };
                apply_action(&mut states[idx], &attributes[idx], action);
            }
        }

        // Cascade: hidden or no-longer-allowed selections are dropped
        let mut selected = selected_values.clone();
        for state in &states {
            let stale = selected.get(&state.id).is_some_and(|value| {
                !state.is_visible || (state.is_restricted && !state.allowed_values.contains(value))
            });
            if stale {
                selected.remove(&state.id);
            }
        }

        RuleOutcome {
            attributes: states,
            selected_values: selected,
        }
    }
}

/// One-shot form of [`AttributeRuleEngine::apply`].
pub fn apply(
    attributes: &[ProductAttribute],
    rules: &[AttributeRule],
    selected_values: &BTreeMap<String, String>,
    quantity: u32,
) -> RuleOutcome {
    AttributeRuleEngine::new(rules.to_vec()).apply(attributes, selected_values, quantity)
}

fn initial_state(attribute: &ProductAttribute) -> AttributeState {
    AttributeState {
        id: attribute.id.clone(),
        name: attribute.name.clone(),
        is_visible: true,
        allowed_values: attribute.values.clone(),
        default_value: attribute.default_value.clone(),
        is_restricted: false,
        quantity: None,
    }
}

fn condition_holds(
    when: &RuleCondition,
    attributes: &[ProductAttribute],
    selected_values: &BTreeMap<String, String>,
    quantity: u32,
) -> bool {
    if when.is_quantity_condition {
        let min = when.min_quantity.unwrap_or(0);
        let max = when.max_quantity.unwrap_or(u32::MAX);
        return min <= quantity && quantity <= max;
    }

    let Some(attribute) = when.attribute.as_deref() else {
        return false;
    };
    if !attributes.iter().any(|a| a.id == attribute) {
        return false;
    }
    let expected = when.value.as_deref().unwrap_or("");
    selected_values.get(attribute).map(String::as_str) == Some(expected)
}

fn apply_action(state: &mut AttributeState, original: &ProductAttribute, action: &RuleAction) {
    match action.action {
        RuleActionKind::Show => state.is_visible = true,
        RuleActionKind::Hide => state.is_visible = false,
        RuleActionKind::ShowOnly => {
            let wanted = action.allowed_values.as_deref().unwrap_or(&[]);
            state.allowed_values = original
                .values
                .iter()
                .filter(|v| wanted.contains(v))
                .cloned()
                .collect();
            state.is_restricted = true;
        }
        RuleActionKind::SetDefault => {
            if let Some(value) = &action.default_value {
                if state.allowed_values.is_empty() || state.allowed_values.contains(value) {
                    state.default_value = Some(value.clone());
                }
            }
        }
        RuleActionKind::Quantity => {
            state.quantity = Some(QuantityConstraint {
                min: action.min_quantity,
                max: action.max_quantity,
                step: action.step_quantity,
            });
        }
    }
}
