use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use tariff_shared::{Condition, ConditionNode, Operator};

/// Flat field -> value map a condition tree is evaluated against
pub type ConditionContext = HashMap<String, Value>;

/// Evaluates AND / OR / leaf condition trees
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn evaluate(node: &ConditionNode, context: &ConditionContext) -> bool {
        match node {
            ConditionNode::And(children) => children.iter().all(|c| Self::evaluate(c, context)),
            ConditionNode::Or(children) => children.iter().any(|c| Self::evaluate(c, context)),
            ConditionNode::Leaf(condition) => Self::evaluate_leaf(condition, context),
        }
    }

    fn evaluate_leaf(condition: &Condition, context: &ConditionContext) -> bool {
        let actual = match context.get(&condition.field) {
            Some(v) if !v.is_null() => v,
            // an absent field is "not equal" to anything
            _ => return condition.operator == Operator::NotEquals,
        };
        let expected = &condition.value;

        match condition.operator {
            Operator::Equals => loosely_equal(actual, expected),
            Operator::NotEquals => !loosely_equal(actual, expected),
            Operator::Gt => numeric_cmp(actual, expected) == Some(Ordering::Greater),
            Operator::Lt => numeric_cmp(actual, expected) == Some(Ordering::Less),
            Operator::Gte => matches!(
                numeric_cmp(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lte => matches!(
                numeric_cmp(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::In => members(expected).iter().any(|m| loosely_equal(actual, m)),
            Operator::Contains => as_text(actual).contains(as_text(expected).as_str()),
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric equality when both sides look numeric, string equality otherwise.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => as_text(a) == as_text(b),
    }
}

fn numeric_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    let (x, y) = (as_number(a)?, as_number(b)?);
    x.partial_cmp(&y)
}

/// Right-hand side of IN: an array, or a comma-separated string.
fn members(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(pairs: &[(&str, Value)]) -> ConditionContext {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn leaf(field: &str, operator: Operator, value: Value) -> ConditionNode {
        ConditionNode::leaf(field, operator, value)
    }

    #[test]
    fn test_and_of_or() {
        let node: ConditionNode = serde_json::from_value(json!({
            "AND": [{"OR": [{"field": "x", "operator": "EQUALS", "value": "1"}]}]
        }))
        .unwrap();
        assert!(ConditionEvaluator::evaluate(&node, &ctx(&[("x", json!("1"))])));
        assert!(!ConditionEvaluator::evaluate(&node, &ctx(&[("x", json!("2"))])));
    }

    #[test]
    fn test_five_levels_deep() {
        // AND > OR > AND > OR > leaf, with a failing sibling at every OR level
        let deep = ConditionNode::And(vec![ConditionNode::Or(vec![
            leaf("zone", Operator::Equals, json!("nowhere")),
            ConditionNode::And(vec![
                leaf("quantity", Operator::Gte, json!(10)),
                ConditionNode::Or(vec![
                    leaf("segment", Operator::Equals, json!("retail")),
                    ConditionNode::And(vec![leaf("day_of_week", Operator::In, json!("0,6"))]),
                ]),
            ]),
        ])]);

        let weekend = ctx(&[("quantity", json!(12)), ("day_of_week", json!(6))]);
        assert!(ConditionEvaluator::evaluate(&deep, &weekend));

        let weekday = ctx(&[("quantity", json!(12)), ("day_of_week", json!(3))]);
        assert!(!ConditionEvaluator::evaluate(&deep, &weekday));

        let small = ctx(&[("quantity", json!(2)), ("day_of_week", json!(6))]);
        assert!(!ConditionEvaluator::evaluate(&deep, &small));
    }

    #[test]
    fn test_empty_groups() {
        let empty = ctx(&[]);
        assert!(ConditionEvaluator::evaluate(&ConditionNode::And(vec![]), &empty));
        assert!(!ConditionEvaluator::evaluate(&ConditionNode::Or(vec![]), &empty));
    }

    #[test]
    fn test_missing_field() {
        let empty = ctx(&[("other", json!(null))]);
        assert!(!ConditionEvaluator::evaluate(&leaf("x", Operator::Equals, json!("1")), &empty));
        assert!(ConditionEvaluator::evaluate(&leaf("x", Operator::NotEquals, json!("1")), &empty));
        assert!(!ConditionEvaluator::evaluate(&leaf("x", Operator::Gt, json!(0)), &empty));
        assert!(!ConditionEvaluator::evaluate(&leaf("other", Operator::In, json!("a")), &empty));
        assert!(ConditionEvaluator::evaluate(&leaf("other", Operator::NotEquals, json!("a")), &empty));
    }

    #[test]
    fn test_numeric_coercion() {
        let c = ctx(&[("quantity", json!("10")), ("price", json!(99.5))]);
        assert!(ConditionEvaluator::evaluate(&leaf("quantity", Operator::Equals, json!(10)), &c));
        assert!(ConditionEvaluator::evaluate(&leaf("quantity", Operator::Equals, json!("10.0")), &c));
        assert!(ConditionEvaluator::evaluate(&leaf("price", Operator::Lt, json!("100")), &c));
        assert!(ConditionEvaluator::evaluate(&leaf("price", Operator::Gte, json!(99.5)), &c));
        assert!(!ConditionEvaluator::evaluate(&leaf("price", Operator::Gt, json!(99.5)), &c));
    }

    #[test]
    fn test_non_numeric_comparison_is_false() {
        let c = ctx(&[("name", json!("glossy"))]);
        assert!(!ConditionEvaluator::evaluate(&leaf("name", Operator::Gt, json!(1)), &c));
        assert!(!ConditionEvaluator::evaluate(&leaf("name", Operator::Lte, json!("z")), &c));
    }

    #[test]
    fn test_in_and_contains() {
        let c = ctx(&[("zone", json!("KA")), ("paper", json!("matte-300gsm"))]);
        assert!(ConditionEvaluator::evaluate(&leaf("zone", Operator::In, json!("MH, KA ,TN")), &c));
        assert!(ConditionEvaluator::evaluate(&leaf("zone", Operator::In, json!(["KA", "DL"])), &c));
        assert!(!ConditionEvaluator::evaluate(&leaf("zone", Operator::In, json!(["DL"])), &c));
        assert!(ConditionEvaluator::evaluate(&leaf("paper", Operator::Contains, json!("300")), &c));
        assert!(!ConditionEvaluator::evaluate(&leaf("paper", Operator::Contains, json!("gloss")), &c));
    }
}
