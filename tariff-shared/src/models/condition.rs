use serde::{Deserialize, Serialize};

/// Comparison operator of a leaf condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
    NotEquals,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    Contains,
}

/// `context[field] <operator> value`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: serde_json::Value,
}

/// Boolean condition tree.
///
/// On the wire a group is `{"AND": [...]}` / `{"OR": [...]}` and a leaf is a
/// bare `{"field", "operator", "value"}` object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ConditionNode {
    #[serde(rename = "AND")]
    And(Vec<ConditionNode>),
    #[serde(rename = "OR")]
    Or(Vec<ConditionNode>),
    #[serde(untagged)]
    Leaf(Condition),
}

impl ConditionNode {
    pub fn leaf(field: &str, operator: Operator, value: serde_json::Value) -> Self {
        ConditionNode::Leaf(Condition {
            field: field.to_string(),
            operator,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_tree_from_json() {
        let node: ConditionNode = serde_json::from_value(json!({
            "AND": [
                {"OR": [{"field": "x", "operator": "EQUALS", "value": "1"}]},
                {"field": "quantity", "operator": "GTE", "value": 10}
            ]
        }))
        .unwrap();

        let ConditionNode::And(children) = node else {
            panic!("expected AND at the root");
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(&children[0], ConditionNode::Or(inner) if inner.len() == 1));
        assert_eq!(
            children[1],
            ConditionNode::leaf("quantity", Operator::Gte, json!(10))
        );
    }
}
