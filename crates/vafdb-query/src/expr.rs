//! Filter expression trees.
//!
//! An [`Expr`] is a boolean tree of leaves. Parsing produces
//! `Expr<RawLeaf>` (unvalidated `field__lookup` keys and raw strings);
//! [`validate`](crate::validate) rebuilds the same shape as `Expr<Clause>`.
//!
//! Expression mode takes JSON where every node is a single-key object:
//!
//! ```text
//! {"&": [ {"coverage__gte": 20}, {"~": [ {"pathogen": "mpxv"} ]} ]}
//! ```
//!
//! `&`, `|` and `^` take non-empty arrays, `~` takes exactly one child, and
//! any other key is a leaf.

use std::fmt;

use serde_json::Value as Json;

use crate::error::{QueryError, ValidationErrors, NON_FIELD_ERRORS};

pub const AND: &str = "&";
pub const OR: &str = "|";
pub const XOR: &str = "^";
pub const NOT: &str = "~";

/// Boolean expression over leaves of type `L`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<L> {
    Leaf(L),
    And(Vec<Expr<L>>),
    Or(Vec<Expr<L>>),
    Xor(Vec<Expr<L>>),
    Not(Box<Expr<L>>),
}

impl<L> Expr<L> {
    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Expr::Leaf(_) => 1,
            Expr::And(children) | Expr::Or(children) | Expr::Xor(children) => {
                children.iter().map(Expr::leaf_count).sum()
            }
            Expr::Not(child) => child.leaf_count(),
        }
    }

    /// Visits leaves left to right.
    pub fn leaves(&self) -> Vec<&L> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a L>) {
        match self {
            Expr::Leaf(leaf) => out.push(leaf),
            Expr::And(children) | Expr::Or(children) | Expr::Xor(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            Expr::Not(child) => child.collect_leaves(out),
        }
    }
}

/// Prefix rendering: `&(a, |(b, c))`.
impl<L: fmt::Display> fmt::Display for Expr<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (op, children) = match self {
            Expr::Leaf(leaf) => return write!(f, "{leaf}"),
            Expr::Not(child) => return write!(f, "{NOT}({child})"),
            Expr::And(children) => (AND, children),
            Expr::Or(children) => (OR, children),
            Expr::Xor(children) => (XOR, children),
        };
        write!(f, "{op}(")?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}

/// Unvalidated leaf: a `field__lookup` key and its raw value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawLeaf {
    pub key: String,
    pub raw: String,
}

impl RawLeaf {
    pub fn new(key: impl Into<String>, raw: impl Into<String>) -> Self {
        RawLeaf {
            key: key.into(),
            raw: raw.into(),
        }
    }
}

impl fmt::Display for RawLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:?}", self.key, self.raw)
    }
}

/// Builds a simple-mode tree: every `(key, value)` pair becomes a leaf and
/// all leaves are ANDed. Repeated pairs are kept once, in first-seen order.
pub fn parse_simple<K, V, I>(pairs: I) -> Expr<RawLeaf>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut leaves: Vec<Expr<RawLeaf>> = Vec::new();
    for (key, value) in pairs {
        let leaf = Expr::Leaf(RawLeaf::new(key, value));
        if !leaves.contains(&leaf) {
            leaves.push(leaf);
        }
    }
    Expr::And(leaves)
}

/// Parses an expression-mode JSON document.
///
/// Every structural problem in the document is reported, not just the
/// first one.
pub fn parse_expression(json: &Json) -> Result<Expr<RawLeaf>, ValidationErrors> {
    match parse_expression_partial(json) {
        (Some(expr), errors) if errors.is_empty() => Ok(expr),
        (_, errors) => Err(errors),
    }
}

/// Parses whatever is well formed in an expression-mode document.
///
/// Malformed nodes are reported and left out of the returned tree so the
/// surviving leaves can still be validated. The tree is only a faithful
/// filter when no errors were reported.
pub fn parse_expression_partial(json: &Json) -> (Option<Expr<RawLeaf>>, ValidationErrors) {
    let mut errors = ValidationErrors::new();
    let expr = parse_node(json, &mut errors);
    (expr, errors)
}

fn parse_node(json: &Json, errors: &mut ValidationErrors) -> Option<Expr<RawLeaf>> {
    let Some(object) = json.as_object() else {
        errors.push(
            NON_FIELD_ERRORS,
            QueryError::Malformed(format!("Expected an object, found {}.", json_type(json))),
        );
        return None;
    };
    let mut entries = object.iter();
    let (key, value) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        _ => {
            errors.push(
                NON_FIELD_ERRORS,
                QueryError::Malformed(format!(
                    "Expected exactly one key per object, found {}.",
                    object.len()
                )),
            );
            return None;
        }
    };

    match key.as_str() {
        AND | OR | XOR | NOT => parse_combinator(key, value, errors),
        _ => parse_leaf(key, value, errors),
    }
}

fn parse_combinator(key: &str, value: &Json, errors: &mut ValidationErrors) -> Option<Expr<RawLeaf>> {
    let Some(items) = value.as_array() else {
        errors.push(
            key,
            QueryError::Malformed(format!("Expected a list, found {}.", json_type(value))),
        );
        return None;
    };

    if key == NOT && items.len() != 1 {
        errors.push(
            key,
            QueryError::Malformed(format!(
                "Expected exactly one operand, found {}.",
                items.len()
            )),
        );
    } else if items.is_empty() {
        errors.push(key, QueryError::Malformed("Expected at least one operand.".to_string()));
    }

    // Children are parsed even when the operand count is wrong so their
    // own errors are reported too.
    let mut children: Vec<Expr<RawLeaf>> = items
        .iter()
        .filter_map(|item| parse_node(item, errors))
        .collect();

    match key {
        NOT if children.len() == 1 => children.pop().map(|child| Expr::Not(Box::new(child))),
        _ if children.is_empty() => None,
        // A `~` with the wrong operand count is already reported; its
        // children are kept for validation only.
        AND | NOT => Some(Expr::And(children)),
        OR => Some(Expr::Or(children)),
        _ => Some(Expr::Xor(children)),
    }
}

fn parse_leaf(key: &str, value: &Json, errors: &mut ValidationErrors) -> Option<Expr<RawLeaf>> {
    let raw = match value {
        Json::Array(items) => {
            let parts: Option<Vec<String>> = items.iter().map(scalar_text).collect();
            parts.map(|parts| parts.join(","))
        }
        other => scalar_text(other),
    };
    match raw {
        Some(raw) => Some(Expr::Leaf(RawLeaf::new(key, raw))),
        None => {
            errors.push(
                key,
                QueryError::Malformed(format!(
                    "Expected a string, number or boolean, found {}.",
                    json_type(value)
                )),
            );
            None
        }
    }
}

fn scalar_text(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_type(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "a list",
        Json::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf(key: &str, raw: &str) -> Expr<RawLeaf> {
        Expr::Leaf(RawLeaf::new(key, raw))
    }

    #[test]
    fn simple_mode_ands_and_dedups() {
        let expr = parse_simple([
            ("coverage__gte", "20"),
            ("pathogen", "mpxv"),
            ("coverage__gte", "20"),
            ("coverage__gte", "30"),
        ]);
        assert_eq!(
            expr,
            Expr::And(vec![
                leaf("coverage__gte", "20"),
                leaf("pathogen", "mpxv"),
                leaf("coverage__gte", "30"),
            ])
        );
    }

    #[test]
    fn simple_mode_without_pairs_is_empty_and() {
        let expr = parse_simple(Vec::<(String, String)>::new());
        assert_eq!(expr, Expr::And(vec![]));
    }

    #[test]
    fn nested_expression() {
        let expr = parse_expression(&json!({
            "|": [
                {"coverage__lt": 10},
                {"&": [{"pathogen": "mpxv"}, {"~": [{"suppressed": true}]}]}
            ]
        }))
        .unwrap();
        assert_eq!(
            expr,
            Expr::Or(vec![
                leaf("coverage__lt", "10"),
                Expr::And(vec![
                    leaf("pathogen", "mpxv"),
                    Expr::Not(Box::new(leaf("suppressed", "true"))),
                ]),
            ])
        );
        assert_eq!(expr.leaf_count(), 3);
    }

    #[test]
    fn bare_leaf_at_top_level() {
        let expr = parse_expression(&json!({"coverage": 20})).unwrap();
        assert_eq!(expr, leaf("coverage", "20"));
    }

    #[test]
    fn array_values_are_joined() {
        let expr = parse_expression(&json!({"position__in": [1, 2, 3]})).unwrap();
        assert_eq!(expr, leaf("position__in", "1,2,3"));
    }

    #[test]
    fn floats_keep_their_text() {
        let expr = parse_expression(&json!({"pc_a__gt": 0.25})).unwrap();
        assert_eq!(expr, leaf("pc_a__gt", "0.25"));
    }

    #[test]
    fn not_needs_exactly_one_child() {
        let errors = parse_expression(&json!({"~": [{"a": 1}, {"b": 2}]})).unwrap_err();
        assert_eq!(errors.for_field(NOT).count(), 1);
        let errors = parse_expression(&json!({"~": []})).unwrap_err();
        assert_eq!(errors.for_field(NOT).count(), 1);
    }

    #[test]
    fn empty_combinator_rejected() {
        let errors = parse_expression(&json!({"&": []})).unwrap_err();
        assert_eq!(
            errors.for_field(AND).next(),
            Some(&QueryError::Malformed("Expected at least one operand.".into()))
        );
    }

    #[test]
    fn structural_errors_accumulate() {
        let errors = parse_expression(&json!({
            "&": [
                {"a": 1, "b": 2},
                {"c": null},
                "oops",
                {"|": {"d": 1}}
            ]
        }))
        .unwrap_err();
        assert_eq!(errors.for_field(NON_FIELD_ERRORS).count(), 2);
        assert_eq!(errors.for_field("c").count(), 1);
        assert_eq!(errors.for_field(OR).count(), 1);
    }

    #[test]
    fn partial_tree_keeps_well_formed_leaves() {
        let (expr, errors) = parse_expression_partial(&json!({
            "&": [
                {"bogus_field": "1"},
                {"~": []},
                {"|": [{"coverage": 5}, "oops"]}
            ]
        }));
        assert_eq!(
            expr,
            Some(Expr::And(vec![
                leaf("bogus_field", "1"),
                Expr::Or(vec![leaf("coverage", "5")]),
            ]))
        );
        assert_eq!(errors.for_field(NOT).count(), 1);
        assert_eq!(errors.for_field(NON_FIELD_ERRORS).count(), 1);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn partial_tree_of_clean_document_has_no_errors() {
        let (expr, errors) = parse_expression_partial(&json!({"~": [{"coverage": 5}]}));
        assert_eq!(expr, Some(Expr::Not(Box::new(leaf("coverage", "5")))));
        assert!(errors.is_empty());
    }

    #[test]
    fn object_leaf_values_rejected() {
        let errors = parse_expression(&json!({"coverage": {"gte": 1}})).unwrap_err();
        assert_eq!(errors.for_field("coverage").count(), 1);
    }

    #[test]
    fn display_is_prefix_notation() {
        let expr = Expr::And(vec![
            leaf("a", "1"),
            Expr::Not(Box::new(Expr::Or(vec![leaf("b", "2"), leaf("c", "3")]))),
        ]);
        assert_eq!(expr.to_string(), r#"&(a="1", ~(|(b="2", c="3")))"#);
    }
}
