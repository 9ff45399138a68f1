//! Leaf validation against the schema registry.

use crate::clause::Clause;
use crate::coerce::coerce;
use crate::error::{QueryError, ValidationErrors};
use crate::expr::{Expr, RawLeaf};
use crate::lookup::Lookup;
use crate::schema::Registry;

/// Validates every leaf of `expr`, returning a tree of the same shape.
///
/// All leaves are checked; errors are reported against the leaf's
/// original key in tree order.
pub fn validate(expr: &Expr<RawLeaf>, registry: &Registry) -> Result<Expr<Clause>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let validated = rebuild(expr, registry, &mut errors);
    match validated {
        Some(tree) if errors.is_empty() => Ok(tree),
        _ => Err(errors),
    }
}

/// Validates a single leaf.
pub fn validate_leaf(leaf: &RawLeaf, registry: &Registry) -> Result<Clause, QueryError> {
    let (name, lookup) = Lookup::split_key(&leaf.key);
    let spec = registry.resolve(name).ok_or(QueryError::UnknownField)?;
    if !registry.is_lookup_allowed(spec, lookup) {
        return Err(QueryError::UnsupportedLookup {
            lookup: lookup.to_string(),
            kind: spec.kind,
        });
    }
    let value = coerce(spec, lookup, &leaf.raw)?;
    Ok(Clause {
        path: spec.path(),
        kind: spec.kind,
        lookup,
        value,
    })
}

fn rebuild(expr: &Expr<RawLeaf>, registry: &Registry, errors: &mut ValidationErrors) -> Option<Expr<Clause>> {
    match expr {
        Expr::Leaf(leaf) => match validate_leaf(leaf, registry) {
            Ok(clause) => Some(Expr::Leaf(clause)),
            Err(err) => {
                errors.push(leaf.key.clone(), err);
                None
            }
        },
        Expr::And(children) => rebuild_all(children, registry, errors).map(Expr::And),
        Expr::Or(children) => rebuild_all(children, registry, errors).map(Expr::Or),
        Expr::Xor(children) => rebuild_all(children, registry, errors).map(Expr::Xor),
        Expr::Not(child) => rebuild(child, registry, errors).map(|c| Expr::Not(Box::new(c))),
    }
}

fn rebuild_all(
    children: &[Expr<RawLeaf>],
    registry: &Registry,
    errors: &mut ValidationErrors,
) -> Option<Vec<Expr<Clause>>> {
    // Collect into a Vec first so every child is visited.
    let rebuilt: Vec<Option<Expr<Clause>>> = children
        .iter()
        .map(|child| rebuild(child, registry, errors))
        .collect();
    rebuilt.into_iter().collect()
}
