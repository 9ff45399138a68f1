//! Lowering validated trees onto a store's predicate primitives.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::clause::Clause;
use crate::expr::Expr;

/// Composition primitives a record store exposes for filtering.
///
/// Implementors only need `everything`, `leaf`, `and`, `or` and `not`;
/// `xor` defaults to `(a ∨ b) ∧ ¬(a ∧ b)`.
pub trait PredicateBuilder {
    type Predicate: Clone;

    /// Matches every record.
    fn everything(&self) -> Self::Predicate;

    /// Lowers one validated leaf. The clause's path says which relation to
    /// traverse.
    fn leaf(&self, clause: &Clause) -> Self::Predicate;

    fn and(&self, a: Self::Predicate, b: Self::Predicate) -> Self::Predicate;

    fn or(&self, a: Self::Predicate, b: Self::Predicate) -> Self::Predicate;

    fn not(&self, a: Self::Predicate) -> Self::Predicate;

    fn xor(&self, a: Self::Predicate, b: Self::Predicate) -> Self::Predicate {
        let either = self.or(a.clone(), b.clone());
        let both = self.and(a, b);
        self.and(either, self.not(both))
    }
}

/// Compiles a validated tree into a predicate.
///
/// Children of `And`, `Or` and `Xor` fold left to right. An empty `And`
/// matches everything; an empty `Or` or `Xor` matches nothing.
pub fn compile<B: PredicateBuilder + ?Sized>(expr: &Expr<Clause>, builder: &B) -> B::Predicate {
    match expr {
        Expr::Leaf(clause) => builder.leaf(clause),
        Expr::Not(child) => builder.not(compile(child.as_ref(), builder)),
        Expr::And(children) => fold(children, builder, B::and).unwrap_or_else(|| builder.everything()),
        Expr::Or(children) => fold(children, builder, B::or).unwrap_or_else(|| nothing(builder)),
        Expr::Xor(children) => fold(children, builder, B::xor).unwrap_or_else(|| nothing(builder)),
    }
}

fn fold<B, F>(children: &[Expr<Clause>], builder: &B, combine: F) -> Option<B::Predicate>
where
    B: PredicateBuilder + ?Sized,
    F: Fn(&B, B::Predicate, B::Predicate) -> B::Predicate,
{
    children
        .iter()
        .map(|child| compile(child, builder))
        .reduce(|acc, next| combine(builder, acc, next))
}

fn nothing<B: PredicateBuilder + ?Sized>(builder: &B) -> B::Predicate {
    builder.not(builder.everything())
}

/// A compiled predicate plus the fingerprint cursors are bound to.
#[derive(Debug, Clone)]
pub struct CompiledQuery<P> {
    pub predicate: P,
    pub fingerprint: String,
}

/// Compiles `expr` and fingerprints its canonical rendering.
pub fn compile_query<B: PredicateBuilder + ?Sized>(
    expr: &Expr<Clause>,
    builder: &B,
) -> CompiledQuery<B::Predicate> {
    CompiledQuery {
        predicate: compile(expr, builder),
        fingerprint: fingerprint(expr),
    }
}

/// Hex of the first 8 bytes of the SHA-256 of the tree's rendering.
pub fn fingerprint(expr: &Expr<Clause>) -> String {
    let digest = Sha256::digest(expr.to_string().as_bytes());
    digest[..8].iter().fold(String::with_capacity(16), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}
