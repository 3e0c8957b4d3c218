//! Tree algebra over surface-id (or name) factors: AND-product, OR-sum, complement.
//!
//! Grounded on `original_source/core/formula/logical/lpolynomial.hpp`. The original
//! keeps three mutually-exclusive vectors (`factors_`, `factorPolys_`, `terms_`) on one
//! struct; per §9's redesign note this is re-modeled as a proper sum type with a
//! smart-constructor collapse instead of "at most one of three vectors is non-empty".

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use itertools::Itertools;

use crate::error::GeomError;

/// A factor usable in a [`LogicalExpression`]: a signed surface id during evaluation,
/// or a (possibly signed) surface/cell name during parsing, before names are resolved
/// to ids.
pub trait Factor: Clone + Eq + Ord + fmt::Debug {
    /// The complement of this factor (negate-id for numeric factors, leading-`-`
    /// toggle for string factors).
    fn complement(&self) -> Self;
    /// Squared magnitude used to make the primary/dual pair of a factor compare equal
    /// for `unique_factor_set` purposes (mirrors `FactorComparator` in the original,
    /// which orders by `v*v`).
    fn magnitude_key(&self) -> i64;
}

impl Factor for i32 {
    fn complement(&self) -> Self {
        -self
    }
    fn magnitude_key(&self) -> i64 {
        (*self as i64) * (*self as i64)
    }
}

impl Factor for String {
    fn complement(&self) -> Self {
        if let Some(stripped) = self.strip_prefix('-') {
            stripped.to_string()
        } else {
            format!("-{self}")
        }
    }
    fn magnitude_key(&self) -> i64 {
        let stripped = self.strip_prefix('-').unwrap_or(self);
        stripped.parse::<i64>().unwrap_or(0)
    }
}

/// A node in the logical-expression tree. Exactly one variant is ever constructed for
/// a given meaning; [`LogicalExpression::mono`]/`and_of`/`or_of` collapse
/// single-element vectors at construction, matching the original's `initialize()`.
#[derive(Clone, Debug)]
pub enum LogicalExpression<F: Factor> {
    /// AND over a non-empty vector of factors.
    Mono(Vec<F>),
    /// AND over a non-empty vector of sub-expressions (a "nested monomial").
    AndOf(Vec<LogicalExpression<F>>),
    /// OR over a non-empty vector of sub-expressions.
    OrOf(Vec<LogicalExpression<F>>),
}

impl<F: Factor> LogicalExpression<F> {
    /// Builds a monomial from a single factor.
    pub fn factor(f: F) -> Self {
        LogicalExpression::Mono(vec![f])
    }

    /// Builds a monomial (AND) from a factor vector; collapses to the element itself
    /// if only one factor is given, and flattens a single nested expression the way
    /// the original's `initialize()` loop does.
    pub fn mono(factors: Vec<F>) -> Self {
        assert!(!factors.is_empty(), "monomial must have >=1 factor");
        LogicalExpression::Mono(factors)
    }

    /// Builds an AND of sub-expressions, collapsing a singleton list to its element.
    pub fn and_of(mut terms: Vec<LogicalExpression<F>>) -> Self {
        assert!(!terms.is_empty(), "AND must have >=1 term");
        if terms.len() == 1 {
            return terms.pop().unwrap();
        }
        LogicalExpression::AndOf(terms)
    }

    /// Builds an OR of sub-expressions, collapsing a singleton list to its element.
    pub fn or_of(mut terms: Vec<LogicalExpression<F>>) -> Self {
        assert!(!terms.is_empty(), "OR must have >=1 term");
        if terms.len() == 1 {
            return terms.pop().unwrap();
        }
        LogicalExpression::OrOf(terms)
    }

    /// Size: number of top-level terms, counting a collapsed nested monomial as one.
    pub fn size(&self) -> usize {
        match self {
            LogicalExpression::Mono(_) => 1,
            LogicalExpression::AndOf(v) | LogicalExpression::OrOf(v) => v.len(),
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            LogicalExpression::Mono(_) => 0,
            LogicalExpression::AndOf(_) => 1,
            LogicalExpression::OrOf(_) => 2,
        }
    }

    /// The set of distinct factors occurring anywhere in the expression, primary and
    /// dual identified with each other via [`Factor::magnitude_key`].
    pub fn unique_factor_set(&self) -> BTreeSet<MagnitudeOrdered<F>> {
        let mut set = BTreeSet::new();
        self.collect_factors(&mut set);
        set
    }

    fn collect_factors(&self, set: &mut BTreeSet<MagnitudeOrdered<F>>) {
        match self {
            LogicalExpression::Mono(factors) => {
                for f in factors {
                    set.insert(MagnitudeOrdered(f.clone()));
                }
            }
            LogicalExpression::AndOf(terms) | LogicalExpression::OrOf(terms) => {
                for t in terms {
                    t.collect_factors(set);
                }
            }
        }
    }

    /// De Morgan complement: Mono -> OR of per-factor complements; AndOf -> OR of
    /// complemented children; OrOf -> AND of complemented children.
    pub fn complement(&self) -> Self {
        match self {
            LogicalExpression::Mono(factors) => {
                let terms: Vec<_> = factors
                    .iter()
                    .map(|f| LogicalExpression::factor(f.complement()))
                    .collect();
                LogicalExpression::or_of(terms)
            }
            LogicalExpression::AndOf(terms) => {
                let complemented: Vec<_> = terms.iter().map(|t| t.complement()).collect();
                LogicalExpression::or_of(complemented)
            }
            LogicalExpression::OrOf(terms) => {
                let complemented: Vec<_> = terms.iter().map(|t| t.complement()).collect();
                LogicalExpression::and_of(complemented)
            }
        }
    }

    /// `self AND other` (appends, generalizing a monomial into a nested-AND the way
    /// `operator*=` does in the original).
    pub fn append_and(self, other: Self) -> Self {
        let lhs_terms = match self {
            LogicalExpression::AndOf(terms) => terms,
            other_self => vec![other_self],
        };
        let mut terms = lhs_terms;
        terms.push(other);
        LogicalExpression::and_of(terms)
    }

    /// `self OR other` (appends, generalizing a monomial into an OR the way
    /// `operator+=` does in the original).
    pub fn append_or(self, other: Self) -> Self {
        let lhs_terms = match self {
            LogicalExpression::OrOf(terms) => terms,
            other_self => vec![other_self],
        };
        let mut terms = lhs_terms;
        terms.push(other);
        LogicalExpression::or_of(terms)
    }

    /// Generic short-circuiting evaluation: AND nodes short-circuit on the first
    /// `false`, OR nodes short-circuit on the first `true`.
    pub fn evaluate<A: Copy>(&self, functor: &impl Fn(&F, A) -> bool, arg: A) -> bool {
        match self {
            LogicalExpression::Mono(factors) => factors.iter().all(|f| functor(f, arg)),
            LogicalExpression::AndOf(terms) => terms.iter().all(|t| t.evaluate(functor, arg)),
            LogicalExpression::OrOf(terms) => terms.iter().any(|t| t.evaluate(functor, arg)),
        }
    }
}

impl<F: Factor + fmt::Display> LogicalExpression<F> {
    /// Serializes back to deck syntax: AND is whitespace, OR is `:`, grouping via `()`.
    /// A `name_of` resolver may be supplied to print surface names instead of raw
    /// factors (used by id->name round-tripping); pass `|_| None` to print factors as-is.
    pub fn to_string_with(&self, name_of: &impl Fn(&F) -> Option<String>) -> String {
        match self {
            LogicalExpression::Mono(factors) => factors
                .iter()
                .map(|f| name_of(f).unwrap_or_else(|| f.to_string()))
                .join(" "),
            LogicalExpression::AndOf(terms) => terms
                .iter()
                .map(|t| t.to_string_with(name_of))
                .join(" "),
            LogicalExpression::OrOf(terms) => {
                let joined = terms.iter().map(|t| t.to_string_with(name_of)).join(":");
                if terms.len() > 1 {
                    format!("({joined})")
                } else {
                    joined
                }
            }
        }
    }
}

impl LogicalExpression<i32> {
    /// Parses deck-syntax equation text into an expression over resolved surface ids,
    /// using `name_to_id` to resolve each factor token. See §4.1 for the parsing
    /// algorithm (complement substitution, implicit-AND repair, outermost-level split).
    pub fn from_string(
        text: &str,
        name_to_id: &impl Fn(&str) -> Option<i32>,
    ) -> Result<Self, GeomError> {
        crate::deck::parse_equation(text, name_to_id)
    }
}

/// A wrapper implementing the original's `FactorComparator`: orders (and equates) a
/// factor and its dual by squared magnitude, so `unique_factor_set` identifies primary
/// and dual ids with each other.
#[derive(Clone, Debug)]
pub struct MagnitudeOrdered<F: Factor>(pub F);

impl<F: Factor> PartialEq for MagnitudeOrdered<F> {
    fn eq(&self, other: &Self) -> bool {
        self.0.magnitude_key() == other.0.magnitude_key()
    }
}
impl<F: Factor> Eq for MagnitudeOrdered<F> {}
impl<F: Factor> PartialOrd for MagnitudeOrdered<F> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<F: Factor> Ord for MagnitudeOrdered<F> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.magnitude_key().cmp(&other.0.magnitude_key())
    }
}

// Ordering/equality over LogicalExpression itself: variant tag, then size, then
// multiset/set comparison of contents, so it is usable as a map/set key (§3 invariant).
impl<F: Factor> PartialEq for LogicalExpression<F> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (LogicalExpression::Mono(a), LogicalExpression::Mono(b)) => {
                let sa: BTreeSet<_> = a.iter().cloned().collect();
                let sb: BTreeSet<_> = b.iter().cloned().collect();
                sa == sb
            }
            (LogicalExpression::AndOf(a), LogicalExpression::AndOf(b))
            | (LogicalExpression::OrOf(a), LogicalExpression::OrOf(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                let mut a_sorted = a.clone();
                let mut b_sorted = b.clone();
                a_sorted.sort_by(cmp_expr);
                b_sorted.sort_by(cmp_expr);
                a_sorted == b_sorted
            }
            _ => false,
        }
    }
}
impl<F: Factor> Eq for LogicalExpression<F> {}

fn cmp_expr<F: Factor>(a: &LogicalExpression<F>, b: &LogicalExpression<F>) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

impl<F: Factor> PartialOrd for LogicalExpression<F> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<F: Factor> Ord for LogicalExpression<F> {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank_cmp = self.variant_rank().cmp(&other.variant_rank());
        if rank_cmp != Ordering::Equal {
            return rank_cmp;
        }
        let size_cmp = self.size().cmp(&other.size());
        if size_cmp != Ordering::Equal {
            return size_cmp;
        }
        match (self, other) {
            (LogicalExpression::Mono(a), LogicalExpression::Mono(b)) => {
                let mut a_sorted = a.clone();
                let mut b_sorted = b.clone();
                a_sorted.sort();
                b_sorted.sort();
                a_sorted.cmp(&b_sorted)
            }
            (LogicalExpression::AndOf(a), LogicalExpression::AndOf(b))
            | (LogicalExpression::OrOf(a), LogicalExpression::OrOf(b)) => {
                let mut a_sorted = a.clone();
                let mut b_sorted = b.clone();
                a_sorted.sort_by(cmp_expr);
                b_sorted.sort_by(cmp_expr);
                a_sorted.cmp(&b_sorted)
            }
            _ => unreachable!("rank compared equal but variants differ"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surf(id: i32) -> LogicalExpression<i32> {
        LogicalExpression::factor(id)
    }

    #[test]
    fn complement_twice_is_identity() {
        let x = surf(5);
        assert_eq!(x.complement().complement(), x);
    }

    #[test]
    fn complement_of_monomial_is_or_of_complements() {
        let x = LogicalExpression::mono(vec![1, 2]);
        let comp = x.complement();
        match comp {
            LogicalExpression::OrOf(terms) => {
                assert_eq!(terms.len(), 2);
            }
            _ => panic!("expected OrOf"),
        }
    }

    #[test]
    fn evaluate_matches_demorgan() {
        let x = LogicalExpression::or_of(vec![surf(1), surf(-2)]);
        let f = |id: &i32, p: i32| *id == p;
        for p in [1, -2, 3] {
            let direct = x.evaluate(&f, p);
            let comp = x.complement().evaluate(&f, p);
            assert_eq!(direct, !comp, "failed for p={p}");
        }
    }

    #[test]
    fn equality_is_orderless() {
        let a = LogicalExpression::mono(vec![1, 2, 3]);
        let b = LogicalExpression::mono(vec![3, 1, 2]);
        assert_eq!(a, b);
    }

    #[test]
    fn and_of_size1_collapses() {
        let a = LogicalExpression::and_of(vec![surf(1)]);
        assert_eq!(a, surf(1));
    }
}
