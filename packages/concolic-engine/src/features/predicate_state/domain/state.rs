//! PredicateState: Basic / Chain / Choice trees of predicates
//!
//! ```text
//!   Chain ─┬─ base: Basic [ @S x = a ; @P x > 0 ]
//!          └─ tail: Choice ─┬─ Basic [ @P y == 0 ]
//!                           └─ Basic [ @P y != 0 ; @S z = 1 ]
//! ```
//!
//! Values are immutable and structurally shared through `Arc`; every
//! operation returns a new state. The only in-place mutation is
//! `push_predicate`, which goes through `Arc::make_mut` and therefore
//! never affects states shared with other owners.

use crate::shared::models::{Clause, Predicate, PredicateKind, SymbolicState, Term};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateState {
    /// Straight-line effects in program order
    Basic(Arc<Vec<Predicate>>),
    /// `base` happens, then `tail`
    Chain {
        base: Arc<PredicateState>,
        tail: Arc<PredicateState>,
    },
    /// Join of mutually exclusive paths
    Choice(Arc<Vec<PredicateState>>),
}

impl Default for PredicateState {
    fn default() -> Self {
        Self::empty()
    }
}

impl PredicateState {
    // ═══════════════════════════════════════════════════════════════════════
    // Constructors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn empty() -> Self {
        PredicateState::Basic(Arc::new(Vec::new()))
    }

    pub fn basic(predicates: Vec<Predicate>) -> Self {
        PredicateState::Basic(Arc::new(predicates))
    }

    pub fn chain(base: PredicateState, tail: PredicateState) -> Self {
        PredicateState::Chain {
            base: Arc::new(base),
            tail: Arc::new(tail),
        }
    }

    pub fn choice(branches: Vec<PredicateState>) -> Self {
        PredicateState::Choice(Arc::new(branches))
    }

    /// Basic state made of the clauses' predicates, in order
    pub fn from_clauses<'a>(clauses: impl IntoIterator<Item = &'a Clause>) -> Self {
        Self::basic(clauses.into_iter().map(|c| c.predicate.clone()).collect())
    }

    /// Data and path predicates of one run as a single basic state
    pub fn from_symbolic(state: &SymbolicState) -> Self {
        Self::from_clauses(state.clauses.0.iter())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Total predicate count
    pub fn size(&self) -> usize {
        match self {
            PredicateState::Basic(ps) => ps.len(),
            PredicateState::Chain { base, tail } => base.size() + tail.size(),
            PredicateState::Choice(bs) => bs.iter().map(|b| b.size()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Flattened view in program order; choice branches are concatenated
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut out = Vec::with_capacity(self.size());
        self.collect_predicates(&mut out);
        out
    }

    fn collect_predicates<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            PredicateState::Basic(ps) => out.extend(ps.iter()),
            PredicateState::Chain { base, tail } => {
                base.collect_predicates(out);
                tail.collect_predicates(out);
            }
            PredicateState::Choice(bs) => {
                for b in bs.iter() {
                    b.collect_predicates(out);
                }
            }
        }
    }

    /// Leaf variables referenced anywhere in the state
    pub fn collect_vars(&self) -> FxHashSet<Term> {
        let mut vars = FxHashSet::default();
        for p in self.predicates() {
            p.collect_vars(&mut vars);
        }
        vars
    }

    /// Every term and subterm referenced anywhere in the state
    pub fn all_terms(&self) -> FxHashSet<Term> {
        let mut terms = FxHashSet::default();
        for p in self.predicates() {
            for t in p.operands() {
                t.collect_all(&mut terms);
            }
        }
        terms
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Functional updates
    // ═══════════════════════════════════════════════════════════════════════

    pub fn map(&self, f: &mut dyn FnMut(&Predicate) -> Predicate) -> PredicateState {
        self.filter_map(&mut |p| Some(f(p)))
    }

    pub fn filter_map(
        &self,
        f: &mut dyn FnMut(&Predicate) -> Option<Predicate>,
    ) -> PredicateState {
        match self {
            PredicateState::Basic(ps) => PredicateState::basic(ps.iter().filter_map(|p| f(p)).collect()),
            PredicateState::Chain { base, tail } => {
                let base = base.filter_map(f);
                let tail = tail.filter_map(f);
                PredicateState::chain(base, tail)
            }
            PredicateState::Choice(bs) => {
                PredicateState::choice(bs.iter().map(|b| b.filter_map(f)).collect())
            }
        }
    }

    pub fn filter(&self, keep: &mut dyn FnMut(&Predicate) -> bool) -> PredicateState {
        self.filter_map(&mut |p| if keep(p) { Some(p.clone()) } else { None })
    }

    pub fn filter_by_kind(&self, kind: PredicateKind) -> PredicateState {
        self.filter(&mut |p| p.kind == kind)
    }

    /// Path-kind predicates only
    pub fn path(&self) -> PredicateState {
        self.filter_by_kind(PredicateKind::Path)
    }

    /// Apply `f` to the direct children of composite states; `Basic` is
    /// returned unchanged
    pub fn fmap(&self, f: &mut dyn FnMut(&PredicateState) -> PredicateState) -> PredicateState {
        match self {
            PredicateState::Basic(_) => self.clone(),
            PredicateState::Chain { base, tail } => {
                let base = f(base);
                let tail = f(tail);
                PredicateState::chain(base, tail)
            }
            PredicateState::Choice(bs) => PredicateState::choice(bs.iter().map(|b| f(b)).collect()),
        }
    }

    /// Reverse evaluation order. `reverse(reverse(s)) == s`.
    pub fn reverse(&self) -> PredicateState {
        match self {
            PredicateState::Basic(ps) => {
                PredicateState::basic(ps.iter().rev().cloned().collect())
            }
            PredicateState::Chain { base, tail } => {
                PredicateState::chain(tail.reverse(), base.reverse())
            }
            PredicateState::Choice(bs) => {
                PredicateState::choice(bs.iter().map(|b| b.reverse()).collect())
            }
        }
    }

    pub fn add_predicate(&self, predicate: Predicate) -> PredicateState {
        let mut next = self.clone();
        next.push_predicate(predicate);
        next
    }

    /// In-place append. `Basic` appends, `Chain` appends to its tail and
    /// `Choice` becomes `Chain(choice, Basic([predicate]))`.
    pub fn push_predicate(&mut self, predicate: Predicate) {
        match self {
            PredicateState::Basic(ps) => Arc::make_mut(ps).push(predicate),
            PredicateState::Chain { tail, .. } => Arc::make_mut(tail).push_predicate(predicate),
            PredicateState::Choice(_) => {
                let choice = std::mem::take(self);
                *self = PredicateState::chain(choice, PredicateState::basic(vec![predicate]));
            }
        }
    }

    /// Sequential composition; empty sides are dropped
    pub fn plus(&self, other: &PredicateState) -> PredicateState {
        if self.is_empty() {
            other.clone()
        } else if other.is_empty() {
            self.clone()
        } else {
            PredicateState::chain(self.clone(), other.clone())
        }
    }

    /// Remainder of `self` after the prefix `prefix`, or `None` when
    /// `prefix` is not a structural prefix of `self`
    pub fn slice_on(&self, prefix: &PredicateState) -> Option<PredicateState> {
        if self == prefix {
            return Some(PredicateState::empty());
        }
        match self {
            PredicateState::Basic(ps) => match prefix {
                PredicateState::Basic(pre) if ps.starts_with(pre) => {
                    Some(PredicateState::basic(ps[pre.len()..].to_vec()))
                }
                _ => None,
            },
            PredicateState::Chain { base, tail } => {
                if base.as_ref() == prefix {
                    return Some(tail.as_ref().clone());
                }
                if let PredicateState::Chain {
                    base: pre_base,
                    tail: pre_tail,
                } = prefix
                {
                    if pre_base == base {
                        return tail.slice_on(pre_tail);
                    }
                }
                base.slice_on(prefix)
                    .map(|rest| rest.plus(tail))
            }
            PredicateState::Choice(bs) => {
                let slices: Option<Vec<_>> = bs.iter().map(|b| b.slice_on(prefix)).collect();
                slices.map(PredicateState::choice)
            }
        }
    }

    pub fn starts_with(&self, prefix: &PredicateState) -> bool {
        self.slice_on(prefix).is_some()
    }

    /// Remove empty sub-states and collapse singleton choices; merges
    /// adjacent basic blocks. Idempotent.
    pub fn simplify(&self) -> PredicateState {
        match self {
            PredicateState::Basic(_) => self.clone(),
            PredicateState::Chain { base, tail } => {
                let base = base.simplify();
                let tail = tail.simplify();
                if base.is_empty() {
                    return tail;
                }
                if tail.is_empty() {
                    return base;
                }
                if let (PredicateState::Basic(b), PredicateState::Basic(t)) = (&base, &tail) {
                    return PredicateState::basic(b.iter().chain(t.iter()).cloned().collect());
                }
                PredicateState::chain(base, tail)
            }
            PredicateState::Choice(bs) => {
                let branches: Vec<_> = bs.iter().map(|b| b.simplify()).collect();
                if branches.iter().all(|b| b.is_empty()) {
                    PredicateState::empty()
                } else if branches.len() == 1 {
                    branches.into_iter().next().unwrap_or_default()
                } else {
                    PredicateState::choice(branches)
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Prefix / suffix
    // ═══════════════════════════════════════════════════════════════════════

    /// First `n` predicates (counted along each choice branch)
    pub fn take(&self, n: usize) -> PredicateState {
        match self {
            PredicateState::Basic(ps) => PredicateState::basic(ps.iter().take(n).cloned().collect()),
            PredicateState::Chain { base, tail } => {
                let base_size = base.size();
                if n <= base_size {
                    base.take(n)
                } else {
                    PredicateState::chain(base.as_ref().clone(), tail.take(n - base_size))
                }
            }
            PredicateState::Choice(bs) => {
                PredicateState::choice(bs.iter().map(|b| b.take(n)).collect())
            }
        }
    }

    /// Everything after the first `n` predicates
    pub fn drop_first(&self, n: usize) -> PredicateState {
        match self {
            PredicateState::Basic(ps) => PredicateState::basic(ps.iter().skip(n).cloned().collect()),
            PredicateState::Chain { base, tail } => {
                let base_size = base.size();
                if n >= base_size {
                    tail.drop_first(n - base_size)
                } else {
                    PredicateState::chain(base.drop_first(n), tail.as_ref().clone())
                }
            }
            PredicateState::Choice(bs) => {
                PredicateState::choice(bs.iter().map(|b| b.drop_first(n)).collect())
            }
        }
    }

    pub fn take_last(&self, n: usize) -> PredicateState {
        self.reverse().take(n).reverse()
    }

    pub fn drop_last(&self, n: usize) -> PredicateState {
        self.reverse().drop_first(n).reverse()
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match self {
            PredicateState::Basic(ps) => {
                writeln!(f, "{}(", pad)?;
                for p in ps.iter() {
                    writeln!(f, "{}  {}", pad, p)?;
                }
                writeln!(f, "{})", pad)
            }
            PredicateState::Chain { base, tail } => {
                base.fmt_indented(f, indent)?;
                writeln!(f, "{}->", pad)?;
                tail.fmt_indented(f, indent)
            }
            PredicateState::Choice(bs) => {
                writeln!(f, "{}BEGIN", pad)?;
                for (i, b) in bs.iter().enumerate() {
                    if i > 0 {
                        writeln!(f, "{}<>", pad)?;
                    }
                    b.fmt_indented(f, indent + 1)?;
                }
                writeln!(f, "{}END", pad)
            }
        }
    }
}

impl fmt::Display for PredicateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{SymType, Term};
    use pretty_assertions::assert_eq;

    fn assign(name: &str, v: i32) -> Predicate {
        Predicate::assign(Term::value(name, SymType::Int), Term::int(v))
    }

    fn path(name: &str, v: i32) -> Predicate {
        Predicate::path(Term::value(name, SymType::Int), Term::int(v))
    }

    #[test]
    fn test_add_predicate_shapes() {
        let basic = PredicateState::basic(vec![assign("a", 1)]);
        assert_eq!(
            basic.add_predicate(assign("b", 2)),
            PredicateState::basic(vec![assign("a", 1), assign("b", 2)])
        );

        let chain = PredicateState::chain(basic.clone(), PredicateState::basic(vec![]));
        assert_eq!(
            chain.add_predicate(assign("c", 3)),
            PredicateState::chain(basic.clone(), PredicateState::basic(vec![assign("c", 3)]))
        );

        let choice = PredicateState::choice(vec![
            PredicateState::basic(vec![path("x", 0)]),
            PredicateState::basic(vec![path("x", 1)]),
        ]);
        let added = choice.add_predicate(assign("d", 4));
        assert_eq!(
            added,
            PredicateState::chain(choice.clone(), PredicateState::basic(vec![assign("d", 4)]))
        );
        // the original choice is untouched
        assert_eq!(choice.size(), 2);
    }

    #[test]
    fn test_empty_slice_identity() {
        let empty = PredicateState::empty();
        assert_eq!(empty.slice_on(&PredicateState::empty()), Some(PredicateState::empty()));
    }

    #[test]
    fn test_slice_basic_prefix() {
        let s = PredicateState::basic(vec![assign("a", 1), assign("b", 2), assign("c", 3)]);
        let prefix = PredicateState::basic(vec![assign("a", 1)]);
        assert_eq!(
            s.slice_on(&prefix),
            Some(PredicateState::basic(vec![assign("b", 2), assign("c", 3)]))
        );
        assert_eq!(s.slice_on(&PredicateState::basic(vec![assign("b", 2)])), None);
    }

    #[test]
    fn test_slice_choice_requires_every_branch() {
        let prefix = PredicateState::basic(vec![assign("a", 1)]);
        let ok = PredicateState::choice(vec![
            PredicateState::basic(vec![assign("a", 1), path("x", 0)]),
            PredicateState::basic(vec![assign("a", 1), path("x", 1)]),
        ]);
        assert!(ok.starts_with(&prefix));

        let bad = PredicateState::choice(vec![
            PredicateState::basic(vec![assign("a", 1), path("x", 0)]),
            PredicateState::basic(vec![path("x", 1)]),
        ]);
        assert_eq!(bad.slice_on(&prefix), None);
    }

    #[test]
    fn test_simplify_collapses() {
        let s = PredicateState::chain(
            PredicateState::chain(PredicateState::empty(), PredicateState::basic(vec![assign("a", 1)])),
            PredicateState::choice(vec![PredicateState::basic(vec![assign("b", 2)])]),
        );
        let simple = s.simplify();
        assert_eq!(simple, PredicateState::basic(vec![assign("a", 1), assign("b", 2)]));
        assert_eq!(simple.simplify(), simple);
    }

    #[test]
    fn test_simplify_keeps_empty_branch_with_siblings() {
        let s = PredicateState::choice(vec![
            PredicateState::empty(),
            PredicateState::basic(vec![path("x", 0)]),
        ]);
        assert_eq!(s.simplify(), s);
    }

    #[test]
    fn test_take_drop_last() {
        let s = PredicateState::chain(
            PredicateState::basic(vec![assign("a", 1), assign("b", 2)]),
            PredicateState::basic(vec![assign("c", 3)]),
        );
        assert_eq!(s.take(1), PredicateState::basic(vec![assign("a", 1)]));
        assert_eq!(s.drop_first(2), PredicateState::basic(vec![assign("c", 3)]));
        assert_eq!(s.take_last(1).simplify(), PredicateState::basic(vec![assign("c", 3)]));
        assert_eq!(
            s.drop_last(1).simplify(),
            PredicateState::basic(vec![assign("a", 1), assign("b", 2)])
        );
    }

    #[test]
    fn test_drop_first_across_chain() {
        let s = PredicateState::chain(
            PredicateState::basic(vec![assign("a", 1), assign("b", 2)]),
            PredicateState::basic(vec![assign("c", 3), assign("d", 4)]),
        );
        assert_eq!(
            s.drop_first(1),
            PredicateState::chain(
                PredicateState::basic(vec![assign("b", 2)]),
                PredicateState::basic(vec![assign("c", 3), assign("d", 4)]),
            )
        );
        assert_eq!(s.drop_first(3), PredicateState::basic(vec![assign("d", 4)]));
        assert_eq!(s.drop_first(4).size(), 0);
    }

    #[test]
    fn test_path_filter() {
        let s = PredicateState::basic(vec![assign("a", 1), path("a", 1)]);
        assert_eq!(s.path(), PredicateState::basic(vec![path("a", 1)]));
    }
}
