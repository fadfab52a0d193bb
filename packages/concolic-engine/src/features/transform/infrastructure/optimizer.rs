//! Dead definition elimination
//!
//! Drops trivially-true equalities and inequalities, then repeatedly drops
//! `State` definitions of local values nobody reads. A fresh variable bound
//! by a single equation never constrains the rest of the formula, so
//! satisfiability is preserved. Memory writes and array allocations always
//! stay. Values the query mentions, or the caller lists as required, stay
//! too so they show up in the model.

use crate::features::predicate_state::PredicateState;
use crate::features::transform::domain::{PipelineError, Transformer};
use crate::shared::models::{Predicate, PredicateBody, PredicateKind, Term, TermKind};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Optimizer {
    required: FxHashSet<Term>,
    removed: usize,
}

impl Optimizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep definitions of every variable in `query`
    pub fn with_query(query: &PredicateState) -> Self {
        Self {
            required: query.collect_vars(),
            removed: 0,
        }
    }

    pub fn require(&mut self, term: Term) {
        self.required.insert(term);
    }

    pub fn removed(&self) -> usize {
        self.removed
    }
}

fn count_vars(term: &Term, counts: &mut FxHashMap<Term, usize>) {
    if term.is_variable() {
        *counts.entry(term.clone()).or_default() += 1;
        return;
    }
    for sub in term.subterms() {
        count_vars(sub, counts);
    }
}

fn occurrences(state: &PredicateState) -> FxHashMap<Term, usize> {
    let mut counts = FxHashMap::default();
    for p in state.predicates() {
        for t in p.operands() {
            count_vars(t, &mut counts);
        }
    }
    counts
}

fn constants_equal(lhv: &Term, rhv: &Term) -> Option<bool> {
    if !lhv.is_const() || !rhv.is_const() {
        return None;
    }
    match (lhv.kind(), rhv.kind()) {
        (TermKind::ConstInt(l), TermKind::ConstInt(r)) => Some(l == r),
        (TermKind::ConstBool(l), TermKind::ConstBool(r)) => Some(l == r),
        (TermKind::Null, TermKind::Null) => Some(true),
        _ => None,
    }
}

/// Holds in every model
pub fn is_trivially_true(predicate: &Predicate) -> bool {
    match &predicate.body {
        PredicateBody::Equality { lhv, rhv } => {
            (lhv == rhv && !lhv.ty().is_floating() && lhv.kind() != &TermKind::Undef)
                || constants_equal(lhv, rhv) == Some(true)
        }
        PredicateBody::Inequality { lhv, rhv } => constants_equal(lhv, rhv) == Some(false),
        _ => false,
    }
}

impl Optimizer {
    fn removable(&self, predicate: &Predicate, counts: &FxHashMap<Term, usize>) -> bool {
        if predicate.kind != PredicateKind::State || predicate.writes_memory() {
            return false;
        }
        let Some(lhv) = predicate.lhv() else {
            return false;
        };
        matches!(lhv.kind(), TermKind::Value(_))
            && !self.required.contains(lhv)
            && counts.get(lhv).copied().unwrap_or(0) == 1
    }
}

impl Transformer for Optimizer {
    fn name(&self) -> &'static str {
        "optimizer"
    }

    fn apply(&mut self, state: &PredicateState) -> Result<PredicateState, PipelineError> {
        let before = state.size();
        let mut current = state.filter(&mut |p| !is_trivially_true(p));
        loop {
            let counts = occurrences(&current);
            let next = current.filter(&mut |p| !self.removable(p, &counts));
            if next.size() == current.size() {
                break;
            }
            current = next;
        }
        let current = current.simplify();
        self.removed += before - current.size();
        debug!(removed = before - current.size(), "optimized state");
        Ok(current)
    }
}
