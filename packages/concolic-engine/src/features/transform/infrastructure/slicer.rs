//! Query-directed slicing
//!
//! Keeps every non-`State` predicate and, by fixpoint, every `State`
//! predicate that defines a relevant variable or writes a relevant memory
//! space. Relevance starts from the kept predicates, the query, and
//! variables defined more than once (conflicting definitions constrain each
//! other). Memory is tracked per memspace, so slicing is only as precise as
//! the memory spacer that ran before it.

use crate::features::predicate_state::PredicateState;
use crate::features::transform::domain::{PairTransformer, PipelineError};
use crate::shared::models::{Predicate, PredicateBody, PredicateKind, Term, TermKind};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Slicer {
    required: FxHashSet<Term>,
    sliced: usize,
}

#[derive(Default)]
struct Relevance {
    vars: FxHashSet<Term>,
    memspaces: FxHashSet<u32>,
}

impl Relevance {
    fn absorb(&mut self, predicate: &Predicate) {
        predicate.collect_vars(&mut self.vars);
        for t in predicate.operands() {
            collect_reads(t, &mut self.memspaces);
        }
    }
}

/// Memory spaces a term reads from
fn collect_reads(term: &Term, out: &mut FxHashSet<u32>) {
    match term.kind() {
        TermKind::FieldLoad(reference) | TermKind::ArrayLoad(reference) => {
            if let TermKind::Field { owner: base, .. } | TermKind::ArrayIndex { array: base, .. } =
                reference.kind()
            {
                out.insert(base.ty().memspace());
            }
        }
        TermKind::ArrayLength(array) => {
            out.insert(array.ty().memspace());
        }
        _ => {}
    }
    for sub in term.subterms() {
        collect_reads(sub, out);
    }
}

/// Memory space a predicate writes, if any
fn written_memspace(predicate: &Predicate) -> Option<u32> {
    match &predicate.body {
        PredicateBody::FieldStore { field, .. } => match field.kind() {
            TermKind::Field { owner, .. } => Some(owner.ty().memspace()),
            _ => None,
        },
        PredicateBody::ArrayStore { index, .. } => match index.kind() {
            TermKind::ArrayIndex { array, .. } => Some(array.ty().memspace()),
            _ => None,
        },
        PredicateBody::NewArray { lhv, .. } => Some(lhv.ty().memspace()),
        _ => None,
    }
}

impl Slicer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_required(required: impl IntoIterator<Item = Term>) -> Self {
        Self {
            required: required.into_iter().collect(),
            sliced: 0,
        }
    }

    /// Predicates removed by the last run
    pub fn sliced(&self) -> usize {
        self.sliced
    }

    fn keeps(predicate: &Predicate, relevance: &Relevance) -> bool {
        if predicate.kind != PredicateKind::State {
            return true;
        }
        if let Some(ms) = written_memspace(predicate) {
            if relevance.memspaces.contains(&ms) {
                return true;
            }
        }
        match &predicate.body {
            PredicateBody::NewArray { lhv, dimensions } => {
                relevance.vars.contains(lhv)
                    || dimensions.iter().any(|d| {
                        let mut vars = FxHashSet::default();
                        d.collect_vars(&mut vars);
                        vars.iter().any(|v| relevance.vars.contains(v))
                    })
            }
            PredicateBody::Call { lhv: None, .. } => false,
            _ => match predicate.lhv() {
                Some(lhv) if lhv.is_variable() => relevance.vars.contains(lhv),
                _ => written_memspace(predicate).is_none(),
            },
        }
    }
}

impl PairTransformer for Slicer {
    fn name(&self) -> &'static str {
        "slicer"
    }

    fn apply_pair(
        &mut self,
        state: &PredicateState,
        query: &PredicateState,
    ) -> Result<(PredicateState, PredicateState), PipelineError> {
        let predicates = state.predicates();
        let mut relevance = Relevance {
            vars: self.required.clone(),
            memspaces: FxHashSet::default(),
        };
        for p in query.predicates() {
            relevance.absorb(p);
        }

        let mut definitions: FxHashMap<&Term, usize> = FxHashMap::default();
        for p in &predicates {
            if let Some(lhv) = p.lhv() {
                *definitions.entry(lhv).or_default() += 1;
            }
        }
        relevance
            .vars
            .extend(definitions.into_iter().filter(|(_, n)| *n > 1).map(|(t, _)| t.clone()));

        let mut kept = vec![false; predicates.len()];
        loop {
            let mut changed = false;
            for (i, p) in predicates.iter().enumerate() {
                if !kept[i] && Self::keeps(p, &relevance) {
                    kept[i] = true;
                    relevance.absorb(p);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let mut index = 0;
        let sliced = state
            .filter(&mut |_| {
                let keep = kept.get(index).copied().unwrap_or(true);
                index += 1;
                keep
            })
            .simplify();
        self.sliced = state.size() - sliced.size();
        debug!(removed = self.sliced, kept = sliced.size(), "sliced state");
        Ok((sliced, query.clone()))
    }
}
