//! Memory-space disambiguation
//!
//! Steensgaard-style unification over reference-typed terms. Two references
//! that may alias end up in the same class; each class becomes one memory
//! space and every reference type is rewritten to carry it. Field and
//! element contents are modelled as successor nodes keyed by field name (or
//! `[]` for array elements) and merged whenever their parents are unified.
//!
//! Spaces are numbered densely from 1 in first-seen order; `null` keeps
//! space 0.

use super::union_find::UnionFind;
use crate::features::predicate_state::PredicateState;
use crate::features::transform::domain::{PairTransformer, PipelineError, Transformer};
use crate::shared::models::{CmpOp, Predicate, PredicateBody, SymType, Term, TermKind};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

const ELEMENTS: &str = "[]";

#[derive(Debug, Default)]
struct AliasGraph {
    sets: UnionFind,
    ids: FxHashMap<Term, u32>,
    /// Term nodes in first-seen order
    order: Vec<Term>,
    /// root -> (label -> content node)
    successors: FxHashMap<u32, FxHashMap<Arc<str>, u32>>,
}

fn tracked(term: &Term) -> bool {
    term.ty().is_reference() && term.ty() != &SymType::Null
}

impl AliasGraph {
    fn node(&mut self, term: &Term) -> u32 {
        if let Some(&id) = self.ids.get(term) {
            return id;
        }
        let id = self.sets.make_set();
        self.ids.insert(term.clone(), id);
        self.order.push(term.clone());
        id
    }

    fn successor(&mut self, owner: u32, label: &str) -> u32 {
        let root = self.sets.find(owner);
        if let Some(&succ) = self.successors.get(&root).and_then(|s| s.get(label)) {
            return succ;
        }
        let succ = self.sets.make_set();
        self.successors
            .entry(root)
            .or_default()
            .insert(Arc::from(label), succ);
        succ
    }

    /// Join two classes and, transitively, their contents
    fn unify(&mut self, a: u32, b: u32) {
        let mut pending = vec![(a, b)];
        while let Some((x, y)) = pending.pop() {
            let Some((root, absorbed)) = self.sets.union(x, y) else {
                continue;
            };
            let Some(moved) = self.successors.remove(&absorbed) else {
                continue;
            };
            let kept = self.successors.entry(root).or_default();
            for (label, succ) in moved {
                match kept.get(&label) {
                    Some(&existing) => pending.push((existing, succ)),
                    None => {
                        kept.insert(label, succ);
                    }
                }
            }
        }
    }

    fn unify_terms(&mut self, a: &Term, b: &Term) {
        if tracked(a) && tracked(b) {
            let (x, y) = (self.node(a), self.node(b));
            self.unify(x, y);
        }
    }

    fn visit_term(&mut self, term: &Term) {
        for sub in term.subterms() {
            self.visit_term(sub);
        }
        if tracked(term) {
            self.node(term);
        }
        match term.kind() {
            TermKind::Field { owner, name } if tracked(owner) && tracked(term) => {
                let owner_id = self.node(owner);
                let content = self.successor(owner_id, name);
                let field = self.node(term);
                self.unify(field, content);
            }
            TermKind::ArrayIndex { array, .. } if tracked(array) && tracked(term) => {
                let array_id = self.node(array);
                let content = self.successor(array_id, ELEMENTS);
                let element = self.node(term);
                self.unify(element, content);
            }
            TermKind::FieldLoad(reference) | TermKind::ArrayLoad(reference) | TermKind::Cast(reference) => {
                self.unify_terms(term, reference)
            }
            TermKind::Cmp {
                op: CmpOp::Eq | CmpOp::Neq,
                lhv,
                rhv,
            } => self.unify_terms(lhv, rhv),
            _ => {}
        }
    }

    fn visit_predicate(&mut self, predicate: &Predicate) {
        for t in predicate.operands() {
            self.visit_term(t);
        }
        match &predicate.body {
            PredicateBody::Equality { lhv, rhv } | PredicateBody::Inequality { lhv, rhv } => {
                self.unify_terms(lhv, rhv)
            }
            PredicateBody::Call {
                lhv: Some(lhv),
                call,
            } => self.unify_terms(lhv, call),
            PredicateBody::FieldStore { field, value } => self.unify_terms(field, value),
            PredicateBody::ArrayStore { index, value } => self.unify_terms(index, value),
            _ => {}
        }
    }

    /// Dense memspace per class root, numbered in first-seen order
    fn memspaces(&mut self) -> FxHashMap<Term, u32> {
        let mut by_root: FxHashMap<u32, u32> = FxHashMap::default();
        let mut out = FxHashMap::default();
        for term in std::mem::take(&mut self.order) {
            let Some(&id) = self.ids.get(&term) else {
                continue;
            };
            let root = self.sets.find(id);
            let next = by_root.len() as u32 + 1;
            let ms = *by_root.entry(root).or_insert(next);
            out.insert(term, ms);
        }
        out
    }
}

struct Rewriter<'m> {
    memspaces: &'m FxHashMap<Term, u32>,
}

impl Transformer for Rewriter<'_> {
    fn name(&self) -> &'static str {
        "memspace-rewriter"
    }

    fn transform_term(&mut self, term: &Term) -> Term {
        let rebuilt = term.map_subterms(&mut |sub| self.transform_term(sub));
        match self.memspaces.get(term) {
            Some(&ms) => rebuilt.with_type(term.ty().with_memspace(ms)),
            None => rebuilt,
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySpacer {
    spaces: usize,
}

impl MemorySpacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct memory spaces assigned by the last run
    pub fn spaces(&self) -> usize {
        self.spaces
    }
}

impl PairTransformer for MemorySpacer {
    fn name(&self) -> &'static str {
        "memory-spacer"
    }

    fn apply_pair(
        &mut self,
        state: &PredicateState,
        query: &PredicateState,
    ) -> Result<(PredicateState, PredicateState), PipelineError> {
        let mut graph = AliasGraph::default();
        for p in state.predicates().into_iter().chain(query.predicates()) {
            graph.visit_predicate(p);
        }
        let memspaces = graph.memspaces();
        self.spaces = memspaces.values().copied().max().unwrap_or(0) as usize;
        debug!(terms = memspaces.len(), spaces = self.spaces, "assigned memory spaces");

        let mut rewriter = Rewriter {
            memspaces: &memspaces,
        };
        Ok((
            rewriter.transform_state(state),
            rewriter.transform_state(query),
        ))
    }
}
