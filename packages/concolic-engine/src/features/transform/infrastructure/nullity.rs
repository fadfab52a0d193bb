//! Non-null annotations
//!
//! Turns the dataflow facts recorded in the `AnalysisContext` into
//! `Require(term != null)` predicates: right after each definition of a
//! non-null term, and at the very start of the state for `this` and
//! arguments, which have no definition.

use crate::features::predicate_state::PredicateState;
use crate::features::transform::domain::{PipelineError, Transformer};
use crate::shared::models::{Predicate, PredicateKind, Term, TermKind};
use rustc_hash::FxHashSet;

pub struct NullityAnnotator<'c> {
    non_null: &'c FxHashSet<Term>,
    annotated: usize,
}

impl<'c> NullityAnnotator<'c> {
    pub fn new(non_null: &'c FxHashSet<Term>) -> Self {
        Self {
            non_null,
            annotated: 0,
        }
    }

    pub fn annotated(&self) -> usize {
        self.annotated
    }

    fn requirement(&mut self, term: &Term) -> Option<Predicate> {
        if !term.ty().is_reference() || !self.non_null.contains(term) {
            return None;
        }
        self.annotated += 1;
        Some(Predicate::inequality(
            PredicateKind::Require,
            term.clone(),
            Term::null(),
        ))
    }
}

impl Transformer for NullityAnnotator<'_> {
    fn name(&self) -> &'static str {
        "nullity-annotator"
    }

    fn apply(&mut self, state: &PredicateState) -> Result<PredicateState, PipelineError> {
        if self.non_null.is_empty() {
            return Ok(state.clone());
        }
        let body = self.transform_state(state);

        let mut inputs: Vec<Term> = state
            .collect_vars()
            .into_iter()
            .filter(|t| matches!(t.kind(), TermKind::This | TermKind::Argument(_)))
            .collect();
        inputs.sort_by_key(|t| t.to_string());
        let prefix: Vec<Predicate> = inputs.iter().filter_map(|t| self.requirement(t)).collect();
        Ok(PredicateState::basic(prefix).plus(&body))
    }

    fn transform_basic(&mut self, predicates: &[Predicate]) -> PredicateState {
        let mut out = Vec::with_capacity(predicates.len());
        for p in predicates {
            out.push(p.clone());
            if let Some(lhv) = p.lhv() {
                if let Some(require) = self.requirement(lhv) {
                    out.push(require);
                }
            }
        }
        PredicateState::basic(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::SymType;

    #[test]
    fn test_requirements_follow_definitions() {
        let a = SymType::class("A");
        let this = Term::this(a.clone());
        let v = Term::value("v", a.clone());
        let w = Term::value("w", a.clone());
        let mut facts = FxHashSet::default();
        facts.insert(this.clone());
        facts.insert(v.clone());

        let state = PredicateState::basic(vec![
            Predicate::assign(v.clone(), Term::field_load(Term::field(this, "f", a.clone()))),
            Predicate::assign(w, v),
        ]);
        let mut annotator = NullityAnnotator::new(&facts);
        let out = annotator.apply(&state).unwrap();
        let text: Vec<String> = out.predicates().iter().map(|p| p.to_string()).collect();
        assert_eq!(
            text,
            vec![
                "@R this != null",
                "@S v = *(this.f)",
                "@R v != null",
                "@S w = v",
            ]
        );
        assert_eq!(annotator.annotated(), 2);
    }

    #[test]
    fn test_no_facts_is_identity() {
        let facts = FxHashSet::default();
        let state = PredicateState::basic(vec![Predicate::assign(
            Term::value("x", SymType::Int),
            Term::int(1),
        )]);
        assert_eq!(NullityAnnotator::new(&facts).apply(&state).unwrap(), state);
    }
}
