//! Predicate-state rewriting hooks
//!
//! A pass overrides the narrowest hook it needs. The defaults rebuild the
//! tree shape-for-shape, so a pass that only touches terms implements
//! `transform_term_node` and nothing else.

use super::error::PipelineError;
use crate::features::predicate_state::PredicateState;
use crate::shared::models::{Predicate, Term};

pub trait Transformer {
    fn name(&self) -> &'static str;

    fn apply(&mut self, state: &PredicateState) -> Result<PredicateState, PipelineError> {
        Ok(self.transform_state(state))
    }

    fn transform_state(&mut self, state: &PredicateState) -> PredicateState {
        match state {
            PredicateState::Basic(predicates) => self.transform_basic(predicates),
            PredicateState::Chain { base, tail } => {
                let base = self.transform_state(base);
                let tail = self.transform_state(tail);
                PredicateState::chain(base, tail)
            }
            PredicateState::Choice(branches) => PredicateState::choice(
                branches.iter().map(|b| self.transform_state(b)).collect(),
            ),
        }
    }

    fn transform_basic(&mut self, predicates: &[Predicate]) -> PredicateState {
        PredicateState::basic(
            predicates
                .iter()
                .filter_map(|p| self.transform_predicate(p))
                .collect(),
        )
    }

    /// `None` removes the predicate
    fn transform_predicate(&mut self, predicate: &Predicate) -> Option<Predicate> {
        Some(predicate.map_terms(&mut |t| self.transform_term(t)))
    }

    /// Post-order: children first, then `transform_term_node` on the rebuilt
    /// node
    fn transform_term(&mut self, term: &Term) -> Term {
        let rebuilt = term.map_subterms(&mut |sub| self.transform_term(sub));
        self.transform_term_node(rebuilt)
    }

    fn transform_term_node(&mut self, term: Term) -> Term {
        term
    }
}

/// Pass that must see the state and the query together
pub trait PairTransformer {
    fn name(&self) -> &'static str;

    fn apply_pair(
        &mut self,
        state: &PredicateState,
        query: &PredicateState,
    ) -> Result<(PredicateState, PredicateState), PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{SymType, TermKind};

    struct Renamer;

    impl Transformer for Renamer {
        fn name(&self) -> &'static str {
            "renamer"
        }

        fn transform_term_node(&mut self, term: Term) -> Term {
            match term.kind() {
                TermKind::Value(name) if name.as_ref() == "a" => Term::value("b", term.ty().clone()),
                _ => term,
            }
        }
    }

    #[test]
    fn test_default_hooks_reach_nested_terms() {
        let a = Term::value("a", SymType::Int);
        let state = PredicateState::chain(
            PredicateState::basic(vec![Predicate::assign(
                Term::value("x", SymType::Int),
                Term::neg(a.clone()),
            )]),
            PredicateState::choice(vec![PredicateState::basic(vec![Predicate::path(
                a,
                Term::int(1),
            )])]),
        );
        let out = Renamer.apply(&state).unwrap();
        let vars: Vec<String> = out.collect_vars().iter().map(|t| t.to_string()).collect();
        assert!(vars.contains(&"b".to_string()));
        assert!(!vars.contains(&"a".to_string()));
        assert_eq!(out.size(), state.size());
    }
}
