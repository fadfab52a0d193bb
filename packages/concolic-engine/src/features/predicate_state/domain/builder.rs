//! Mutable accumulation helper for PredicateState

use super::state::PredicateState;
use crate::shared::models::Predicate;

/// Grows a `Chain` spine predicate-by-predicate without re-copying the
/// already-built prefix. `build()` hands out the immutable result.
#[derive(Debug, Clone, Default)]
pub struct StateBuilder {
    current: PredicateState,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: PredicateState) -> Self {
        Self { current: state }
    }

    pub fn add_predicate(&mut self, predicate: Predicate) -> &mut Self {
        self.current.push_predicate(predicate);
        self
    }

    pub fn add_state(&mut self, state: &PredicateState) -> &mut Self {
        self.current = self.current.plus(state);
        self
    }

    /// Wrap `choices` into a `Choice` and chain it
    pub fn add_choices(&mut self, choices: Vec<PredicateState>) -> &mut Self {
        match choices.len() {
            0 => {}
            1 => {
                let single = choices.into_iter().next().unwrap_or_default();
                self.add_state(&single);
            }
            _ => {
                let choice = PredicateState::choice(choices);
                self.add_state(&choice);
            }
        }
        self
    }

    pub fn current(&self) -> &PredicateState {
        &self.current
    }

    pub fn build(self) -> PredicateState {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{SymType, Term};

    #[test]
    fn test_builder_chains_and_choices() {
        let x = Term::value("x", SymType::Int);
        let mut builder = StateBuilder::new();
        builder
            .add_predicate(Predicate::assign(x.clone(), Term::int(1)))
            .add_choices(vec![
                PredicateState::basic(vec![Predicate::path(x.clone(), Term::int(1))]),
                PredicateState::basic(vec![Predicate::path(x.clone(), Term::int(2))]),
            ])
            .add_predicate(Predicate::assign(Term::value("y", SymType::Int), x));
        let state = builder.build();

        assert_eq!(state.size(), 4);
        match &state {
            PredicateState::Chain { base, tail } => {
                assert_eq!(base.size(), 1);
                assert!(matches!(tail.as_ref(), PredicateState::Chain { .. }));
            }
            other => panic!("expected chain, got {}", other),
        }
    }
}
