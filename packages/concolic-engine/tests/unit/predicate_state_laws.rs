//! Algebraic laws of PredicateState
//!
//! Properties that must hold for every state:
//! - Slicing: (a + b).slice_on(a) == b for a non-empty prefix a
//! - Idempotence: simplify(simplify(s)) == simplify(s)
//! - Involution: reverse(reverse(s)) == s
//! - Additivity: size of Chain/Choice is the sum of its parts

#[path = "../common/mod.rs"]
mod common;

use common::*;
use concolic_engine::features::predicate_state::{PredicateState, StateBuilder};
use concolic_engine::shared::models::{CmpOp, Predicate, Term};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_slice_on_prefix(a in arb_state(), b in arb_state()) {
        prop_assume!(!a.is_empty() && !b.is_empty());
        let joined = a.plus(&b);
        prop_assert_eq!(joined.slice_on(&a), Some(b));
    }

    #[test]
    fn prop_simplify_idempotent(s in arb_state()) {
        let once = s.simplify();
        prop_assert_eq!(once.simplify(), once.clone());
        prop_assert_eq!(once.size(), s.size());
    }

    #[test]
    fn prop_reverse_involution(s in arb_state()) {
        prop_assert_eq!(s.reverse().reverse(), s);
    }

    #[test]
    fn prop_size_additive(a in arb_state(), b in arb_state()) {
        let total = a.size() + b.size();
        prop_assert_eq!(PredicateState::chain(a.clone(), b.clone()).size(), total);
        prop_assert_eq!(PredicateState::choice(vec![a, b]).size(), total);
    }

    #[test]
    fn prop_take_drop_partition(preds in prop::collection::vec(arb_predicate(), 0..8), n in 0usize..10) {
        let s = PredicateState::basic(preds);
        let rebuilt = s.take(n).plus(&s.drop_first(n)).simplify();
        prop_assert_eq!(texts(&rebuilt), texts(&s));
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_empty_prefix_identity() {
    let empty = PredicateState::empty();
    assert_eq!(empty.slice_on(&empty), Some(PredicateState::empty()));
}

#[test]
fn test_non_prefix_does_not_slice() {
    let a = PredicateState::basic(vec![path_cmp(CmpOp::Lt, int("x"), Term::int(1))]);
    let b = PredicateState::basic(vec![path_cmp(CmpOp::Gt, int("x"), Term::int(1))]);
    assert_eq!(a.slice_on(&b), None);
    assert!(!a.starts_with(&b));
}

#[test]
fn test_builder_choice_then_tail() {
    let x = int("x");
    let mut builder = StateBuilder::new();
    builder.add_predicate(Predicate::assign(x.clone(), Term::int(0)));
    builder.add_choices(vec![
        PredicateState::basic(vec![path_cmp(CmpOp::Lt, x.clone(), Term::int(0))]),
        PredicateState::empty(),
    ]);
    builder.add_predicate(Predicate::assign(int("y"), x));
    let state = builder.build();

    assert_eq!(state.size(), 3);
    let simplified = state.simplify();
    // the empty branch is an unconstrained path and must survive
    assert_eq!(simplified.size(), 3);
    assert_eq!(
        texts(&simplified),
        vec!["@S x = 0", "@P (x < 0) = true", "@S y = x"]
    );
}
