//! Solver backend behaviour on reversed path clauses
//!
//! Invariants:
//! - a clause and its reversal are each satisfiable on their own
//! - a clause and its reversal are never satisfiable together
//! - models returned for a satisfiable query satisfy it

#[path = "../common/mod.rs"]
mod common;

use common::*;
use concolic_engine::context::TypeRegistry;
use concolic_engine::features::concolic::ClauseReverser;
use concolic_engine::features::predicate_state::PredicateState;
use concolic_engine::features::smt::{EnumerativeBackend, SmtResult, SmtSolver};
use concolic_engine::shared::models::{
    Clause, CmpOp, InstructionRef, Predicate, PredicateBody, PredicateKind, SymType, Term,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn solve(predicates: Vec<Predicate>) -> SmtResult {
    let types = TypeRegistry::new();
    let mut solver = SmtSolver::new(EnumerativeBackend::new(200_000), &types);
    solver
        .is_reachable(&PredicateState::basic(predicates))
        .unwrap()
}

fn assert_exclusive(original: &Clause, reversed: &Clause) {
    assert!(solve(vec![original.predicate.clone()]).is_sat(), "{}", original);
    assert!(solve(vec![reversed.predicate.clone()]).is_sat(), "{}", reversed);
    assert!(
        solve(vec![original.predicate.clone(), reversed.predicate.clone()]).is_unsat(),
        "{} and {} overlap",
        original,
        reversed
    );
}

// ============================================================================
// Branches
// ============================================================================

fn arb_cmp() -> impl Strategy<Value = CmpOp> {
    prop_oneof![
        Just(CmpOp::Eq),
        Just(CmpOp::Neq),
        Just(CmpOp::Lt),
        Just(CmpOp::Le),
        Just(CmpOp::Gt),
        Just(CmpOp::Ge),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_branch_reversal_is_exclusive(op in arb_cmp(), c in -20i32..20, taken in any::<bool>()) {
        let clause = branch("Foo.bar", 3, Term::cmp(op, int("x"), Term::int(c)), taken);
        let reversed = ClauseReverser::new().reverse(&clause, &[]).unwrap();
        prop_assert_eq!(&reversed.instruction, &clause.instruction);
        assert_exclusive(&clause, &reversed);
    }
}

#[test]
fn test_branch_model_takes_the_other_side() {
    let clause = branch("Foo.bar", 1, Term::cmp(CmpOp::Gt, int("x"), Term::int(10)), true);
    let reversed = ClauseReverser::new().reverse(&clause, &[]).unwrap();
    let result = solve(vec![reversed.predicate]);
    let value = result.model().unwrap().value_of(&int("x")).unwrap().as_int().unwrap();
    assert!(value <= 10);
}

// ============================================================================
// Null checks
// ============================================================================

#[test]
fn test_null_check_reversal_is_exclusive() {
    let o = Term::value("o", SymType::class("A"));
    let clause = Clause::new(
        InstructionRef::other("Foo.bar", 2),
        Predicate::equality(PredicateKind::Path, o.clone(), Term::null()),
    );
    let reversed = ClauseReverser::new().reverse(&clause, &[]).unwrap();
    assert!(matches!(reversed.predicate.body, PredicateBody::Inequality { .. }));
    assert_exclusive(&clause, &reversed);

    let result = solve(vec![reversed.predicate]);
    assert!(!result.model().unwrap().value_of(&o).unwrap().is_null());
}

// ============================================================================
// Switches
// ============================================================================

#[test]
fn test_switch_reversals_are_exclusive() {
    let instruction = switch_instruction("Foo.bar", 5, &[(1, 10), (2, 10), (3, 11)], 12);
    let taken = Clause::new(
        instruction,
        Predicate::equality(PredicateKind::Path, int("x"), Term::int(1)),
    );
    let reverser = ClauseReverser::new();

    let other_case = reverser.reverse(&taken, &[&taken.predicate]).unwrap();
    assert_eq!(other_case.predicate.to_string(), "@P x = 3");
    assert_exclusive(&taken, &other_case);

    let default = reverser
        .reverse(&taken, &[&taken.predicate, &other_case.predicate])
        .unwrap();
    assert!(matches!(default.predicate.body, PredicateBody::DefaultSwitch { .. }));
    assert_exclusive(&taken, &default);
    assert_exclusive(&other_case, &default);

    let result = solve(vec![default.predicate]);
    let value = result.model().unwrap().value_of(&int("x")).unwrap().as_int().unwrap();
    assert!(![1, 2, 3].contains(&value));
}
