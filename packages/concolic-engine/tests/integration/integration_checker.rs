//! Checker end to end: provider lookup, pipeline and enumerative solving

#[path = "../common/mod.rs"]
mod common;

use common::*;
use concolic_engine::config::EngineConfig;
use concolic_engine::context::AnalysisContext;
use concolic_engine::features::predicate_state::PredicateState;
use concolic_engine::features::smt::Checker;
use concolic_engine::shared::models::{
    BinaryOp, CmpOp, InstructionRef, MethodRef, Predicate, PredicateKind, SymType, Term,
};
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;
use std::sync::Arc;

fn context() -> AnalysisContext {
    AnalysisContext::new(Arc::new(EngineConfig::default()))
}

fn inc() -> MethodRef {
    MethodRef::new("Util", "inc")
}

/// `Util.inc(a) = a + 1`
fn register_inc(ctx: &mut AnalysisContext) {
    let tmp = int("tmp");
    ctx.methods_mut().register(
        inc(),
        PredicateState::basic(vec![
            Predicate::assign(
                tmp.clone(),
                Term::binary(BinaryOp::Add, Term::argument(0, SymType::Int), Term::int(1)),
            ),
            Predicate::assign(Term::return_value(inc(), SymType::Int), tmp),
        ]),
    );
}

#[test]
fn test_reachable_instruction_yields_inputs() {
    let ctx = context();
    let checker = Checker::new(&ctx, Enumerative);
    let (x, y) = (int("x"), int("y"));
    let target = InstructionRef::other("Foo.bar", 7);
    let mut states = FxHashMap::default();
    states.insert(
        target.clone(),
        PredicateState::basic(vec![
            path_cmp(CmpOp::Eq, x.clone(), Term::int(0)),
            path_cmp(CmpOp::Eq, y.clone(), Term::int(1)),
        ]),
    );

    let result = checker.check_reachable(&states, &target).unwrap();
    let model = result.model().expect("reachable");
    assert_eq!(model.value_of(&x), Some(&Term::int(0)));
    assert_eq!(model.value_of(&y), Some(&Term::int(1)));
}

#[test]
fn test_unreachable_instruction() {
    let ctx = context();
    let checker = Checker::new(&ctx, Enumerative);
    let x = int("x");
    let target = InstructionRef::other("Foo.bar", 9);
    let mut states = FxHashMap::default();
    states.insert(
        target.clone(),
        PredicateState::basic(vec![
            path_cmp(CmpOp::Gt, x.clone(), Term::int(3)),
            path_cmp(CmpOp::Lt, x, Term::int(3)),
        ]),
    );
    assert!(checker.check_reachable(&states, &target).unwrap().is_unsat());
}

#[test]
fn test_inlined_callee_constrains_argument() {
    let mut ctx = context();
    register_inc(&mut ctx);
    let checker = Checker::new(&ctx, Enumerative);

    let (x, y) = (int("x"), int("y"));
    let state = PredicateState::basic(vec![Predicate::call(
        Some(y.clone()),
        Term::call(inc(), None, vec![x.clone()], SymType::Int),
    )]);
    let query = PredicateState::basic(vec![path_cmp(CmpOp::Eq, y, Term::int(5))]);

    let result = checker.check(&state, &query).unwrap();
    assert_eq!(result.model().unwrap().value_of(&x), Some(&Term::int(4)));
}

#[test]
fn test_requirement_violation() {
    let ctx = context();
    let checker = Checker::new(&ctx, Enumerative);
    let x = int("x");
    let state = PredicateState::basic(vec![path_cmp(CmpOp::Ge, x.clone(), Term::int(0))]);
    let query = PredicateState::basic(vec![Predicate::equality(
        PredicateKind::Require,
        Term::cmp(CmpOp::Neq, x.clone(), Term::int(0)),
        Term::bool(true),
    )]);

    let result = checker.is_violated(&state, &query).unwrap();
    assert_eq!(result.model().unwrap().value_of(&x), Some(&Term::int(0)));
}

#[test]
fn test_pipeline_failure_carries_state() {
    let mut ctx = context();
    register_inc(&mut ctx);
    let checker = Checker::new(&ctx, Enumerative);

    // Util.inc takes one argument
    let state = PredicateState::basic(vec![Predicate::call(
        Some(int("y")),
        Term::call(inc(), None, vec![], SymType::Int),
    )]);
    let err = checker.prepare_and_check(&state).unwrap_err();
    assert_eq!(err.state, state);
    assert!(err.to_string().contains("while checking state"));
}
