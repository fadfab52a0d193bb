//! Common test utilities for concolic-engine
//!
//! Term and clause fixtures plus proptest strategies shared by the unit and
//! integration targets.

#![allow(dead_code)]

use concolic_engine::features::predicate_state::PredicateState;
use concolic_engine::features::smt::{BackendFactory, EnumerativeBackend, SmtError};
use concolic_engine::shared::models::{
    Clause, CmpOp, InstructionKind, InstructionRef, Predicate, PredicateKind, SymType,
    SymbolicState, Term,
};
use proptest::prelude::*;

// ============================================================================
// Fixtures
// ============================================================================

pub fn int(name: &str) -> Term {
    Term::value(name, SymType::Int)
}

/// `@P (lhv op rhv) = true`
pub fn path_cmp(op: CmpOp, lhv: Term, rhv: Term) -> Predicate {
    Predicate::path(Term::cmp(op, lhv, rhv), Term::bool(true))
}

pub fn branch(method: &str, index: u32, cond: Term, taken: bool) -> Clause {
    Clause::new(
        InstructionRef::branch(method, index),
        Predicate::path(cond, Term::bool(taken)),
    )
}

pub fn assign(method: &str, index: u32, lhv: Term, rhv: Term) -> Clause {
    Clause::new(InstructionRef::other(method, index), Predicate::assign(lhv, rhv))
}

pub fn switch_instruction(method: &str, index: u32, cases: &[(i64, u32)], default: u32) -> InstructionRef {
    InstructionRef::new(
        method,
        index,
        InstructionKind::Switch {
            cases: cases.to_vec(),
            default,
        },
    )
}

pub fn trace(clauses: Vec<Clause>) -> SymbolicState {
    SymbolicState::from_clauses(clauses)
}

pub fn texts(state: &PredicateState) -> Vec<String> {
    state.predicates().iter().map(|p| p.to_string()).collect()
}

/// Enumerative backend with a test-sized budget
pub struct Enumerative;

impl BackendFactory for Enumerative {
    type Backend = EnumerativeBackend;

    fn create(&self) -> Result<EnumerativeBackend, SmtError> {
        Ok(EnumerativeBackend::new(200_000))
    }
}

// ============================================================================
// Strategies
// ============================================================================

pub fn arb_predicate() -> impl Strategy<Value = Predicate> {
    (0u8..4, -5i32..5, 0u8..3).prop_map(|(v, c, shape)| {
        let var = int(&format!("v{}", v));
        match shape {
            0 => Predicate::assign(var, Term::int(c)),
            1 => path_cmp(CmpOp::Lt, var, Term::int(c)),
            _ => Predicate::equality(
                PredicateKind::Require,
                Term::cmp(CmpOp::Neq, var, Term::int(c)),
                Term::bool(true),
            ),
        }
    })
}

pub fn arb_state() -> impl Strategy<Value = PredicateState> {
    let leaf = prop::collection::vec(arb_predicate(), 0..4).prop_map(PredicateState::basic);
    leaf.prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| PredicateState::chain(a, b)),
            prop::collection::vec(inner, 1..3).prop_map(PredicateState::choice),
        ]
    })
}
