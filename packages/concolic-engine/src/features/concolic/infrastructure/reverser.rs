//! Path clause reversal
//!
//! Two-way decisions are negated in place. Switch decisions pick an outcome
//! not yet observed among the sibling clauses at the same decision point;
//! cases that jump to the same block form one equivalence class, so only
//! one representative per class is ever tried.

use crate::shared::models::{Clause, InstructionKind, Predicate, PredicateBody, Term};
use rustc_hash::FxHashSet;
use tracing::warn;

#[derive(Debug, Default, Clone, Copy)]
pub struct ClauseReverser;

impl ClauseReverser {
    pub fn new() -> Self {
        Self
    }

    /// Clause taking a different outcome of the same instruction, or `None`
    /// when every outcome has been tried
    pub fn reverse(&self, clause: &Clause, siblings: &[&Predicate]) -> Option<Clause> {
        if !clause.is_path() {
            warn!(clause = %clause, "cannot reverse a non-path clause");
            return None;
        }
        let reversed = match &clause.instruction.kind {
            InstructionKind::Switch { cases, default } => {
                reverse_switch(&clause.predicate, cases, *default, siblings)
            }
            _ => clause.predicate.inverse(),
        };
        if reversed.is_none() && !is_switch_shape(&clause.predicate) {
            warn!(clause = %clause, "unknown clause shape");
        }
        reversed.map(|predicate| Clause::new(clause.instruction.clone(), predicate))
    }
}

fn is_switch_shape(predicate: &Predicate) -> bool {
    matches!(
        predicate.body,
        PredicateBody::Equality { .. } | PredicateBody::DefaultSwitch { .. }
    )
}

fn reverse_switch(
    predicate: &Predicate,
    cases: &[(i64, u32)],
    default: u32,
    siblings: &[&Predicate],
) -> Option<Predicate> {
    let target_of = |value: i64| {
        cases
            .iter()
            .find(|(c, _)| *c == value)
            .map(|(_, t)| *t)
            .unwrap_or(default)
    };

    let mut visited: FxHashSet<u32> = FxHashSet::default();
    for sibling in siblings {
        match &sibling.body {
            PredicateBody::Equality { rhv, .. } => {
                if let Some(v) = rhv.as_int() {
                    visited.insert(target_of(v));
                }
            }
            PredicateBody::DefaultSwitch { .. } => {
                visited.insert(default);
            }
            _ => {}
        }
    }

    let cond = match &predicate.body {
        PredicateBody::Equality { lhv, rhv } => {
            if let Some(v) = rhv.as_int() {
                visited.insert(target_of(v));
            }
            lhv
        }
        PredicateBody::DefaultSwitch { cond, .. } => {
            visited.insert(default);
            cond
        }
        _ => return None,
    };

    let mut candidates: Vec<i64> = cases
        .iter()
        .filter(|(_, t)| !visited.contains(t))
        .map(|(v, _)| *v)
        .collect();
    candidates.sort_unstable();
    if let Some(&value) = candidates.first() {
        return Some(Predicate::equality(
            predicate.kind,
            cond.clone(),
            Term::integral(value, cond.ty().clone()),
        ));
    }
    if visited.contains(&default) {
        return None;
    }
    let known = cases
        .iter()
        .map(|(v, _)| Term::integral(*v, cond.ty().clone()))
        .collect();
    Some(Predicate::default_switch(predicate.kind, cond.clone(), known))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{CmpOp, InstructionRef, PredicateKind, SymType};

    fn x() -> Term {
        Term::value("x", SymType::Int)
    }

    fn switch() -> InstructionRef {
        InstructionRef::new(
            "m",
            4,
            InstructionKind::Switch {
                cases: vec![(1, 10), (2, 10), (3, 11)],
                default: 12,
            },
        )
    }

    fn case(v: i32) -> Clause {
        Clause::new(
            switch(),
            Predicate::equality(PredicateKind::Path, x(), Term::int(v)),
        )
    }

    #[test]
    fn test_branch_flips() {
        let clause = Clause::new(
            InstructionRef::branch("m", 1),
            Predicate::path(Term::cmp(CmpOp::Lt, x(), Term::int(0)), Term::bool(true)),
        );
        let reversed = ClauseReverser::new().reverse(&clause, &[]).unwrap();
        assert_eq!(reversed.predicate.to_string(), "@P (x < 0) = false");
        assert_eq!(reversed.instruction, clause.instruction);
    }

    #[test]
    fn test_null_check_flips() {
        let o = Term::value("o", SymType::class("A"));
        let clause = Clause::new(
            InstructionRef::other("m", 2),
            Predicate::equality(PredicateKind::Path, o, Term::null()),
        );
        let reversed = ClauseReverser::new().reverse(&clause, &[]).unwrap();
        assert!(matches!(reversed.predicate.body, PredicateBody::Inequality { .. }));
    }

    #[test]
    fn test_switch_skips_equivalent_cases() {
        let reverser = ClauseReverser::new();
        let taken = case(1);
        // case 2 shares the target of case 1
        let next = reverser.reverse(&taken, &[&taken.predicate]).unwrap();
        assert_eq!(next, case(3));

        let seen = [&taken.predicate, &next.predicate];
        let fallback = reverser.reverse(&taken, &seen).unwrap();
        let PredicateBody::DefaultSwitch { cases, .. } = &fallback.predicate.body else {
            panic!("expected default switch");
        };
        assert_eq!(cases.len(), 3);

        let all = [&taken.predicate, &next.predicate, &fallback.predicate];
        assert!(reverser.reverse(&taken, &all).is_none());
    }

    #[test]
    fn test_default_picks_case() {
        let clause = Clause::new(
            switch(),
            Predicate::default_switch(PredicateKind::Path, x(), vec![Term::int(1), Term::int(2), Term::int(3)]),
        );
        let reversed = ClauseReverser::new().reverse(&clause, &[]).unwrap();
        assert_eq!(reversed, case(1));
    }

    #[test]
    fn test_state_clause_is_not_reversed() {
        let clause = Clause::new(InstructionRef::other("m", 0), Predicate::assign(x(), Term::int(1)));
        assert!(ClauseReverser::new().reverse(&clause, &[]).is_none());
    }
}
