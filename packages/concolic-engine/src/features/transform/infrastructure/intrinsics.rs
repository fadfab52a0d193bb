//! Intrinsic call adaptation
//!
//! Calls into well-known assertion helpers carry meaning the solver can use
//! directly. They are rewritten into `Assume`/`Require` predicates; every
//! other call is left alone.

use crate::features::predicate_state::PredicateState;
use crate::features::transform::domain::Transformer;
use crate::shared::models::{Predicate, PredicateBody, PredicateKind, Term, TermKind};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    /// `assume(cond)`
    Assume,
    /// `assert(cond)`
    Assert,
    /// Marks a point that must never execute
    Unreachable,
    /// Argument 0 is not null
    NotNull,
    /// Argument 0 is not null and is returned
    RequireNonNull,
}

const KNOWN: &[(&str, Intrinsic)] = &[
    ("org/vorpal/research/kex/Intrinsics.kexAssume", Intrinsic::Assume),
    ("org/vorpal/research/kex/Intrinsics.kexAssert", Intrinsic::Assert),
    ("org/vorpal/research/kex/Intrinsics.kexUnreachable", Intrinsic::Unreachable),
    ("org/vorpal/research/kex/Intrinsics.kexNotNull", Intrinsic::NotNull),
    ("kotlin/jvm/internal/Intrinsics.checkNotNull", Intrinsic::NotNull),
    ("kotlin/jvm/internal/Intrinsics.checkNotNullParameter", Intrinsic::NotNull),
    ("kotlin/jvm/internal/Intrinsics.checkParameterIsNotNull", Intrinsic::NotNull),
    ("kotlin/jvm/internal/Intrinsics.checkNotNullExpressionValue", Intrinsic::NotNull),
    ("kotlin/jvm/internal/Intrinsics.checkExpressionValueIsNotNull", Intrinsic::NotNull),
    ("java/util/Objects.requireNonNull", Intrinsic::RequireNonNull),
];

static INTRINSICS: Lazy<FxHashMap<&'static str, Intrinsic>> =
    Lazy::new(|| KNOWN.iter().copied().collect());

/// Intrinsic behind `method_name` (`class.method`), if any
pub fn lookup(method_name: &str) -> Option<Intrinsic> {
    INTRINSICS.get(method_name).copied()
}

#[derive(Debug, Default)]
pub struct IntrinsicAdapter {
    adapted: usize,
}

impl IntrinsicAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adapted(&self) -> usize {
        self.adapted
    }

    fn adapt(&mut self, lhv: Option<&Term>, call: &Term) -> Option<Vec<Predicate>> {
        let TermKind::Call { method, args, .. } = call.kind() else {
            return None;
        };
        let intrinsic = lookup(&method.full_name())?;
        let first = args.first();
        let adapted = match (intrinsic, first) {
            (Intrinsic::Assume, Some(cond)) => vec![Predicate::equality(
                PredicateKind::Assume,
                cond.clone(),
                Term::bool(true),
            )],
            (Intrinsic::Assert, Some(cond)) => vec![Predicate::equality(
                PredicateKind::Require,
                cond.clone(),
                Term::bool(true),
            )],
            (Intrinsic::Unreachable, _) => vec![Predicate::equality(
                PredicateKind::Require,
                Term::bool(false),
                Term::bool(true),
            )],
            (Intrinsic::NotNull, Some(value)) => vec![Predicate::inequality(
                PredicateKind::Assume,
                value.clone(),
                Term::null(),
            )],
            (Intrinsic::RequireNonNull, Some(value)) => {
                let mut ps = vec![Predicate::inequality(
                    PredicateKind::Assume,
                    value.clone(),
                    Term::null(),
                )];
                if let Some(lhv) = lhv {
                    ps.push(Predicate::assign(lhv.clone(), value.clone()));
                }
                ps
            }
            _ => return None,
        };
        self.adapted += 1;
        Some(adapted)
    }
}

impl Transformer for IntrinsicAdapter {
    fn name(&self) -> &'static str {
        "intrinsic-adapter"
    }

    fn transform_basic(&mut self, predicates: &[Predicate]) -> PredicateState {
        let mut out = Vec::with_capacity(predicates.len());
        for p in predicates {
            let adapted = match &p.body {
                PredicateBody::Call { lhv, call } => self.adapt(lhv.as_ref(), call),
                _ => None,
            };
            match adapted {
                Some(ps) => out.extend(ps),
                None => out.push(p.clone()),
            }
        }
        PredicateState::basic(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{MethodRef, SymType};

    fn call(class: &str, name: &str, args: Vec<Term>) -> Term {
        Term::call(MethodRef::new(class, name), None, args, SymType::Void)
    }

    #[test]
    fn test_assume_and_assert() {
        let c = Term::value("c", SymType::Bool);
        let state = PredicateState::basic(vec![
            Predicate::call(None, call("org/vorpal/research/kex/Intrinsics", "kexAssume", vec![c.clone()])),
            Predicate::call(None, call("org/vorpal/research/kex/Intrinsics", "kexAssert", vec![c.clone()])),
        ]);
        let mut adapter = IntrinsicAdapter::new();
        let out = adapter.apply(&state).unwrap();
        let kinds: Vec<PredicateKind> = out.predicates().iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PredicateKind::Assume, PredicateKind::Require]);
        assert_eq!(adapter.adapted(), 2);
    }

    #[test]
    fn test_kotlin_null_checks() {
        assert_eq!(
            lookup("kotlin/jvm/internal/Intrinsics.checkNotNullParameter"),
            Some(Intrinsic::NotNull)
        );
        let o = Term::value("o", SymType::class("A"));
        let r = Term::value("r", SymType::class("A"));
        let state = PredicateState::basic(vec![Predicate::call(
            Some(r.clone()),
            Term::call(
                MethodRef::new("java/util/Objects", "requireNonNull"),
                None,
                vec![o.clone()],
                SymType::class("A"),
            ),
        )]);
        let out = IntrinsicAdapter::new().apply(&state).unwrap();
        let text: Vec<String> = out.predicates().iter().map(|p| p.to_string()).collect();
        assert_eq!(text, vec!["@A o != null", "@S r = o"]);
    }

    #[test]
    fn test_unknown_calls_untouched() {
        let state = PredicateState::basic(vec![Predicate::call(None, call("A", "foo", vec![]))]);
        assert_eq!(IntrinsicAdapter::new().apply(&state).unwrap(), state);
    }
}
