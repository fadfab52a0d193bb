//! Explicit bool/integral conversions
//!
//! Booleans are a separate solver sort. Wherever a boolean meets an integral
//! operand the boolean side gets an explicit cast, so no conversion is left
//! implicit for the solver layer.

use crate::features::transform::domain::Transformer;
use crate::shared::models::{Predicate, PredicateBody, SymType, Term, TermKind};

#[derive(Debug, Default)]
pub struct BoolTypeAdapter;

impl BoolTypeAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn mixes_bool(a: &SymType, b: &SymType) -> bool {
    (a.is_bool() && b.is_integral()) || (a.is_integral() && b.is_bool())
}

/// Bool and sub-word operands widened to `Int`, `Long` kept
fn widen(term: &Term) -> Term {
    match term.ty() {
        SymType::Int | SymType::Long => term.clone(),
        _ => Term::cast(term.clone(), SymType::Int),
    }
}

impl Transformer for BoolTypeAdapter {
    fn name(&self) -> &'static str {
        "bool-type-adapter"
    }

    fn transform_predicate(&mut self, predicate: &Predicate) -> Option<Predicate> {
        let predicate = predicate.map_terms(&mut |t| self.transform_term(t));
        let body = match &predicate.body {
            PredicateBody::Equality { lhv, rhv } if mixes_bool(lhv.ty(), rhv.ty()) => {
                PredicateBody::Equality {
                    lhv: lhv.clone(),
                    rhv: Term::cast(rhv.clone(), lhv.ty().clone()),
                }
            }
            PredicateBody::Inequality { lhv, rhv } if mixes_bool(lhv.ty(), rhv.ty()) => {
                PredicateBody::Inequality {
                    lhv: lhv.clone(),
                    rhv: Term::cast(rhv.clone(), lhv.ty().clone()),
                }
            }
            _ => return Some(predicate),
        };
        Some(Predicate::new(predicate.kind, body))
    }

    fn transform_term_node(&mut self, term: Term) -> Term {
        match term.kind() {
            TermKind::Binary { op, lhv, rhv }
                if op.is_logical() && lhv.ty() != rhv.ty() && mixes_bool(lhv.ty(), rhv.ty()) =>
            {
                let (l, r) = (widen(lhv), widen(rhv));
                let (l, r) = match (l.ty(), r.ty()) {
                    (SymType::Long, SymType::Int) => (l, Term::cast(r, SymType::Long)),
                    (SymType::Int, SymType::Long) => (Term::cast(l, SymType::Long), r),
                    _ => (l, r),
                };
                Term::binary(*op, l, r)
            }
            TermKind::Cmp { op, lhv, rhv } if mixes_bool(lhv.ty(), rhv.ty()) => {
                let (l, r) = if lhv.ty().is_bool() {
                    (Term::cast(lhv.clone(), rhv.ty().clone()), rhv.clone())
                } else {
                    (lhv.clone(), Term::cast(rhv.clone(), lhv.ty().clone()))
                };
                Term::cmp(*op, l, r)
            }
            _ => term,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::predicate_state::PredicateState;
    use crate::shared::models::{BinaryOp, CmpOp};

    #[test]
    fn test_bool_int_equality_gets_cast() {
        let b = Term::value("b", SymType::Bool);
        let state = PredicateState::basic(vec![Predicate::assign(b.clone(), Term::int(1))]);
        let out = BoolTypeAdapter::new().apply(&state).unwrap();
        assert_eq!(out.predicates()[0].to_string(), "@S b = (bool) 1");
    }

    #[test]
    fn test_mixed_logical_op_widened() {
        let b = Term::value("b", SymType::Bool);
        let i = Term::value("i", SymType::Int);
        let t = BoolTypeAdapter::new().transform_term(&Term::binary(BinaryOp::And, b, i.clone()));
        assert_eq!(t.ty(), &SymType::Int);
        assert_eq!(t.to_string(), "((int) b & i)");

        let c = BoolTypeAdapter::new().transform_term(&Term::cmp(CmpOp::Eq, i, Term::bool(true)));
        assert_eq!(c.to_string(), "(i == (int) true)");
    }

    #[test]
    fn test_matching_types_untouched() {
        let x = Term::value("x", SymType::Int);
        let t = Term::binary(BinaryOp::Add, x.clone(), Term::int(2));
        assert_eq!(BoolTypeAdapter::new().transform_term(&t), t);
    }
}
