//! Explicit integral/floating conversions
//!
//! Binary and comparison operands of different numeric kinds are cast to
//! the wider floating type (`double` over `float` over any integral type).
//! Equalities cast their right-hand side to the type of the left.

use crate::features::transform::domain::Transformer;
use crate::shared::models::{Predicate, PredicateBody, SymType, Term, TermKind};

#[derive(Debug, Default)]
pub struct FloatTypeAdapter;

impl FloatTypeAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn rank(ty: &SymType) -> Option<u8> {
    match ty {
        SymType::Double => Some(3),
        SymType::Float => Some(2),
        ty if ty.is_integral() => Some(1),
        _ => None,
    }
}

/// Common floating type of two numeric operands, when they need one
fn common_floating(a: &SymType, b: &SymType) -> Option<SymType> {
    if a == b || !(a.is_floating() || b.is_floating()) {
        return None;
    }
    let (ra, rb) = (rank(a)?, rank(b)?);
    Some(if ra >= rb { a.clone() } else { b.clone() })
}

fn cast_to(term: &Term, ty: &SymType) -> Term {
    if term.ty() == ty {
        term.clone()
    } else {
        Term::cast(term.clone(), ty.clone())
    }
}

impl Transformer for FloatTypeAdapter {
    fn name(&self) -> &'static str {
        "float-type-adapter"
    }

    fn transform_predicate(&mut self, predicate: &Predicate) -> Option<Predicate> {
        let predicate = predicate.map_terms(&mut |t| self.transform_term(t));
        let body = match &predicate.body {
            PredicateBody::Equality { lhv, rhv }
                if common_floating(lhv.ty(), rhv.ty()).is_some() =>
            {
                PredicateBody::Equality {
                    lhv: lhv.clone(),
                    rhv: cast_to(rhv, lhv.ty()),
                }
            }
            PredicateBody::Inequality { lhv, rhv }
                if common_floating(lhv.ty(), rhv.ty()).is_some() =>
            {
                PredicateBody::Inequality {
                    lhv: lhv.clone(),
                    rhv: cast_to(rhv, lhv.ty()),
                }
            }
            _ => return Some(predicate),
        };
        Some(Predicate::new(predicate.kind, body))
    }

    fn transform_term_node(&mut self, term: Term) -> Term {
        match term.kind() {
            TermKind::Binary { op, lhv, rhv } => match common_floating(lhv.ty(), rhv.ty()) {
                Some(ty) => Term::binary(*op, cast_to(lhv, &ty), cast_to(rhv, &ty)),
                None => term,
            },
            TermKind::Cmp { op, lhv, rhv } => match common_floating(lhv.ty(), rhv.ty()) {
                Some(ty) => Term::cmp(*op, cast_to(lhv, &ty), cast_to(rhv, &ty)),
                None => term,
            },
            _ => term,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{BinaryOp, CmpOp};

    #[test]
    fn test_int_plus_double_promoted() {
        let i = Term::value("i", SymType::Int);
        let d = Term::value("d", SymType::Double);
        let t = FloatTypeAdapter::new().transform_term(&Term::binary(BinaryOp::Add, i, d));
        assert_eq!(t.ty(), &SymType::Double);
        assert_eq!(t.to_string(), "((double) i + d)");
    }

    #[test]
    fn test_float_double_compare_uses_double() {
        let f = Term::value("f", SymType::Float);
        let t = FloatTypeAdapter::new().transform_term(&Term::cmp(CmpOp::Lt, f, Term::double(1.5)));
        assert_eq!(t.to_string(), "((double) f < 1.5)");
    }

    #[test]
    fn test_integral_operands_untouched() {
        let t = Term::binary(BinaryOp::Mul, Term::value("a", SymType::Int), Term::long(3));
        assert_eq!(FloatTypeAdapter::new().transform_term(&t), t);
    }
}
