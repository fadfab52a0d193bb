//! Constant folding
//!
//! Folds arithmetic, comparisons, negations and casts whose operands are
//! constants. Results follow the solver encoding exactly (wrapping at the
//! sort width, masked shift amounts, IEEE comparisons), so folding never
//! changes satisfiability. Divisions by zero and float-to-int casts outside
//! the target range are left for the solver.

use crate::features::transform::domain::Transformer;
use crate::shared::models::{BinaryOp, CmpOp, SymType, Term, TermKind};
use std::cmp::Ordering;

#[derive(Debug, Default)]
pub struct ConstantPropagator {
    folded: usize,
}

impl ConstantPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folded(&self) -> usize {
        self.folded
    }
}

/// Sign-extend the low `width` bits
fn wrap(value: i64, width: u32) -> i64 {
    if width >= 64 {
        value
    } else {
        let shift = 64 - width;
        (value << shift) >> shift
    }
}

fn fold_int(op: BinaryOp, l: i64, r: i64, width: u32) -> Option<i64> {
    let shift = (r as u32) & (width - 1);
    let unsigned = if width >= 64 {
        l as u64
    } else {
        (l as u64) & ((1u64 << width) - 1)
    };
    let value = match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div if r == 0 => return None,
        BinaryOp::Div => l.wrapping_div(r),
        BinaryOp::Rem if r == 0 => return None,
        BinaryOp::Rem => l.wrapping_rem(r),
        BinaryOp::Shl => l.wrapping_shl(shift),
        BinaryOp::Shr => l >> shift,
        BinaryOp::Ushr => (unsigned >> shift) as i64,
        BinaryOp::And => l & r,
        BinaryOp::Or => l | r,
        BinaryOp::Xor => l ^ r,
    };
    Some(wrap(value, width))
}

fn fold_float(op: BinaryOp, l: f64, r: f64, single: bool) -> Option<f64> {
    if single {
        let (l, r) = (l as f32, r as f32);
        let v = match op {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div => l / r,
            _ => return None,
        };
        return Some(v as f64);
    }
    match op {
        BinaryOp::Add => Some(l + r),
        BinaryOp::Sub => Some(l - r),
        BinaryOp::Mul => Some(l * r),
        BinaryOp::Div => Some(l / r),
        _ => None,
    }
}

fn floating(value: f64, ty: &SymType) -> Term {
    match ty {
        SymType::Float => Term::float(value as f32),
        _ => Term::double(value),
    }
}

fn compare(op: CmpOp, ordering: Option<Ordering>) -> Term {
    use Ordering::*;
    match op {
        CmpOp::Eq => Term::bool(ordering == Some(Equal)),
        CmpOp::Neq => Term::bool(ordering != Some(Equal)),
        CmpOp::Lt => Term::bool(ordering == Some(Less)),
        CmpOp::Le => Term::bool(matches!(ordering, Some(Less | Equal))),
        CmpOp::Gt => Term::bool(ordering == Some(Greater)),
        CmpOp::Ge => Term::bool(matches!(ordering, Some(Greater | Equal))),
        CmpOp::Cmp | CmpOp::Cmpg => Term::int(match ordering {
            Some(Less) => -1,
            Some(Equal) => 0,
            _ => 1,
        }),
        CmpOp::Cmpl => Term::int(match ordering {
            Some(Greater) => 1,
            Some(Equal) => 0,
            _ => -1,
        }),
    }
}

fn fold_binary(op: BinaryOp, lhv: &Term, rhv: &Term) -> Option<Term> {
    let ty = lhv.ty();
    match (lhv.kind(), rhv.kind()) {
        (TermKind::ConstInt(l), TermKind::ConstInt(r)) if ty.is_integral() => {
            let value = fold_int(op, *l, *r, ty.bit_size())?;
            Some(Term::integral(value, ty.clone()))
        }
        (TermKind::ConstBool(l), TermKind::ConstBool(r)) => match op {
            BinaryOp::And => Some(Term::bool(*l && *r)),
            BinaryOp::Or => Some(Term::bool(*l || *r)),
            BinaryOp::Xor => Some(Term::bool(*l ^ *r)),
            _ => None,
        },
        (TermKind::ConstFloat(_), TermKind::ConstFloat(_)) if ty == rhv.ty() => {
            let value = fold_float(op, lhv.as_float()?, rhv.as_float()?, ty == &SymType::Float)?;
            Some(floating(value, ty))
        }
        _ => None,
    }
}

fn fold_cmp(op: CmpOp, lhv: &Term, rhv: &Term) -> Option<Term> {
    let ordering = match (lhv.kind(), rhv.kind()) {
        (TermKind::ConstInt(l), TermKind::ConstInt(r)) => Some(l.cmp(r)),
        (TermKind::ConstFloat(_), TermKind::ConstFloat(_)) => {
            lhv.as_float()?.partial_cmp(&rhv.as_float()?)
        }
        (TermKind::ConstBool(l), TermKind::ConstBool(r)) => match op {
            CmpOp::Eq | CmpOp::Neq => Some(l.cmp(r)),
            _ => return None,
        },
        (TermKind::Null, TermKind::Null) => match op {
            CmpOp::Eq | CmpOp::Neq => Some(Ordering::Equal),
            _ => return None,
        },
        _ => return None,
    };
    Some(compare(op, ordering))
}

fn fold_cast(operand: &Term, target: &SymType) -> Option<Term> {
    match operand.kind() {
        TermKind::ConstInt(v) => match target {
            SymType::Bool => Some(Term::bool(*v != 0)),
            SymType::Float | SymType::Double => Some(floating(*v as f64, target)),
            ty if ty.is_integral() => Some(Term::integral(wrap(*v, ty.bit_size()), ty.clone())),
            _ => None,
        },
        TermKind::ConstBool(b) => match target {
            SymType::Bool => Some(operand.clone()),
            ty if ty.is_integral() => Some(Term::integral(*b as i64, ty.clone())),
            _ => None,
        },
        TermKind::ConstFloat(_) => {
            let v = operand.as_float()?;
            match target {
                SymType::Float | SymType::Double => Some(floating(v, target)),
                ty if ty.is_integral() => {
                    let truncated = v.trunc();
                    let width = ty.bit_size();
                    let (min, max) = if width >= 64 {
                        (i64::MIN as f64, i64::MAX as f64)
                    } else {
                        (i32::MIN as f64, i32::MAX as f64)
                    };
                    if v.is_nan() || truncated < min || truncated > max {
                        return None;
                    }
                    Some(Term::integral(truncated as i64, ty.clone()))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

impl Transformer for ConstantPropagator {
    fn name(&self) -> &'static str {
        "constant-propagator"
    }

    fn transform_term_node(&mut self, term: Term) -> Term {
        let folded = match term.kind() {
            TermKind::Binary { op, lhv, rhv } => fold_binary(*op, lhv, rhv),
            TermKind::Cmp { op, lhv, rhv } => fold_cmp(*op, lhv, rhv),
            TermKind::Neg(operand) => match operand.kind() {
                TermKind::ConstInt(v) if term.ty().is_integral() => Some(Term::integral(
                    wrap(v.wrapping_neg(), term.ty().bit_size()),
                    term.ty().clone(),
                )),
                TermKind::ConstFloat(_) => operand.as_float().map(|v| floating(-v, term.ty())),
                TermKind::ConstBool(b) => Some(Term::bool(!b)),
                _ => None,
            },
            TermKind::Cast(operand) => fold_cast(operand, term.ty()),
            _ => None,
        };
        match folded {
            Some(constant) => {
                self.folded += 1;
                constant
            }
            None => term,
        }
    }
}
