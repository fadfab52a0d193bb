//! In-crate expression AST and the `AstEngine` that builds it
//!
//! Both bundled backends (bounded enumeration and SMT-LIB process) decide
//! formulas expressed in this AST. Construction performs sort checking and
//! light local folding (boolean constants, double negation, n-ary and/or
//! flattening) and nothing else.

use crate::features::smt::domain::{mask, Opcode, SmtEngine, SmtError};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    BitVec(u32),
    Float,
    Double,
    Str,
    Array(Box<Sort>, Box<Sort>),
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::BitVec(w) => write!(f, "(_ BitVec {})", w),
            Sort::Float => write!(f, "Float32"),
            Sort::Double => write!(f, "Float64"),
            Sort::Str => write!(f, "String"),
            Sort::Array(d, r) => write!(f, "(Array {} {})", d, r),
        }
    }
}

/// Numeric conversions that cannot be expressed with other nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    /// Sign-extend by the given number of bits
    SignExtend(u32),
    /// Signed bit-vector to floating point
    BvToFp,
    /// Floating point to signed bit-vector, rounding toward zero
    FpToBv,
    /// Between float and double precision
    FpToFp,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Var(Arc<str>),
    /// Variable bound by binder `binder` at position `index`
    Bound { binder: u32, index: u32 },
    BoolConst(bool),
    /// Bits masked to the sort's width
    BvConst(u64),
    /// `f64` bits; float-sorted constants are stored widened
    FpConst(u64),
    StrConst(Arc<str>),
    ConstArray(SmtExpr),
    Not(SmtExpr),
    And(Vec<SmtExpr>),
    Or(Vec<SmtExpr>),
    Binary(Opcode, SmtExpr, SmtExpr),
    Neg(SmtExpr),
    Ite(SmtExpr, SmtExpr, SmtExpr),
    Extract { high: u32, low: u32, arg: SmtExpr },
    Convert(Conversion, SmtExpr),
    Select(SmtExpr, SmtExpr),
    Store(SmtExpr, SmtExpr, SmtExpr),
    Quantifier {
        universal: bool,
        binder: u32,
        sorts: Vec<Sort>,
        body: SmtExpr,
        patterns: Vec<Vec<SmtExpr>>,
    },
    Lambda {
        binder: u32,
        sorts: Vec<Sort>,
        body: SmtExpr,
    },
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ExprNode {
    pub sort: Sort,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SmtExpr(Arc<ExprNode>);

impl SmtExpr {
    pub fn new(sort: Sort, kind: ExprKind) -> Self {
        SmtExpr(Arc::new(ExprNode { sort, kind }))
    }

    pub fn sort(&self) -> &Sort {
        &self.0.sort
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    pub fn as_bool_const(&self) -> Option<bool> {
        match self.kind() {
            ExprKind::BoolConst(b) => Some(*b),
            _ => None,
        }
    }

    pub fn children(&self) -> Vec<&SmtExpr> {
        match self.kind() {
            ExprKind::Var(_)
            | ExprKind::Bound { .. }
            | ExprKind::BoolConst(_)
            | ExprKind::BvConst(_)
            | ExprKind::FpConst(_)
            | ExprKind::StrConst(_) => Vec::new(),
            ExprKind::ConstArray(e)
            | ExprKind::Not(e)
            | ExprKind::Neg(e)
            | ExprKind::Extract { arg: e, .. }
            | ExprKind::Convert(_, e) => vec![e],
            ExprKind::And(es) | ExprKind::Or(es) => es.iter().collect(),
            ExprKind::Binary(_, a, b) | ExprKind::Select(a, b) => vec![a, b],
            ExprKind::Ite(a, b, c) | ExprKind::Store(a, b, c) => vec![a, b, c],
            ExprKind::Quantifier { body, patterns, .. } => std::iter::once(body)
                .chain(patterns.iter().flatten())
                .collect(),
            ExprKind::Lambda { body, .. } => vec![body],
        }
    }

    /// Free variables with their sorts, in first-occurrence order
    pub fn free_vars(&self, out: &mut Vec<(Arc<str>, Sort)>) {
        if let ExprKind::Var(name) = self.kind() {
            if !out.iter().any(|(n, _)| n == name) {
                out.push((name.clone(), self.sort().clone()));
            }
            return;
        }
        for child in self.children() {
            child.free_vars(out);
        }
    }

    pub fn has_binders(&self) -> bool {
        matches!(
            self.kind(),
            ExprKind::Quantifier { .. } | ExprKind::Lambda { .. } | ExprKind::Bound { .. }
        ) || self.children().into_iter().any(|c| c.has_binders())
    }
}

impl fmt::Display for SmtExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::smtlib::to_smtlib(self))
    }
}

/// Expression factory implementing `SmtEngine` over `SmtExpr`
#[derive(Debug, Default)]
pub struct AstEngine {
    fresh: u32,
    binders: u32,
}

impl AstEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn bv_const(value: u64, width: u32) -> SmtExpr {
        SmtExpr::new(Sort::BitVec(width), ExprKind::BvConst(value & mask(width)))
    }

    fn bind(&mut self, sorts: &[Sort]) -> (u32, Vec<SmtExpr>) {
        let binder = self.binders;
        self.binders += 1;
        let vars = sorts
            .iter()
            .enumerate()
            .map(|(i, s)| {
                SmtExpr::new(
                    s.clone(),
                    ExprKind::Bound {
                        binder,
                        index: i as u32,
                    },
                )
            })
            .collect();
        (binder, vars)
    }

    fn quantifier(
        &mut self,
        universal: bool,
        sorts: &[Sort],
        body: &dyn Fn(&mut Self, &[SmtExpr]) -> SmtExpr,
        patterns: &dyn Fn(&mut Self, &[SmtExpr]) -> Vec<Vec<SmtExpr>>,
    ) -> SmtExpr {
        let (binder, vars) = self.bind(sorts);
        let body = body(self, &vars);
        let patterns = patterns(self, &vars);
        SmtExpr::new(
            Sort::Bool,
            ExprKind::Quantifier {
                universal,
                binder,
                sorts: sorts.to_vec(),
                body,
                patterns,
            },
        )
    }
}

fn is_fp(sort: &Sort) -> bool {
    matches!(sort, Sort::Float | Sort::Double)
}

fn is_bv(sort: &Sort) -> bool {
    matches!(sort, Sort::BitVec(_))
}

impl SmtEngine for AstEngine {
    type Expr = SmtExpr;
    type Sort = Sort;
    type Pattern = Vec<SmtExpr>;

    fn bool_sort(&mut self) -> Sort {
        Sort::Bool
    }

    fn bv_sort(&mut self, width: u32) -> Sort {
        Sort::BitVec(width)
    }

    fn float_sort(&mut self) -> Sort {
        Sort::Float
    }

    fn double_sort(&mut self) -> Sort {
        Sort::Double
    }

    fn string_sort(&mut self) -> Sort {
        Sort::Str
    }

    fn array_sort(&mut self, domain: &Sort, range: &Sort) -> Sort {
        Sort::Array(Box::new(domain.clone()), Box::new(range.clone()))
    }

    fn sort_of(&self, expr: &SmtExpr) -> Sort {
        expr.sort().clone()
    }

    fn is_bool_sort(&self, sort: &Sort) -> bool {
        matches!(sort, Sort::Bool)
    }

    fn is_bv_sort(&self, sort: &Sort) -> bool {
        is_bv(sort)
    }

    fn is_float_sort(&self, sort: &Sort) -> bool {
        matches!(sort, Sort::Float)
    }

    fn is_double_sort(&self, sort: &Sort) -> bool {
        matches!(sort, Sort::Double)
    }

    fn is_array_sort(&self, sort: &Sort) -> bool {
        matches!(sort, Sort::Array(..))
    }

    fn bv_width(&self, sort: &Sort) -> Option<u32> {
        match sort {
            Sort::BitVec(w) => Some(*w),
            _ => None,
        }
    }

    fn make_bool(&mut self, value: bool) -> SmtExpr {
        SmtExpr::new(Sort::Bool, ExprKind::BoolConst(value))
    }

    fn make_bv(&mut self, value: i64, width: u32) -> SmtExpr {
        Self::bv_const(value as u64, width)
    }

    fn make_float(&mut self, value: f32) -> SmtExpr {
        SmtExpr::new(Sort::Float, ExprKind::FpConst((value as f64).to_bits()))
    }

    fn make_double(&mut self, value: f64) -> SmtExpr {
        SmtExpr::new(Sort::Double, ExprKind::FpConst(value.to_bits()))
    }

    fn make_string(&mut self, value: &str) -> SmtExpr {
        SmtExpr::new(Sort::Str, ExprKind::StrConst(value.into()))
    }

    fn make_var(&mut self, name: &str, sort: &Sort) -> SmtExpr {
        SmtExpr::new(sort.clone(), ExprKind::Var(name.into()))
    }

    fn make_fresh_var(&mut self, prefix: &str, sort: &Sort) -> SmtExpr {
        let name = format!("{}!{}", prefix, self.fresh);
        self.fresh += 1;
        self.make_var(&name, sort)
    }

    fn make_const_array(&mut self, domain: &Sort, value: &SmtExpr) -> SmtExpr {
        let sort = Sort::Array(Box::new(domain.clone()), Box::new(value.sort().clone()));
        SmtExpr::new(sort, ExprKind::ConstArray(value.clone()))
    }

    fn binary(&mut self, op: Opcode, lhs: &SmtExpr, rhs: &SmtExpr) -> Result<SmtExpr, SmtError> {
        let (ls, rs) = (lhs.sort(), rhs.sort());
        let mismatch = || SmtError::sort_mismatch(op, ls, rs);
        let sort = match op {
            Opcode::Eq | Opcode::Neq => {
                if ls != rs {
                    return Err(mismatch());
                }
                Sort::Bool
            }
            Opcode::Gt | Opcode::Ge | Opcode::Lt | Opcode::Le => {
                if ls != rs || !(is_bv(ls) || is_fp(ls)) {
                    return Err(mismatch());
                }
                Sort::Bool
            }
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Divide | Opcode::Mod => {
                if ls != rs || !(is_bv(ls) || is_fp(ls)) {
                    return Err(mismatch());
                }
                ls.clone()
            }
            Opcode::Shl | Opcode::Shr | Opcode::Ashr => {
                if ls != rs || !is_bv(ls) {
                    return Err(mismatch());
                }
                ls.clone()
            }
            Opcode::And | Opcode::Or | Opcode::Xor => {
                if ls != rs || !(is_bv(ls) || matches!(ls, Sort::Bool)) {
                    return Err(mismatch());
                }
                if matches!(ls, Sort::Bool) {
                    match op {
                        Opcode::And => return Ok(self.conjunction(&[lhs.clone(), rhs.clone()])),
                        Opcode::Or => return Ok(self.disjunction(&[lhs.clone(), rhs.clone()])),
                        _ => {}
                    }
                }
                ls.clone()
            }
            Opcode::Implies | Opcode::Iff => {
                if ls != &Sort::Bool || rs != &Sort::Bool {
                    return Err(mismatch());
                }
                Sort::Bool
            }
            Opcode::Concat => match (ls, rs) {
                (Sort::BitVec(a), Sort::BitVec(b)) => Sort::BitVec(a + b),
                (Sort::Str, Sort::Str) => Sort::Str,
                _ => return Err(mismatch()),
            },
        };
        Ok(SmtExpr::new(
            sort,
            ExprKind::Binary(op, lhs.clone(), rhs.clone()),
        ))
    }

    fn negate(&mut self, expr: &SmtExpr) -> Result<SmtExpr, SmtError> {
        match expr.sort() {
            Sort::Bool => Ok(match expr.kind() {
                ExprKind::BoolConst(b) => self.make_bool(!b),
                ExprKind::Not(inner) => inner.clone(),
                _ => SmtExpr::new(Sort::Bool, ExprKind::Not(expr.clone())),
            }),
            s if is_bv(s) || is_fp(s) => Ok(SmtExpr::new(s.clone(), ExprKind::Neg(expr.clone()))),
            other => Err(SmtError::unsupported(format!("negation of {}", other))),
        }
    }

    fn ite(&mut self, cond: &SmtExpr, then: &SmtExpr, otherwise: &SmtExpr) -> Result<SmtExpr, SmtError> {
        if cond.sort() != &Sort::Bool {
            return Err(SmtError::sort_mismatch("ite", cond.sort(), Sort::Bool));
        }
        if then.sort() != otherwise.sort() {
            return Err(SmtError::sort_mismatch("ite", then.sort(), otherwise.sort()));
        }
        Ok(match cond.as_bool_const() {
            Some(true) => then.clone(),
            Some(false) => otherwise.clone(),
            None if then == otherwise => then.clone(),
            None => SmtExpr::new(
                then.sort().clone(),
                ExprKind::Ite(cond.clone(), then.clone(), otherwise.clone()),
            ),
        })
    }

    fn extract(&mut self, expr: &SmtExpr, high: u32, low: u32) -> Result<SmtExpr, SmtError> {
        match expr.sort() {
            Sort::BitVec(w) if high >= low && high < *w => Ok(SmtExpr::new(
                Sort::BitVec(high - low + 1),
                ExprKind::Extract {
                    high,
                    low,
                    arg: expr.clone(),
                },
            )),
            other => Err(SmtError::unsupported(format!(
                "extract [{}:{}] from {}",
                high, low, other
            ))),
        }
    }

    fn conjunction(&mut self, exprs: &[SmtExpr]) -> SmtExpr {
        let mut parts = Vec::with_capacity(exprs.len());
        for e in exprs {
            match e.kind() {
                ExprKind::BoolConst(true) => {}
                ExprKind::BoolConst(false) => return self.make_bool(false),
                ExprKind::And(inner) => parts.extend(inner.iter().cloned()),
                _ => parts.push(e.clone()),
            }
        }
        match parts.len() {
            0 => self.make_bool(true),
            1 => parts.remove(0),
            _ => SmtExpr::new(Sort::Bool, ExprKind::And(parts)),
        }
    }

    fn disjunction(&mut self, exprs: &[SmtExpr]) -> SmtExpr {
        let mut parts = Vec::with_capacity(exprs.len());
        for e in exprs {
            match e.kind() {
                ExprKind::BoolConst(false) => {}
                ExprKind::BoolConst(true) => return self.make_bool(true),
                ExprKind::Or(inner) => parts.extend(inner.iter().cloned()),
                _ => parts.push(e.clone()),
            }
        }
        match parts.len() {
            0 => self.make_bool(false),
            1 => parts.remove(0),
            _ => SmtExpr::new(Sort::Bool, ExprKind::Or(parts)),
        }
    }

    fn bool2bv(&mut self, expr: &SmtExpr, width: u32) -> Result<SmtExpr, SmtError> {
        let one = Self::bv_const(1, width);
        let zero = Self::bv_const(0, width);
        self.ite(expr, &one, &zero)
    }

    fn bv2bool(&mut self, expr: &SmtExpr) -> Result<SmtExpr, SmtError> {
        let width = self
            .bv_width(expr.sort())
            .ok_or_else(|| SmtError::unsupported(format!("bv2bool of {}", expr.sort())))?;
        let zero = Self::bv_const(0, width);
        self.binary(Opcode::Neq, expr, &zero)
    }

    fn bv2bv(&mut self, expr: &SmtExpr, width: u32) -> Result<SmtExpr, SmtError> {
        let current = self
            .bv_width(expr.sort())
            .ok_or_else(|| SmtError::unsupported(format!("bv2bv of {}", expr.sort())))?;
        if current == width {
            Ok(expr.clone())
        } else if current < width {
            Ok(SmtExpr::new(
                Sort::BitVec(width),
                ExprKind::Convert(Conversion::SignExtend(width - current), expr.clone()),
            ))
        } else {
            self.extract(expr, width - 1, 0)
        }
    }

    fn bv2float(&mut self, expr: &SmtExpr, double: bool) -> Result<SmtExpr, SmtError> {
        if !is_bv(expr.sort()) {
            return Err(SmtError::unsupported(format!("bv2float of {}", expr.sort())));
        }
        let sort = if double { Sort::Double } else { Sort::Float };
        Ok(SmtExpr::new(sort, ExprKind::Convert(Conversion::BvToFp, expr.clone())))
    }

    fn float2bv(&mut self, expr: &SmtExpr, width: u32) -> Result<SmtExpr, SmtError> {
        if !is_fp(expr.sort()) {
            return Err(SmtError::unsupported(format!("float2bv of {}", expr.sort())));
        }
        Ok(SmtExpr::new(
            Sort::BitVec(width),
            ExprKind::Convert(Conversion::FpToBv, expr.clone()),
        ))
    }

    fn float2float(&mut self, expr: &SmtExpr, double: bool) -> Result<SmtExpr, SmtError> {
        let target = if double { Sort::Double } else { Sort::Float };
        match expr.sort() {
            s if s == &target => Ok(expr.clone()),
            s if is_fp(s) => Ok(SmtExpr::new(target, ExprKind::Convert(Conversion::FpToFp, expr.clone()))),
            other => Err(SmtError::unsupported(format!("float2float of {}", other))),
        }
    }

    fn load(&mut self, array: &SmtExpr, index: &SmtExpr) -> Result<SmtExpr, SmtError> {
        match array.sort() {
            Sort::Array(domain, range) if domain.as_ref() == index.sort() => Ok(SmtExpr::new(
                range.as_ref().clone(),
                ExprKind::Select(array.clone(), index.clone()),
            )),
            other => Err(SmtError::sort_mismatch("select", other, index.sort())),
        }
    }

    fn store(&mut self, array: &SmtExpr, index: &SmtExpr, value: &SmtExpr) -> Result<SmtExpr, SmtError> {
        match array.sort() {
            Sort::Array(domain, range)
                if domain.as_ref() == index.sort() && range.as_ref() == value.sort() =>
            {
                Ok(SmtExpr::new(
                    array.sort().clone(),
                    ExprKind::Store(array.clone(), index.clone(), value.clone()),
                ))
            }
            other => Err(SmtError::sort_mismatch("store", other, value.sort())),
        }
    }

    fn make_pattern(&mut self, terms: &[SmtExpr]) -> Vec<SmtExpr> {
        terms.to_vec()
    }

    fn forall(
        &mut self,
        sorts: &[Sort],
        body: &dyn Fn(&mut Self, &[SmtExpr]) -> SmtExpr,
        patterns: &dyn Fn(&mut Self, &[SmtExpr]) -> Vec<Vec<SmtExpr>>,
    ) -> SmtExpr {
        self.quantifier(true, sorts, body, patterns)
    }

    fn exists(
        &mut self,
        sorts: &[Sort],
        body: &dyn Fn(&mut Self, &[SmtExpr]) -> SmtExpr,
        patterns: &dyn Fn(&mut Self, &[SmtExpr]) -> Vec<Vec<SmtExpr>>,
    ) -> SmtExpr {
        self.quantifier(false, sorts, body, patterns)
    }

    fn lambda(&mut self, sorts: &[Sort], body: &dyn Fn(&mut Self, &[SmtExpr]) -> SmtExpr) -> SmtExpr {
        let (binder, vars) = self.bind(sorts);
        let body = body(self, &vars);
        let sort = sorts.iter().rev().fold(body.sort().clone(), |range, domain| {
            Sort::Array(Box::new(domain.clone()), Box::new(range))
        });
        SmtExpr::new(
            sort,
            ExprKind::Lambda {
                binder,
                sorts: sorts.to_vec(),
                body,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_checks() {
        let mut e = AstEngine::new();
        let x = e.make_var("x", &Sort::BitVec(32));
        let b = e.make_var("b", &Sort::Bool);
        assert!(e.binary(Opcode::Add, &x, &x).is_ok());
        assert!(matches!(
            e.binary(Opcode::Add, &x, &b),
            Err(SmtError::SortMismatch { .. })
        ));
        let lt = e.binary(Opcode::Lt, &x, &x).unwrap();
        assert_eq!(lt.sort(), &Sort::Bool);
    }

    #[test]
    fn test_boolean_folding() {
        let mut e = AstEngine::new();
        let t = e.make_bool(true);
        let b = e.make_var("b", &Sort::Bool);
        assert_eq!(e.conjunction(&[t.clone(), b.clone()]), b);
        let not_b = e.negate(&b).unwrap();
        assert_eq!(e.negate(&not_b).unwrap(), b);
        let f = e.make_bool(false);
        assert_eq!(e.disjunction(&[f, b.clone()]), b);
    }

    #[test]
    fn test_conversions() {
        let mut e = AstEngine::new();
        let x = e.make_var("x", &Sort::BitVec(32));
        let wide = e.bv2bv(&x, 64).unwrap();
        assert_eq!(wide.sort(), &Sort::BitVec(64));
        let narrow = e.bv2bv(&wide, 8).unwrap();
        assert_eq!(narrow.sort(), &Sort::BitVec(8));
        let flag = e.bv2bool(&x).unwrap();
        assert_eq!(flag.sort(), &Sort::Bool);
        let back = e.bool2bv(&flag, 32).unwrap();
        assert_eq!(back.sort(), &Sort::BitVec(32));
        assert_eq!(e.sort_bit_size(&Sort::Bool), 32);
        assert_eq!(e.sort_bit_size(&Sort::Double), 64);
    }

    #[test]
    fn test_lambda_sort() {
        let mut e = AstEngine::new();
        let bv = Sort::BitVec(32);
        let lam = e.lambda(&[bv.clone()], &|eng, vars| {
            let one = eng.make_bv(1, 32);
            eng.binary(Opcode::Add, &vars[0], &one).unwrap_or_else(|_| one.clone())
        });
        assert_eq!(lam.sort(), &Sort::Array(Box::new(bv.clone()), Box::new(bv)));
        assert!(lam.has_binders());
    }
}
