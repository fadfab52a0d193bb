//! Theory-agnostic solver interface
//!
//! Adding a backend means implementing `SmtEngine` (term construction) and
//! `SolverBackend` (deciding a set of assertions); nothing above the solver
//! layer changes.

use super::error::SmtError;
use super::opcode::Opcode;
use crate::shared::models::WORD;
use std::fmt;

/// Raw value of a probed expression in a satisfying assignment
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Bool(bool),
    /// Bits masked to `width`
    BitVec { bits: u64, width: u32 },
    Float(f64),
    Str(String),
    /// Finite array: explicit entries over a default
    Array {
        entries: Vec<(RawValue, RawValue)>,
        default: Box<RawValue>,
    },
}

impl RawValue {
    /// Sign-extended integer view of a bit-vector
    pub fn as_signed(&self) -> Option<i64> {
        match self {
            RawValue::BitVec { bits, width } => Some(sign_extend(*bits, *width)),
            RawValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RawValue::Bool(b) => Some(*b),
            RawValue::BitVec { bits, .. } => Some(*bits != 0),
            _ => None,
        }
    }
}

pub fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

pub fn sign_extend(bits: u64, width: u32) -> i64 {
    if width == 0 || width >= 64 {
        return bits as i64;
    }
    let shift = 64 - width;
    ((bits << shift) as i64) >> shift
}

/// Answer of a backend for one set of assertions
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Values of the requested probes, in request order; `None` where the
    /// backend could not report a value
    Sat(Vec<Option<RawValue>>),
    Unsat,
    Unknown(String),
}

pub trait SmtEngine {
    type Expr: Clone + fmt::Debug;
    type Sort: Clone + fmt::Debug + PartialEq;
    type Pattern: Clone + fmt::Debug;

    // ═══════════════════════════════════════════════════════════════════════
    // Sorts
    // ═══════════════════════════════════════════════════════════════════════

    fn bool_sort(&mut self) -> Self::Sort;
    fn bv_sort(&mut self, width: u32) -> Self::Sort;
    fn float_sort(&mut self) -> Self::Sort;
    fn double_sort(&mut self) -> Self::Sort;
    fn string_sort(&mut self) -> Self::Sort;
    fn array_sort(&mut self, domain: &Self::Sort, range: &Self::Sort) -> Self::Sort;

    // ═══════════════════════════════════════════════════════════════════════
    // Introspection
    // ═══════════════════════════════════════════════════════════════════════

    fn sort_of(&self, expr: &Self::Expr) -> Self::Sort;
    fn is_bool_sort(&self, sort: &Self::Sort) -> bool;
    fn is_bv_sort(&self, sort: &Self::Sort) -> bool;
    fn is_float_sort(&self, sort: &Self::Sort) -> bool;
    fn is_double_sort(&self, sort: &Self::Sort) -> bool;
    fn is_array_sort(&self, sort: &Self::Sort) -> bool;
    fn bv_width(&self, sort: &Self::Sort) -> Option<u32>;

    /// Bool counts as a machine word, floats as 32 and doubles as 64 bits
    fn sort_bit_size(&self, sort: &Self::Sort) -> u32 {
        if self.is_bool_sort(sort) {
            WORD
        } else if let Some(width) = self.bv_width(sort) {
            width
        } else if self.is_float_sort(sort) {
            32
        } else if self.is_double_sort(sort) {
            64
        } else {
            WORD
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Leaves
    // ═══════════════════════════════════════════════════════════════════════

    fn make_bool(&mut self, value: bool) -> Self::Expr;
    fn make_bv(&mut self, value: i64, width: u32) -> Self::Expr;
    fn make_float(&mut self, value: f32) -> Self::Expr;
    fn make_double(&mut self, value: f64) -> Self::Expr;
    fn make_string(&mut self, value: &str) -> Self::Expr;
    fn make_var(&mut self, name: &str, sort: &Self::Sort) -> Self::Expr;
    /// Variable with a name unique within this engine
    fn make_fresh_var(&mut self, prefix: &str, sort: &Self::Sort) -> Self::Expr;
    fn make_const_array(&mut self, domain: &Self::Sort, value: &Self::Expr) -> Self::Expr;

    // ═══════════════════════════════════════════════════════════════════════
    // Operators
    // ═══════════════════════════════════════════════════════════════════════

    fn binary(
        &mut self,
        op: Opcode,
        lhs: &Self::Expr,
        rhs: &Self::Expr,
    ) -> Result<Self::Expr, SmtError>;

    /// Boolean not, bit-vector or floating negation depending on the sort
    fn negate(&mut self, expr: &Self::Expr) -> Result<Self::Expr, SmtError>;

    fn ite(
        &mut self,
        cond: &Self::Expr,
        then: &Self::Expr,
        otherwise: &Self::Expr,
    ) -> Result<Self::Expr, SmtError>;

    fn extract(&mut self, expr: &Self::Expr, high: u32, low: u32) -> Result<Self::Expr, SmtError>;

    fn conjunction(&mut self, exprs: &[Self::Expr]) -> Self::Expr;
    fn disjunction(&mut self, exprs: &[Self::Expr]) -> Self::Expr;

    // conversions

    fn bool2bv(&mut self, expr: &Self::Expr, width: u32) -> Result<Self::Expr, SmtError>;
    fn bv2bool(&mut self, expr: &Self::Expr) -> Result<Self::Expr, SmtError>;
    /// Sign-extend or truncate
    fn bv2bv(&mut self, expr: &Self::Expr, width: u32) -> Result<Self::Expr, SmtError>;
    fn bv2float(&mut self, expr: &Self::Expr, double: bool) -> Result<Self::Expr, SmtError>;
    /// Round toward zero
    fn float2bv(&mut self, expr: &Self::Expr, width: u32) -> Result<Self::Expr, SmtError>;
    fn float2float(&mut self, expr: &Self::Expr, double: bool) -> Result<Self::Expr, SmtError>;

    // arrays

    fn load(&mut self, array: &Self::Expr, index: &Self::Expr) -> Result<Self::Expr, SmtError>;
    fn store(
        &mut self,
        array: &Self::Expr,
        index: &Self::Expr,
        value: &Self::Expr,
    ) -> Result<Self::Expr, SmtError>;

    // binders

    fn make_pattern(&mut self, terms: &[Self::Expr]) -> Self::Pattern;

    fn forall(
        &mut self,
        sorts: &[Self::Sort],
        body: &dyn Fn(&mut Self, &[Self::Expr]) -> Self::Expr,
        patterns: &dyn Fn(&mut Self, &[Self::Expr]) -> Vec<Self::Pattern>,
    ) -> Self::Expr;

    fn exists(
        &mut self,
        sorts: &[Self::Sort],
        body: &dyn Fn(&mut Self, &[Self::Expr]) -> Self::Expr,
        patterns: &dyn Fn(&mut Self, &[Self::Expr]) -> Vec<Self::Pattern>,
    ) -> Self::Expr;

    /// Array-valued lambda over the bound variables
    fn lambda(
        &mut self,
        sorts: &[Self::Sort],
        body: &dyn Fn(&mut Self, &[Self::Expr]) -> Self::Expr,
    ) -> Self::Expr;
}

/// Decides assertions built by its engine.
///
/// Backends are acquired per query and release every native resource
/// (processes, contexts) when dropped.
pub trait SolverBackend {
    type Engine: SmtEngine;

    fn name(&self) -> &'static str;

    fn engine(&mut self) -> &mut Self::Engine;

    /// Decide the conjunction of `assertions`; on sat report the value of
    /// every probe
    fn check(
        &mut self,
        assertions: &[<Self::Engine as SmtEngine>::Expr],
        probes: &[<Self::Engine as SmtEngine>::Expr],
    ) -> Result<Verdict, SmtError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0xFFFF_FFFF, 32), -1);
        assert_eq!(sign_extend(0x7FFF_FFFF, 32), i32::MAX as i64);
        assert_eq!(sign_extend(5, 64), 5);
        assert_eq!(mask(8), 0xFF);
        assert_eq!(mask(64), u64::MAX);
    }
}
