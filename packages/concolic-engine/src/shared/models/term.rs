//! Symbolic terms
//!
//! A `Term` is an immutable, `Arc`-shared expression node. Identity is
//! structural: two terms are equal iff their types and shapes are equal,
//! so terms can be used directly as map keys (models, memspace tables,
//! execution-tree clauses).

use super::sym_type::SymType;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Reference to a method by owner class and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodRef {
    pub class: Arc<str>,
    pub name: Arc<str>,
}

impl MethodRef {
    pub fn new(class: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
        }
    }

    /// `class.name`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.class, self.name)
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Ushr => ">>>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
        }
    }

    /// Ops that are boolean connectives when both operands are bool
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor)
    }
}

/// Comparison operators. `Cmp`, `Cmpg` and `Cmpl` produce -1/0/1 ints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    Cmp,
    Cmpg,
    Cmpl,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Neq => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Cmp => "cmp",
            CmpOp::Cmpg => "cmpg",
            CmpOp::Cmpl => "cmpl",
        }
    }

    /// Relational ops yield bool, the three-way ops yield int
    pub fn result_type(&self) -> SymType {
        match self {
            CmpOp::Cmp | CmpOp::Cmpg | CmpOp::Cmpl => SymType::Int,
            _ => SymType::Bool,
        }
    }

    pub fn negate(&self) -> Option<CmpOp> {
        Some(match self {
            CmpOp::Eq => CmpOp::Neq,
            CmpOp::Neq => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Ge => CmpOp::Lt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Cmp | CmpOp::Cmpg | CmpOp::Cmpl => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermKind {
    Value(Arc<str>),
    Argument(u32),
    This,
    ReturnValue(MethodRef),
    ConstBool(bool),
    ConstInt(i64),
    /// Floating constant stored as `f64` bits so terms stay `Eq + Hash`
    ConstFloat(u64),
    ConstString(Arc<str>),
    Null,
    Binary { op: BinaryOp, lhv: Term, rhv: Term },
    Cmp { op: CmpOp, lhv: Term, rhv: Term },
    Neg(Term),
    Cast(Term),
    InstanceOf { operand: Term, class: Arc<str> },
    /// Field reference `owner.name`; typed by the field's value type
    Field { owner: Term, name: Arc<str> },
    FieldLoad(Term),
    /// Array element reference `array[index]`; typed by the element type
    ArrayIndex { array: Term, index: Term },
    ArrayLoad(Term),
    ArrayLength(Term),
    Call {
        method: MethodRef,
        owner: Option<Term>,
        args: Vec<Term>,
    },
    Undef,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TermNode {
    pub ty: SymType,
    pub kind: TermKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term(Arc<TermNode>);

impl Term {
    pub fn new(ty: SymType, kind: TermKind) -> Self {
        Term(Arc::new(TermNode { ty, kind }))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Constructors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn value(name: impl Into<Arc<str>>, ty: SymType) -> Self {
        Self::new(ty, TermKind::Value(name.into()))
    }

    pub fn argument(index: u32, ty: SymType) -> Self {
        Self::new(ty, TermKind::Argument(index))
    }

    pub fn this(ty: SymType) -> Self {
        Self::new(ty, TermKind::This)
    }

    pub fn return_value(method: MethodRef, ty: SymType) -> Self {
        Self::new(ty, TermKind::ReturnValue(method))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(SymType::Bool, TermKind::ConstBool(value))
    }

    pub fn int(value: i32) -> Self {
        Self::new(SymType::Int, TermKind::ConstInt(value as i64))
    }

    pub fn long(value: i64) -> Self {
        Self::new(SymType::Long, TermKind::ConstInt(value))
    }

    /// Integral constant of an explicit type (byte/char/short/int/long)
    pub fn integral(value: i64, ty: SymType) -> Self {
        Self::new(ty, TermKind::ConstInt(value))
    }

    pub fn float(value: f32) -> Self {
        Self::new(SymType::Float, TermKind::ConstFloat((value as f64).to_bits()))
    }

    pub fn double(value: f64) -> Self {
        Self::new(SymType::Double, TermKind::ConstFloat(value.to_bits()))
    }

    pub fn string(value: impl Into<Arc<str>>) -> Self {
        Self::new(
            SymType::class("java/lang/String"),
            TermKind::ConstString(value.into()),
        )
    }

    pub fn null() -> Self {
        Self::new(SymType::Null, TermKind::Null)
    }

    pub fn undef(ty: SymType) -> Self {
        Self::new(ty, TermKind::Undef)
    }

    /// Binary arithmetic; typed by the left operand
    pub fn binary(op: BinaryOp, lhv: Term, rhv: Term) -> Self {
        let ty = lhv.ty().clone();
        Self::new(ty, TermKind::Binary { op, lhv, rhv })
    }

    pub fn cmp(op: CmpOp, lhv: Term, rhv: Term) -> Self {
        Self::new(op.result_type(), TermKind::Cmp { op, lhv, rhv })
    }

    pub fn neg(operand: Term) -> Self {
        let ty = operand.ty().clone();
        Self::new(ty, TermKind::Neg(operand))
    }

    pub fn cast(operand: Term, ty: SymType) -> Self {
        Self::new(ty, TermKind::Cast(operand))
    }

    pub fn instance_of(operand: Term, class: impl Into<Arc<str>>) -> Self {
        Self::new(
            SymType::Bool,
            TermKind::InstanceOf {
                operand,
                class: class.into(),
            },
        )
    }

    pub fn field(owner: Term, name: impl Into<Arc<str>>, ty: SymType) -> Self {
        Self::new(
            ty,
            TermKind::Field {
                owner,
                name: name.into(),
            },
        )
    }

    pub fn field_load(field: Term) -> Self {
        let ty = field.ty().clone();
        Self::new(ty, TermKind::FieldLoad(field))
    }

    pub fn array_index(array: Term, index: Term) -> Self {
        let ty = array.ty().element().cloned().unwrap_or(SymType::Int);
        Self::new(ty, TermKind::ArrayIndex { array, index })
    }

    pub fn array_load(index_ref: Term) -> Self {
        let ty = index_ref.ty().clone();
        Self::new(ty, TermKind::ArrayLoad(index_ref))
    }

    pub fn array_length(array: Term) -> Self {
        Self::new(SymType::Int, TermKind::ArrayLength(array))
    }

    pub fn call(method: MethodRef, owner: Option<Term>, args: Vec<Term>, ty: SymType) -> Self {
        Self::new(
            ty,
            TermKind::Call {
                method,
                owner,
                args,
            },
        )
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn ty(&self) -> &SymType {
        &self.0.ty
    }

    pub fn kind(&self) -> &TermKind {
        &self.0.kind
    }

    /// Same shape, different type
    pub fn with_type(&self, ty: SymType) -> Term {
        if &ty == self.ty() {
            return self.clone();
        }
        Term::new(ty, self.kind().clone())
    }

    pub fn is_const(&self) -> bool {
        matches!(
            self.kind(),
            TermKind::ConstBool(_)
                | TermKind::ConstInt(_)
                | TermKind::ConstFloat(_)
                | TermKind::ConstString(_)
                | TermKind::Null
        )
    }

    /// Named leaves: solver variables
    pub fn is_variable(&self) -> bool {
        matches!(
            self.kind(),
            TermKind::Value(_) | TermKind::Argument(_) | TermKind::This | TermKind::ReturnValue(_)
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind(), TermKind::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind() {
            TermKind::ConstBool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.kind() {
            TermKind::ConstInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self.kind() {
            TermKind::ConstFloat(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }

    pub fn subterms(&self) -> Vec<&Term> {
        match self.kind() {
            TermKind::Binary { lhv, rhv, .. } | TermKind::Cmp { lhv, rhv, .. } => vec![lhv, rhv],
            TermKind::Neg(t)
            | TermKind::Cast(t)
            | TermKind::FieldLoad(t)
            | TermKind::ArrayLoad(t)
            | TermKind::ArrayLength(t) => vec![t],
            TermKind::InstanceOf { operand, .. } => vec![operand],
            TermKind::Field { owner, .. } => vec![owner],
            TermKind::ArrayIndex { array, index } => vec![array, index],
            TermKind::Call { owner, args, .. } => owner.iter().chain(args.iter()).collect(),
            _ => Vec::new(),
        }
    }

    /// Rebuild this node with every direct subterm replaced by `f(subterm)`.
    /// Returns `self` (shared) when nothing changed.
    pub fn map_subterms(&self, f: &mut dyn FnMut(&Term) -> Term) -> Term {
        let kind = match self.kind() {
            TermKind::Binary { op, lhv, rhv } => TermKind::Binary {
                op: *op,
                lhv: f(lhv),
                rhv: f(rhv),
            },
            TermKind::Cmp { op, lhv, rhv } => TermKind::Cmp {
                op: *op,
                lhv: f(lhv),
                rhv: f(rhv),
            },
            TermKind::Neg(t) => TermKind::Neg(f(t)),
            TermKind::Cast(t) => TermKind::Cast(f(t)),
            TermKind::FieldLoad(t) => TermKind::FieldLoad(f(t)),
            TermKind::ArrayLoad(t) => TermKind::ArrayLoad(f(t)),
            TermKind::ArrayLength(t) => TermKind::ArrayLength(f(t)),
            TermKind::InstanceOf { operand, class } => TermKind::InstanceOf {
                operand: f(operand),
                class: class.clone(),
            },
            TermKind::Field { owner, name } => TermKind::Field {
                owner: f(owner),
                name: name.clone(),
            },
            TermKind::ArrayIndex { array, index } => TermKind::ArrayIndex {
                array: f(array),
                index: f(index),
            },
            TermKind::Call {
                method,
                owner,
                args,
            } => TermKind::Call {
                method: method.clone(),
                owner: owner.as_ref().map(|o| f(o)),
                args: args.iter().map(|a| f(a)).collect(),
            },
            _ => return self.clone(),
        };
        if &kind == self.kind() {
            self.clone()
        } else {
            Term::new(self.ty().clone(), kind)
        }
    }

    /// Post-order rewrite of the whole term tree
    pub fn transform(&self, f: &mut dyn FnMut(Term) -> Term) -> Term {
        let rebuilt = self.map_subterms(&mut |sub| sub.transform(f));
        f(rebuilt)
    }

    /// Collect named leaves into `out`
    pub fn collect_vars(&self, out: &mut FxHashSet<Term>) {
        if self.is_variable() {
            out.insert(self.clone());
            return;
        }
        for sub in self.subterms() {
            sub.collect_vars(out);
        }
    }

    /// Collect every subterm (including self) into `out`
    pub fn collect_all(&self, out: &mut FxHashSet<Term>) {
        if out.insert(self.clone()) {
            for sub in self.subterms() {
                sub.collect_all(out);
            }
        }
    }

    pub fn contains(&self, needle: &Term) -> bool {
        self == needle || self.subterms().into_iter().any(|t| t.contains(needle))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TermKind::Value(name) => write!(f, "{}", name),
            TermKind::Argument(i) => write!(f, "arg${}", i),
            TermKind::This => write!(f, "this"),
            TermKind::ReturnValue(m) => write!(f, "<retval>{}", m),
            TermKind::ConstBool(b) => write!(f, "{}", b),
            TermKind::ConstInt(v) => write!(f, "{}", v),
            TermKind::ConstFloat(bits) => write!(f, "{}", f64::from_bits(*bits)),
            TermKind::ConstString(s) => write!(f, "\"{}\"", s),
            TermKind::Null => write!(f, "null"),
            TermKind::Binary { op, lhv, rhv } => write!(f, "({} {} {})", lhv, op.symbol(), rhv),
            TermKind::Cmp { op, lhv, rhv } => write!(f, "({} {} {})", lhv, op.symbol(), rhv),
            TermKind::Neg(t) => write!(f, "-{}", t),
            TermKind::Cast(t) => write!(f, "({}) {}", self.ty(), t),
            TermKind::InstanceOf { operand, class } => {
                write!(f, "{} instanceof {}", operand, class)
            }
            TermKind::Field { owner, name } => write!(f, "{}.{}", owner, name),
            TermKind::FieldLoad(field) => write!(f, "*({})", field),
            TermKind::ArrayIndex { array, index } => write!(f, "{}[{}]", array, index),
            TermKind::ArrayLoad(index) => write!(f, "*({})", index),
            TermKind::ArrayLength(array) => write!(f, "{}.length", array),
            TermKind::Call {
                method,
                owner,
                args,
            } => {
                if let Some(owner) = owner {
                    write!(f, "{}.", owner)?;
                }
                write!(f, "{}(", method.name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            TermKind::Undef => write!(f, "<undef>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_identity() {
        let a = Term::value("x", SymType::Int);
        let b = Term::value("x", SymType::Int);
        assert_eq!(a, b);
        assert_ne!(a, Term::value("x", SymType::Long));

        let sum1 = Term::binary(BinaryOp::Add, a.clone(), Term::int(1));
        let sum2 = Term::binary(BinaryOp::Add, b, Term::int(1));
        assert_eq!(sum1, sum2);
    }

    #[test]
    fn test_map_subterms_shares_unchanged() {
        let x = Term::value("x", SymType::Int);
        let t = Term::cmp(CmpOp::Lt, x.clone(), Term::int(3));
        let same = t.map_subterms(&mut |s| s.clone());
        assert_eq!(same, t);

        let y = Term::value("y", SymType::Int);
        let replaced = t.transform(&mut |s| if s == x { y.clone() } else { s });
        assert_eq!(replaced.to_string(), "(y < 3)");
    }

    #[test]
    fn test_collect_vars() {
        let obj = Term::value("o", SymType::class("A"));
        let load = Term::field_load(Term::field(obj.clone(), "f", SymType::Int));
        let expr = Term::binary(BinaryOp::Mul, load, Term::argument(0, SymType::Int));
        let mut vars = FxHashSet::default();
        expr.collect_vars(&mut vars);
        assert_eq!(vars.len(), 2);
        assert!(vars.contains(&obj));
    }

    #[test]
    fn test_cmp_negation() {
        assert_eq!(CmpOp::Lt.negate(), Some(CmpOp::Ge));
        assert_eq!(CmpOp::Cmp.negate(), None);
        assert_eq!(CmpOp::Cmpl.result_type(), SymType::Int);
    }
}
