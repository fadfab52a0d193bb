//! Predicates: atomic effects over terms

use super::sym_type::SymType;
use super::term::{Term, TermKind};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a predicate within a state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateKind {
    /// Data effect: assignment, load, store, allocation
    State,
    /// Branch condition taken
    Path,
    /// Hypothesis
    Assume,
    /// Background fact
    Axiom,
    /// Obligation
    Require,
}

impl PredicateKind {
    pub fn tag(&self) -> &'static str {
        match self {
            PredicateKind::State => "S",
            PredicateKind::Path => "P",
            PredicateKind::Assume => "A",
            PredicateKind::Axiom => "X",
            PredicateKind::Require => "R",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateBody {
    Equality {
        lhv: Term,
        rhv: Term,
    },
    Inequality {
        lhv: Term,
        rhv: Term,
    },
    /// `cond` is none of `cases`
    DefaultSwitch {
        cond: Term,
        cases: Vec<Term>,
    },
    Call {
        lhv: Option<Term>,
        call: Term,
    },
    New {
        lhv: Term,
    },
    NewArray {
        lhv: Term,
        dimensions: Vec<Term>,
    },
    /// `field` is a `Field` reference term
    FieldStore {
        field: Term,
        value: Term,
    },
    /// `index` is an `ArrayIndex` reference term
    ArrayStore {
        index: Term,
        value: Term,
    },
}

/// An immutable predicate, compared by `(kind, operands)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Predicate {
    pub kind: PredicateKind,
    pub body: PredicateBody,
}

impl Predicate {
    pub fn new(kind: PredicateKind, body: PredicateBody) -> Self {
        Self { kind, body }
    }

    pub fn equality(kind: PredicateKind, lhv: Term, rhv: Term) -> Self {
        Self::new(kind, PredicateBody::Equality { lhv, rhv })
    }

    pub fn inequality(kind: PredicateKind, lhv: Term, rhv: Term) -> Self {
        Self::new(kind, PredicateBody::Inequality { lhv, rhv })
    }

    /// State-kind assignment `lhv = rhv`
    pub fn assign(lhv: Term, rhv: Term) -> Self {
        Self::equality(PredicateKind::State, lhv, rhv)
    }

    /// Path-kind `cond == value`
    pub fn path(cond: Term, value: Term) -> Self {
        Self::equality(PredicateKind::Path, cond, value)
    }

    pub fn default_switch(kind: PredicateKind, cond: Term, cases: Vec<Term>) -> Self {
        Self::new(kind, PredicateBody::DefaultSwitch { cond, cases })
    }

    pub fn call(lhv: Option<Term>, call: Term) -> Self {
        Self::new(PredicateKind::State, PredicateBody::Call { lhv, call })
    }

    pub fn new_object(lhv: Term) -> Self {
        Self::new(PredicateKind::State, PredicateBody::New { lhv })
    }

    pub fn new_array(lhv: Term, dimensions: Vec<Term>) -> Self {
        Self::new(PredicateKind::State, PredicateBody::NewArray { lhv, dimensions })
    }

    pub fn field_store(field: Term, value: Term) -> Self {
        Self::new(PredicateKind::State, PredicateBody::FieldStore { field, value })
    }

    pub fn array_store(index: Term, value: Term) -> Self {
        Self::new(PredicateKind::State, PredicateBody::ArrayStore { index, value })
    }

    pub fn with_kind(&self, kind: PredicateKind) -> Self {
        Self {
            kind,
            body: self.body.clone(),
        }
    }

    pub fn is_path(&self) -> bool {
        self.kind == PredicateKind::Path
    }

    /// Term defined by this predicate, if any
    pub fn lhv(&self) -> Option<&Term> {
        if self.kind != PredicateKind::State {
            return None;
        }
        match &self.body {
            PredicateBody::Equality { lhv, .. }
            | PredicateBody::New { lhv }
            | PredicateBody::NewArray { lhv, .. } => Some(lhv),
            PredicateBody::Call { lhv, .. } => lhv.as_ref(),
            _ => None,
        }
    }

    /// Predicates that write the heap
    pub fn writes_memory(&self) -> bool {
        matches!(
            self.body,
            PredicateBody::FieldStore { .. }
                | PredicateBody::ArrayStore { .. }
                | PredicateBody::NewArray { .. }
        )
    }

    pub fn operands(&self) -> Vec<&Term> {
        match &self.body {
            PredicateBody::Equality { lhv, rhv } | PredicateBody::Inequality { lhv, rhv } => {
                vec![lhv, rhv]
            }
            PredicateBody::DefaultSwitch { cond, cases } => {
                std::iter::once(cond).chain(cases.iter()).collect()
            }
            PredicateBody::Call { lhv, call } => lhv.iter().chain(std::iter::once(call)).collect(),
            PredicateBody::New { lhv } => vec![lhv],
            PredicateBody::NewArray { lhv, dimensions } => {
                std::iter::once(lhv).chain(dimensions.iter()).collect()
            }
            PredicateBody::FieldStore { field, value } => vec![field, value],
            PredicateBody::ArrayStore { index, value } => vec![index, value],
        }
    }

    /// Apply `f` to every operand
    pub fn map_terms(&self, f: &mut dyn FnMut(&Term) -> Term) -> Predicate {
        let body = match &self.body {
            PredicateBody::Equality { lhv, rhv } => PredicateBody::Equality {
                lhv: f(lhv),
                rhv: f(rhv),
            },
            PredicateBody::Inequality { lhv, rhv } => PredicateBody::Inequality {
                lhv: f(lhv),
                rhv: f(rhv),
            },
            PredicateBody::DefaultSwitch { cond, cases } => PredicateBody::DefaultSwitch {
                cond: f(cond),
                cases: cases.iter().map(|c| f(c)).collect(),
            },
            PredicateBody::Call { lhv, call } => PredicateBody::Call {
                lhv: lhv.as_ref().map(|l| f(l)),
                call: f(call),
            },
            PredicateBody::New { lhv } => PredicateBody::New { lhv: f(lhv) },
            PredicateBody::NewArray { lhv, dimensions } => PredicateBody::NewArray {
                lhv: f(lhv),
                dimensions: dimensions.iter().map(|d| f(d)).collect(),
            },
            PredicateBody::FieldStore { field, value } => PredicateBody::FieldStore {
                field: f(field),
                value: f(value),
            },
            PredicateBody::ArrayStore { index, value } => PredicateBody::ArrayStore {
                index: f(index),
                value: f(value),
            },
        };
        Predicate {
            kind: self.kind,
            body,
        }
    }

    /// Logical negation for condition-shaped predicates
    pub fn inverse(&self) -> Option<Predicate> {
        let body = match &self.body {
            PredicateBody::Equality { lhv, rhv } => match rhv.as_bool() {
                Some(b) => PredicateBody::Equality {
                    lhv: lhv.clone(),
                    rhv: Term::bool(!b),
                },
                None => PredicateBody::Inequality {
                    lhv: lhv.clone(),
                    rhv: rhv.clone(),
                },
            },
            PredicateBody::Inequality { lhv, rhv } => PredicateBody::Equality {
                lhv: lhv.clone(),
                rhv: rhv.clone(),
            },
            _ => return None,
        };
        Some(Predicate {
            kind: self.kind,
            body,
        })
    }

    pub fn collect_vars(&self, out: &mut FxHashSet<Term>) {
        for t in self.operands() {
            t.collect_vars(out);
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} ", self.kind.tag())?;
        match &self.body {
            PredicateBody::Equality { lhv, rhv } => write!(f, "{} = {}", lhv, rhv),
            PredicateBody::Inequality { lhv, rhv } => write!(f, "{} != {}", lhv, rhv),
            PredicateBody::DefaultSwitch { cond, cases } => {
                write!(f, "{} !in (", cond)?;
                for (i, c) in cases.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", c)?;
                }
                write!(f, ")")
            }
            PredicateBody::Call { lhv: Some(l), call } => write!(f, "{} = {}", l, call),
            PredicateBody::Call { lhv: None, call } => write!(f, "{}", call),
            PredicateBody::New { lhv } => write!(f, "{} = new {}", lhv, lhv.ty()),
            PredicateBody::NewArray { lhv, dimensions } => {
                write!(f, "{} = new {}", lhv, lhv.ty().element().unwrap_or(&SymType::Void))?;
                for d in dimensions {
                    write!(f, "[{}]", d)?;
                }
                Ok(())
            }
            PredicateBody::FieldStore { field, value } => write!(f, "*({}) = {}", field, value),
            PredicateBody::ArrayStore { index, value } => write!(f, "*({}) = {}", index, value),
        }
    }
}

/// Field reference split into `(owner, name)`
pub fn field_parts(field: &Term) -> Option<(&Term, &str)> {
    match field.kind() {
        TermKind::Field { owner, name } => Some((owner, name)),
        _ => None,
    }
}

/// Array index reference split into `(array, index)`
pub fn index_parts(index: &Term) -> Option<(&Term, &Term)> {
    match index.kind() {
        TermKind::ArrayIndex { array, index } => Some((array, index)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_by_kind_and_operands() {
        let x = Term::value("x", SymType::Int);
        let a = Predicate::path(x.clone(), Term::int(0));
        let b = Predicate::path(x.clone(), Term::int(0));
        assert_eq!(a, b);
        assert_ne!(a, Predicate::assign(x, Term::int(0)));
    }

    #[test]
    fn test_inverse() {
        let c = Term::value("c", SymType::Bool);
        let p = Predicate::path(c.clone(), Term::bool(true));
        assert_eq!(p.inverse(), Some(Predicate::path(c, Term::bool(false))));

        let o = Term::value("o", SymType::class("A"));
        let null_check = Predicate::path(o.clone(), Term::null());
        assert_eq!(
            null_check.inverse(),
            Some(Predicate::inequality(PredicateKind::Path, o.clone(), Term::null()))
        );
        assert_eq!(Predicate::new_object(o).inverse(), None);
    }

    #[test]
    fn test_lhv_only_for_state() {
        let x = Term::value("x", SymType::Int);
        assert_eq!(Predicate::assign(x.clone(), Term::int(1)).lhv(), Some(&x));
        assert_eq!(Predicate::path(x, Term::int(1)).lhv(), None);
    }
}
