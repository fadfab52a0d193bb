//! Verdicts and models

use crate::shared::models::{SymType, Term};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;

/// Before/after contents of one memory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryShape {
    pub initial_memory: FxHashMap<Term, Term>,
    pub final_memory: FxHashMap<Term, Term>,
}

impl MemoryShape {
    pub fn is_empty(&self) -> bool {
        self.initial_memory.is_empty() && self.final_memory.is_empty()
    }
}

/// Satisfying assignment read back into terms.
///
/// Addresses are integral constants typed with the reference type they
/// belong to; address 0 is reported as `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmtModel {
    pub assignments: FxHashMap<Term, Term>,
    /// Array element memories keyed by `array[index]` with constant operands
    pub memories: BTreeMap<u32, MemoryShape>,
    /// Field memories: memspace -> field name -> address -> value
    pub properties: BTreeMap<u32, BTreeMap<String, MemoryShape>>,
    /// Array lengths: memspace -> address -> length
    pub bounds: BTreeMap<u32, MemoryShape>,
    /// Instantiable types for reference terms whose static type is abstract
    pub types: FxHashMap<Term, SymType>,
}

impl SmtModel {
    pub fn value_of(&self, term: &Term) -> Option<&Term> {
        self.assignments.get(term)
    }

    /// Assignment of a named value, looked up by name regardless of type tag
    pub fn value_by_name(&self, name: &str) -> Option<&Term> {
        self.assignments
            .iter()
            .find(|(k, _)| k.to_string() == name)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for SmtModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = self
            .assignments
            .iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect();
        lines.sort();
        writeln!(f, "Model {{")?;
        for line in lines {
            writeln!(f, "  {}", line)?;
        }
        write!(f, "}}")
    }
}

/// Three-valued verdict. Equality compares the case only, never the model:
/// models are witnesses, not canonical values.
#[derive(Debug, Clone)]
pub enum SmtResult {
    Sat(SmtModel),
    Unsat,
    Unknown(String),
}

impl SmtResult {
    pub fn unknown(reason: impl Into<String>) -> Self {
        SmtResult::Unknown(reason.into())
    }

    /// False only for `Unknown`
    pub fn known(&self) -> bool {
        !matches!(self, SmtResult::Unknown(_))
    }

    pub fn is_sat(&self) -> bool {
        matches!(self, SmtResult::Sat(_))
    }

    pub fn is_unsat(&self) -> bool {
        matches!(self, SmtResult::Unsat)
    }

    pub fn model(&self) -> Option<&SmtModel> {
        match self {
            SmtResult::Sat(model) => Some(model),
            _ => None,
        }
    }

    pub fn into_model(self) -> Option<SmtModel> {
        match self {
            SmtResult::Sat(model) => Some(model),
            _ => None,
        }
    }

    pub fn matches(&self, other: &SmtResult) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl PartialEq for SmtResult {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl fmt::Display for SmtResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmtResult::Sat(_) => write!(f, "sat"),
            SmtResult::Unsat => write!(f, "unsat"),
            SmtResult::Unknown(reason) => write!(f, "unknown ({})", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_equality_ignores_model() {
        let mut model = SmtModel::default();
        model
            .assignments
            .insert(Term::value("x", SymType::Int), Term::int(3));
        assert_eq!(SmtResult::Sat(model), SmtResult::Sat(SmtModel::default()));
        assert_eq!(SmtResult::unknown("a"), SmtResult::unknown("b"));
        assert_ne!(SmtResult::Unsat, SmtResult::unknown("timeout"));
    }

    #[test]
    fn test_known() {
        assert!(SmtResult::Unsat.known());
        assert!(SmtResult::Sat(SmtModel::default()).known());
        assert!(!SmtResult::unknown("budget").known());
    }
}
