//! Instructions, clauses and the per-run symbolic record

use super::predicate::Predicate;
use super::term::Term;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Shape of the instruction a clause originates from. Only the kinds that
/// matter for branch reversal are distinguished.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstructionKind {
    /// Two-way conditional branch
    Branch,
    /// Multi-way switch: `(case value, target block)` pairs plus the default
    /// block
    Switch { cases: Vec<(i64, u32)>, default: u32 },
    Call,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstructionRef {
    pub method: Arc<str>,
    pub index: u32,
    pub kind: InstructionKind,
}

impl InstructionRef {
    pub fn new(method: impl Into<Arc<str>>, index: u32, kind: InstructionKind) -> Self {
        Self {
            method: method.into(),
            index,
            kind,
        }
    }

    pub fn branch(method: impl Into<Arc<str>>, index: u32) -> Self {
        Self::new(method, index, InstructionKind::Branch)
    }

    pub fn other(method: impl Into<Arc<str>>, index: u32) -> Self {
        Self::new(method, index, InstructionKind::Other)
    }

    /// Number of distinct outcomes of this instruction, for exhaustiveness
    pub fn outcomes(&self) -> Option<usize> {
        match &self.kind {
            InstructionKind::Branch => Some(2),
            InstructionKind::Switch { cases, default } => {
                let mut targets: Vec<u32> = cases.iter().map(|(_, t)| *t).collect();
                targets.push(*default);
                targets.sort_unstable();
                targets.dedup();
                Some(targets.len())
            }
            _ => None,
        }
    }
}

impl fmt::Display for InstructionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.method, self.index)
    }
}

/// `(instruction, predicate)` pair recorded from one run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clause {
    pub instruction: InstructionRef,
    pub predicate: Predicate,
}

impl Clause {
    pub fn new(instruction: InstructionRef, predicate: Predicate) -> Self {
        Self {
            instruction,
            predicate,
        }
    }

    pub fn is_path(&self) -> bool {
        self.predicate.is_path()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} :: {}", self.instruction, self.predicate)
    }
}

/// Ordered data clauses of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClauseState(pub Vec<Clause>);

/// Ordered Path-kind clauses of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathCondition(pub Vec<Clause>);

impl PathCondition {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Clause> {
        self.0.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clause> {
        self.0.iter()
    }
}

/// Concrete runtime value observed for a term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConcreteValue {
    Null,
    Bool { value: bool },
    Int { value: i64 },
    Double {
        #[serde(with = "non_finite_f64")]
        value: f64,
    },
    Str { value: String },
    Object { class: String, id: u64 },
    Array { element: String, length: u32, id: u64 },
}

/// JSON has no NaN or infinities: those travel as the strings `"NaN"`,
/// `"Infinity"` and `"-Infinity"`, finite values as plain numbers
mod non_finite_f64 {
    use super::{Deserialize, Deserializer, Serializer};
    use serde::de::Error;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("Infinity")
        } else {
            serializer.serialize_str("-Infinity")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "Infinity" => Ok(f64::INFINITY),
                "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("not a double: {}", other))),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteBinding {
    pub term: Term,
    pub value: ConcreteValue,
}

/// Per-run record produced by instrumented execution; never mutated after
/// creation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolicState {
    pub clauses: ClauseState,
    pub path: PathCondition,
    #[serde(default)]
    pub concrete_values: Vec<ConcreteBinding>,
    #[serde(default)]
    pub trace: Vec<InstructionRef>,
}

impl SymbolicState {
    /// Build from an interleaved clause sequence, splitting off the path
    pub fn from_clauses(clauses: Vec<Clause>) -> Self {
        let path = clauses.iter().filter(|c| c.is_path()).cloned().collect();
        let trace = clauses.iter().map(|c| c.instruction.clone()).collect();
        Self {
            clauses: ClauseState(clauses),
            path: PathCondition(path),
            concrete_values: Vec::new(),
            trace,
        }
    }

    pub fn concrete_value(&self, term: &Term) -> Option<&ConcreteValue> {
        self.concrete_values
            .iter()
            .find(|b| &b.term == term)
            .map(|b| &b.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Predicate, SymType};

    #[test]
    fn test_switch_outcomes_group_targets() {
        let cases = vec![(1, 10), (2, 10), (3, 11)];
        let sw = InstructionRef::new("m", 0, InstructionKind::Switch { cases, default: 12 });
        assert_eq!(sw.outcomes(), Some(3));
        assert_eq!(InstructionRef::branch("m", 1).outcomes(), Some(2));
        assert_eq!(InstructionRef::other("m", 2).outcomes(), None);
    }

    #[test]
    fn test_from_clauses_splits_path() {
        let x = Term::value("x", SymType::Int);
        let def = Clause::new(InstructionRef::other("m", 0), Predicate::assign(x.clone(), Term::int(1)));
        let br = Clause::new(InstructionRef::branch("m", 1), Predicate::path(x, Term::int(1)));
        let state = SymbolicState::from_clauses(vec![def, br.clone()]);
        assert_eq!(state.clauses.0.len(), 2);
        assert_eq!(state.path.0, vec![br]);
        assert_eq!(state.trace.len(), 2);
    }
}
