//! Symbolic types
//!
//! Every term carries a `SymType`. Reference types (`Class`, `Array`) also
//! carry the memory space assigned by the memory spacer; before memspacing
//! runs every reference lives in memspace 0.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Machine word size in bits
pub const WORD: u32 = 32;
/// Double-word size in bits
pub const DWORD: u32 = 64;

/// Type of a symbolic term
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SymType {
    Bool,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Class { name: Arc<str>, memspace: u32 },
    Array { element: Box<SymType>, memspace: u32 },
    Null,
    Void,
}

impl SymType {
    pub fn class(name: impl Into<Arc<str>>) -> Self {
        SymType::Class {
            name: name.into(),
            memspace: 0,
        }
    }

    pub fn array(element: SymType) -> Self {
        SymType::Array {
            element: Box::new(element),
            memspace: 0,
        }
    }

    /// Width of the solver sort this type maps to
    pub fn bit_size(&self) -> u32 {
        match self {
            SymType::Long | SymType::Double => DWORD,
            _ => WORD,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, SymType::Bool)
    }

    /// Integral types (bit-vector sorted, excluding bool)
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            SymType::Byte | SymType::Char | SymType::Short | SymType::Int | SymType::Long
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, SymType::Float | SymType::Double)
    }

    /// Class, array and null types
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            SymType::Class { .. } | SymType::Array { .. } | SymType::Null
        )
    }

    pub fn memspace(&self) -> u32 {
        match self {
            SymType::Class { memspace, .. } | SymType::Array { memspace, .. } => *memspace,
            _ => 0,
        }
    }

    /// Same type re-tagged with a memory space; non-reference types are unchanged
    pub fn with_memspace(&self, ms: u32) -> Self {
        match self {
            SymType::Class { name, .. } => SymType::Class {
                name: name.clone(),
                memspace: ms,
            },
            SymType::Array { element, .. } => SymType::Array {
                element: element.clone(),
                memspace: ms,
            },
            other => other.clone(),
        }
    }

    pub fn element(&self) -> Option<&SymType> {
        match self {
            SymType::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Type name without memspace, used for the `SmtModel` readback and for
    /// memory naming
    pub fn name(&self) -> String {
        match self {
            SymType::Bool => "bool".into(),
            SymType::Byte => "byte".into(),
            SymType::Char => "char".into(),
            SymType::Short => "short".into(),
            SymType::Int => "int".into(),
            SymType::Long => "long".into(),
            SymType::Float => "float".into(),
            SymType::Double => "double".into(),
            SymType::Class { name, .. } => name.to_string(),
            SymType::Array { element, .. } => format!("{}[]", element.name()),
            SymType::Null => "null".into(),
            SymType::Void => "void".into(),
        }
    }
}

impl fmt::Display for SymType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.memspace() {
            0 => write!(f, "{}", self.name()),
            ms => write!(f, "{}#{}", self.name(), ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_sizes() {
        assert_eq!(SymType::Int.bit_size(), 32);
        assert_eq!(SymType::Char.bit_size(), 32);
        assert_eq!(SymType::Long.bit_size(), 64);
        assert_eq!(SymType::Float.bit_size(), 32);
        assert_eq!(SymType::Double.bit_size(), 64);
        assert_eq!(SymType::class("A").bit_size(), 32);
    }

    #[test]
    fn test_memspace_retag() {
        let a = SymType::array(SymType::Int);
        let tagged = a.with_memspace(3);
        assert_eq!(tagged.memspace(), 3);
        assert_eq!(tagged.element(), Some(&SymType::Int));
        assert_eq!(SymType::Int.with_memspace(4), SymType::Int);
        assert_eq!(tagged.to_string(), "int[]#3");
    }
}
