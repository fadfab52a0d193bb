//! Leaf value types shared by every feature

pub mod clause;
pub mod execution;
pub mod predicate;
pub mod sym_type;
pub mod term;

pub use clause::{
    Clause, ClauseState, ConcreteBinding, ConcreteValue, InstructionKind, InstructionRef,
    PathCondition, SymbolicState,
};
pub use execution::{ExecutionCompletedResult, ExecutionResult, TestExecutionRequest};
pub use predicate::{field_parts, index_parts, Predicate, PredicateBody, PredicateKind};
pub use sym_type::{SymType, DWORD, WORD};
pub use term::{BinaryOp, CmpOp, MethodRef, Term, TermKind};
