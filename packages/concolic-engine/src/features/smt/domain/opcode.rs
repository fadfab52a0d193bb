//! Closed set of binary solver operators

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Eq,
    Neq,
    Add,
    Sub,
    Mul,
    Divide,
    Mod,
    Gt,
    Ge,
    Lt,
    Le,
    Shl,
    Shr,
    Ashr,
    And,
    Or,
    Xor,
    Implies,
    Iff,
    Concat,
}

impl Opcode {
    /// Operators whose result is a boolean regardless of operand sort
    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            Opcode::Eq
                | Opcode::Neq
                | Opcode::Gt
                | Opcode::Ge
                | Opcode::Lt
                | Opcode::Le
                | Opcode::Implies
                | Opcode::Iff
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Divide | Opcode::Mod
        )
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, Opcode::Shl | Opcode::Shr | Opcode::Ashr)
    }

    pub fn is_bitwise(&self) -> bool {
        matches!(self, Opcode::And | Opcode::Or | Opcode::Xor)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Eq => "EQ",
            Opcode::Neq => "NEQ",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Divide => "DIVIDE",
            Opcode::Mod => "MOD",
            Opcode::Gt => "GT",
            Opcode::Ge => "GE",
            Opcode::Lt => "LT",
            Opcode::Le => "LE",
            Opcode::Shl => "SHL",
            Opcode::Shr => "SHR",
            Opcode::Ashr => "ASHR",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Xor => "XOR",
            Opcode::Implies => "IMPLIES",
            Opcode::Iff => "IFF",
            Opcode::Concat => "CONCAT",
        };
        f.write_str(name)
    }
}
