use super::{FlowKind, MethodRef, OpCode, OperandType, Token};
use crate::util::{Offset, Width};
use std::fmt;
use std::slice;
use std::sync::Arc;

/// Inline operand of an instruction, after decoding
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    None,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),

    /// Local or argument index
    Variable(u16),

    /// Unresolved metadata token (fields, types, strings, signatures)
    Token(Token),

    /// Resolved call target
    Method(Arc<MethodRef>),

    /// Absolute offset of a branch target
    Target(Offset),

    /// Absolute offsets of `switch` targets, in table order
    Targets(Vec<Offset>),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Int(value) => write!(f, "{}", value),
            Operand::Long(value) => write!(f, "{}", value),
            Operand::Float(value) => write!(f, "{}", value),
            Operand::Double(value) => write!(f, "{}", value),
            Operand::Variable(index) => write!(f, "{}", index),
            Operand::Token(token) => write!(f, "{}", token),
            Operand::Method(method) => write!(f, "{}", method),
            Operand::Target(target) => write!(f, "{}", target),
            Operand::Targets(targets) => {
                f.write_str("(")?;
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", target)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// A single decoded CIL instruction
///
/// Instructions are immutable once decoded: the CFG and the linear IR only ever borrow them.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    offset: Offset,
    opcode: &'static OpCode,
    operand: Operand,
}

impl Instruction {
    pub fn new(offset: Offset, opcode: &'static OpCode, operand: Operand) -> Instruction {
        Instruction {
            offset,
            opcode,
            operand,
        }
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn opcode(&self) -> &'static OpCode {
        self.opcode
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Mnemonic of the opcode
    pub fn name(&self) -> &'static str {
        self.opcode.name
    }

    pub fn flow_kind(&self) -> FlowKind {
        self.opcode.flow_kind()
    }

    /// Static branch targets (empty for instructions that don't jump)
    pub fn branch_targets(&self) -> &[Offset] {
        match &self.operand {
            Operand::Target(target) => slice::from_ref(target),
            Operand::Targets(targets) => targets.as_slice(),
            _ => &[],
        }
    }

    /// Can execution continue with the next instruction?
    pub fn has_fallthrough(&self) -> bool {
        matches!(
            self.flow_kind(),
            FlowKind::Fallthrough | FlowKind::ConditionalBranch | FlowKind::Switch
        )
    }

    /// Offset of the instruction that directly follows this one
    pub fn next_offset(&self) -> Offset {
        self.offset.after(self)
    }

    /// Call target, for `call`, `callvirt`, `newobj`, `jmp`, `ldftn`, and `ldvirtftn`
    pub fn method_ref(&self) -> Option<&MethodRef> {
        match &self.operand {
            Operand::Method(method) => Some(method.as_ref()),
            _ => None,
        }
    }
}

impl Width for Instruction {
    fn width(&self) -> usize {
        let operand_width = match self.opcode.operand_type.fixed_width() {
            Some(width) => width,
            None => 4 + 4 * self.branch_targets().len(),
        };
        self.opcode.width() + operand_width
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.offset, self.opcode.name)?;
        if self.opcode.operand_type != OperandType::InlineNone && self.operand != Operand::None {
            write!(f, " {}", self.operand)?;
        }
        Ok(())
    }
}
