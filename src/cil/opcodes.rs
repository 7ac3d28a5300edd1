//! Static description of every CIL opcode
//!
//! The table mirrors partition III of ECMA-335: for each opcode we record its encoding, how it
//! affects control flow, how many evaluation stack slots it consumes and produces, and what kind
//! of inline operand follows it in the instruction stream.

use crate::util::Width;

/// How an instruction affects control flow
///
/// This is the fine-grained classification (the same one metadata readers usually expose). Most
/// consumers only care about the coarser [`FlowKind`].
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum FlowControl {
    Next,
    Break,
    Call,
    Meta,
    Branch,
    CondBranch,
    Return,
    Throw,
}

/// Coarse control flow classification used when partitioning method bodies
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum FlowKind {
    /// Execution continues with the next instruction
    Fallthrough,

    /// Unconditional jump (`br`, `leave`, ...)
    Branch,

    /// Jump or fall through to the next instruction
    ConditionalBranch,

    /// Leaves the method or the current handler (`ret`, `endfinally`, `endfilter`)
    Return,

    /// Raises an exception (`throw`, `rethrow`)
    Throw,

    /// Multi-way jump which falls through when the index is out of range
    Switch,
}

/// Number of evaluation stack slots consumed
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum StackPop {
    Pop0,
    Pop1,
    Pop2,
    Pop3,

    /// Empties the evaluation stack (`leave`)
    PopAll,

    /// Depends on the call target or the enclosing method's signature
    VarPop,
}

/// Number of evaluation stack slots produced
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum StackPush {
    Push0,
    Push1,
    Push2,

    /// Depends on the call target's return type
    VarPush,
}

/// Kind of operand encoded inline after the opcode
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OperandType {
    InlineNone,
    ShortInlineI,
    InlineI,
    InlineI8,
    ShortInlineR,
    InlineR,
    ShortInlineBrTarget,
    InlineBrTarget,
    InlineSwitch,
    InlineMethod,
    InlineField,
    InlineType,
    InlineTok,
    InlineString,
    InlineSig,
    ShortInlineVar,
    InlineVar,
    ShortInlineArg,
    InlineArg,
}

impl OperandType {
    /// Encoded width of the operand, or `None` for `switch` (whose width depends on its table)
    pub fn fixed_width(&self) -> Option<usize> {
        Some(match self {
            OperandType::InlineNone => 0,
            OperandType::ShortInlineI
            | OperandType::ShortInlineBrTarget
            | OperandType::ShortInlineVar
            | OperandType::ShortInlineArg => 1,
            OperandType::InlineVar | OperandType::InlineArg => 2,
            OperandType::InlineI
            | OperandType::ShortInlineR
            | OperandType::InlineBrTarget
            | OperandType::InlineMethod
            | OperandType::InlineField
            | OperandType::InlineType
            | OperandType::InlineTok
            | OperandType::InlineString
            | OperandType::InlineSig => 4,
            OperandType::InlineI8 | OperandType::InlineR => 8,
            OperandType::InlineSwitch => return None,
        })
    }

    /// Does the operand refer to a metadata token?
    pub fn is_token(&self) -> bool {
        matches!(
            self,
            OperandType::InlineMethod
                | OperandType::InlineField
                | OperandType::InlineType
                | OperandType::InlineTok
                | OperandType::InlineString
                | OperandType::InlineSig
        )
    }
}

/// One entry of the opcode table
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct OpCode {
    /// Mnemonic (eg. `ldarg.0`)
    pub name: &'static str,

    /// Encoded value: `0x00..=0xFF` for one byte opcodes, `0xFE00..=0xFEFF` for prefixed ones
    pub value: u16,

    pub flow_control: FlowControl,
    pub stack_pop: StackPop,
    pub stack_push: StackPush,
    pub operand_type: OperandType,
}

/// First byte of every two byte opcode
pub const TWO_BYTE_PREFIX: u8 = 0xFE;

impl OpCode {
    pub const CALL: u16 = 0x28;
    pub const CALLI: u16 = 0x29;
    pub const RET: u16 = 0x2A;
    pub const SWITCH: u16 = 0x45;
    pub const CALLVIRT: u16 = 0x6F;
    pub const NEWOBJ: u16 = 0x73;

    /// Look up an opcode by its encoded value
    pub fn from_value(value: u16) -> Option<&'static OpCode> {
        OPCODES.iter().find(|opcode| opcode.value == value)
    }

    /// Look up an opcode by its mnemonic
    pub fn from_name(name: &str) -> Option<&'static OpCode> {
        OPCODES.iter().find(|opcode| opcode.name == name)
    }

    pub fn is_two_byte(&self) -> bool {
        self.value > 0xFF
    }

    /// Coarse control flow classification
    pub fn flow_kind(&self) -> FlowKind {
        match self.flow_control {
            FlowControl::Next | FlowControl::Break | FlowControl::Call | FlowControl::Meta => {
                FlowKind::Fallthrough
            }
            FlowControl::Branch => FlowKind::Branch,
            FlowControl::CondBranch if self.value == OpCode::SWITCH => FlowKind::Switch,
            FlowControl::CondBranch => FlowKind::ConditionalBranch,
            FlowControl::Return => FlowKind::Return,
            FlowControl::Throw => FlowKind::Throw,
        }
    }
}

impl Width for OpCode {
    fn width(&self) -> usize {
        if self.is_two_byte() {
            2
        } else {
            1
        }
    }
}

const fn op(
    name: &'static str,
    value: u16,
    flow_control: FlowControl,
    stack_pop: StackPop,
    stack_push: StackPush,
    operand_type: OperandType,
) -> OpCode {
    OpCode {
        name,
        value,
        flow_control,
        stack_pop,
        stack_push,
        operand_type,
    }
}

use FlowControl::*;
use OperandType::*;
use StackPop::*;
use StackPush::*;

/// Every opcode defined by ECMA-335 (6th edition)
#[rustfmt::skip]
pub static OPCODES: [OpCode; 219] = [
    op("nop", 0x00, Next, Pop0, Push0, InlineNone),
    op("break", 0x01, Break, Pop0, Push0, InlineNone),
    op("ldarg.0", 0x02, Next, Pop0, Push1, InlineNone),
    op("ldarg.1", 0x03, Next, Pop0, Push1, InlineNone),
    op("ldarg.2", 0x04, Next, Pop0, Push1, InlineNone),
    op("ldarg.3", 0x05, Next, Pop0, Push1, InlineNone),
    op("ldloc.0", 0x06, Next, Pop0, Push1, InlineNone),
    op("ldloc.1", 0x07, Next, Pop0, Push1, InlineNone),
    op("ldloc.2", 0x08, Next, Pop0, Push1, InlineNone),
    op("ldloc.3", 0x09, Next, Pop0, Push1, InlineNone),
    op("stloc.0", 0x0A, Next, Pop1, Push0, InlineNone),
    op("stloc.1", 0x0B, Next, Pop1, Push0, InlineNone),
    op("stloc.2", 0x0C, Next, Pop1, Push0, InlineNone),
    op("stloc.3", 0x0D, Next, Pop1, Push0, InlineNone),
    op("ldarg.s", 0x0E, Next, Pop0, Push1, ShortInlineArg),
    op("ldarga.s", 0x0F, Next, Pop0, Push1, ShortInlineArg),
    op("starg.s", 0x10, Next, Pop1, Push0, ShortInlineArg),
    op("ldloc.s", 0x11, Next, Pop0, Push1, ShortInlineVar),
    op("ldloca.s", 0x12, Next, Pop0, Push1, ShortInlineVar),
    op("stloc.s", 0x13, Next, Pop1, Push0, ShortInlineVar),
    op("ldnull", 0x14, Next, Pop0, Push1, InlineNone),
    op("ldc.i4.m1", 0x15, Next, Pop0, Push1, InlineNone),
    op("ldc.i4.0", 0x16, Next, Pop0, Push1, InlineNone),
    op("ldc.i4.1", 0x17, Next, Pop0, Push1, InlineNone),
    op("ldc.i4.2", 0x18, Next, Pop0, Push1, InlineNone),
    op("ldc.i4.3", 0x19, Next, Pop0, Push1, InlineNone),
    op("ldc.i4.4", 0x1A, Next, Pop0, Push1, InlineNone),
    op("ldc.i4.5", 0x1B, Next, Pop0, Push1, InlineNone),
    op("ldc.i4.6", 0x1C, Next, Pop0, Push1, InlineNone),
    op("ldc.i4.7", 0x1D, Next, Pop0, Push1, InlineNone),
    op("ldc.i4.8", 0x1E, Next, Pop0, Push1, InlineNone),
    op("ldc.i4.s", 0x1F, Next, Pop0, Push1, ShortInlineI),
    op("ldc.i4", 0x20, Next, Pop0, Push1, InlineI),
    op("ldc.i8", 0x21, Next, Pop0, Push1, InlineI8),
    op("ldc.r4", 0x22, Next, Pop0, Push1, ShortInlineR),
    op("ldc.r8", 0x23, Next, Pop0, Push1, InlineR),
    op("dup", 0x25, Next, Pop1, Push2, InlineNone),
    op("pop", 0x26, Next, Pop1, Push0, InlineNone),
    op("jmp", 0x27, Call, Pop0, Push0, InlineMethod),
    op("call", 0x28, Call, VarPop, VarPush, InlineMethod),
    op("calli", 0x29, Call, VarPop, VarPush, InlineSig),
    op("ret", 0x2A, Return, VarPop, Push0, InlineNone),
    op("br.s", 0x2B, Branch, Pop0, Push0, ShortInlineBrTarget),
    op("brfalse.s", 0x2C, CondBranch, Pop1, Push0, ShortInlineBrTarget),
    op("brtrue.s", 0x2D, CondBranch, Pop1, Push0, ShortInlineBrTarget),
    op("beq.s", 0x2E, CondBranch, Pop2, Push0, ShortInlineBrTarget),
    op("bge.s", 0x2F, CondBranch, Pop2, Push0, ShortInlineBrTarget),
    op("bgt.s", 0x30, CondBranch, Pop2, Push0, ShortInlineBrTarget),
    op("ble.s", 0x31, CondBranch, Pop2, Push0, ShortInlineBrTarget),
    op("blt.s", 0x32, CondBranch, Pop2, Push0, ShortInlineBrTarget),
    op("bne.un.s", 0x33, CondBranch, Pop2, Push0, ShortInlineBrTarget),
    op("bge.un.s", 0x34, CondBranch, Pop2, Push0, ShortInlineBrTarget),
    op("bgt.un.s", 0x35, CondBranch, Pop2, Push0, ShortInlineBrTarget),
    op("ble.un.s", 0x36, CondBranch, Pop2, Push0, ShortInlineBrTarget),
    op("blt.un.s", 0x37, CondBranch, Pop2, Push0, ShortInlineBrTarget),
    op("br", 0x38, Branch, Pop0, Push0, InlineBrTarget),
    op("brfalse", 0x39, CondBranch, Pop1, Push0, InlineBrTarget),
    op("brtrue", 0x3A, CondBranch, Pop1, Push0, InlineBrTarget),
    op("beq", 0x3B, CondBranch, Pop2, Push0, InlineBrTarget),
    op("bge", 0x3C, CondBranch, Pop2, Push0, InlineBrTarget),
    op("bgt", 0x3D, CondBranch, Pop2, Push0, InlineBrTarget),
    op("ble", 0x3E, CondBranch, Pop2, Push0, InlineBrTarget),
    op("blt", 0x3F, CondBranch, Pop2, Push0, InlineBrTarget),
    op("bne.un", 0x40, CondBranch, Pop2, Push0, InlineBrTarget),
    op("bge.un", 0x41, CondBranch, Pop2, Push0, InlineBrTarget),
    op("bgt.un", 0x42, CondBranch, Pop2, Push0, InlineBrTarget),
    op("ble.un", 0x43, CondBranch, Pop2, Push0, InlineBrTarget),
    op("blt.un", 0x44, CondBranch, Pop2, Push0, InlineBrTarget),
    op("switch", 0x45, CondBranch, Pop1, Push0, InlineSwitch),
    op("ldind.i1", 0x46, Next, Pop1, Push1, InlineNone),
    op("ldind.u1", 0x47, Next, Pop1, Push1, InlineNone),
    op("ldind.i2", 0x48, Next, Pop1, Push1, InlineNone),
    op("ldind.u2", 0x49, Next, Pop1, Push1, InlineNone),
    op("ldind.i4", 0x4A, Next, Pop1, Push1, InlineNone),
    op("ldind.u4", 0x4B, Next, Pop1, Push1, InlineNone),
    op("ldind.i8", 0x4C, Next, Pop1, Push1, InlineNone),
    op("ldind.i", 0x4D, Next, Pop1, Push1, InlineNone),
    op("ldind.r4", 0x4E, Next, Pop1, Push1, InlineNone),
    op("ldind.r8", 0x4F, Next, Pop1, Push1, InlineNone),
    op("ldind.ref", 0x50, Next, Pop1, Push1, InlineNone),
    op("stind.ref", 0x51, Next, Pop2, Push0, InlineNone),
    op("stind.i1", 0x52, Next, Pop2, Push0, InlineNone),
    op("stind.i2", 0x53, Next, Pop2, Push0, InlineNone),
    op("stind.i4", 0x54, Next, Pop2, Push0, InlineNone),
    op("stind.i8", 0x55, Next, Pop2, Push0, InlineNone),
    op("stind.r4", 0x56, Next, Pop2, Push0, InlineNone),
    op("stind.r8", 0x57, Next, Pop2, Push0, InlineNone),
    op("add", 0x58, Next, Pop2, Push1, InlineNone),
    op("sub", 0x59, Next, Pop2, Push1, InlineNone),
    op("mul", 0x5A, Next, Pop2, Push1, InlineNone),
    op("div", 0x5B, Next, Pop2, Push1, InlineNone),
    op("div.un", 0x5C, Next, Pop2, Push1, InlineNone),
    op("rem", 0x5D, Next, Pop2, Push1, InlineNone),
    op("rem.un", 0x5E, Next, Pop2, Push1, InlineNone),
    op("and", 0x5F, Next, Pop2, Push1, InlineNone),
    op("or", 0x60, Next, Pop2, Push1, InlineNone),
    op("xor", 0x61, Next, Pop2, Push1, InlineNone),
    op("shl", 0x62, Next, Pop2, Push1, InlineNone),
    op("shr", 0x63, Next, Pop2, Push1, InlineNone),
    op("shr.un", 0x64, Next, Pop2, Push1, InlineNone),
    op("neg", 0x65, Next, Pop1, Push1, InlineNone),
    op("not", 0x66, Next, Pop1, Push1, InlineNone),
    op("conv.i1", 0x67, Next, Pop1, Push1, InlineNone),
    op("conv.i2", 0x68, Next, Pop1, Push1, InlineNone),
    op("conv.i4", 0x69, Next, Pop1, Push1, InlineNone),
    op("conv.i8", 0x6A, Next, Pop1, Push1, InlineNone),
    op("conv.r4", 0x6B, Next, Pop1, Push1, InlineNone),
    op("conv.r8", 0x6C, Next, Pop1, Push1, InlineNone),
    op("conv.u4", 0x6D, Next, Pop1, Push1, InlineNone),
    op("conv.u8", 0x6E, Next, Pop1, Push1, InlineNone),
    op("callvirt", 0x6F, Call, VarPop, VarPush, InlineMethod),
    op("cpobj", 0x70, Next, Pop2, Push0, InlineType),
    op("ldobj", 0x71, Next, Pop1, Push1, InlineType),
    op("ldstr", 0x72, Next, Pop0, Push1, InlineString),
    op("newobj", 0x73, Call, VarPop, Push1, InlineMethod),
    op("castclass", 0x74, Next, Pop1, Push1, InlineType),
    op("isinst", 0x75, Next, Pop1, Push1, InlineType),
    op("conv.r.un", 0x76, Next, Pop1, Push1, InlineNone),
    op("unbox", 0x79, Next, Pop1, Push1, InlineType),
    op("throw", 0x7A, Throw, Pop1, Push0, InlineNone),
    op("ldfld", 0x7B, Next, Pop1, Push1, InlineField),
    op("ldflda", 0x7C, Next, Pop1, Push1, InlineField),
    op("stfld", 0x7D, Next, Pop2, Push0, InlineField),
    op("ldsfld", 0x7E, Next, Pop0, Push1, InlineField),
    op("ldsflda", 0x7F, Next, Pop0, Push1, InlineField),
    op("stsfld", 0x80, Next, Pop1, Push0, InlineField),
    op("stobj", 0x81, Next, Pop2, Push0, InlineType),
    op("conv.ovf.i1.un", 0x82, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.i2.un", 0x83, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.i4.un", 0x84, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.i8.un", 0x85, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.u1.un", 0x86, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.u2.un", 0x87, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.u4.un", 0x88, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.u8.un", 0x89, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.i.un", 0x8A, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.u.un", 0x8B, Next, Pop1, Push1, InlineNone),
    op("box", 0x8C, Next, Pop1, Push1, InlineType),
    op("newarr", 0x8D, Next, Pop1, Push1, InlineType),
    op("ldlen", 0x8E, Next, Pop1, Push1, InlineNone),
    op("ldelema", 0x8F, Next, Pop2, Push1, InlineType),
    op("ldelem.i1", 0x90, Next, Pop2, Push1, InlineNone),
    op("ldelem.u1", 0x91, Next, Pop2, Push1, InlineNone),
    op("ldelem.i2", 0x92, Next, Pop2, Push1, InlineNone),
    op("ldelem.u2", 0x93, Next, Pop2, Push1, InlineNone),
    op("ldelem.i4", 0x94, Next, Pop2, Push1, InlineNone),
    op("ldelem.u4", 0x95, Next, Pop2, Push1, InlineNone),
    op("ldelem.i8", 0x96, Next, Pop2, Push1, InlineNone),
    op("ldelem.i", 0x97, Next, Pop2, Push1, InlineNone),
    op("ldelem.r4", 0x98, Next, Pop2, Push1, InlineNone),
    op("ldelem.r8", 0x99, Next, Pop2, Push1, InlineNone),
    op("ldelem.ref", 0x9A, Next, Pop2, Push1, InlineNone),
    op("stelem.i", 0x9B, Next, Pop3, Push0, InlineNone),
    op("stelem.i1", 0x9C, Next, Pop3, Push0, InlineNone),
    op("stelem.i2", 0x9D, Next, Pop3, Push0, InlineNone),
    op("stelem.i4", 0x9E, Next, Pop3, Push0, InlineNone),
    op("stelem.i8", 0x9F, Next, Pop3, Push0, InlineNone),
    op("stelem.r4", 0xA0, Next, Pop3, Push0, InlineNone),
    op("stelem.r8", 0xA1, Next, Pop3, Push0, InlineNone),
    op("stelem.ref", 0xA2, Next, Pop3, Push0, InlineNone),
    op("ldelem", 0xA3, Next, Pop2, Push1, InlineType),
    op("stelem", 0xA4, Next, Pop3, Push0, InlineType),
    op("unbox.any", 0xA5, Next, Pop1, Push1, InlineType),
    op("conv.ovf.i1", 0xB3, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.u1", 0xB4, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.i2", 0xB5, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.u2", 0xB6, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.i4", 0xB7, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.u4", 0xB8, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.i8", 0xB9, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.u8", 0xBA, Next, Pop1, Push1, InlineNone),
    op("refanyval", 0xC2, Next, Pop1, Push1, InlineType),
    op("ckfinite", 0xC3, Next, Pop1, Push1, InlineNone),
    op("mkrefany", 0xC6, Next, Pop1, Push1, InlineType),
    op("ldtoken", 0xD0, Next, Pop0, Push1, InlineTok),
    op("conv.u2", 0xD1, Next, Pop1, Push1, InlineNone),
    op("conv.u1", 0xD2, Next, Pop1, Push1, InlineNone),
    op("conv.i", 0xD3, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.i", 0xD4, Next, Pop1, Push1, InlineNone),
    op("conv.ovf.u", 0xD5, Next, Pop1, Push1, InlineNone),
    op("add.ovf", 0xD6, Next, Pop2, Push1, InlineNone),
    op("add.ovf.un", 0xD7, Next, Pop2, Push1, InlineNone),
    op("mul.ovf", 0xD8, Next, Pop2, Push1, InlineNone),
    op("mul.ovf.un", 0xD9, Next, Pop2, Push1, InlineNone),
    op("sub.ovf", 0xDA, Next, Pop2, Push1, InlineNone),
    op("sub.ovf.un", 0xDB, Next, Pop2, Push1, InlineNone),
    // Empties the stack at runtime, but it always ends its block so nothing observes it
    op("endfinally", 0xDC, Return, Pop0, Push0, InlineNone),
    op("leave", 0xDD, Branch, PopAll, Push0, InlineBrTarget),
    op("leave.s", 0xDE, Branch, PopAll, Push0, ShortInlineBrTarget),
    op("stind.i", 0xDF, Next, Pop2, Push0, InlineNone),
    op("conv.u", 0xE0, Next, Pop1, Push1, InlineNone),
    op("arglist", 0xFE00, Next, Pop0, Push1, InlineNone),
    op("ceq", 0xFE01, Next, Pop2, Push1, InlineNone),
    op("cgt", 0xFE02, Next, Pop2, Push1, InlineNone),
    op("cgt.un", 0xFE03, Next, Pop2, Push1, InlineNone),
    op("clt", 0xFE04, Next, Pop2, Push1, InlineNone),
    op("clt.un", 0xFE05, Next, Pop2, Push1, InlineNone),
    op("ldftn", 0xFE06, Next, Pop0, Push1, InlineMethod),
    op("ldvirtftn", 0xFE07, Next, Pop1, Push1, InlineMethod),
    op("ldarg", 0xFE09, Next, Pop0, Push1, InlineArg),
    op("ldarga", 0xFE0A, Next, Pop0, Push1, InlineArg),
    op("starg", 0xFE0B, Next, Pop1, Push0, InlineArg),
    op("ldloc", 0xFE0C, Next, Pop0, Push1, InlineVar),
    op("ldloca", 0xFE0D, Next, Pop0, Push1, InlineVar),
    op("stloc", 0xFE0E, Next, Pop1, Push0, InlineVar),
    op("localloc", 0xFE0F, Next, Pop1, Push1, InlineNone),
    op("endfilter", 0xFE11, Return, Pop1, Push0, InlineNone),
    op("unaligned.", 0xFE12, Meta, Pop0, Push0, ShortInlineI),
    op("volatile.", 0xFE13, Meta, Pop0, Push0, InlineNone),
    op("tail.", 0xFE14, Meta, Pop0, Push0, InlineNone),
    op("initobj", 0xFE15, Next, Pop1, Push0, InlineType),
    op("constrained.", 0xFE16, Meta, Pop0, Push0, InlineType),
    op("cpblk", 0xFE17, Next, Pop3, Push0, InlineNone),
    op("initblk", 0xFE18, Next, Pop3, Push0, InlineNone),
    op("no.", 0xFE19, Meta, Pop0, Push0, ShortInlineI),
    op("rethrow", 0xFE1A, Throw, Pop0, Push0, InlineNone),
    op("sizeof", 0xFE1C, Next, Pop0, Push1, InlineType),
    op("refanytype", 0xFE1D, Next, Pop1, Push1, InlineNone),
    op("readonly.", 0xFE1E, Meta, Pop0, Push0, InlineNone),
];
