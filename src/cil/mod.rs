//! CIL method bodies
//!
//! ### Structure
//!
//! A method body is a flat, ordered list of [`Instruction`]s, each sitting at a byte
//! [`Offset`](crate::util::Offset) inside the body. Every instruction points at a static
//! [`OpCode`] entry describing:
//!
//!   - how it affects control flow ([`FlowControl`], summarized as a [`FlowKind`])
//!   - how many evaluation stack slots it consumes and produces ([`StackPop`] and
//!     [`StackPush`]), where the call family has a variable effect resolved from the callee's
//!     [`MethodSig`]
//!   - which kind of inline [`Operand`] follows it
//!
//! Alongside the instructions, a body may have [`ExceptionRegion`]s. Handlers are entered by the
//! runtime rather than by branches, so they matter for partitioning the body and for the stack
//! depth at the start of the handler.
//!
//! ### Reading and writing
//!
//! [`decode_body`] turns raw IL bytes into instructions (resolving call targets through a
//! [`TokenResolver`]). For hand-written bodies, the [`Assembler`] takes mnemonics and labels
//! and takes care of offsets.

mod assembler;
mod decode;
mod errors;
mod exception;
mod instruction;
mod opcodes;
mod signature;

pub use assembler::*;
pub use decode::*;
pub use errors::*;
pub use exception::*;
pub use instruction::*;
pub use opcodes::{FlowControl, FlowKind, OpCode, OperandType, StackPop, StackPush, OPCODES};
pub use signature::*;
