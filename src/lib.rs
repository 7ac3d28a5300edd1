//! Lowering of stack-based CIL method bodies into a register-based linear IR
//!
//! The pipeline, one method at a time:
//!
//!   1. [`module`] holds the metadata of an assembly module, including raw IL bytes
//!   2. [`cil`] decodes those bytes into [`Instruction`](cil::Instruction)s
//!   3. [`cfg`] partitions the instructions into basic blocks
//!   4. [`linear`] replaces the implicit evaluation stack with explicit registers
//!   5. [`dump`] prints the result
//!
//! Methods are independent of each other: nothing in the pipeline is shared mutably, so
//! separate methods can be lowered on separate threads.

pub mod cfg;
pub mod cil;
pub mod dump;
pub mod linear;
pub mod module;
pub mod util;
