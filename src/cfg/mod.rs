//! Control flow graphs of CIL method bodies
//!
//! A [`CilControlFlowGraph`] partitions the instructions of one method into
//! [`CilBasicBlock`]s. The graph only borrows the instructions, and blocks refer to each other
//! through [`BlockId`]s rather than references.

mod basic_block;
mod errors;
mod graph;

pub use basic_block::*;
pub use errors::*;
pub use graph::*;
