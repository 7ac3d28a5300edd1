use crate::cil::Instruction;
use crate::util::Offset;
use std::fmt;

/// Index of a basic block inside its control flow graph
///
/// Blocks are numbered in program order, so the entry block is always `BlockId::ENTRY` and
/// comparing ids compares the position of blocks in the method body.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct BlockId(pub(crate) usize);

impl BlockId {
    /// Block containing the first instruction of the method
    pub const ENTRY: BlockId = BlockId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maximal straight-line run of instructions
///
/// Only the last instruction may transfer control, and only the first instruction may be the
/// target of a transfer. Edges are stored as block ids, never as references, so loops in the
/// graph don't turn into ownership cycles.
#[derive(Debug, Clone)]
pub struct CilBasicBlock<'a> {
    pub(crate) id: BlockId,
    pub(crate) instructions: &'a [Instruction],
    pub(crate) predecessors: Vec<BlockId>,

    /// Distinct successors; when there is a fallthrough successor, it is the last one
    pub(crate) successors: Vec<BlockId>,
    pub(crate) fallthrough: Option<BlockId>,

    /// Stack depth on entry, if this block starts an exception handler or a filter
    pub(crate) handler_entry_depth: Option<usize>,
}

impl<'a> CilBasicBlock<'a> {
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Instructions in the block, in program order (never empty)
    pub fn instructions(&self) -> &'a [Instruction] {
        self.instructions
    }

    pub fn predecessors(&self) -> &[BlockId] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[BlockId] {
        &self.successors
    }

    /// Block reached by running off the end of this one
    pub fn fallthrough_successor(&self) -> Option<BlockId> {
        self.fallthrough
    }

    pub fn handler_entry_depth(&self) -> Option<usize> {
        self.handler_entry_depth
    }

    pub fn start_offset(&self) -> Offset {
        self.instructions[0].offset()
    }

    pub fn last_instruction(&self) -> &'a Instruction {
        &self.instructions[self.instructions.len() - 1]
    }

    /// Does control leave the method (or the handler) from this block?
    pub fn is_exit(&self) -> bool {
        self.successors.is_empty()
    }
}

fn write_ids(f: &mut fmt::Formatter<'_>, ids: &[BlockId]) -> fmt::Result {
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", id)?;
    }
    Ok(())
}

impl<'a> fmt::Display for CilBasicBlock<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BasicBlock{}", self.id)?;
        for instruction in self.instructions {
            writeln!(f, "{}", instruction)?;
        }
        f.write_str("in: [")?;
        write_ids(f, &self.predecessors)?;
        f.write_str("]\nout: [")?;
        write_ids(f, &self.successors)?;
        f.write_str("]\n")
    }
}
