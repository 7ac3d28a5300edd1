use super::{BlockId, CilBasicBlock, Error};
use crate::cil::{ExceptionRegion, FlowKind, Instruction};
use crate::util::{Offset, Width};
use std::collections::BTreeMap;
use std::fmt;

/// Control flow graph of a single method body
///
/// Blocks live in an arena indexed by [`BlockId`] and appear in program order, so concatenating
/// the instructions of every block gives back the method body exactly.
#[derive(Debug, Clone)]
pub struct CilControlFlowGraph<'a> {
    instructions: &'a [Instruction],
    blocks: Vec<CilBasicBlock<'a>>,
}

impl<'a> CilControlFlowGraph<'a> {
    /// Partition a method body into basic blocks and connect them
    ///
    /// Leaders are the first instruction, every branch target, every instruction following a
    /// control transfer (including conditional ones), and the boundaries of exception regions.
    /// Handlers are entered by the runtime, so they don't get incoming edges: instead, the
    /// blocks starting a handler or filter remember the stack depth they are entered with.
    pub fn build(
        instructions: &'a [Instruction],
        regions: &[ExceptionRegion],
    ) -> Result<CilControlFlowGraph<'a>, Error> {
        if instructions.is_empty() {
            return Err(Error::EmptyMethod);
        }

        let index_of = |offset: Offset| {
            instructions
                .binary_search_by_key(&offset, Instruction::offset)
                .ok()
        };
        let end_of_body = instructions[instructions.len() - 1].next_offset();

        // Leader instruction index -> handler entry depth (if the leader starts a handler)
        let mut leaders: BTreeMap<usize, Option<usize>> = BTreeMap::new();
        leaders.insert(0, None);
        for (idx, instruction) in instructions.iter().enumerate() {
            for target in instruction.branch_targets() {
                let target_idx = index_of(*target).ok_or(Error::DanglingBranchTarget {
                    source: instruction.offset(),
                    target: *target,
                })?;
                leaders.entry(target_idx).or_insert(None);
            }
            if instruction.flow_kind() != FlowKind::Fallthrough && idx + 1 < instructions.len() {
                leaders.entry(idx + 1).or_insert(None);
            }
        }
        for region in regions {
            for boundary in region.boundaries() {
                match index_of(boundary) {
                    Some(idx) => {
                        leaders.entry(idx).or_insert(None);
                    }
                    None if boundary == end_of_body => (),
                    None => return Err(Error::DanglingRegionBoundary { offset: boundary }),
                }
            }
            for (entry, depth) in region.entry_points() {
                if let Some(idx) = index_of(entry) {
                    leaders.insert(idx, Some(depth));
                }
            }
        }

        // Slice the body at every leader
        let starts: Vec<(usize, Option<usize>)> = leaders.into_iter().collect();
        let mut blocks: Vec<CilBasicBlock<'a>> = Vec::with_capacity(starts.len());
        let mut block_of_instruction: Vec<BlockId> = Vec::with_capacity(instructions.len());
        for (i, (start, handler_entry_depth)) in starts.iter().enumerate() {
            let end = starts
                .get(i + 1)
                .map_or(instructions.len(), |(next_start, _)| *next_start);
            let id = BlockId(i);
            block_of_instruction.extend((*start..end).map(|_| id));
            blocks.push(CilBasicBlock {
                id,
                instructions: &instructions[*start..end],
                predecessors: vec![],
                successors: vec![],
                fallthrough: None,
                handler_entry_depth: *handler_entry_depth,
            });
        }

        // Connect blocks
        let block_count = blocks.len();
        for block in &mut blocks {
            let last = block.last_instruction();
            let fallthrough = if last.has_fallthrough() && block.id.0 + 1 < block_count {
                Some(BlockId(block.id.0 + 1))
            } else {
                None
            };

            let mut successors: Vec<BlockId> = vec![];
            for target in last.branch_targets() {
                // Targets were checked while collecting leaders
                if let Some(idx) = index_of(*target) {
                    let target_block = block_of_instruction[idx];
                    if Some(target_block) != fallthrough && !successors.contains(&target_block) {
                        successors.push(target_block);
                    }
                }
            }
            successors.extend(fallthrough);

            block.successors = successors;
            block.fallthrough = fallthrough;
        }
        for idx in 0..block_count {
            for succ_idx in 0..blocks[idx].successors.len() {
                let succ = blocks[idx].successors[succ_idx];
                blocks[succ.0].predecessors.push(BlockId(idx));
            }
        }

        log::debug!(
            "partitioned {} instructions ({} bytes) into {} basic blocks",
            instructions.len(),
            end_of_body.0,
            block_count
        );

        Ok(CilControlFlowGraph {
            instructions,
            blocks,
        })
    }

    /// Every block, in program order
    pub fn basic_blocks(&self) -> &[CilBasicBlock<'a>] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &CilBasicBlock<'a> {
        &self.blocks[id.0]
    }

    pub fn entry_block(&self) -> &CilBasicBlock<'a> {
        &self.blocks[BlockId::ENTRY.0]
    }

    /// Blocks without successors (they return, throw, or end a handler)
    pub fn exit_blocks(&self) -> Vec<&CilBasicBlock<'a>> {
        self.blocks.iter().filter(|block| block.is_exit()).collect()
    }

    /// Block starting at the given offset
    pub fn block_at(&self, offset: Offset) -> Option<BlockId> {
        self.blocks
            .binary_search_by_key(&offset, |block| block.start_offset())
            .ok()
            .map(BlockId)
    }

    /// Instructions of the whole method body
    pub fn instructions(&self) -> &'a [Instruction] {
        self.instructions
    }

    /// Size of the method body in bytes
    pub fn code_size(&self) -> usize {
        self.instructions.iter().map(Width::width).sum()
    }
}

impl<'a> fmt::Display for CilControlFlowGraph<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", block)?;
        }
        Ok(())
    }
}
