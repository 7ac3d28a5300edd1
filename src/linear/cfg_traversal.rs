use super::{lower_instruction, Error, EvaluationStack, LinearIr, LinearIrInstruction};
use crate::cfg::{BlockId, CilControlFlowGraph};
use crate::cil::MethodSig;

/// Lower a method body by walking its control flow graph depth first
///
/// Every block is lowered starting from the stack depth its first visitor leaves behind. The
/// walk starts at the entry block and then picks up any block still unvisited (unreachable code
/// and exception handlers), in block order. Roots start from an empty stack, or from the entry
/// depth of the handler they begin.
///
/// A block with several predecessors is lowered only once, using the depth from whichever path
/// reaches it first. For verifiable code all paths agree anyway.
///
/// The walk uses an explicit work stack of `(block, depth on entry)` pairs rather than recursion,
/// so large methods can't overflow the native stack. Successors are pushed in reverse so they
/// get visited in successor order.
pub fn lower_cfg<'a>(
    cfg: &CilControlFlowGraph<'a>,
    method: &MethodSig,
) -> Result<LinearIr<'a>, Error> {
    let blocks = cfg.basic_blocks();
    let mut lowered: Vec<Option<Vec<LinearIrInstruction<'a>>>> =
        (0..blocks.len()).map(|_| None).collect();
    let mut max_register_count = 0;

    let mut work: Vec<(BlockId, usize)> = vec![];
    for root in blocks {
        if lowered[root.id().index()].is_some() {
            continue;
        }
        work.push((root.id(), root.handler_entry_depth().unwrap_or(0)));

        while let Some((id, depth)) = work.pop() {
            if lowered[id.index()].is_some() {
                continue;
            }
            let block = cfg.block(id);

            let entry_depth = block.handler_entry_depth().unwrap_or(depth);
            let mut stack = EvaluationStack::with_depth(entry_depth);
            let instructions = block
                .instructions()
                .iter()
                .map(|instruction| lower_instruction(&mut stack, instruction, method))
                .collect::<Result<Vec<_>, _>>()?;
            lowered[id.index()] = Some(instructions);
            max_register_count = max_register_count.max(stack.max_depth());

            for successor in block.successors().iter().rev() {
                if lowered[successor.index()].is_none() {
                    work.push((*successor, stack.depth()));
                }
            }
        }
    }

    let instructions: Vec<LinearIrInstruction<'a>> =
        lowered.into_iter().flatten().flatten().collect();
    log::debug!(
        "lowered {} blocks ({} instructions) using {} registers",
        blocks.len(),
        instructions.len(),
        max_register_count
    );

    Ok(LinearIr {
        instructions,
        max_register_count,
    })
}
