use super::{lower_instruction, Error, EvaluationStack, LinearIr};
use crate::cfg;
use crate::cil::{ExceptionRegion, Instruction, MethodSig};
use crate::util::Offset;
use std::collections::{HashMap, HashSet};

/// Lower a method body in a single pass over its instructions, in program order
///
/// The output corresponds one-to-one with `instructions`. Stack depths follow the rule from
/// ECMA-335 (III.1.7.5) for single pass verification: after an unconditional transfer (`br`,
/// `leave`, `ret`, `throw`, ...) the depth is the one recorded by an earlier forward branch to
/// the next instruction, or zero if there was none. The first instruction of a handler or filter
/// starts with its entry depth.
pub fn lower_linear<'a>(
    instructions: &'a [Instruction],
    regions: &[ExceptionRegion],
    method: &MethodSig,
) -> Result<LinearIr<'a>, Error> {
    if instructions.is_empty() {
        return Err(Error::MalformedBytecode(cfg::Error::EmptyMethod));
    }

    let starts: HashSet<Offset> = instructions.iter().map(Instruction::offset).collect();
    let end_of_body = instructions[instructions.len() - 1].next_offset();
    for boundary in regions.iter().flat_map(ExceptionRegion::boundaries) {
        if boundary != end_of_body && !starts.contains(&boundary) {
            return Err(Error::MalformedBytecode(
                cfg::Error::DanglingRegionBoundary { offset: boundary },
            ));
        }
    }
    let handler_entries: HashMap<Offset, usize> = regions
        .iter()
        .flat_map(ExceptionRegion::entry_points)
        .collect();
    let mut recorded_depths: HashMap<Offset, usize> = HashMap::new();

    let mut stack = EvaluationStack::new();
    let mut lowered = Vec::with_capacity(instructions.len());
    let mut falls_through = true;
    for instruction in instructions {
        let offset = instruction.offset();
        if let Some(depth) = handler_entries.get(&offset) {
            stack.set_depth(*depth);
        } else if !falls_through {
            stack.set_depth(recorded_depths.get(&offset).copied().unwrap_or(0));
        }

        lowered.push(lower_instruction(&mut stack, instruction, method)?);

        for target in instruction.branch_targets() {
            if !starts.contains(target) {
                return Err(Error::MalformedBytecode(cfg::Error::DanglingBranchTarget {
                    source: offset,
                    target: *target,
                }));
            }
            if *target > offset {
                recorded_depths.entry(*target).or_insert(stack.depth());
            }
        }
        falls_through = instruction.has_fallthrough();
    }

    log::debug!(
        "lowered {} instructions in one pass using {} registers",
        lowered.len(),
        stack.max_depth()
    );

    Ok(LinearIr {
        instructions: lowered,
        max_register_count: stack.max_depth(),
    })
}
