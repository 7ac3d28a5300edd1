use super::{Error, EvaluationStack, LinearIrInstruction};
use crate::cil::{Instruction, MethodSig, OpCode, StackPop, StackPush};

/// Values consumed by an instruction
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Pops {
    Count(usize),

    /// Empties the stack, whatever is on it
    All,
}

/// Resolved effect of one instruction on the evaluation stack
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct StackEffect {
    pub pops: Pops,
    pub pushes: usize,
}

impl StackEffect {
    /// Work out how an instruction affects the stack
    ///
    /// Most opcodes have a fixed effect. The call family depends on the callee's signature and
    /// `ret` depends on the signature of the method being lowered (`method`).
    pub fn of(instruction: &Instruction, method: &MethodSig) -> Result<StackEffect, Error> {
        let opcode = instruction.opcode();
        let invalid = || Error::InvalidStackEffect {
            offset: instruction.offset(),
            opcode: opcode.name,
        };

        let pops = match opcode.stack_pop {
            StackPop::Pop0 => Pops::Count(0),
            StackPop::Pop1 => Pops::Count(1),
            StackPop::Pop2 => Pops::Count(2),
            StackPop::Pop3 => Pops::Count(3),
            StackPop::PopAll => Pops::All,
            StackPop::VarPop => match opcode.value {
                OpCode::RET => Pops::Count(if method.returns_void() { 0 } else { 1 }),
                OpCode::CALL | OpCode::CALLVIRT | OpCode::NEWOBJ | OpCode::CALLI => {
                    let callee = &instruction.method_ref().ok_or_else(invalid)?.signature;
                    let receiver = callee.has_implicit_this() && opcode.value != OpCode::NEWOBJ;
                    let function_pointer = opcode.value == OpCode::CALLI;
                    Pops::Count(
                        callee.parameter_count() + receiver as usize + function_pointer as usize,
                    )
                }
                _ => return Err(invalid()),
            },
        };

        let pushes = match opcode.stack_push {
            StackPush::Push0 => 0,
            StackPush::Push1 => 1,
            StackPush::Push2 => 2,
            StackPush::VarPush => match opcode.value {
                OpCode::CALL | OpCode::CALLVIRT | OpCode::CALLI => {
                    let callee = &instruction.method_ref().ok_or_else(invalid)?.signature;
                    if callee.returns_void() {
                        0
                    } else {
                        1
                    }
                }
                _ => return Err(invalid()),
            },
        };

        Ok(StackEffect { pops, pushes })
    }
}

/// Lower one instruction against the current state of the evaluation stack
///
/// This is the only place registers get assigned: both lowering strategies funnel every
/// instruction through here and differ only in the stack they pass in.
pub fn lower_instruction<'a>(
    stack: &mut EvaluationStack,
    instruction: &'a Instruction,
    method: &MethodSig,
) -> Result<LinearIrInstruction<'a>, Error> {
    let effect = StackEffect::of(instruction, method)?;
    let inputs = match effect.pops {
        Pops::All => {
            stack.clear();
            vec![]
        }
        Pops::Count(count) => stack.pop(count).ok_or(Error::UnbalancedStack {
            offset: instruction.offset(),
            opcode: instruction.name(),
            depth: stack.depth(),
            required: count,
        })?,
    };
    let outputs = stack.push(effect.pushes);
    Ok(LinearIrInstruction::new(instruction, inputs, outputs))
}
