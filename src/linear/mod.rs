//! Register-based linear IR
//!
//! CIL is a stack machine: instructions implicitly pop their operands off an evaluation stack
//! and push their results back on. The linear IR makes those operands explicit by naming each
//! stack slot with a virtual [`Register`] whose index is the slot's depth. So
//!
//! ```text
//! ldarg.0          IL_0000: v0 <- ldarg.0
//! ldarg.1    =>    IL_0001: v1 <- ldarg.1
//! add              IL_0002: v0 <- add v0 v1
//! ret              IL_0003: ret v0
//! ```
//!
//! Assigning registers only requires knowing the stack depth before every instruction. There
//! are two ways of getting at it (see [`LoweringStrategy`]):
//!
//!   - [`lower_linear`] makes a single pass in program order
//!   - [`lower_cfg`] walks the [control flow graph](crate::cfg) depth first
//!
//! Both go through the same per-instruction step, [`lower_instruction`].

mod cfg_traversal;
mod effect;
mod errors;
mod forward_pass;
mod instruction;
mod stack;

pub use cfg_traversal::*;
pub use effect::*;
pub use errors::*;
pub use forward_pass::*;
pub use instruction::*;
pub use stack::*;

use crate::cfg::CilControlFlowGraph;
use crate::cil::{ExceptionRegion, Instruction, MethodSig};
use std::fmt;
use std::str::FromStr;

/// Lowered method body
#[derive(Clone, Debug)]
pub struct LinearIr<'a> {
    pub instructions: Vec<LinearIrInstruction<'a>>,

    /// Number of distinct registers used (the maximum stack depth reached)
    pub max_register_count: usize,
}

/// How stack depths get computed while lowering
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum LoweringStrategy {
    /// Single pass in program order
    #[default]
    SingleForwardPass,

    /// Depth-first traversal of the control flow graph
    CfgTraversal,
}

impl fmt::Display for LoweringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoweringStrategy::SingleForwardPass => "single-forward-pass",
            LoweringStrategy::CfgTraversal => "cfg-traversal",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

impl fmt::Display for UnknownStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown lowering algorithm '{}' (expected 'forwardpass' or 'cfgtraverse')",
            self.0
        )
    }
}

impl std::error::Error for UnknownStrategy {}

impl FromStr for LoweringStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<LoweringStrategy, UnknownStrategy> {
        match s {
            "forwardpass" | "single-forward-pass" => Ok(LoweringStrategy::SingleForwardPass),
            "cfgtraverse" | "cfg-traversal" => Ok(LoweringStrategy::CfgTraversal),
            other => Err(UnknownStrategy(other.to_owned())),
        }
    }
}

/// A method body prepared for one of the lowering strategies
///
/// Each variant only holds what its strategy needs: the forward pass works straight off the
/// instructions, while the traversal needs the control flow graph built up front.
pub enum Lowering<'a> {
    ForwardPass {
        instructions: &'a [Instruction],
        regions: &'a [ExceptionRegion],
    },
    CfgTraversal {
        cfg: CilControlFlowGraph<'a>,
    },
}

impl<'a> Lowering<'a> {
    pub fn prepare(
        strategy: LoweringStrategy,
        instructions: &'a [Instruction],
        regions: &'a [ExceptionRegion],
    ) -> Result<Lowering<'a>, Error> {
        Ok(match strategy {
            LoweringStrategy::SingleForwardPass => Lowering::ForwardPass {
                instructions,
                regions,
            },
            LoweringStrategy::CfgTraversal => Lowering::CfgTraversal {
                cfg: CilControlFlowGraph::build(instructions, regions)?,
            },
        })
    }

    /// Lower the body of a method with the given signature
    pub fn lower(&self, method: &MethodSig) -> Result<LinearIr<'a>, Error> {
        match self {
            Lowering::ForwardPass {
                instructions,
                regions,
            } => lower_linear(*instructions, *regions, method),
            Lowering::CfgTraversal { cfg } => lower_cfg(cfg, method),
        }
    }
}

/// Lower a method body with the given strategy
pub fn lower<'a>(
    strategy: LoweringStrategy,
    instructions: &'a [Instruction],
    regions: &'a [ExceptionRegion],
    method: &MethodSig,
) -> Result<LinearIr<'a>, Error> {
    Lowering::prepare(strategy, instructions, regions)?.lower(method)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cfg;
    use crate::cil::{Assembler, CallingConvention, HandlerKind};
    use crate::util::Offset;

    const STRATEGIES: [LoweringStrategy; 2] = [
        LoweringStrategy::SingleForwardPass,
        LoweringStrategy::CfgTraversal,
    ];

    fn returning(ret: &str) -> MethodSig {
        MethodSig {
            calling_convention: CallingConvention::DEFAULT,
            return_type: ret.to_owned(),
            parameters: vec![String::from("System.Int32")],
        }
    }

    fn assemble(
        build: impl FnOnce(&mut Assembler) -> Result<(), crate::cil::Error>,
    ) -> Vec<Instruction> {
        let mut asm = Assembler::new();
        build(&mut asm).unwrap();
        asm.finish().unwrap()
    }

    fn rendered(ir: &LinearIr<'_>) -> Vec<String> {
        ir.instructions.iter().map(ToString::to_string).collect()
    }

    /// `x > 0 ? x - 1 : x * x + 1`, with the value left on the stack across the join
    fn ternary() -> Vec<Instruction> {
        assemble(|asm| {
            asm.op("ldarg.0")?
                .branch("brfalse.s", "zero")?
                .op("ldarg.0")?
                .op("ldc.i4.1")?
                .op("sub")?
                .branch("br.s", "join")?
                .label("zero")?
                .op("ldarg.0")?
                .op("ldarg.0")?
                .op("mul")?
                .op("ldc.i4.1")?
                .op("add")?
                .label("join")?
                .op("ret")?;
            Ok(())
        })
    }

    #[test]
    fn strategy_names() {
        assert_eq!("forwardpass".parse(), Ok(LoweringStrategy::SingleForwardPass));
        assert_eq!("cfg-traversal".parse(), Ok(LoweringStrategy::CfgTraversal));
        assert_eq!(
            "cfgtraverse".parse::<LoweringStrategy>().unwrap().to_string(),
            "cfg-traversal"
        );
        assert!("depthfirst".parse::<LoweringStrategy>().is_err());
        assert_eq!(LoweringStrategy::default(), LoweringStrategy::SingleForwardPass);
    }

    #[test]
    fn ternary_lowering_agrees() {
        let instructions = ternary();
        let expected = vec![
            "IL_0000: v0 <- ldarg.0",
            "IL_0001: brfalse.s v0 | target: IL_0008",
            "IL_0003: v0 <- ldarg.0",
            "IL_0004: v1 <- ldc.i4.1",
            "IL_0005: v0 <- sub v0 v1",
            "IL_0006: br.s | target: IL_000D",
            "IL_0008: v0 <- ldarg.0",
            "IL_0009: v1 <- ldarg.0",
            "IL_000A: v0 <- mul v0 v1",
            "IL_000B: v1 <- ldc.i4.1",
            "IL_000C: v0 <- add v0 v1",
            "IL_000D: ret v0",
        ];
        for strategy in STRATEGIES {
            let ir = lower(strategy, &instructions, &[], &returning("System.Int32")).unwrap();
            assert_eq!(rendered(&ir), expected, "{}", strategy);
            assert_eq!(ir.max_register_count, 2);
        }
    }

    #[test]
    fn forward_pass_reuses_recorded_depth_after_unconditional_branch() {
        // The join block is only reachable by branches, and the value reaching it sits in `v0`
        let instructions = ternary();
        let ir = lower_linear(&instructions, &[], &returning("System.Int32")).unwrap();
        let ret = ir.instructions.last().unwrap();
        assert_eq!(ret.inputs(), &[Register(0)]);
        for (lowered, source) in ir.instructions.iter().zip(&instructions) {
            assert!(std::ptr::eq(lowered.source(), source));
        }
    }

    #[test]
    fn catch_handlers_start_with_the_exception_on_the_stack() {
        let instructions = assemble(|asm| {
            asm.op("ldarg.0")?
                .op("stloc.0")?
                .branch("leave.s", "end")?
                .label("handler")?
                .op("stloc.1")?
                .op("ldc.i4.m1")?
                .op("stloc.0")?
                .branch("leave.s", "end")?
                .label("end")?
                .op("ldloc.0")?
                .op("ret")?;
            Ok(())
        });
        let regions = [ExceptionRegion {
            kind: HandlerKind::Catch,
            try_start: Offset(0),
            try_end: Offset(4),
            handler_start: Offset(4),
            handler_end: Offset(9),
            filter_start: None,
            catch_type: Some(String::from("System.Exception")),
        }];

        for strategy in STRATEGIES {
            let ir = lower(strategy, &instructions, &regions, &returning("System.Int32")).unwrap();
            let lines = rendered(&ir);
            assert_eq!(lines[3], "IL_0004: stloc.1 v0", "{}", strategy);
            assert_eq!(lines[6], "IL_0007: leave.s | target: IL_0009", "{}", strategy);
            assert_eq!(lines[8], "IL_000A: ret v0", "{}", strategy);
        }

        // Without the region, the forward pass sees an empty stack at the handler
        assert!(matches!(
            lower_linear(&instructions, &[], &returning("System.Int32")),
            Err(Error::UnbalancedStack { offset: Offset(4), .. })
        ));
    }

    #[test]
    fn unreachable_blocks_are_still_lowered() {
        let instructions = assemble(|asm| {
            asm.op("ret")?.op("ldc.i4.0")?.op("pop")?.op("ret")?;
            Ok(())
        });
        let ir = lower_cfg(
            &CilControlFlowGraph::build(&instructions, &[]).unwrap(),
            &returning("System.Void"),
        )
        .unwrap();
        assert_eq!(
            rendered(&ir),
            vec![
                "IL_0000: ret",
                "IL_0001: v0 <- ldc.i4.0",
                "IL_0002: pop v0",
                "IL_0003: ret",
            ]
        );
    }

    #[test]
    fn malformed_bodies() {
        for strategy in STRATEGIES {
            assert_eq!(
                lower(strategy, &[], &[], &returning("System.Void")).unwrap_err(),
                Error::MalformedBytecode(cfg::Error::EmptyMethod)
            );
        }

        // Region ending inside `ldc.i4.s`
        let instructions = assemble(|asm| {
            asm.op_int("ldc.i4.s", 5)?.op("pop")?.op("ret")?;
            Ok(())
        });
        let regions = [ExceptionRegion {
            kind: HandlerKind::Finally,
            try_start: Offset(0),
            try_end: Offset(1),
            handler_start: Offset(3),
            handler_end: Offset(4),
            filter_start: None,
            catch_type: None,
        }];
        for strategy in STRATEGIES {
            assert_eq!(
                lower(strategy, &instructions, &regions, &returning("System.Void")).unwrap_err(),
                Error::MalformedBytecode(cfg::Error::DanglingRegionBoundary { offset: Offset(1) }),
                "{}",
                strategy
            );
        }

        let instructions = assemble(|asm| {
            asm.op("pop")?.op("ret")?;
            Ok(())
        });
        for strategy in STRATEGIES {
            assert_eq!(
                lower(strategy, &instructions, &[], &returning("System.Void")).unwrap_err(),
                Error::UnbalancedStack {
                    offset: Offset(0),
                    opcode: "pop",
                    depth: 0,
                    required: 1,
                }
            );
        }
    }
}
