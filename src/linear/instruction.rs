use super::Register;
use crate::cil::{FlowKind, Instruction};
use crate::util::Offset;
use std::fmt;

/// Register-based counterpart of one CIL instruction
///
/// The opcode (and operand) stay those of the source instruction: only the implicit stack
/// operands are made explicit as registers.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearIrInstruction<'a> {
    source: &'a Instruction,
    inputs: Vec<Register>,
    outputs: Vec<Register>,
}

impl<'a> LinearIrInstruction<'a> {
    pub fn new(
        source: &'a Instruction,
        inputs: Vec<Register>,
        outputs: Vec<Register>,
    ) -> LinearIrInstruction<'a> {
        LinearIrInstruction {
            source,
            inputs,
            outputs,
        }
    }

    /// Stack-based instruction this was lowered from
    pub fn source(&self) -> &'a Instruction {
        self.source
    }

    /// Registers read, from the deepest stack slot to the top
    pub fn inputs(&self) -> &[Register] {
        &self.inputs
    }

    /// Registers written, from the deepest stack slot to the top
    pub fn outputs(&self) -> &[Register] {
        &self.outputs
    }

    pub fn label(&self) -> Offset {
        self.source.offset()
    }

    pub fn opcode_name(&self) -> &'static str {
        self.source.name()
    }

    /// Static targets, if this instruction transfers control to any
    pub fn targets(&self) -> &'a [Offset] {
        match self.source.flow_kind() {
            FlowKind::Branch | FlowKind::ConditionalBranch | FlowKind::Switch => {
                self.source.branch_targets()
            }
            _ => &[],
        }
    }
}

/// `<label>: <outputs> <- <opcode> <inputs> | target(s): <labels>`
impl<'a> fmt::Display for LinearIrInstruction<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.label())?;
        if !self.outputs.is_empty() {
            for output in &self.outputs {
                write!(f, "{} ", output)?;
            }
            f.write_str("<- ")?;
        }
        f.write_str(self.opcode_name())?;
        for input in &self.inputs {
            write!(f, " {}", input)?;
        }

        let targets = self.targets();
        if !targets.is_empty() {
            f.write_str(if targets.len() == 1 {
                " | target:"
            } else {
                " | targets:"
            })?;
            for target in targets {
                write!(f, " {}", target)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::{OpCode, Operand};

    fn render(name: &str, operand: Operand, inputs: &[usize], outputs: &[usize]) -> String {
        let source = Instruction::new(Offset(0x1F), OpCode::from_name(name).unwrap(), operand);
        let registers =
            |raw: &[usize]| -> Vec<Register> { raw.iter().copied().map(Register).collect() };
        LinearIrInstruction::new(&source, registers(inputs), registers(outputs)).to_string()
    }

    #[test]
    fn rendering() {
        assert_eq!(render("ldarg.0", Operand::None, &[], &[0]), "IL_001F: v0 <- ldarg.0");
        assert_eq!(
            render("add", Operand::None, &[0, 1], &[0]),
            "IL_001F: v0 <- add v0 v1"
        );
        assert_eq!(
            render("dup", Operand::None, &[2], &[2, 3]),
            "IL_001F: v2 v3 <- dup v2"
        );
        assert_eq!(render("stloc.0", Operand::None, &[0], &[]), "IL_001F: stloc.0 v0");
        assert_eq!(render("ret", Operand::None, &[], &[]), "IL_001F: ret");
        assert_eq!(
            render("ble.s", Operand::Target(Offset(0x2A)), &[0, 1], &[]),
            "IL_001F: ble.s v0 v1 | target: IL_002A"
        );
        assert_eq!(
            render("leave", Operand::Target(Offset(0x40)), &[], &[]),
            "IL_001F: leave | target: IL_0040"
        );
        assert_eq!(
            render(
                "switch",
                Operand::Targets(vec![Offset(0x30), Offset(0x32)]),
                &[0],
                &[]
            ),
            "IL_001F: switch v0 | targets: IL_0030 IL_0032"
        );
        assert_eq!(
            render("ldc.i4.s", Operand::Int(7), &[], &[4]),
            "IL_001F: v4 <- ldc.i4.s"
        );
    }
}
