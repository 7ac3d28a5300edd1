use super::{Error, Instruction, MethodRef, OpCode, Operand, OperandType, Token};
use crate::util::{Offset, Width};
use std::collections::HashMap;
use std::sync::Arc;

/// Operand that may still refer to labels which haven't been placed yet
enum PendingOperand {
    Resolved(Operand),
    Label(String),
    Labels(Vec<String>),
}

struct PendingInstruction {
    offset: Offset,
    opcode: &'static OpCode,
    operand: PendingOperand,
}

/// Builder for method bodies written by hand
///
/// Instructions are appended one at a time by mnemonic. Branches refer to string labels, which
/// can be placed before or after the branch. Offsets are assigned as instructions are emitted
/// (the width of an instruction never depends on where its targets end up), so labels only
/// need to be patched in when the body is finished.
///
/// ```
/// # use cil2lir::cil::Assembler;
/// let mut asm = Assembler::new();
/// asm.op("ldarg.0")?
///     .branch("brfalse.s", "zero")?
///     .op("ldc.i4.1")?
///     .op("ret")?
///     .label("zero")?
///     .op("ldc.i4.0")?
///     .op("ret")?;
/// let instructions = asm.finish()?;
/// assert_eq!(instructions.len(), 6);
/// # Ok::<(), cil2lir::cil::Error>(())
/// ```
pub struct Assembler {
    instructions: Vec<PendingInstruction>,
    labels: HashMap<String, Offset>,
    next_offset: Offset,
}

impl Default for Assembler {
    fn default() -> Assembler {
        Assembler::new()
    }
}

impl Assembler {
    pub fn new() -> Assembler {
        Assembler {
            instructions: vec![],
            labels: HashMap::new(),
            next_offset: Offset(0),
        }
    }

    /// Offset at which the next instruction will be placed
    pub fn current_offset(&self) -> Offset {
        self.next_offset
    }

    /// Place a label at the current offset
    pub fn label(&mut self, name: &str) -> Result<&mut Self, Error> {
        if self.labels.insert(name.to_owned(), self.next_offset).is_some() {
            return Err(Error::DuplicateLabel(name.to_owned()));
        }
        Ok(self)
    }

    /// Instruction without an inline operand
    pub fn op(&mut self, mnemonic: &str) -> Result<&mut Self, Error> {
        let opcode = Assembler::lookup(mnemonic, |typ| typ == OperandType::InlineNone)?;
        self.emit(opcode, PendingOperand::Resolved(Operand::None), 0)
    }

    /// Instruction with an integer immediate, a local index, or an argument index
    pub fn op_int(&mut self, mnemonic: &str, value: i64) -> Result<&mut Self, Error> {
        let opcode = Assembler::lookup(mnemonic, |typ| {
            matches!(
                typ,
                OperandType::ShortInlineI
                    | OperandType::InlineI
                    | OperandType::InlineI8
                    | OperandType::ShortInlineVar
                    | OperandType::ShortInlineArg
                    | OperandType::InlineVar
                    | OperandType::InlineArg
            )
        })?;
        let out_of_range = || Error::OperandOutOfRange {
            mnemonic: opcode.name,
            value,
        };

        let operand = match opcode.operand_type {
            OperandType::ShortInlineI if opcode.name == "ldc.i4.s" => {
                Operand::Int(i8::try_from(value).map_err(|_| out_of_range())? as i32)
            }
            OperandType::ShortInlineI => {
                Operand::Int(u8::try_from(value).map_err(|_| out_of_range())? as i32)
            }
            OperandType::InlineI => Operand::Int(i32::try_from(value).map_err(|_| out_of_range())?),
            OperandType::InlineI8 => Operand::Long(value),
            OperandType::ShortInlineVar | OperandType::ShortInlineArg => {
                Operand::Variable(u8::try_from(value).map_err(|_| out_of_range())? as u16)
            }
            _ => Operand::Variable(u16::try_from(value).map_err(|_| out_of_range())?),
        };
        self.emit(opcode, PendingOperand::Resolved(operand), 0)
    }

    /// `ldc.r4` or `ldc.r8`
    pub fn op_real(&mut self, mnemonic: &str, value: f64) -> Result<&mut Self, Error> {
        let opcode = Assembler::lookup(mnemonic, |typ| {
            matches!(typ, OperandType::ShortInlineR | OperandType::InlineR)
        })?;
        let operand = if opcode.operand_type == OperandType::ShortInlineR {
            Operand::Float(value as f32)
        } else {
            Operand::Double(value)
        };
        self.emit(opcode, PendingOperand::Resolved(operand), 0)
    }

    /// Instruction with an unresolved metadata token
    pub fn op_token(&mut self, mnemonic: &str, token: Token) -> Result<&mut Self, Error> {
        let opcode = Assembler::lookup(mnemonic, |typ| typ.is_token())?;
        self.emit(opcode, PendingOperand::Resolved(Operand::Token(token)), 0)
    }

    /// Call-like instruction with its resolved target (or `calli` with its signature)
    pub fn op_method(
        &mut self,
        mnemonic: &str,
        method: Arc<MethodRef>,
    ) -> Result<&mut Self, Error> {
        let opcode = Assembler::lookup(mnemonic, |typ| {
            matches!(typ, OperandType::InlineMethod | OperandType::InlineSig)
        })?;
        self.emit(opcode, PendingOperand::Resolved(Operand::Method(method)), 0)
    }

    /// Branch (short or long form) to a label
    pub fn branch(&mut self, mnemonic: &str, label: &str) -> Result<&mut Self, Error> {
        let opcode = Assembler::lookup(mnemonic, |typ| {
            matches!(
                typ,
                OperandType::ShortInlineBrTarget | OperandType::InlineBrTarget
            )
        })?;
        self.emit(opcode, PendingOperand::Label(label.to_owned()), 0)
    }

    /// `switch` over the given labels
    pub fn switch(&mut self, labels: &[&str]) -> Result<&mut Self, Error> {
        let opcode = Assembler::lookup("switch", |typ| typ == OperandType::InlineSwitch)?;
        let labels: Vec<String> = labels.iter().map(|label| label.to_string()).collect();
        let table_width = 4 + 4 * labels.len();
        self.emit(opcode, PendingOperand::Labels(labels), table_width)
    }

    /// Resolve all labels and produce the instruction list
    pub fn finish(self) -> Result<Vec<Instruction>, Error> {
        let labels = self.labels;
        let resolve = |label: &String| {
            labels
                .get(label)
                .copied()
                .ok_or_else(|| Error::UndefinedLabel(label.clone()))
        };

        self.instructions
            .into_iter()
            .map(|pending| {
                let operand = match pending.operand {
                    PendingOperand::Resolved(operand) => operand,
                    PendingOperand::Label(label) => Operand::Target(resolve(&label)?),
                    PendingOperand::Labels(names) => Operand::Targets(
                        names.iter().map(resolve).collect::<Result<Vec<_>, _>>()?,
                    ),
                };
                Ok(Instruction::new(pending.offset, pending.opcode, operand))
            })
            .collect()
    }

    fn lookup(
        mnemonic: &str,
        accepts: impl Fn(OperandType) -> bool,
    ) -> Result<&'static OpCode, Error> {
        let opcode =
            OpCode::from_name(mnemonic).ok_or_else(|| Error::UnknownMnemonic(mnemonic.to_owned()))?;
        if accepts(opcode.operand_type) {
            Ok(opcode)
        } else {
            Err(Error::OperandMismatch {
                mnemonic: opcode.name,
                operand_type: opcode.operand_type,
            })
        }
    }

    fn emit(
        &mut self,
        opcode: &'static OpCode,
        operand: PendingOperand,
        switch_table_width: usize,
    ) -> Result<&mut Self, Error> {
        let offset = self.next_offset;
        let operand_width = opcode.operand_type.fixed_width().unwrap_or(switch_table_width);
        self.next_offset = Offset(offset.0 + opcode.width() + operand_width);
        self.instructions.push(PendingInstruction {
            offset,
            opcode,
            operand,
        });
        Ok(self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::{decode_body, parse_hex, NoTokens};

    #[test]
    fn forward_and_backward_labels() {
        let mut asm = Assembler::new();
        asm.op("ldc.i4.0")
            .unwrap()
            .op("stloc.0")
            .unwrap()
            .branch("br.s", "cond")
            .unwrap()
            .label("body")
            .unwrap()
            .op("ldloc.0")
            .unwrap()
            .op("ldarg.1")
            .unwrap()
            .op("add")
            .unwrap()
            .op("stloc.0")
            .unwrap()
            .label("cond")
            .unwrap()
            .op("ldarg.1")
            .unwrap()
            .op("dup")
            .unwrap()
            .op("ldc.i4.1")
            .unwrap()
            .op("sub")
            .unwrap()
            .op_int("starg.s", 1)
            .unwrap()
            .op("ldc.i4.0")
            .unwrap()
            .branch("bgt.s", "body")
            .unwrap()
            .op("ldloc.0")
            .unwrap()
            .op("ret")
            .unwrap();
        let instructions = asm.finish().unwrap();

        let expected = parse_hex("16 0A 2B 04 06 03 58 0A 03 25 17 59 10 01 16 30 F3 06 2A").unwrap();
        assert_eq!(asm_width(&instructions), expected.len());
        assert_eq!(decode_body(&expected, &NoTokens).unwrap(), instructions);
    }

    fn asm_width(instructions: &[Instruction]) -> usize {
        instructions.iter().map(Width::width).sum()
    }

    #[test]
    fn switch_offsets() {
        let mut asm = Assembler::new();
        asm.op("ldarg.0").unwrap();
        asm.switch(&["a", "b"]).unwrap();
        assert_eq!(asm.current_offset(), Offset(14));
        asm.label("a").unwrap().op("ret").unwrap();
        asm.label("b").unwrap().op("ret").unwrap();
        let instructions = asm.finish().unwrap();
        assert_eq!(instructions[1].branch_targets(), &[Offset(14), Offset(15)]);
        assert_eq!(instructions[1].width(), 13);
    }

    #[test]
    fn assembler_errors() {
        let mut asm = Assembler::new();
        assert!(matches!(asm.op("frobnicate"), Err(Error::UnknownMnemonic(_))));
        assert!(matches!(
            asm.op("br.s"),
            Err(Error::OperandMismatch { mnemonic: "br.s", .. })
        ));
        assert!(matches!(
            asm.op_int("ldc.i4.s", 200),
            Err(Error::OperandOutOfRange { value: 200, .. })
        ));
        asm.label("x").unwrap();
        assert!(matches!(asm.label("x"), Err(Error::DuplicateLabel(_))));

        asm.branch("br", "nowhere").unwrap();
        assert!(matches!(asm.finish(), Err(Error::UndefinedLabel(label)) if label == "nowhere"));
    }
}
