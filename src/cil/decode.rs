use super::{Error, Instruction, MethodRef, OpCode, Operand, OperandType, StackPop, Token};
use super::opcodes::TWO_BYTE_PREFIX;
use crate::util::Offset;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;
use std::sync::Arc;

/// Source of method references for call instructions
///
/// Decoding only needs to know what a token points to when the instruction's stack effect
/// depends on it. For `calli`, the token is a stand-alone signature rather than a method, but it
/// resolves the same way.
pub trait TokenResolver {
    fn resolve_method(&self, token: Token) -> Option<Arc<MethodRef>>;
}

/// Resolver that knows no tokens at all
pub struct NoTokens;

impl TokenResolver for NoTokens {
    fn resolve_method(&self, _token: Token) -> Option<Arc<MethodRef>> {
        None
    }
}

impl<F: Fn(Token) -> Option<Arc<MethodRef>>> TokenResolver for F {
    fn resolve_method(&self, token: Token) -> Option<Arc<MethodRef>> {
        self(token)
    }
}

/// Decode the IL bytes of a method body into instructions
///
/// Branch operands are turned into absolute offsets. Method tokens of instructions with a
/// variable stack effect (`call`, `calli`, `callvirt`, `newobj`) must resolve, other method
/// tokens are kept as plain tokens when the resolver does not know them.
pub fn decode_body<R: TokenResolver + ?Sized>(
    il: &[u8],
    resolver: &R,
) -> Result<Vec<Instruction>, Error> {
    let mut cursor = Cursor::new(il);
    let mut instructions = vec![];

    while (cursor.position() as usize) < il.len() {
        let offset = Offset(cursor.position() as usize);
        let truncated = |_| Error::UnexpectedEnd { offset };

        let first = cursor.read_u8().map_err(truncated)?;
        let value = if first == TWO_BYTE_PREFIX {
            0xFE00 | cursor.read_u8().map_err(truncated)? as u16
        } else {
            first as u16
        };
        let opcode = OpCode::from_value(value).ok_or(Error::UnknownOpcode { offset, value })?;

        let operand = match opcode.operand_type {
            OperandType::InlineNone => Operand::None,
            OperandType::ShortInlineI if opcode.name == "ldc.i4.s" => {
                Operand::Int(cursor.read_i8().map_err(truncated)? as i32)
            }
            OperandType::ShortInlineI => Operand::Int(cursor.read_u8().map_err(truncated)? as i32),
            OperandType::InlineI => {
                Operand::Int(cursor.read_i32::<LittleEndian>().map_err(truncated)?)
            }
            OperandType::InlineI8 => {
                Operand::Long(cursor.read_i64::<LittleEndian>().map_err(truncated)?)
            }
            OperandType::ShortInlineR => {
                Operand::Float(cursor.read_f32::<LittleEndian>().map_err(truncated)?)
            }
            OperandType::InlineR => {
                Operand::Double(cursor.read_f64::<LittleEndian>().map_err(truncated)?)
            }
            OperandType::ShortInlineVar | OperandType::ShortInlineArg => {
                Operand::Variable(cursor.read_u8().map_err(truncated)? as u16)
            }
            OperandType::InlineVar | OperandType::InlineArg => {
                Operand::Variable(cursor.read_u16::<LittleEndian>().map_err(truncated)?)
            }
            OperandType::ShortInlineBrTarget => {
                let delta = cursor.read_i8().map_err(truncated)? as i64;
                let next = cursor.position() as usize;
                Operand::Target(branch_target(offset, next, delta)?)
            }
            OperandType::InlineBrTarget => {
                let delta = cursor.read_i32::<LittleEndian>().map_err(truncated)? as i64;
                let next = cursor.position() as usize;
                Operand::Target(branch_target(offset, next, delta)?)
            }
            OperandType::InlineSwitch => {
                let count = cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;
                let remaining = il.len() - cursor.position() as usize;
                if count > remaining / 4 {
                    return Err(Error::UnexpectedEnd { offset });
                }
                let mut deltas = Vec::with_capacity(count);
                for _ in 0..count {
                    deltas.push(cursor.read_i32::<LittleEndian>().map_err(truncated)? as i64);
                }
                let next = cursor.position() as usize;
                let targets = deltas
                    .into_iter()
                    .map(|delta| branch_target(offset, next, delta))
                    .collect::<Result<Vec<_>, _>>()?;
                Operand::Targets(targets)
            }
            OperandType::InlineMethod | OperandType::InlineSig => {
                let token = Token(cursor.read_u32::<LittleEndian>().map_err(truncated)?);
                match resolver.resolve_method(token) {
                    Some(method) => Operand::Method(method),
                    None if opcode.stack_pop == StackPop::VarPop => {
                        return Err(Error::UnresolvedToken { offset, token })
                    }
                    None => Operand::Token(token),
                }
            }
            OperandType::InlineField
            | OperandType::InlineType
            | OperandType::InlineTok
            | OperandType::InlineString => {
                Operand::Token(Token(cursor.read_u32::<LittleEndian>().map_err(truncated)?))
            }
        };

        instructions.push(Instruction::new(offset, opcode, operand));
    }

    Ok(instructions)
}

/// Branch displacements are relative to the start of the next instruction
fn branch_target(offset: Offset, next: usize, delta: i64) -> Result<Offset, Error> {
    Offset(next)
        .displace(delta)
        .ok_or(Error::BranchOutOfRange { offset })
}

/// Parse IL written as hexadecimal bytes (whitespace between bytes is ignored)
pub fn parse_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|byte| !byte.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::cil::{CallingConvention, MethodSig};

    fn console_write_line() -> Arc<MethodRef> {
        Arc::new(MethodRef {
            token: Token(0x0A00_0001),
            full_name: String::from("System.Void System.Console::WriteLine(System.Int32)"),
            signature: MethodSig {
                calling_convention: CallingConvention::DEFAULT,
                return_type: String::from("System.Void"),
                parameters: vec![String::from("System.Int32")],
            },
        })
    }

    #[test]
    fn decode_straight_line() {
        let il = parse_hex("02 03 58 6A 2A").unwrap();
        let instructions = decode_body(&il, &NoTokens).unwrap();
        let names: Vec<&str> = instructions.iter().map(Instruction::name).collect();
        assert_eq!(names, vec!["ldarg.0", "ldarg.1", "add", "conv.i8", "ret"]);
        assert_eq!(instructions[4].offset(), Offset(4));
    }

    #[test]
    fn decode_branches_and_switch() {
        // ldarg.0; switch (IL_0010, IL_0012); ldc.i4.0; ret; ldc.i4.1; ret; ldc.i4.2; ret
        let il = parse_hex("02 45 02000000 02000000 04000000 16 2A 17 2A 18 2A").unwrap();
        let instructions = decode_body(&il, &NoTokens).unwrap();
        assert_eq!(
            instructions[1].branch_targets(),
            &[Offset(0x10), Offset(0x12)]
        );
        assert_eq!(instructions[2].offset(), Offset(0x0E));

        // br.s -2 loops on itself
        let il = parse_hex("2B FE").unwrap();
        let instructions = decode_body(&il, &NoTokens).unwrap();
        assert_eq!(instructions[0].branch_targets(), &[Offset(0)]);

        let il = parse_hex("2B F0").unwrap();
        assert!(matches!(
            decode_body(&il, &NoTokens),
            Err(Error::BranchOutOfRange { offset: Offset(0) })
        ));
    }

    #[test]
    fn decode_short_immediates() {
        let il = parse_hex("1F FE 0E 01 FE 01 2A").unwrap();
        let instructions = decode_body(&il, &NoTokens).unwrap();
        assert_eq!(instructions[0].operand(), &Operand::Int(-2));
        assert_eq!(instructions[1].operand(), &Operand::Variable(1));
        assert_eq!(instructions[2].name(), "ceq");
        assert_eq!(instructions[3].offset(), Offset(6));
    }

    #[test]
    fn decode_resolves_calls() {
        let resolver = |token: Token| {
            if token == Token(0x0A00_0001) {
                Some(console_write_line())
            } else {
                None
            }
        };

        let il = parse_hex("17 28 01 00 00 0A 2A").unwrap();
        let instructions = decode_body(&il, &resolver).unwrap();
        assert_eq!(
            instructions[1].method_ref().map(|method| method.token),
            Some(Token(0x0A00_0001))
        );

        let il = parse_hex("17 28 02 00 00 0A 2A").unwrap();
        assert!(matches!(
            decode_body(&il, &resolver),
            Err(Error::UnresolvedToken { token: Token(0x0A00_0002), .. })
        ));

        // `ldftn` does not need a resolved method
        let il = parse_hex("FE 06 02 00 00 0A 2A").unwrap();
        let instructions = decode_body(&il, &resolver).unwrap();
        assert_eq!(instructions[0].operand(), &Operand::Token(Token(0x0A00_0002)));
    }

    #[test]
    fn decode_errors() {
        assert!(matches!(
            decode_body(&[0x24], &NoTokens),
            Err(Error::UnknownOpcode { value: 0x24, .. })
        ));
        assert!(matches!(
            decode_body(&[0x16, 0x20, 0x01], &NoTokens),
            Err(Error::UnexpectedEnd { offset: Offset(1) })
        ));
        assert!(matches!(
            decode_body(&[0x45, 0xFF, 0xFF, 0xFF, 0xFF], &NoTokens),
            Err(Error::UnexpectedEnd { offset: Offset(0) })
        ));
        assert!(parse_hex("0").is_none());
        assert!(parse_hex("zz").is_none());
    }
}
