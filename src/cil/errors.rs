use super::{OperandType, Token};
use crate::util::Offset;
use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// IL text that isn't a sequence of hexadecimal byte pairs
    InvalidHex,

    /// Byte (or `0xFE`-prefixed pair) that is not a known opcode
    UnknownOpcode { offset: Offset, value: u16 },

    /// Method body ends in the middle of an instruction
    UnexpectedEnd { offset: Offset },

    /// Branch displacement lands before the start of the method
    BranchOutOfRange { offset: Offset },

    /// Method token that the module does not know about
    UnresolvedToken { offset: Offset, token: Token },

    IoError(std::io::Error),

    /// Assembler was handed a mnemonic that is not in the opcode table
    UnknownMnemonic(String),

    /// Assembler operand does not fit the opcode's operand type
    OperandMismatch {
        mnemonic: &'static str,
        operand_type: OperandType,
    },

    /// Immediate does not fit in the opcode's encoding (eg. `ldarg.s 300`)
    OperandOutOfRange { mnemonic: &'static str, value: i64 },

    UndefinedLabel(String),
    DuplicateLabel(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidHex => f.write_str("IL bytes are not hexadecimal byte pairs"),
            Error::UnknownOpcode { offset, value } => {
                write!(f, "unknown opcode 0x{:02X} at {}", value, offset)
            }
            Error::UnexpectedEnd { offset } => {
                write!(f, "method body ends inside the instruction at {}", offset)
            }
            Error::BranchOutOfRange { offset } => {
                write!(f, "branch at {} jumps before the start of the method", offset)
            }
            Error::UnresolvedToken { offset, token } => {
                write!(f, "cannot resolve method token {} at {}", token, offset)
            }
            Error::IoError(err) => write!(f, "{}", err),
            Error::UnknownMnemonic(mnemonic) => write!(f, "unknown mnemonic '{}'", mnemonic),
            Error::OperandMismatch {
                mnemonic,
                operand_type,
            } => write!(f, "'{}' expects an {:?} operand", mnemonic, operand_type),
            Error::OperandOutOfRange { mnemonic, value } => {
                write!(f, "operand {} does not fit '{}'", value, mnemonic)
            }
            Error::UndefinedLabel(label) => write!(f, "label '{}' is never placed", label),
            Error::DuplicateLabel(label) => write!(f, "label '{}' is placed twice", label),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}
