use crate::cfg;
use crate::util::Offset;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The method body can't be partitioned into basic blocks
    MalformedBytecode(cfg::Error),

    /// An instruction pops more values than the stack holds
    UnbalancedStack {
        offset: Offset,
        opcode: &'static str,
        depth: usize,
        required: usize,
    },

    /// The stack effect of an instruction can't be determined
    ///
    /// Either the opcode has a variable effect it shouldn't have, or a call is missing its
    /// resolved target.
    InvalidStackEffect { offset: Offset, opcode: &'static str },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedBytecode(err) => write!(f, "malformed bytecode: {}", err),
            Error::UnbalancedStack {
                offset,
                opcode,
                depth,
                required,
            } => write!(
                f,
                "unbalanced stack: {} at {} pops {} value(s) but the stack holds {}",
                opcode, offset, required, depth
            ),
            Error::InvalidStackEffect { offset, opcode } => {
                write!(f, "invalid stack effect for {} at {}", opcode, offset)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedBytecode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<cfg::Error> for Error {
    fn from(err: cfg::Error) -> Error {
        Error::MalformedBytecode(err)
    }
}
