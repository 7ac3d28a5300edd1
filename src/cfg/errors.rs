use crate::util::Offset;
use std::fmt;

/// Malformed method body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Method body without a single instruction
    EmptyMethod,

    /// Branch whose target is not the start of an instruction
    DanglingBranchTarget { source: Offset, target: Offset },

    /// Exception region boundary that is not the start of an instruction
    DanglingRegionBoundary { offset: Offset },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyMethod => f.write_str("method body has no instructions"),
            Error::DanglingBranchTarget { source, target } => write!(
                f,
                "branch at {} targets {}, which is not an instruction start",
                source, target
            ),
            Error::DanglingRegionBoundary { offset } => write!(
                f,
                "exception region boundary {} is not an instruction start",
                offset
            ),
        }
    }
}

impl std::error::Error for Error {}
