use crate::module::LookupError;
use crate::{cfg, cil, linear};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    Lookup(LookupError),

    /// IL bytes of a method could not be decoded
    Decode(cil::Error),

    Cfg(cfg::Error),
    Lowering(linear::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "{}", err),
            Error::Lookup(err) => write!(f, "{}", err),
            Error::Decode(err) => write!(f, "cannot decode method body: {}", err),
            Error::Cfg(err) => write!(f, "{}", err),
            Error::Lowering(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<LookupError> for Error {
    fn from(err: LookupError) -> Error {
        Error::Lookup(err)
    }
}

impl From<cil::Error> for Error {
    fn from(err: cil::Error) -> Error {
        Error::Decode(err)
    }
}

impl From<cfg::Error> for Error {
    fn from(err: cfg::Error) -> Error {
        Error::Cfg(err)
    }
}

impl From<linear::Error> for Error {
    fn from(err: linear::Error) -> Error {
        Error::Lowering(err)
    }
}
