use std::fmt;

#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    JsonError(serde_json::Error),

    /// Token that isn't a hexadecimal (or decimal) 32-bit number
    InvalidToken(String),

    Lookup(LookupError),
}

/// Requested type or method does not exist in the module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    Type(String),
    Method {
        type_name: String,
        method_name: String,
    },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Type(type_name) => write!(f, "Could not find type '{}'", type_name),
            LookupError::Method {
                type_name,
                method_name,
            } => write!(
                f,
                "Could not find method '{}' in type '{}'",
                method_name, type_name
            ),
        }
    }
}

impl std::error::Error for LookupError {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "{}", err),
            Error::JsonError(err) => write!(f, "invalid module description: {}", err),
            Error::InvalidToken(token) => write!(f, "invalid metadata token '{}'", token),
            Error::Lookup(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            Error::JsonError(err) => Some(err),
            Error::Lookup(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::JsonError(err)
    }
}

impl From<LookupError> for Error {
    fn from(err: LookupError) -> Error {
        Error::Lookup(err)
    }
}
