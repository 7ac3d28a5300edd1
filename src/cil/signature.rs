use bitflags::bitflags;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Metadata token (table index in the top byte, row in the bottom three bytes)
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, PartialOrd, Ord)]
pub struct Token(pub u32);

impl Token {
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Accepts both `0x0A000001` and plain decimal
impl FromStr for Token {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Token, ParseIntError> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).map(Token),
            None => s.parse().map(Token),
        }
    }
}

bitflags! {
    /// Calling convention byte of a method signature (ECMA-335 II.23.2.1)
    ///
    /// Only the bits that influence the evaluation stack are named here; the low nibble is the
    /// calling kind (`DEFAULT`, `VARARG`, ...).
    pub struct CallingConvention: u8 {
        const DEFAULT = 0x00;
        const VARARG = 0x05;
        const HAS_THIS = 0x20;
        const EXPLICIT_THIS = 0x40;
    }
}

/// Stack-relevant part of a method signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodSig {
    pub calling_convention: CallingConvention,

    /// Fully qualified return type (`System.Void` for methods returning nothing)
    pub return_type: String,

    /// Fully qualified parameter types, not including any `this`
    pub parameters: Vec<String>,
}

impl MethodSig {
    pub const VOID: &'static str = "System.Void";

    pub fn returns_void(&self) -> bool {
        self.return_type == MethodSig::VOID
    }

    /// Does a call site have to push `this` in addition to the declared parameters?
    pub fn has_implicit_this(&self) -> bool {
        self.calling_convention.contains(CallingConvention::HAS_THIS)
            && !self.calling_convention.contains(CallingConvention::EXPLICIT_THIS)
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }
}

/// Method reference resolved from a call instruction's token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodRef {
    pub token: Token,

    /// Display name, eg. `System.Void System.Console::WriteLine(System.String)`
    pub full_name: String,

    pub signature: MethodSig,
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn token_parsing() {
        assert_eq!("0x0A000001".parse::<Token>().unwrap(), Token(0x0A00_0001));
        assert_eq!("100663297".parse::<Token>().unwrap(), Token(0x0600_0001));
        assert!("0xZZ".parse::<Token>().is_err());

        let token = Token(0x0A00_0012);
        assert_eq!(token.table(), 0x0A);
        assert_eq!(token.row(), 0x12);
        assert_eq!(token.to_string(), "0x0A000012");
    }

    #[test]
    fn implicit_this() {
        let mut sig = MethodSig {
            calling_convention: CallingConvention::HAS_THIS,
            return_type: String::from("System.Int32"),
            parameters: vec![String::from("System.Int32")],
        };
        assert!(sig.has_implicit_this());
        assert!(!sig.returns_void());

        sig.calling_convention |= CallingConvention::EXPLICIT_THIS;
        assert!(!sig.has_implicit_this());

        sig.calling_convention = CallingConvention::DEFAULT;
        assert!(!sig.has_implicit_this());
    }
}
