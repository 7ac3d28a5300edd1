use std::fmt;
use std::ops::Sub;

/// Elements with an encoded width in bytes (eg. instructions inside a method body)
pub trait Width {
    fn width(&self) -> usize;
}

/// Byte offset into a method body
///
/// Offsets double as the labels under which instructions are printed: the instruction at offset
/// `31` is `IL_001F`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Offset(pub usize);

impl Offset {
    /// Offset reached after skipping over something of the given width
    pub fn after<W: Width + ?Sized>(self, elem: &W) -> Offset {
        Offset(self.0 + elem.width())
    }

    /// Apply a signed displacement (as found in branch operands)
    pub fn displace(self, delta: i64) -> Option<Offset> {
        let target = self.0 as i64 + delta;
        usize::try_from(target).ok().map(Offset)
    }
}

impl Sub for Offset {
    type Output = isize;

    fn sub(self, other: Offset) -> isize {
        (self.0 as isize) - (other.0 as isize)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn labels_are_zero_padded_uppercase_hex() {
        assert_eq!(Offset(0).to_string(), "IL_0000");
        assert_eq!(Offset(31).to_string(), "IL_001F");
        assert_eq!(Offset(0x1_2345).to_string(), "IL_12345");
    }

    #[test]
    fn displacement_cannot_go_before_start() {
        assert_eq!(Offset(10).displace(-4), Some(Offset(6)));
        assert_eq!(Offset(10).displace(-11), None);
        assert_eq!(Offset(4) - Offset(10), -6);
    }
}
