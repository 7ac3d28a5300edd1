use std::fmt;

/// Printing configuration for the linear IR and CFG dumps
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IrPrintingPolicy {
    /// Spaces per indentation level (entering a type or a method body)
    pub tab_width: usize,

    /// Color labels, opcodes, registers, and branch targets
    pub color_enabled: bool,
}

impl Default for IrPrintingPolicy {
    fn default() -> IrPrintingPolicy {
        IrPrintingPolicy {
            tab_width: 2,
            color_enabled: false,
        }
    }
}

impl IrPrintingPolicy {
    /// Indentation at the outermost level
    pub fn indent(&self) -> Indent {
        Indent {
            level: 0,
            width: self.tab_width,
        }
    }
}

/// Current indentation, passed down explicitly to every nested printer
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Indent {
    level: usize,
    width: usize,
}

impl Indent {
    /// Indentation one level further in
    pub fn deeper(self) -> Indent {
        Indent {
            level: self.level + 1,
            ..self
        }
    }
}

impl fmt::Display for Indent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:1$}", "", self.level * self.width)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn indentation() {
        let policy = IrPrintingPolicy::default();
        let top = policy.indent();
        assert_eq!(top.to_string(), "");
        assert_eq!(top.deeper().to_string(), "  ");
        assert_eq!(top.deeper().deeper().to_string(), "    ");

        let wide = IrPrintingPolicy {
            tab_width: 4,
            ..policy
        };
        assert_eq!(wide.indent().deeper().to_string(), "    ");
    }
}
