use super::{Error, Indent, IrPrintingPolicy};
use crate::cfg::CilControlFlowGraph;
use crate::linear::{lower, LinearIrInstruction, LoweringStrategy};
use crate::module::{MethodDef, Module, TypeDef};
use std::fmt::Display;
use std::io;
use termcolor::{Color, ColorSpec, WriteColor};

/// Prints the linear IR (or the control flow graph) of the methods of a module
pub struct LinearIrDump<'m> {
    module: &'m Module,
    policy: IrPrintingPolicy,
    strategy: LoweringStrategy,
}

impl<'m> LinearIrDump<'m> {
    pub fn new(
        module: &'m Module,
        policy: IrPrintingPolicy,
        strategy: LoweringStrategy,
    ) -> LinearIrDump<'m> {
        LinearIrDump {
            module,
            policy,
            strategy,
        }
    }

    /// Print every type of the module, each followed by a blank line
    pub fn dump_module(&self, out: &mut dyn WriteColor) -> Result<(), Error> {
        log::debug!(
            "dumping module {} using {}",
            self.module.name(),
            self.strategy
        );
        for type_def in self.module.types() {
            self.write_type(out, type_def, self.policy.indent())?;
            writeln!(out)?;
        }
        Ok(())
    }

    /// Print every method with a body in the type
    pub fn dump_type(&self, out: &mut dyn WriteColor, type_name: &str) -> Result<(), Error> {
        let type_def = self.module.find_type(type_name)?;
        self.write_type(out, type_def, self.policy.indent())
    }

    pub fn dump_method(
        &self,
        out: &mut dyn WriteColor,
        type_name: &str,
        method_name: &str,
    ) -> Result<(), Error> {
        let (_, method) = self.module.find_method(type_name, method_name)?;
        self.write_method(out, method, self.policy.indent())
    }

    /// Print the basic blocks of one method, without lowering it
    pub fn dump_cfg(
        &self,
        out: &mut dyn WriteColor,
        type_name: &str,
        method_name: &str,
    ) -> Result<(), Error> {
        let (_, method) = self.module.find_method(type_name, method_name)?;
        let instructions = self.module.decode(method)?;
        let cfg = CilControlFlowGraph::build(&instructions, method.exception_regions())?;

        let indent = self.policy.indent();
        self.write_header(out, method.full_name(), indent)?;
        let inner = indent.deeper();
        for line in cfg.to_string().lines() {
            if line.is_empty() {
                writeln!(out)?;
            } else if self.policy.color_enabled && line.starts_with("BasicBlock") {
                write!(out, "{}", inner)?;
                write_colored(out, ColorSpec::new().set_bold(true), line)?;
                writeln!(out)?;
            } else {
                writeln!(out, "{}{}", inner, line)?;
            }
        }
        writeln!(out, "{}}}", indent)?;
        Ok(())
    }

    fn write_type(
        &self,
        out: &mut dyn WriteColor,
        type_def: &TypeDef,
        indent: Indent,
    ) -> Result<(), Error> {
        self.write_header(out, &type_def.full_name(), indent)?;
        for method in type_def.methods().iter().filter(|m| m.has_body()) {
            self.write_method(out, method, indent.deeper())?;
            writeln!(out)?;
        }
        writeln!(out, "{}}}", indent)?;
        Ok(())
    }

    /// Print one method body
    ///
    /// Failures to decode or lower the body are reported in place of the instructions: only
    /// output errors propagate.
    fn write_method(
        &self,
        out: &mut dyn WriteColor,
        method: &MethodDef,
        indent: Indent,
    ) -> Result<(), Error> {
        self.write_header(out, method.full_name(), indent)?;
        if method.has_body() {
            match self.write_body(out, method, indent.deeper()) {
                Err(Error::IoError(err)) => return Err(Error::IoError(err)),
                Err(err) => {
                    log::warn!("cannot lower {}: {}", method.full_name(), err);
                    self.write_error(out, &err, indent.deeper())?;
                }
                Ok(()) => (),
            }
        }
        writeln!(out, "{}}}", indent)?;
        Ok(())
    }

    fn write_body(
        &self,
        out: &mut dyn WriteColor,
        method: &MethodDef,
        indent: Indent,
    ) -> Result<(), Error> {
        let instructions = self.module.decode(method)?;
        let ir = lower(
            self.strategy,
            &instructions,
            method.exception_regions(),
            method.signature(),
        )?;
        log::debug!(
            "lowered {} to {} instructions over {} registers",
            method.full_name(),
            ir.instructions.len(),
            ir.max_register_count
        );

        for instruction in &ir.instructions {
            write!(out, "{}", indent)?;
            if self.policy.color_enabled {
                write_instruction_colored(out, instruction)?;
            } else {
                write!(out, "{}", instruction)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn write_header(&self, out: &mut dyn WriteColor, name: &str, indent: Indent) -> io::Result<()> {
        if self.policy.color_enabled {
            write!(out, "{}", indent)?;
            write_colored(out, ColorSpec::new().set_bold(true), name)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}{}", indent, name)?;
        }
        writeln!(out, "{}{{", indent)
    }

    fn write_error(&self, out: &mut dyn WriteColor, err: &Error, indent: Indent) -> io::Result<()> {
        write!(out, "{}", indent)?;
        if self.policy.color_enabled {
            write_colored(out, ColorSpec::new().set_fg(Some(Color::Red)), "error:")?;
        } else {
            write!(out, "error:")?;
        }
        writeln!(out, " {}", err)
    }
}

fn write_colored(out: &mut dyn WriteColor, spec: &ColorSpec, text: impl Display) -> io::Result<()> {
    out.set_color(spec)?;
    write!(out, "{}", text)?;
    out.reset()
}

/// Same layout as the `Display` implementation, with colors
fn write_instruction_colored(
    out: &mut dyn WriteColor,
    instruction: &LinearIrInstruction<'_>,
) -> io::Result<()> {
    let mut label = ColorSpec::new();
    label.set_dimmed(true);
    let mut opcode = ColorSpec::new();
    opcode.set_fg(Some(Color::Yellow)).set_bold(true);
    let mut register = ColorSpec::new();
    register.set_fg(Some(Color::Green));
    let mut target = ColorSpec::new();
    target.set_fg(Some(Color::Cyan));

    write_colored(out, &label, instruction.label())?;
    write!(out, ": ")?;
    if !instruction.outputs().is_empty() {
        for output in instruction.outputs() {
            write_colored(out, &register, output)?;
            write!(out, " ")?;
        }
        write!(out, "<- ")?;
    }
    write_colored(out, &opcode, instruction.opcode_name())?;
    for input in instruction.inputs() {
        write!(out, " ")?;
        write_colored(out, &register, input)?;
    }

    let targets = instruction.targets();
    if !targets.is_empty() {
        write!(
            out,
            "{}",
            if targets.len() == 1 {
                " | target:"
            } else {
                " | targets:"
            }
        )?;
        for offset in targets {
            write!(out, " ")?;
            write_colored(out, &target, offset)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use termcolor::Buffer;

    const SAMPLE: &str = r#"{
        "name": "sample.dll",
        "types": [
            {
                "namespace": "Sample",
                "name": "Program",
                "methods": [
                    {
                        "name": "Add",
                        "token": "0x06000001",
                        "signature": {
                            "return_type": "System.Int32",
                            "parameters": ["System.Int32", "System.Int32"]
                        },
                        "body": { "il": "02 03 58 2A" }
                    },
                    {
                        "name": "Broken",
                        "token": "0x06000002",
                        "signature": { "return_type": "System.Void" },
                        "body": { "il": "26 2A" }
                    },
                    {
                        "name": "Abstract",
                        "token": "0x06000003",
                        "signature": { "has_this": true, "return_type": "System.Void" }
                    }
                ]
            },
            {
                "name": "Empty"
            }
        ]
    }"#;

    fn render(
        policy: IrPrintingPolicy,
        print: impl FnOnce(&LinearIrDump<'_>, &mut Buffer) -> Result<(), Error>,
    ) -> String {
        let module = Module::from_json(SAMPLE).unwrap();
        let dump = LinearIrDump::new(&module, policy, LoweringStrategy::SingleForwardPass);
        let mut buffer = if policy.color_enabled {
            Buffer::ansi()
        } else {
            Buffer::no_color()
        };
        print(&dump, &mut buffer).unwrap();
        String::from_utf8(buffer.into_inner()).unwrap()
    }

    const PROGRAM: &str = "\
Sample.Program
{
  System.Int32 Sample.Program::Add(System.Int32,System.Int32)
  {
    IL_0000: v0 <- ldarg.0
    IL_0001: v1 <- ldarg.1
    IL_0002: v0 <- add v0 v1
    IL_0003: ret v0
  }

  System.Void Sample.Program::Broken()
  {
    error: unbalanced stack: pop at IL_0000 pops 1 value(s) but the stack holds 0
  }

}
";

    #[test]
    fn type_dump_isolates_failing_methods() {
        let text = render(IrPrintingPolicy::default(), |dump, out| {
            dump.dump_type(out, "Program")
        });
        assert_eq!(text, PROGRAM);
    }

    #[test]
    fn malformed_il_is_reported_in_place_of_the_body() {
        let module = Module::from_json(&SAMPLE.replace(r#""il": "26 2A""#, r#""il": "2""#)).unwrap();
        let dump = LinearIrDump::new(
            &module,
            IrPrintingPolicy::default(),
            LoweringStrategy::SingleForwardPass,
        );
        let mut buffer = Buffer::no_color();
        dump.dump_type(&mut buffer, "Program").unwrap();
        let text = String::from_utf8(buffer.into_inner()).unwrap();

        assert!(text.contains("    IL_0003: ret v0\n"));
        assert!(text.contains(
            "  System.Void Sample.Program::Broken()\n  {\n    error: cannot decode method body: \
             IL bytes are not hexadecimal byte pairs\n  }\n"
        ));
    }

    #[test]
    fn module_dump() {
        let text = render(IrPrintingPolicy::default(), |dump, out| dump.dump_module(out));
        assert_eq!(text, format!("{}\nEmpty\n{{\n}}\n\n", PROGRAM));
    }

    #[test]
    fn method_dump_with_wider_tabs() {
        let policy = IrPrintingPolicy {
            tab_width: 4,
            ..IrPrintingPolicy::default()
        };
        let text = render(policy, |dump, out| dump.dump_method(out, "Program", "Add"));
        assert_eq!(
            text,
            "\
System.Int32 Sample.Program::Add(System.Int32,System.Int32)
{
    IL_0000: v0 <- ldarg.0
    IL_0001: v1 <- ldarg.1
    IL_0002: v0 <- add v0 v1
    IL_0003: ret v0
}
"
        );
    }

    #[test]
    fn cfg_dump() {
        let text = render(IrPrintingPolicy::default(), |dump, out| {
            dump.dump_cfg(out, "Program", "Add")
        });
        assert_eq!(
            text,
            "\
System.Int32 Sample.Program::Add(System.Int32,System.Int32)
{
  BasicBlock0
  IL_0000: ldarg.0
  IL_0001: ldarg.1
  IL_0002: add
  IL_0003: ret
  in: []
  out: []
}
"
        );
    }

    #[test]
    fn colored_output_keeps_the_text() {
        let policy = IrPrintingPolicy {
            color_enabled: true,
            ..IrPrintingPolicy::default()
        };
        let text = render(policy, |dump, out| dump.dump_method(out, "Program", "Add"));
        assert!(text.contains('\x1b'));

        let plain = strip_ansi(&text);
        assert!(plain.contains("IL_0002: v0 <- add v0 v1\n"));
    }

    #[test]
    fn lookup_failures_propagate() {
        let module = Module::from_json(SAMPLE).unwrap();
        let dump = LinearIrDump::new(
            &module,
            IrPrintingPolicy::default(),
            LoweringStrategy::CfgTraversal,
        );
        let mut buffer = Buffer::no_color();
        let err = dump.dump_method(&mut buffer, "Program", "Missing").unwrap_err();
        assert_eq!(err.to_string(), "Could not find method 'Missing' in type 'Program'");
        assert!(matches!(
            dump.dump_type(&mut buffer, "Nope"),
            Err(Error::Lookup(_))
        ));
        assert!(matches!(
            dump.dump_cfg(&mut buffer, "Program", "Broken"),
            Ok(())
        ));
    }

    fn strip_ansi(text: &str) -> String {
        let mut plain = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c in chars.by_ref() {
                    if c == 'm' {
                        break;
                    }
                }
            } else {
                plain.push(c);
            }
        }
        plain
    }
}
