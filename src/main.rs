use cil2lir::dump::{IrPrintingPolicy, LinearIrDump};
use cil2lir::linear::LoweringStrategy;
use cil2lir::module::Module;

use clap::{crate_version, value_parser, Arg, ArgAction, Command};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::exit;
use termcolor::{Ansi, ColorChoice, NoColor, StandardStream, WriteColor};

fn main() {
    env_logger::init();

    let matches = Command::new("cil2lir")
        .version(crate_version!())
        .about("Converts the stack-based CIL of a module's methods into a register-based linear IR")
        .arg(
            Arg::new("type")
                .short('t')
                .long("type")
                .value_name("TYPE")
                .help("Name of the type whose methods are processed"),
        )
        .arg(
            Arg::new("method")
                .short('m')
                .long("method")
                .value_name("METHOD")
                .help("Name of the method to process (requires --type)"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Write the output to this file instead of stdout"),
        )
        .arg(
            Arg::new("algorithm")
                .short('a')
                .long("algorithm")
                .value_name("ALGORITHM")
                .value_parser(value_parser!(LoweringStrategy))
                .default_value("forwardpass")
                .help("Lowering algorithm: 'forwardpass' or 'cfgtraverse'"),
        )
        .arg(
            Arg::new("dump-cfg")
                .long("dump-cfg")
                .action(ArgAction::SetTrue)
                .help("Dump the control flow graph of --method and exit"),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .action(ArgAction::SetTrue)
                .help("Color the output"),
        )
        .arg(
            Arg::new("tab-width")
                .long("tab-width")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .default_value("2")
                .help("Number of spaces per indentation level"),
        )
        .arg(
            Arg::new("MODULE_FILE")
                .help("Module description (JSON) to read")
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .get_matches();

    let module_file = match matches.get_one::<PathBuf>("MODULE_FILE") {
        Some(path) => path,
        None => usage_error("No modules specified... Exiting."),
    };
    let type_name = matches.get_one::<String>("type");
    let method_name = matches.get_one::<String>("method");
    let dump_cfg = matches.get_flag("dump-cfg");

    if dump_cfg && method_name.is_none() {
        usage_error("Missing method... Exiting.");
    }
    if method_name.is_some() && type_name.is_none() {
        usage_error("No type specified... Exiting.");
    }

    let policy = IrPrintingPolicy {
        tab_width: matches.get_one::<usize>("tab-width").copied().unwrap_or(2),
        color_enabled: matches.get_flag("color"),
    };
    let strategy = matches
        .get_one::<LoweringStrategy>("algorithm")
        .copied()
        .unwrap_or_default();

    log::info!("Reading '{}'", module_file.display());
    let module = match Module::read(module_file) {
        Ok(module) => module,
        Err(err) => fail(err),
    };

    let mut out: Box<dyn WriteColor> = match matches.get_one::<PathBuf>("output") {
        Some(path) => {
            let file = match File::create(path) {
                Ok(file) => io::BufWriter::new(file),
                Err(err) => fail(err),
            };
            if policy.color_enabled {
                Box::new(Ansi::new(file))
            } else {
                Box::new(NoColor::new(file))
            }
        }
        None => Box::new(StandardStream::stdout(if policy.color_enabled {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        })),
    };

    let dump = LinearIrDump::new(&module, policy, strategy);
    let result = match (type_name, method_name) {
        (Some(type_name), Some(method_name)) if dump_cfg => {
            dump.dump_cfg(&mut *out, type_name, method_name)
        }
        (Some(type_name), Some(method_name)) => {
            dump.dump_method(&mut *out, type_name, method_name)
        }
        (Some(type_name), None) => dump.dump_type(&mut *out, type_name),
        (None, _) => dump.dump_module(&mut *out),
    };
    if let Err(err) = result {
        fail(err);
    }
    if let Err(err) = out.flush() {
        fail(err);
    }
}

/// Report a problem with the command line and exit
fn usage_error(message: &str) -> ! {
    println!("{}", message);
    exit(1)
}

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("error: {}", err);
    exit(1)
}
