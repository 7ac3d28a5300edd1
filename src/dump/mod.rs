//! Text rendering of lowered methods and control flow graphs
//!
//! Output is written to a [`termcolor::WriteColor`], so the same printer serves terminals,
//! files, and in-memory buffers. Indentation is an explicit [`Indent`] value handed down to
//! each nested printer.

mod errors;
mod linear_ir_dump;
mod policy;

pub use errors::*;
pub use linear_ir_dump::*;
pub use policy::*;
