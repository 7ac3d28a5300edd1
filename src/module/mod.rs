//! Materialized output of a metadata reader
//!
//! A [`Module`] is loaded from a JSON [description](ModuleDescription) listing its types, their
//! methods (with signatures and raw IL bodies), and the external methods that call instructions
//! refer to. Bodies are only decoded when asked for, so a single malformed body doesn't stop the
//! rest of the module from being processed.

mod description;
mod errors;
mod model;

pub use description::*;
pub use errors::*;
pub use model::*;
