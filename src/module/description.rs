//! On-disk form of a module, as handed over by the metadata reader
//!
//! Tokens are written as hexadecimal strings (`"0x06000001"`) and IL bytes as a string of
//! hexadecimal byte pairs, optionally separated by whitespace.

use crate::cil::HandlerKind;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleDescription {
    pub name: String,

    /// Methods from other modules (or stand-alone signatures) referenced by call instructions
    #[serde(default)]
    pub references: Vec<MethodRefDescription>,

    pub types: Vec<TypeDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MethodRefDescription {
    pub token: String,
    pub full_name: String,
    pub signature: SignatureDescription,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignatureDescription {
    #[serde(default)]
    pub has_this: bool,

    #[serde(default)]
    pub explicit_this: bool,

    #[serde(default)]
    pub vararg: bool,

    pub return_type: String,

    #[serde(default)]
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeDescription {
    #[serde(default)]
    pub namespace: String,

    pub name: String,

    #[serde(default)]
    pub methods: Vec<MethodDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MethodDescription {
    pub name: String,
    pub token: String,
    pub signature: SignatureDescription,

    /// Abstract, extern, and runtime-provided methods have no body
    #[serde(default)]
    pub body: Option<BodyDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BodyDescription {
    pub il: String,

    #[serde(default)]
    pub exception_regions: Vec<RegionDescription>,
}

/// Exception region, with byte offsets into the IL
#[derive(Debug, Clone, Deserialize)]
pub struct RegionDescription {
    pub kind: HandlerKind,
    pub try_start: usize,
    pub try_end: usize,
    pub handler_start: usize,
    pub handler_end: usize,

    #[serde(default)]
    pub filter_start: Option<usize>,

    #[serde(default)]
    pub catch_type: Option<String>,
}
