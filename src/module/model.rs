use super::description::{
    BodyDescription, MethodDescription, ModuleDescription, SignatureDescription, TypeDescription,
};
use super::{Error, LookupError};
use crate::cil::{
    decode_body, parse_hex, CallingConvention, ExceptionRegion, Instruction, MethodRef, MethodSig,
    Token, TokenResolver,
};
use crate::util::Offset;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Types and method bodies of one assembly module
#[derive(Debug)]
pub struct Module {
    name: String,
    types: Vec<TypeDef>,

    /// Every method a call instruction may refer to (including those defined here)
    references: HashMap<Token, Arc<MethodRef>>,
}

#[derive(Debug)]
pub struct TypeDef {
    namespace: String,
    name: String,
    methods: Vec<MethodDef>,
}

#[derive(Debug)]
pub struct MethodDef {
    name: String,
    declaring_type: String,
    reference: Arc<MethodRef>,
    body: Option<MethodBody>,
}

/// Raw body of a method, decoded on demand
///
/// The IL stays in its hexadecimal form until the method is decoded, so a malformed body only
/// affects its own method.
#[derive(Debug)]
pub struct MethodBody {
    pub il: String,
    pub exception_regions: Vec<ExceptionRegion>,
}

impl Module {
    /// Load a module description from a JSON file
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Module, Error> {
        let text = fs::read_to_string(path)?;
        Module::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Module, Error> {
        let description: ModuleDescription = serde_json::from_str(text)?;
        Module::from_description(description)
    }

    pub fn from_description(description: ModuleDescription) -> Result<Module, Error> {
        let mut references = HashMap::new();
        for reference in description.references {
            let token = parse_token(&reference.token)?;
            let method = MethodRef {
                token,
                full_name: reference.full_name,
                signature: method_sig(reference.signature),
            };
            references.insert(token, Arc::new(method));
        }

        let types = description
            .types
            .into_iter()
            .map(TypeDef::from_description)
            .collect::<Result<Vec<_>, _>>()?;
        for type_def in &types {
            for method in &type_def.methods {
                references.insert(method.reference.token, method.reference.clone());
            }
        }

        log::debug!(
            "loaded module {} with {} types and {} method references",
            description.name,
            types.len(),
            references.len()
        );

        Ok(Module {
            name: description.name,
            types,
            references,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    /// Find a type by its short name (`Program`) or its full name (`App.Program`)
    pub fn find_type(&self, type_name: &str) -> Result<&TypeDef, LookupError> {
        self.types
            .iter()
            .find(|type_def| type_def.name == type_name)
            .or_else(|| {
                self.types
                    .iter()
                    .find(|type_def| type_def.full_name() == type_name)
            })
            .ok_or_else(|| LookupError::Type(type_name.to_owned()))
    }

    pub fn find_method(
        &self,
        type_name: &str,
        method_name: &str,
    ) -> Result<(&TypeDef, &MethodDef), LookupError> {
        let type_def = self.find_type(type_name)?;
        let method = type_def
            .find_method(method_name)
            .ok_or_else(|| LookupError::Method {
                type_name: type_name.to_owned(),
                method_name: method_name.to_owned(),
            })?;
        Ok((type_def, method))
    }

    /// Decode the body of a method, resolving call targets against this module
    ///
    /// Methods without a body decode to an empty instruction list.
    pub fn decode(&self, method: &MethodDef) -> Result<Vec<Instruction>, crate::cil::Error> {
        match &method.body {
            Some(body) => {
                let il = parse_hex(&body.il).ok_or(crate::cil::Error::InvalidHex)?;
                decode_body(&il, self)
            }
            None => Ok(vec![]),
        }
    }
}

impl TokenResolver for Module {
    fn resolve_method(&self, token: Token) -> Option<Arc<MethodRef>> {
        self.references.get(&token).cloned()
    }
}

impl TypeDef {
    fn from_description(description: TypeDescription) -> Result<TypeDef, Error> {
        let TypeDescription {
            namespace,
            name,
            methods,
        } = description;
        let declaring_type = if namespace.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", namespace, name)
        };
        let methods = methods
            .into_iter()
            .map(|method| MethodDef::from_description(&declaring_type, method))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TypeDef {
            namespace,
            name,
            methods,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Namespace.Name`, or just `Name` outside of any namespace
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    /// Find a method by its short name (`Add`) or its full name
    pub fn find_method(&self, method_name: &str) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|method| method.name == method_name)
            .or_else(|| {
                self.methods
                    .iter()
                    .find(|method| method.full_name() == method_name)
            })
    }
}

impl MethodDef {
    fn from_description(
        declaring_type: &str,
        description: MethodDescription,
    ) -> Result<MethodDef, Error> {
        let token = parse_token(&description.token)?;
        let signature = method_sig(description.signature);
        let full_name = format!(
            "{} {}::{}({})",
            signature.return_type,
            declaring_type,
            description.name,
            signature.parameters.join(",")
        );
        let body = description
            .body
            .map(MethodBody::from_description);

        Ok(MethodDef {
            name: description.name,
            declaring_type: declaring_type.to_owned(),
            reference: Arc::new(MethodRef {
                token,
                full_name,
                signature,
            }),
            body,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<return type> <declaring type>::<name>(<parameter types>)`
    pub fn full_name(&self) -> &str {
        &self.reference.full_name
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn token(&self) -> Token {
        self.reference.token
    }

    pub fn signature(&self) -> &MethodSig {
        &self.reference.signature
    }

    pub fn body(&self) -> Option<&MethodBody> {
        self.body.as_ref()
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Exception regions of the body (empty for methods without a body)
    pub fn exception_regions(&self) -> &[ExceptionRegion] {
        match &self.body {
            Some(body) => body.exception_regions.as_slice(),
            None => &[],
        }
    }
}

impl MethodBody {
    fn from_description(description: BodyDescription) -> MethodBody {
        let exception_regions = description
            .exception_regions
            .into_iter()
            .map(|region| ExceptionRegion {
                kind: region.kind,
                try_start: Offset(region.try_start),
                try_end: Offset(region.try_end),
                handler_start: Offset(region.handler_start),
                handler_end: Offset(region.handler_end),
                filter_start: region.filter_start.map(Offset),
                catch_type: region.catch_type,
            })
            .collect();
        MethodBody {
            il: description.il,
            exception_regions,
        }
    }
}

fn parse_token(token: &str) -> Result<Token, Error> {
    token
        .parse()
        .map_err(|_| Error::InvalidToken(token.to_owned()))
}

fn method_sig(description: SignatureDescription) -> MethodSig {
    let mut calling_convention = CallingConvention::DEFAULT;
    calling_convention.set(CallingConvention::HAS_THIS, description.has_this);
    calling_convention.set(CallingConvention::EXPLICIT_THIS, description.explicit_this);
    calling_convention.set(CallingConvention::VARARG, description.vararg);
    MethodSig {
        calling_convention,
        return_type: description.return_type,
        parameters: description.parameters,
    }
}
