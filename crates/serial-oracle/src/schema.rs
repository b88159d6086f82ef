// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON schema describing declared types and endpoint interfaces.
//!
//! The document shape (`serial-schema/v1`) is what a build driver extracts
//! from the host compiler. [`SchemaDocument`] is the raw serde form;
//! [`Schema`] is the resolved form with parsed [`TypeRef`]s and implements
//! [`TypeInfoProvider`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::OracleError;
use crate::provider::{
    CustomSerializer, DeclKind, FieldAccess, FieldInfo, TypeDecl, TypeInfoProvider,
};
use crate::type_ref::TypeRef;

/// Schema version tag this crate understands.
pub const SCHEMA_VERSION: &str = "serial-schema/v1";

/// Raw schema document.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDocument {
    /// Version tag (e.g. `"serial-schema/v1"`).
    #[serde(rename = "schemaVersion", default)]
    pub schema_version: Option<String>,

    /// Declared types visible to this build round.
    #[serde(default)]
    pub types: Vec<TypeDef>,

    /// Endpoint interfaces to generate.
    #[serde(default)]
    pub endpoints: Vec<EndpointDef>,
}

/// Declared type definition.
#[derive(Debug, Clone, Deserialize)]
pub struct TypeDef {
    /// Fully-qualified name.
    pub name: String,
    /// Class, enum, or interface.
    pub kind: DeclKind,
    /// Abstract class flag.
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
    /// No-argument constructor present.
    #[serde(rename = "defaultConstructor", default = "default_true")]
    pub default_constructor: bool,
    /// Superclass name (generic arguments allowed, erased on resolve).
    #[serde(default)]
    pub superclass: Option<String>,
    /// Implemented interfaces.
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Instance fields in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Enum constants in ordinal order.
    #[serde(default)]
    pub values: Vec<String>,
    /// Custom serializer companion.
    #[serde(rename = "customSerializer", default)]
    pub custom_serializer: Option<CustomSerializerDef>,
}

/// Field definition.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Accessor shape.
    #[serde(default)]
    pub access: FieldAccess,
    /// Transient fields are skipped.
    #[serde(default)]
    pub transient: bool,
}

/// Custom serializer declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomSerializerDef {
    /// Companion path.
    pub path: String,
    /// Rust type the companion operates on.
    #[serde(rename = "rustType")]
    pub rust_type: String,
    /// Whether the companion provides `instantiate`.
    #[serde(default)]
    pub instantiate: bool,
    /// Types the companion reads or writes itself.
    #[serde(default)]
    pub requires: Vec<String>,
}

/// Endpoint interface definition.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointDef {
    /// Fully-qualified interface name.
    pub name: String,
    /// Methods in declaration order.
    #[serde(default)]
    pub methods: Vec<MethodDef>,
}

/// Endpoint method signature.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodDef {
    /// Method name.
    pub name: String,
    /// Parameters in order.
    #[serde(default)]
    pub params: Vec<ParamDef>,
    /// Return type, `None` for void.
    #[serde(default)]
    pub returns: Option<String>,
    /// Static methods are skipped.
    #[serde(rename = "static", default)]
    pub is_static: bool,
    /// Default methods are skipped.
    #[serde(rename = "default", default)]
    pub is_default: bool,
}

/// Endpoint method parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamDef {
    /// Parameter name.
    pub name: String,
    /// Type name.
    #[serde(rename = "type")]
    pub type_name: String,
}

fn default_true() -> bool {
    true
}

/// Resolved schema; the JSON-backed [`TypeInfoProvider`].
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: BTreeMap<String, TypeDecl>,
    endpoints: Vec<EndpointDef>,
}

impl Schema {
    /// Parse and resolve a JSON schema document.
    pub fn from_json(json: &str) -> Result<Self, SchemaLoadError> {
        let doc: SchemaDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(doc)?)
    }

    /// Read, parse and resolve a schema file.
    pub fn load(path: &Path) -> Result<Self, SchemaLoadError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Resolve a raw document: parse every type name, erase generics.
    pub fn from_document(doc: SchemaDocument) -> Result<Self, OracleError> {
        if let Some(version) = doc.schema_version.as_deref() {
            if version != SCHEMA_VERSION {
                tracing::warn!(version, expected = SCHEMA_VERSION, "unrecognized schema version");
            }
        }
        let mut types = BTreeMap::new();
        for def in doc.types {
            let decl = resolve_type(def)?;
            if types.contains_key(&decl.name) {
                return Err(OracleError::DuplicateType { name: decl.name });
            }
            types.insert(decl.name.clone(), decl);
        }
        Ok(Self {
            types,
            endpoints: doc.endpoints,
        })
    }

    /// Build a schema directly from declarations (no endpoints).
    pub fn from_decls(decls: impl IntoIterator<Item = TypeDecl>) -> Result<Self, OracleError> {
        let mut types = BTreeMap::new();
        for decl in decls {
            if types.contains_key(&decl.name) {
                return Err(OracleError::DuplicateType { name: decl.name });
            }
            types.insert(decl.name.clone(), decl);
        }
        Ok(Self {
            types,
            endpoints: Vec::new(),
        })
    }

    /// Endpoint interfaces declared in the document.
    pub fn endpoints(&self) -> &[EndpointDef] {
        &self.endpoints
    }

    /// Look up an endpoint by fully-qualified name.
    pub fn endpoint(&self, name: &str) -> Option<&EndpointDef> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    /// All resolved declarations, sorted by name.
    pub fn decls(&self) -> impl Iterator<Item = &TypeDecl> {
        self.types.values()
    }
}

impl TypeInfoProvider for Schema {
    fn declaration(&self, name: &str) -> Option<&TypeDecl> {
        self.types.get(name)
    }

    fn declared_names(&self) -> Vec<&str> {
        self.types.keys().map(String::as_str).collect()
    }
}

/// Failure to load a schema file.
#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    /// The file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The JSON did not match the document shape.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A type name inside the document was malformed or duplicated.
    #[error(transparent)]
    Resolve(#[from] OracleError),
}

fn resolve_type(def: TypeDef) -> Result<TypeDecl, OracleError> {
    let name = declared(&def.name)?;
    let superclass = def.superclass.as_deref().map(declared).transpose()?;
    let interfaces = def
        .interfaces
        .iter()
        .map(|i| declared(i))
        .collect::<Result<Vec<_>, _>>()?;
    let fields = def
        .fields
        .into_iter()
        .map(|f| {
            Ok(FieldInfo {
                ty: TypeRef::parse(&f.type_name)?,
                name: f.name,
                access: f.access,
                transient: f.transient,
            })
        })
        .collect::<Result<Vec<_>, OracleError>>()?;
    let custom_serializer = def
        .custom_serializer
        .map(|c| {
            Ok::<_, OracleError>(CustomSerializer {
                requires: c
                    .requires
                    .iter()
                    .map(|r| TypeRef::parse(r))
                    .collect::<Result<Vec<_>, _>>()?,
                path: c.path,
                rust_type: c.rust_type,
                instantiate: c.instantiate,
            })
        })
        .transpose()?;
    Ok(TypeDecl {
        name,
        kind: def.kind,
        is_abstract: def.is_abstract,
        default_constructor: def.default_constructor,
        superclass,
        interfaces,
        fields,
        values: def.values,
        custom_serializer,
    })
}

fn declared(text: &str) -> Result<String, OracleError> {
    match TypeRef::parse(text)? {
        TypeRef::Declared(name) => Ok(name),
        _ => Err(OracleError::BadTypeName {
            name: text.to_owned(),
            reason: "expected a declared type",
        }),
    }
}
