// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Endpoint method classification.
//!
//! Every non-static, non-default method of an endpoint interface has one of
//! three shapes:
//!
//! - **read**: exactly one `Reader` parameter and a non-void return; the
//!   return type is a read root;
//! - **write**: void return and at least two parameters, the last one a
//!   `Writer`; the preceding parameter types are write roots;
//! - **factory**: no parameters, returning `TypeSerializer`.

use std::collections::BTreeSet;

use serial_oracle::{EndpointDef, MethodDef, OracleError, TypeRef};
use thiserror::Error;

/// Parameter type naming the stream reader.
pub const READER_TYPE: &str = "Reader";
/// Parameter type naming the stream writer.
pub const WRITER_TYPE: &str = "Writer";
/// Return type of the serializer factory.
pub const SERIALIZER_TYPE: &str = "TypeSerializer";

/// Errors raised while classifying endpoint methods.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    /// The method matches none of the read, write, or factory shapes.
    #[error("{endpoint}.{method}: {reason}")]
    BadSignature {
        /// Endpoint interface.
        endpoint: String,
        /// Method name.
        method: String,
        /// What was wrong.
        reason: &'static str,
    },

    /// A parameter or return type name is malformed.
    #[error("{endpoint}.{method}: {source}")]
    BadType {
        /// Endpoint interface.
        endpoint: String,
        /// Method name.
        method: String,
        /// Parse failure.
        #[source]
        source: OracleError,
    },
}

/// Classified shape of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodShape {
    /// Decodes one value of `returns`.
    Read {
        /// Read root.
        returns: TypeRef,
    },
    /// Encodes each parameter in order.
    Write {
        /// Parameter names and write roots, stream parameter excluded.
        params: Vec<(String, TypeRef)>,
    },
    /// Returns the endpoint's type serializer.
    Factory,
}

/// One classified method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointMethod {
    /// Source method name.
    pub name: String,
    /// Classified shape.
    pub shape: MethodShape,
}

/// A classified endpoint interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointModel {
    /// Fully-qualified interface name.
    pub name: String,
    /// Classified methods in declaration order.
    pub methods: Vec<EndpointMethod>,
}

impl EndpointModel {
    /// Classify every method of `def`. Static and default methods are skipped.
    pub fn classify(def: &EndpointDef) -> Result<Self, EndpointError> {
        let methods = def
            .methods
            .iter()
            .filter(|m| !m.is_static && !m.is_default)
            .map(|m| classify_method(&def.name, m))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: def.name.clone(),
            methods,
        })
    }

    /// Return types of read methods.
    pub fn read_roots(&self) -> BTreeSet<TypeRef> {
        self.methods
            .iter()
            .filter_map(|m| match &m.shape {
                MethodShape::Read { returns } => Some(returns.clone()),
                _ => None,
            })
            .collect()
    }

    /// Parameter types of write methods.
    pub fn write_roots(&self) -> BTreeSet<TypeRef> {
        self.methods
            .iter()
            .flat_map(|m| match &m.shape {
                MethodShape::Write { params } => params.iter().map(|(_, t)| t.clone()).collect(),
                _ => Vec::new(),
            })
            .collect()
    }
}

fn is_stream(type_name: &str) -> bool {
    type_name == READER_TYPE || type_name == WRITER_TYPE
}

fn classify_method(endpoint: &str, method: &MethodDef) -> Result<EndpointMethod, EndpointError> {
    let bad = |reason| EndpointError::BadSignature {
        endpoint: endpoint.to_owned(),
        method: method.name.clone(),
        reason,
    };
    let parse = |text: &str| {
        TypeRef::parse(text).map_err(|source| EndpointError::BadType {
            endpoint: endpoint.to_owned(),
            method: method.name.clone(),
            source,
        })
    };
    let params = &method.params;
    let returns = method.returns.as_deref();

    let shape = match (params.as_slice(), returns) {
        ([], Some(SERIALIZER_TYPE)) => MethodShape::Factory,
        ([only], Some(ret)) if only.type_name == READER_TYPE => {
            if is_stream(ret) || ret == SERIALIZER_TYPE {
                return Err(bad("read method must return a serializable type"));
            }
            MethodShape::Read {
                returns: parse(ret)?,
            }
        }
        ([.., last], None) if params.len() >= 2 && last.type_name == WRITER_TYPE => {
            let values = &params[..params.len() - 1];
            if values.iter().any(|p| is_stream(&p.type_name)) {
                return Err(bad("write method takes exactly one trailing Writer"));
            }
            let params = values
                .iter()
                .map(|p| Ok((p.name.clone(), parse(&p.type_name)?)))
                .collect::<Result<Vec<_>, EndpointError>>()?;
            MethodShape::Write { params }
        }
        ([], _) => return Err(bad("a method without parameters must return TypeSerializer")),
        (_, Some(_)) => {
            return Err(bad(
                "a method with a return value must take exactly one Reader",
            ))
        }
        (_, None) => {
            return Err(bad(
                "a void method must take at least one value and a trailing Writer",
            ))
        }
    };
    Ok(EndpointMethod {
        name: method.name.clone(),
        shape,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serial_oracle::{MethodDef, ParamDef};

    fn method(name: &str, params: &[(&str, &str)], returns: Option<&str>) -> MethodDef {
        MethodDef {
            name: name.into(),
            params: params
                .iter()
                .map(|(n, t)| ParamDef {
                    name: (*n).into(),
                    type_name: (*t).into(),
                })
                .collect(),
            returns: returns.map(Into::into),
            is_static: false,
            is_default: false,
        }
    }

    fn endpoint(methods: Vec<MethodDef>) -> EndpointDef {
        EndpointDef {
            name: "x.Api".into(),
            methods,
        }
    }

    #[test]
    fn classifies_the_three_shapes() {
        let model = EndpointModel::classify(&endpoint(vec![
            method("readPoint", &[("reader", "Reader")], Some("x.Point")),
            method(
                "writeBoth",
                &[("p", "x.Point"), ("tags", "String[]"), ("writer", "Writer")],
                None,
            ),
            method("createSerializer", &[], Some("TypeSerializer")),
        ]))
        .unwrap();
        assert_eq!(model.methods[2].shape, MethodShape::Factory);
        assert_eq!(
            model.read_roots().into_iter().collect::<Vec<_>>(),
            vec![TypeRef::declared("x.Point")]
        );
        assert_eq!(model.write_roots().len(), 2);
    }

    #[test]
    fn skips_static_and_default_methods() {
        let mut helper = method("helper", &[("a", "int")], Some("int"));
        helper.is_static = true;
        let model = EndpointModel::classify(&endpoint(vec![helper])).unwrap();
        assert!(model.methods.is_empty());
    }

    #[test]
    fn rejects_other_shapes() {
        for bad in [
            method("noWriter", &[("a", "int"), ("b", "int")], None),
            method("onlyWriter", &[("writer", "Writer")], None),
            method("twoArgsRead", &[("reader", "Reader"), ("x", "int")], Some("int")),
            method("nothing", &[], None),
            method("readStream", &[("reader", "Reader")], Some("Writer")),
            method("doubleWriter", &[("w", "Writer"), ("writer", "Writer")], None),
        ] {
            let name = bad.name.clone();
            assert!(
                matches!(
                    EndpointModel::classify(&endpoint(vec![bad])),
                    Err(EndpointError::BadSignature { .. })
                ),
                "{name}"
            );
        }
    }

    #[test]
    fn malformed_type_is_reported() {
        let err = EndpointModel::classify(&endpoint(vec![method(
            "readBroken",
            &[("reader", "Reader")],
            Some("x.Bad<"),
        )]))
        .unwrap_err();
        assert!(matches!(err, EndpointError::BadType { .. }));
    }
}
