// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rust code emission for one endpoint.
//!
//! The emitted module refers to the runtime only through absolute
//! `::serial_stream::` paths and carries no inner attributes, so it can be
//! written to disk or pulled in with `include!`.

use std::collections::BTreeMap;

use proc_macro2::{Ident, TokenStream};
use quote::quote;
use serial_oracle::{FieldSerializerModel, Primitive, TypeRef};
use thiserror::Error;

use crate::endpoint::{EndpointModel, MethodShape};
use crate::naming::{self, NamingError};
use crate::plan::{FieldSerializerPlan, PlanKind, TypePlan};

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "// @generated by serial-gen. Do not edit.";

/// Errors raised while emitting code.
#[derive(Debug, Error)]
pub enum EmitError {
    /// A name cannot be turned into an identifier.
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// A custom serializer path or Rust type is not a valid path.
    #[error("`{type_name}`: `{path}` is not a Rust path")]
    BadPath {
        /// Declared type carrying the custom serializer.
        type_name: String,
        /// Offending path text.
        path: String,
    },

    /// Two members of one generated item map to the same identifier.
    #[error("`{owner}`: `{first}` and `{second}` both generate `{ident}`")]
    Collision {
        /// Type or endpoint owning the members.
        owner: String,
        /// Generated identifier.
        ident: String,
        /// First source name.
        first: String,
        /// Second source name.
        second: String,
    },

    /// The emitted tokens did not form a valid file.
    #[error("generated code does not parse: {0}")]
    Syntax(#[from] syn::Error),
}

/// Render the module for `endpoint`: header comment plus formatted code.
pub fn render_endpoint(
    endpoint: &EndpointModel,
    plan: &FieldSerializerPlan,
) -> Result<String, EmitError> {
    let tokens = Emitter { endpoint, plan }.emit()?;
    let file: syn::File = syn::parse2(tokens)?;
    Ok(format!(
        "{GENERATED_HEADER}\n// Endpoint: {}\n\n{}",
        endpoint.name,
        prettyplease::unparse(&file)
    ))
}

struct Emitter<'p> {
    endpoint: &'p EndpointModel,
    plan: &'p FieldSerializerPlan,
}

/// Tracks generated identifiers within one owner and reports collisions.
struct Names {
    owner: String,
    seen: BTreeMap<String, String>,
}

impl Names {
    fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_owned(),
            seen: BTreeMap::new(),
        }
    }

    fn claim(&mut self, ident: &Ident, source: &str) -> Result<(), EmitError> {
        let key = ident.to_string();
        match self.seen.insert(key.clone(), source.to_owned()) {
            None => Ok(()),
            Some(first) => Err(EmitError::Collision {
                owner: self.owner.clone(),
                ident: key,
                first,
                second: source.to_owned(),
            }),
        }
    }
}

fn result_of(ok: &TokenStream) -> TokenStream {
    quote!(::core::result::Result<#ok, ::serial_stream::SerializationError>)
}

fn primitive_type(p: Primitive) -> TokenStream {
    match p {
        Primitive::Boolean => quote!(bool),
        Primitive::Byte => quote!(i8),
        Primitive::Char => quote!(char),
        Primitive::Short => quote!(i16),
        Primitive::Int => quote!(i32),
        Primitive::Long => quote!(i64),
        Primitive::Float => quote!(f32),
        Primitive::Double => quote!(f64),
        Primitive::String => quote!(::std::string::String),
    }
}

/// Owned Rust type for a value of `ty`.
fn value_type(ty: &TypeRef) -> TokenStream {
    match ty {
        TypeRef::Primitive(p) => primitive_type(*p),
        TypeRef::Array { leaf, rank } => {
            let mut out = value_type(leaf);
            for _ in 0..*rank {
                out = quote!(::std::vec::Vec<#out>);
            }
            out
        }
        TypeRef::Declared(_) => quote!(::core::option::Option<::serial_stream::ObjectRef>),
    }
}

fn stream_ident(p: Primitive, prefix: &str) -> Result<Ident, NamingError> {
    naming::ident(&format!("{prefix}_{}", p.stream_suffix()))
}

/// Expression writing `place` (an owned place, or a reference when
/// `by_ref`). Returns the expression and whether it yields a `Result`.
fn write_expr(
    ty: &TypeRef,
    place: &TokenStream,
    by_ref: bool,
) -> Result<(TokenStream, bool), EmitError> {
    Ok(match ty {
        TypeRef::Primitive(Primitive::String) => {
            let arg = if by_ref { quote!(#place) } else { quote!(&#place) };
            (quote!(writer.write_string(#arg)), true)
        }
        TypeRef::Primitive(p) => {
            let call = stream_ident(*p, "write")?;
            let arg = if by_ref { quote!(*#place) } else { quote!(#place) };
            (quote!(writer.#call(#arg)), false)
        }
        TypeRef::Declared(_) => (quote!(writer.write_object(#place.as_ref())), true),
        TypeRef::Array { leaf, rank } => {
            let helper = naming::array_writer(leaf, *rank)?;
            let arg = if by_ref { quote!(#place) } else { quote!(&#place) };
            (quote!(#helper(writer, #arg)), true)
        }
    })
}

/// Expression reading one value of `ty`; always yields a `Result`.
fn read_expr(ty: &TypeRef) -> Result<TokenStream, EmitError> {
    Ok(match ty {
        TypeRef::Primitive(Primitive::String) => quote!(reader.read_string()),
        TypeRef::Primitive(p) => {
            let call = stream_ident(*p, "read")?;
            quote!(reader.#call())
        }
        TypeRef::Declared(_) => quote!(reader.read_object()),
        TypeRef::Array { leaf, rank } => {
            let helper = naming::array_reader(leaf, *rank)?;
            quote!(#helper(reader))
        }
    })
}

fn parse_path(type_name: &str, text: &str) -> Result<syn::Path, EmitError> {
    syn::parse_str::<syn::Path>(text).map_err(|_| EmitError::BadPath {
        type_name: type_name.to_owned(),
        path: text.to_owned(),
    })
}

fn fn_ident(prefix: &str, stem: &str, suffix: &str) -> Result<Ident, NamingError> {
    naming::ident(&format!("{prefix}{stem}{suffix}"))
}

impl Emitter<'_> {
    fn emit(&self) -> Result<TokenStream, EmitError> {
        let mut items = Vec::new();
        let mut table = BTreeMap::new();
        let mut stems = Names::new(&self.endpoint.name);
        for tp in self.plan.types() {
            match &tp.kind {
                PlanKind::Class(model) | PlanKind::Enum(model) => {
                    let stem = naming::type_stem(&model.name);
                    stems.claim(&naming::ident(&stem)?, &model.name)?;
                    items.push(Self::signature_const(model)?);
                    items.push(if model.is_enum() {
                        Self::enum_items(tp, model, &stem)?
                    } else if model.is_custom() {
                        Self::custom_items(tp, model, &stem)?
                    } else {
                        self.class_items(tp, model, &stem)?
                    });
                    table.insert(model.name.clone(), Self::table_entry(tp, model, &stem)?);
                }
                PlanKind::Array { leaf, rank } => items.push(array_items(tp, leaf, *rank)?),
            }
        }
        items.push(Self::dispatch(&table));
        items.push(self.endpoint_items()?);
        Ok(quote! { #(#items)* })
    }

    fn signature_const(model: &FieldSerializerModel) -> Result<TokenStream, EmitError> {
        let ident = naming::signature_const(&model.name)?;
        let name = &model.name;
        let doc = format!("Type signature of `{name}`.");
        Ok(quote! {
            #[doc = #doc]
            pub const #ident: &str = #name;
        })
    }

    /// Rust type embedded as `parent` for a chained superclass.
    fn parent_type(&self, superclass: &str) -> Result<TokenStream, EmitError> {
        match self
            .plan
            .declared(superclass)
            .and_then(TypePlan::model)
            .and_then(|m| m.custom_serializer.as_ref())
        {
            Some(custom) => {
                let path = parse_path(superclass, &custom.rust_type)?;
                Ok(quote!(#path))
            }
            None => {
                let ident = naming::type_ident(superclass)?;
                Ok(quote!(#ident))
            }
        }
    }

    fn class_items(
        &self,
        tp: &TypePlan,
        model: &FieldSerializerModel,
        stem: &str,
    ) -> Result<TokenStream, EmitError> {
        let name = &model.name;
        let ty = naming::type_ident(name)?;
        let sig = naming::signature_const(name)?;
        let mut names = Names::new(name);

        let mut members = Vec::new();
        let parent = match &model.superclass {
            Some(sup) => {
                let parent_ident = naming::ident("parent")?;
                names.claim(&parent_ident, "<superclass>")?;
                let parent_ty = self.parent_type(sup)?;
                let doc = format!("State inherited from `{sup}`.");
                members.push(quote! {
                    #[doc = #doc]
                    pub parent: #parent_ty,
                });
                Some(naming::type_stem(sup))
            }
            None => None,
        };
        let mut idents = BTreeMap::new();
        for field in &model.declared_fields {
            let ident = naming::member_ident(&field.name)?;
            names.claim(&ident, &field.name)?;
            let field_ty = value_type(&field.ty);
            let doc = if field.is_eligible() {
                format!("`{}: {}`", field.name, field.ty)
            } else {
                format!("`{}: {}` (not serialized)", field.name, field.ty)
            };
            members.push(quote! {
                #[doc = #doc]
                pub #ident: #field_ty,
            });
            idents.insert(field.name.clone(), ident);
        }

        let doc = format!(
            "Generated from `{name}` ({}).",
            tp.classification.variant_name()
        );
        let mut out = quote! {
            #[doc = #doc]
            #[derive(Clone, Default)]
            pub struct #ty {
                #(#members)*
            }

            impl ::serial_stream::WireObject for #ty {
                fn type_signature(&self) -> &'static str {
                    #sig
                }
                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }
                fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                    self
                }
            }
        };

        let unit = result_of(&quote!(()));
        if tp.ops.serialize {
            let mut stmts = Vec::new();
            for field in &model.fields {
                let ident = &idents[&field.name];
                let field_name = &field.name;
                let (expr, fallible) = write_expr(&field.ty, &quote!(value.#ident), false)?;
                stmts.push(if fallible {
                    quote!(#expr.map_err(|e| e.in_field(#sig, #field_name))?;)
                } else {
                    quote!(#expr;)
                });
            }
            if let Some(parent_stem) = &parent {
                let chain = fn_ident("write_", parent_stem, "_fields")?;
                stmts.push(quote!(#chain(writer, &value.parent)?;));
            }
            let (w, v) = param_names(stmts.is_empty(), "writer")?;
            let write_fields = fn_ident("write_", stem, "_fields")?;
            let serialize = fn_ident("serialize_", stem, "")?;
            let doc_fields = format!("Writes the fields of `{name}`, then its superclass.");
            let doc_ser = format!("Field serializer entry for `{name}`.");
            out.extend(quote! {
                #[doc = #doc_fields]
                pub fn #write_fields(#w: &mut ::serial_stream::Writer<'_>, #v: &#ty) -> #unit {
                    #(#stmts)*
                    Ok(())
                }

                #[doc = #doc_ser]
                pub fn #serialize(
                    writer: &mut ::serial_stream::Writer<'_>,
                    object: &dyn ::serial_stream::WireObject,
                ) -> #unit {
                    let value = ::serial_stream::downcast_ref::<#ty>(object, #sig)?;
                    #write_fields(writer, value)
                }
            });
        }
        if tp.ops.deserialize {
            let mut stmts = Vec::new();
            for field in &model.fields {
                let ident = &idents[&field.name];
                let field_name = &field.name;
                let expr = read_expr(&field.ty)?;
                stmts.push(quote!(value.#ident = #expr.map_err(|e| e.in_field(#sig, #field_name))?;));
            }
            if let Some(parent_stem) = &parent {
                let chain = fn_ident("read_", parent_stem, "_fields")?;
                stmts.push(quote!(#chain(reader, &mut value.parent)?;));
            }
            let (r, v) = param_names(stmts.is_empty(), "reader")?;
            let read_fields = fn_ident("read_", stem, "_fields")?;
            let deserialize = fn_ident("deserialize_", stem, "")?;
            let doc_fields = format!("Reads the fields of `{name}`, then its superclass.");
            let doc_de = format!("Field deserializer entry for `{name}`.");
            out.extend(quote! {
                #[doc = #doc_fields]
                pub fn #read_fields(#r: &mut ::serial_stream::Reader<'_>, #v: &mut #ty) -> #unit {
                    #(#stmts)*
                    Ok(())
                }

                #[doc = #doc_de]
                pub fn #deserialize(
                    reader: &mut ::serial_stream::Reader<'_>,
                    object: &mut dyn ::serial_stream::WireObject,
                ) -> #unit {
                    let value = ::serial_stream::downcast_mut::<#ty>(object, #sig)?;
                    #read_fields(reader, value)
                }
            });
        }
        if tp.ops.instantiate {
            let instantiate = fn_ident("instantiate_", stem, "")?;
            let object = result_of(&quote!(::serial_stream::ObjectRef));
            let doc = format!("Creates an empty `{name}`.");
            out.extend(quote! {
                #[doc = #doc]
                pub fn #instantiate(_reader: &mut ::serial_stream::Reader<'_>) -> #object {
                    Ok(::serial_stream::new_object(#ty::default()))
                }
            });
        }
        Ok(out)
    }

    fn custom_items(
        tp: &TypePlan,
        model: &FieldSerializerModel,
        stem: &str,
    ) -> Result<TokenStream, EmitError> {
        let name = &model.name;
        let Some(custom) = &model.custom_serializer else {
            return Ok(TokenStream::new());
        };
        let rust_type = parse_path(name, &custom.rust_type)?;
        let companion = parse_path(name, &custom.path)?;
        let sig = naming::signature_const(name)?;
        let unit = result_of(&quote!(()));
        let mut out = TokenStream::new();

        if tp.ops.serialize {
            let write_fields = fn_ident("write_", stem, "_fields")?;
            let serialize = fn_ident("serialize_", stem, "")?;
            let doc = format!("Writes `{name}` through `{}`.", custom.path);
            out.extend(quote! {
                #[doc = #doc]
                pub fn #write_fields(writer: &mut ::serial_stream::Writer<'_>, value: &#rust_type) -> #unit {
                    #companion::serialize(writer, value)
                }

                #[doc = #doc]
                pub fn #serialize(
                    writer: &mut ::serial_stream::Writer<'_>,
                    object: &dyn ::serial_stream::WireObject,
                ) -> #unit {
                    let value = ::serial_stream::downcast_ref::<#rust_type>(object, #sig)?;
                    #write_fields(writer, value)
                }
            });
        }
        if tp.ops.deserialize {
            let read_fields = fn_ident("read_", stem, "_fields")?;
            let deserialize = fn_ident("deserialize_", stem, "")?;
            let doc = format!("Reads `{name}` through `{}`.", custom.path);
            out.extend(quote! {
                #[doc = #doc]
                pub fn #read_fields(reader: &mut ::serial_stream::Reader<'_>, value: &mut #rust_type) -> #unit {
                    #companion::deserialize(reader, value)
                }

                #[doc = #doc]
                pub fn #deserialize(
                    reader: &mut ::serial_stream::Reader<'_>,
                    object: &mut dyn ::serial_stream::WireObject,
                ) -> #unit {
                    let value = ::serial_stream::downcast_mut::<#rust_type>(object, #sig)?;
                    #read_fields(reader, value)
                }
            });
        }
        if tp.ops.instantiate {
            let instantiate = fn_ident("instantiate_", stem, "")?;
            let object = result_of(&quote!(::serial_stream::ObjectRef));
            let doc = format!("Creates a `{name}` for the reader.");
            let body = if custom.instantiate {
                quote!(Ok(::serial_stream::new_object(#companion::instantiate(reader)?)))
            } else {
                quote! {
                    let _ = reader;
                    Ok(::serial_stream::new_object(<#rust_type as ::core::default::Default>::default()))
                }
            };
            out.extend(quote! {
                #[doc = #doc]
                pub fn #instantiate(reader: &mut ::serial_stream::Reader<'_>) -> #object {
                    #body
                }
            });
        }
        Ok(out)
    }

    fn enum_items(
        tp: &TypePlan,
        model: &FieldSerializerModel,
        stem: &str,
    ) -> Result<TokenStream, EmitError> {
        let name = &model.name;
        let ty = naming::type_ident(name)?;
        let sig = naming::signature_const(name)?;
        let mut names = Names::new(name);
        let mut variants = Vec::new();
        for value in &model.enum_values {
            let ident = naming::ident(value)?;
            names.claim(&ident, value)?;
            variants.push(ident);
        }
        let count = variants.len();
        let ordinals = (0..count).map(|i| i32::try_from(i).unwrap_or(i32::MAX));
        let doc = format!(
            "Generated from enum `{name}` ({}).",
            tp.classification.variant_name()
        );
        let unit = result_of(&quote!(()));
        let mut out = quote! {
            #[doc = #doc]
            #[allow(non_camel_case_types)]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum #ty {
                #(
                    #[allow(missing_docs)]
                    #variants,
                )*
            }

            impl #ty {
                /// Constants in ordinal order.
                pub const VALUES: [#ty; #count] = [#(#ty::#variants),*];

                /// Position of this constant in declaration order.
                pub fn ordinal(self) -> i32 {
                    match self {
                        #(#ty::#variants => #ordinals,)*
                    }
                }

                /// Constant at `ordinal`, if in range.
                pub fn from_ordinal(ordinal: i32) -> ::core::option::Option<Self> {
                    usize::try_from(ordinal)
                        .ok()
                        .and_then(|i| Self::VALUES.get(i).copied())
                }
            }

            impl ::serial_stream::WireObject for #ty {
                fn type_signature(&self) -> &'static str {
                    #sig
                }
                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }
                fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                    self
                }
            }
        };
        if tp.ops.serialize {
            let serialize = fn_ident("serialize_", stem, "")?;
            let doc = format!("Writes the ordinal of a `{name}` constant.");
            out.extend(quote! {
                #[doc = #doc]
                pub fn #serialize(
                    writer: &mut ::serial_stream::Writer<'_>,
                    object: &dyn ::serial_stream::WireObject,
                ) -> #unit {
                    let value = ::serial_stream::downcast_ref::<#ty>(object, #sig)?;
                    writer.write_int(value.ordinal());
                    Ok(())
                }
            });
        }
        if tp.ops.deserialize {
            let deserialize = fn_ident("deserialize_", stem, "")?;
            let doc = format!("`{name}` constants carry no fields.");
            out.extend(quote! {
                #[doc = #doc]
                pub fn #deserialize(
                    _reader: &mut ::serial_stream::Reader<'_>,
                    object: &mut dyn ::serial_stream::WireObject,
                ) -> #unit {
                    ::serial_stream::downcast_mut::<#ty>(object, #sig)?;
                    Ok(())
                }
            });
        }
        if tp.ops.instantiate {
            let instantiate = fn_ident("instantiate_", stem, "")?;
            let object = result_of(&quote!(::serial_stream::ObjectRef));
            let doc = format!("Reads an ordinal and returns the matching `{name}` constant.");
            out.extend(quote! {
                #[doc = #doc]
                pub fn #instantiate(reader: &mut ::serial_stream::Reader<'_>) -> #object {
                    let ordinal = reader.read_int()?;
                    let value = #ty::from_ordinal(ordinal).ok_or_else(|| {
                        ::serial_stream::SerializationError::MalformedStream(::std::format!(
                            "ordinal {} out of range for {}",
                            ordinal,
                            #sig
                        ))
                    })?;
                    Ok(::serial_stream::new_object(value))
                }
            });
        }
        Ok(out)
    }

    fn table_entry(
        tp: &TypePlan,
        model: &FieldSerializerModel,
        stem: &str,
    ) -> Result<TokenStream, EmitError> {
        let sig = naming::signature_const(&model.name)?;
        let op = |enabled: bool, prefix: &str| -> Result<TokenStream, EmitError> {
            if enabled {
                let ident = fn_ident(prefix, stem, "")?;
                Ok(quote!(::core::option::Option::Some(#ident)))
            } else {
                Ok(quote!(::core::option::Option::None))
            }
        };
        let serialize = op(tp.ops.serialize, "serialize_")?;
        let deserialize = op(tp.ops.deserialize, "deserialize_")?;
        let instantiate = op(tp.ops.instantiate, "instantiate_")?;
        Ok(quote! {
            (#sig, ::serial_stream::FieldSerializer {
                serialize: #serialize,
                deserialize: #deserialize,
                instantiate: #instantiate,
            })
        })
    }

    fn dispatch(table: &BTreeMap<String, TokenStream>) -> TokenStream {
        let count = table.len();
        let entries = table.values();
        quote! {
            /// Field serializers sorted by type signature.
            pub static FIELD_SERIALIZERS: [(&str, ::serial_stream::FieldSerializer); #count] = [
                #(#entries),*
            ];
        }
    }

    fn endpoint_items(&self) -> Result<TokenStream, EmitError> {
        let name = &self.endpoint.name;
        let simple = naming::simple_name(name);
        let serializer = naming::ident(&format!("{simple}TypeSerializer"))?;
        let imp = naming::ident(&format!("{simple}Impl"))?;
        let mut methods = Vec::new();
        let mut names = Names::new(name);
        for method in &self.endpoint.methods {
            let ident = naming::member_ident(&method.name)?;
            names.claim(&ident, &method.name)?;
            let doc = format!("`{}` on `{name}`.", method.name);
            methods.push(match &method.shape {
                MethodShape::Factory => quote! {
                    #[doc = #doc]
                    pub fn #ident(&self) -> #serializer {
                        #serializer
                    }
                },
                MethodShape::Read { returns } => {
                    let ret = result_of(&value_type(returns));
                    let expr = read_expr(returns)?;
                    quote! {
                        #[doc = #doc]
                        pub fn #ident(&self, reader: &mut ::serial_stream::Reader<'_>) -> #ret {
                            #expr
                        }
                    }
                }
                MethodShape::Write { params } => {
                    let mut params_names = Names::new(&format!("{name}.{}", method.name));
                    params_names.claim(&naming::ident("writer")?, "<writer>")?;
                    let mut args = Vec::new();
                    let mut stmts = Vec::new();
                    for (param, ty) in params {
                        let ident = naming::member_ident(param)?;
                        params_names.claim(&ident, param)?;
                        let (arg_ty, stmt) = write_param(self.plan, &ident, ty)?;
                        args.push(quote!(#ident: #arg_ty));
                        stmts.push(stmt);
                    }
                    let unit = result_of(&quote!(()));
                    quote! {
                        #[doc = #doc]
                        pub fn #ident(&self, #(#args,)* writer: &mut ::serial_stream::Writer<'_>) -> #unit {
                            #(#stmts)*
                            Ok(())
                        }
                    }
                }
            });
        }
        let doc_ser = format!("Signature dispatch for `{name}`.");
        let doc_imp = format!("Generated implementation of `{name}`.");
        Ok(quote! {
            #[doc = #doc_ser]
            #[derive(Debug, Clone, Copy, Default)]
            pub struct #serializer;

            impl ::serial_stream::TypeSerializer for #serializer {
                fn serializer(&self, signature: &str) -> ::core::option::Option<&::serial_stream::FieldSerializer> {
                    ::serial_stream::lookup_sorted(&FIELD_SERIALIZERS, signature)
                }
            }

            #[doc = #doc_imp]
            #[derive(Debug, Clone, Copy, Default)]
            pub struct #imp;

            impl #imp {
                #(#methods)*
            }
        })
    }
}

/// Parameter names, underscored when the body does not use them.
fn param_names(unused: bool, stream: &str) -> Result<(Ident, Ident), NamingError> {
    if unused {
        Ok((naming::ident(&format!("_{stream}"))?, naming::ident("_value")?))
    } else {
        Ok((naming::ident(stream)?, naming::ident("value")?))
    }
}

/// Borrowed parameter type for a write root, and the statements writing it.
/// A declared root is checked against the signatures the plan can write in
/// its place before anything reaches the stream.
fn write_param(
    plan: &FieldSerializerPlan,
    ident: &Ident,
    ty: &TypeRef,
) -> Result<(TokenStream, TokenStream), EmitError> {
    Ok(match ty {
        TypeRef::Primitive(Primitive::String) => {
            (quote!(&str), quote!(writer.write_string(#ident)?;))
        }
        TypeRef::Primitive(p) => {
            let call = stream_ident(*p, "write")?;
            (primitive_type(*p), quote!(writer.#call(#ident);))
        }
        TypeRef::Declared(name) => {
            let accepted = plan.writable_as(name);
            (
                quote!(::core::option::Option<&::serial_stream::ObjectRef>),
                quote! {
                    if let ::core::option::Option::Some(object) = #ident {
                        ::serial_stream::expect_signature(object, #name, &[#(#accepted),*])?;
                    }
                    writer.write_object(#ident)?;
                },
            )
        }
        TypeRef::Array { .. } => {
            let element = ty.element().map_or_else(TokenStream::new, |e| value_type(&e));
            let (expr, _) = write_expr(ty, &quote!(#ident), true)?;
            (quote!(&[#element]), quote!(#expr?;))
        }
    })
}

fn array_items(tp: &TypePlan, leaf: &TypeRef, rank: u8) -> Result<TokenStream, EmitError> {
    let ty = &tp.ty;
    let element = ty.element().unwrap_or_else(|| leaf.clone());
    let element_ty = value_type(&element);
    let mut out = TokenStream::new();
    if tp.ops.serialize {
        let helper = naming::array_writer(leaf, rank)?;
        let (expr, fallible) = write_expr(&element, &quote!(element), true)?;
        let stmt = if fallible {
            quote!(#expr?;)
        } else {
            quote!(#expr;)
        };
        let unit = result_of(&quote!(()));
        let doc = format!("Writes a `{ty}` as a length followed by its elements.");
        out.extend(quote! {
            #[doc = #doc]
            pub fn #helper(writer: &mut ::serial_stream::Writer<'_>, value: &[#element_ty]) -> #unit {
                writer.write_length(value.len())?;
                for element in value {
                    #stmt
                }
                Ok(())
            }
        });
    }
    if tp.ops.deserialize {
        let helper = naming::array_reader(leaf, rank)?;
        let expr = read_expr(&element)?;
        let ret = result_of(&value_type(ty));
        let doc = format!("Reads a `{ty}` written as a length followed by its elements.");
        out.extend(quote! {
            #[doc = #doc]
            pub fn #helper(reader: &mut ::serial_stream::Reader<'_>) -> #ret {
                let len = reader.read_length()?;
                let mut out = ::std::vec::Vec::with_capacity(len);
                for _ in 0..len {
                    out.push(#expr?);
                }
                Ok(out)
            }
        });
    }
    Ok(out)
}
