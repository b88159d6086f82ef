// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Source-name → Rust-identifier mapping.

use proc_macro2::{Ident, Span};
use serial_oracle::{Primitive, TypeRef};
use thiserror::Error;

/// A source name that cannot become a Rust identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("`{name}` cannot be used as a Rust identifier")]
pub struct NamingError {
    /// Offending source name.
    pub name: String,
}

/// Simple name of a declared type: last segment, `$` → `_`.
pub fn simple_name(fqn: &str) -> String {
    fqn.rsplit('.').next().unwrap_or(fqn).replace('$', "_")
}

/// `camelCase` / `PascalCase` → `snake_case`.
pub fn snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `com.example.Outer$Inner` → `COM_EXAMPLE_OUTER_INNER`.
pub fn upper_snake(fqn: &str) -> String {
    fqn.split(['.', '$'])
        .map(|seg| snake(seg).to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Name of the `SIGNATURE_*` constant for a declared type.
pub fn signature_const(fqn: &str) -> Result<Ident, NamingError> {
    ident(&format!("SIGNATURE_{}", upper_snake(fqn)))
}

/// Identifier of the generated struct or enum for a declared type.
pub fn type_ident(fqn: &str) -> Result<Ident, NamingError> {
    ident(&simple_name(fqn))
}

/// Snake-case stem used in per-type function names.
pub fn type_stem(fqn: &str) -> String {
    snake(&simple_name(fqn))
}

/// Snake-case stem of an array leaf, unique per fully-qualified name.
pub fn leaf_stem(leaf: &TypeRef) -> String {
    match leaf {
        TypeRef::Primitive(p) => primitive_stem(*p).to_owned(),
        other => other
            .to_string()
            .split(['.', '$'])
            .map(snake)
            .collect::<Vec<_>>()
            .join("_"),
    }
}

fn primitive_stem(p: Primitive) -> &'static str {
    p.stream_suffix()
}

/// `write_array_<leaf>_rank<n>`.
pub fn array_writer(leaf: &TypeRef, rank: u8) -> Result<Ident, NamingError> {
    ident(&format!("write_array_{}_rank{rank}", leaf_stem(leaf)))
}

/// `read_array_<leaf>_rank<n>`.
pub fn array_reader(leaf: &TypeRef, rank: u8) -> Result<Ident, NamingError> {
    ident(&format!("read_array_{}_rank{rank}", leaf_stem(leaf)))
}

/// Rust identifier for a field or method name (snake-cased, raw when it
/// collides with a keyword).
pub fn member_ident(name: &str) -> Result<Ident, NamingError> {
    ident(&snake(name))
}

/// Build an identifier, using a raw identifier for keywords and a trailing
/// underscore for the few keywords that cannot be raw.
pub fn ident(text: &str) -> Result<Ident, NamingError> {
    let mut chars = text.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid || text == "_" {
        return Err(NamingError {
            name: text.to_owned(),
        });
    }
    if syn::parse_str::<Ident>(text).is_ok() {
        return Ok(Ident::new(text, Span::call_site()));
    }
    match text {
        "self" | "Self" | "super" | "crate" => Ok(Ident::new(&format!("{text}_"), Span::call_site())),
        _ => Ok(Ident::new_raw(text, Span::call_site())),
    }
}
