// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Type references as they appear in signatures and field declarations.

use std::fmt;

use crate::error::OracleError;

/// Primitive wire kinds. `String` has its own stream calls and string table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Primitive {
    /// `boolean`
    Boolean,
    /// `byte` (signed 8-bit)
    Byte,
    /// `char` (Unicode scalar)
    Char,
    /// `short` (signed 16-bit)
    Short,
    /// `int` (signed 32-bit)
    Int,
    /// `long` (signed 64-bit)
    Long,
    /// `float` (IEEE 754 binary32)
    Float,
    /// `double` (IEEE 754 binary64)
    Double,
    /// UTF-8 string, deduplicated through the string table.
    String,
}

impl Primitive {
    /// All primitive kinds in declaration order.
    pub const ALL: [Primitive; 9] = [
        Primitive::Boolean,
        Primitive::Byte,
        Primitive::Char,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
        Primitive::String,
    ];

    /// Resolve a source-level primitive name.
    pub fn from_name(name: &str) -> Option<Self> {
        let p = match name {
            "boolean" | "bool" => Primitive::Boolean,
            "byte" | "i8" => Primitive::Byte,
            "char" => Primitive::Char,
            "short" | "i16" => Primitive::Short,
            "int" | "i32" => Primitive::Int,
            "long" | "i64" => Primitive::Long,
            "float" | "f32" => Primitive::Float,
            "double" | "f64" => Primitive::Double,
            "String" | "string" | "java.lang.String" => Primitive::String,
            _ => return None,
        };
        Some(p)
    }

    /// Canonical name, also used when rendering a [`TypeRef`].
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::String => "String",
        }
    }

    /// Suffix of the matching `write_*`/`read_*` stream call.
    pub fn stream_suffix(self) -> &'static str {
        match self {
            Primitive::Boolean => "bool",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::String => "string",
        }
    }
}

/// A reference to a type: primitive, array, or declared (generics erased).
///
/// The derived order (primitives, then arrays, then declared names
/// lexicographically) is the stable order used for every enumeration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeRef {
    /// A primitive or string.
    Primitive(Primitive),
    /// An array of `rank` dimensions over a non-array `leaf`.
    Array {
        /// Element type at the innermost dimension; never an array.
        leaf: Box<TypeRef>,
        /// Number of dimensions, at least 1.
        rank: u8,
    },
    /// A declared class, enum, or interface by fully-qualified name.
    Declared(String),
}

impl TypeRef {
    /// Shorthand for a declared type.
    pub fn declared(name: impl Into<String>) -> Self {
        TypeRef::Declared(name.into())
    }

    /// Wrap `leaf` in `rank` array dimensions. A `rank` of 0 returns `leaf`.
    pub fn array_of(leaf: TypeRef, rank: u8) -> Self {
        if rank == 0 {
            return leaf;
        }
        match leaf {
            TypeRef::Array { leaf, rank: inner } => TypeRef::Array {
                leaf,
                rank: inner.saturating_add(rank),
            },
            other => TypeRef::Array {
                leaf: Box::new(other),
                rank,
            },
        }
    }

    /// Parse a source-style type name.
    ///
    /// Accepts primitives (`int`, `String`), array suffixes (`int[][]`), and
    /// declared names with generic arguments, which are erased
    /// (`java.util.List<a.B>` → `java.util.List`).
    pub fn parse(text: &str) -> Result<Self, OracleError> {
        let bad = |reason| OracleError::BadTypeName {
            name: text.to_owned(),
            reason,
        };
        let mut base = text.trim();
        if base.is_empty() {
            return Err(bad("empty type name"));
        }
        let mut rank: u8 = 0;
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end();
            rank = rank.checked_add(1).ok_or_else(|| bad("too many array dimensions"))?;
        }
        let raw = erase_generics(base).map_err(bad)?;
        validate_qualified_name(raw).map_err(bad)?;
        let leaf = Primitive::from_name(raw)
            .map_or_else(|| TypeRef::Declared(raw.to_owned()), TypeRef::Primitive);
        Ok(TypeRef::array_of(leaf, rank))
    }

    /// Element type of an array: one rank lower, or the leaf at rank 1.
    pub fn element(&self) -> Option<TypeRef> {
        match self {
            TypeRef::Array { leaf, rank } if *rank > 1 => Some(TypeRef::Array {
                leaf: leaf.clone(),
                rank: rank - 1,
            }),
            TypeRef::Array { leaf, .. } => Some((**leaf).clone()),
            _ => None,
        }
    }

    /// The declared name, if this is a declared type.
    pub fn declared_name(&self) -> Option<&str> {
        match self {
            TypeRef::Declared(name) => Some(name),
            _ => None,
        }
    }

    /// The primitive kind, if this is a primitive.
    pub fn primitive(&self) -> Option<Primitive> {
        match self {
            TypeRef::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Whether this is an array type.
    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array { .. })
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Primitive(p) => f.write_str(p.name()),
            TypeRef::Array { leaf, rank } => {
                write!(f, "{leaf}")?;
                for _ in 0..*rank {
                    f.write_str("[]")?;
                }
                Ok(())
            }
            TypeRef::Declared(name) => f.write_str(name),
        }
    }
}

fn erase_generics(base: &str) -> Result<&str, &'static str> {
    let Some(open) = base.find('<') else {
        if base.contains('>') {
            return Err("unbalanced generic brackets");
        }
        return Ok(base);
    };
    if !base.ends_with('>') {
        return Err("trailing text after generic arguments");
    }
    let mut depth: i32 = 0;
    for (i, c) in base.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 && i + 1 != base.len() {
                    return Err("trailing text after generic arguments");
                }
            }
            _ => {}
        }
        if depth < 0 {
            return Err("unbalanced generic brackets");
        }
    }
    if depth != 0 {
        return Err("unbalanced generic brackets");
    }
    Ok(base[..open].trim_end())
}

fn validate_qualified_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("empty type name");
    }
    for segment in name.split('.') {
        let mut chars = segment.chars();
        match chars.next() {
            None => return Err("empty name segment"),
            Some(c) if c.is_ascii_digit() => return Err("segment starts with a digit"),
            Some(_) => {}
        }
        if !segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            return Err("invalid character in type name");
        }
    }
    Ok(())
}
