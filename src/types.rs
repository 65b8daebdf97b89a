//! Wire-type to Rust-type mapping and emitted-name hygiene.

use lazy_static::lazy_static;
use rustc_hash::FxHashSet;

use crate::{
    definition::{Member, ServiceDefinition, Shape, ShapeType},
    strings::to_snake_case,
    Error, Result,
};

lazy_static! {
    /// type names that cannot be emitted verbatim: prelude and std names
    /// that shadow at every use site, plus the legacy trio kept for
    /// call-site compatibility
    static ref RESERVED_TYPE_NAMES: FxHashSet<&'static str> = [
        "Object", "Class", "Trait",
        "Box", "Clone", "Copy", "Default", "Drop", "Error", "Iterator", "Option",
        "Result", "Self", "Send", "String", "Sync", "Vec",
    ]
    .iter()
    .copied()
    .collect();

    /// field names needing a trailing underscore to stay legal Rust
    static ref RESERVED_FIELD_NAMES: FxHashSet<&'static str> = [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else",
        "enum", "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop",
        "match", "mod", "move", "mut", "pub", "ref", "return", "self", "static",
        "struct", "super", "trait", "true", "type", "unsafe", "use", "where", "while",
    ]
    .iter()
    .copied()
    .collect();
}

/// Capitalize the first character in the given string.
pub(crate) fn capitalize_first<S: Into<String>>(word: S) -> String {
    let s = word.into();
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Emitted class name for a shape or operation name. Capitalizes the first
/// letter, strips underscores (acronym casing survives), and prefixes
/// `Aws` when the result would collide with a reserved type name.
/// Idempotent.
pub(crate) fn class_name(name: &str) -> String {
    let capitalized = capitalize_first(name).replace('_', "");
    if RESERVED_TYPE_NAMES.contains(capitalized.as_str()) {
        format!("Aws{}", capitalized)
    } else {
        capitalized
    }
}

/// Emitted field name for a structure member; reserved words get a
/// trailing underscore.
pub(crate) fn field_name(member_name: &str) -> String {
    let name = to_snake_case(member_name);
    if RESERVED_FIELD_NAMES.contains(name.as_str()) {
        name + "_"
    } else {
        name
    }
}

/// Emitted method name for an operation.
pub(crate) fn method_name(operation_name: &str) -> String {
    field_name(operation_name)
}

/// Resolves wire shapes to the Rust types and doc types carried by
/// emitted code. Runtime types appear by bare name; emitted classes
/// import them from the runtime crate.
pub(crate) struct TypeMapper<'g> {
    def: &'g dyn ServiceDefinition,
}

impl<'g> TypeMapper<'g> {
    pub fn new(def: &'g dyn ServiceDefinition) -> Self {
        TypeMapper { def }
    }

    /// Rust type of a scalar shape
    pub fn scalar_type(&self, shape_type: ShapeType) -> String {
        match shape_type {
            ShapeType::Boolean => "bool".to_string(),
            ShapeType::Integer => "i32".to_string(),
            // wide integers stay numeric; see DESIGN.md
            ShapeType::Long => "i64".to_string(),
            ShapeType::Blob => "Vec<u8>".to_string(),
            ShapeType::Timestamp => "DateTime".to_string(),
            _ => "String".to_string(),
        }
    }

    /// Rust type stored for a member, without optionality applied.
    /// Streaming members bypass the shape mapping entirely.
    pub fn member_type(&self, member: &Member) -> Result<String> {
        if member.streaming {
            return Ok("StreamingBody".to_string());
        }
        let shape = self.def.resolve_shape(&member.shape)?;
        self.shape_rust_type(&member.shape, shape)
    }

    fn shape_rust_type(&self, shape_name: &str, shape: &Shape) -> Result<String> {
        Ok(match shape.shape_type {
            ShapeType::Structure => class_name(shape_name),
            ShapeType::List => {
                let element = shape.list_member(shape_name)?;
                format!("Vec<{}>", self.member_type(element)?)
            }
            ShapeType::Map => {
                let (_, value) = self.map_entries(shape_name, shape)?;
                format!("std::collections::HashMap<String, {}>", self.member_type(value)?)
            }
            scalar => self.scalar_type(scalar),
        })
    }

    /// key and value members of a map shape; complex keys are a schema error
    pub fn map_entries<'s>(&self, shape_name: &str, shape: &'s Shape) -> Result<(&'s Member, &'s Member)> {
        let key = shape
            .key
            .as_ref()
            .ok_or_else(|| Error::UnsupportedShape(shape_name.to_string(), "map without key".to_string()))?;
        let value = shape
            .value
            .as_ref()
            .ok_or_else(|| Error::UnsupportedShape(shape_name.to_string(), "map without value".to_string()))?;
        let key_shape = self.def.resolve_shape(&key.shape)?;
        if key_shape.shape_type != ShapeType::String {
            return Err(Error::ComplexMapKey(shape_name.to_string()));
        }
        Ok((key, value))
    }

    /// type named in doc comments; containers spell out their element type
    pub fn doc_type(&self, member: &Member) -> Result<String> {
        if member.streaming {
            return Ok("StreamingBody".to_string());
        }
        let shape = self.def.resolve_shape(&member.shape)?;
        Ok(match shape.shape_type {
            ShapeType::Structure => class_name(&member.shape),
            ShapeType::List => {
                let element = shape.list_member(&member.shape)?;
                format!("Vec<{}>", self.doc_type(element)?)
            }
            ShapeType::Map => {
                let (_, value) = self.map_entries(&member.shape, shape)?;
                format!("HashMap<String, {}>", self.doc_type(value)?)
            }
            ShapeType::Timestamp => "DateTime".to_string(),
            scalar => self.scalar_type(scalar),
        })
    }
}
