//! Protobuf type to GraphQL type translation.
//!
//! Produces a [`TypeInfo`] for every field or type reference: the GraphQL
//! name with its wrapping flags plus the Rust type path the emitted resolver
//! bodies use. Scalars are non-null; message, enum and wrapper references
//! are nullable (protobuf absent-singular semantics); `repeated X` is a
//! nullable list of the base rule.

use heck::{ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use once_cell::sync::Lazy;
use prost_types::field_descriptor_proto::Type;
use prost_types::FieldDescriptorProto;
use std::collections::HashMap;

use crate::error::GeneratorError;
use crate::model::{DescriptorSetIndex, FileModel};
use crate::params::{MapStrategy, Parameters};
use crate::symbol::{normalize_fqn, Role};

/// A `google.protobuf` type with a preallocated runtime representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnown {
    Empty,
    Timestamp,
    Duration,
    /// One of the `*Value` wrapper types, by bare name.
    Wrapper(&'static str),
}

static WELL_KNOWN: Lazy<HashMap<&'static str, WellKnown>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert("google.protobuf.Empty", WellKnown::Empty);
    table.insert("google.protobuf.Timestamp", WellKnown::Timestamp);
    table.insert("google.protobuf.Duration", WellKnown::Duration);
    for wrapper in [
        "BoolValue",
        "StringValue",
        "BytesValue",
        "FloatValue",
        "DoubleValue",
        "Int64Value",
        "Int32Value",
        "UInt64Value",
        "UInt32Value",
        "SInt64Value",
        "SInt32Value",
        "Fixed64Value",
        "Fixed32Value",
        "SFixed64Value",
        "SFixed32Value",
    ] {
        let leaked: &'static str =
            Box::leak(format!("google.protobuf.{wrapper}").into_boxed_str());
        table.insert(leaked, WellKnown::Wrapper(wrapper));
    }
    table
});

/// Look up the runtime substitution for a `google.protobuf` FQN.
pub fn well_known(fqn: &str) -> Option<WellKnown> {
    WELL_KNOWN.get(fqn.trim_start_matches('.')).copied()
}

/// The GraphQL shape of one field or type reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeInfo {
    /// Base name without role prefix (`String`, `hello_Hello`, `Timestamp`).
    pub name: String,
    /// Role prefix (`Object`, `Input`, `Enum`, `Map`); empty for scalars.
    pub prefix: String,
    /// Rust module path owning the generated constructor; empty when local.
    pub module: String,
    /// Trailing role marker (`Input` on input-role wrapper and map names).
    pub suffix: String,
    pub is_scalar: bool,
    pub is_list: bool,
    pub is_non_null: bool,
    /// Concrete Rust type used in resolver bodies; empty for plain scalars.
    pub rust_type: String,
}

impl TypeInfo {
    /// The GraphQL type name referenced by the emitted `TypeRef`.
    pub fn graphql_name(&self) -> String {
        if self.prefix.is_empty() {
            self.name.clone()
        } else {
            format!("{}_{}{}", self.prefix, self.name, self.suffix)
        }
    }
}

/// Translates fields of one file against the request-wide descriptor index.
pub struct Translator<'m, 'a> {
    pub model: &'m FileModel<'a>,
    pub set: &'m DescriptorSetIndex<'a>,
    pub params: &'m Parameters,
}

impl Translator<'_, '_> {
    /// Translate a field in the given role. `optional` suppresses the scalar
    /// non-null rule: oneof members and proto3 `optional` fields are
    /// explicitly nullable.
    pub fn field_type(
        &self,
        field: &FieldDescriptorProto,
        role: Role,
        optional: bool,
    ) -> Result<TypeInfo, GeneratorError> {
        use prost_types::field_descriptor_proto::Label;
        let repeated = field.label == Some(Label::Repeated as i32);
        let mut info = self.base_type(field, role)?;
        if optional {
            info.is_non_null = false;
        }
        if repeated && !self.is_map_field(field) {
            info.is_list = true;
        }
        Ok(info)
    }

    /// Translate a message reference (RPC input or output position).
    pub fn message_type(&self, fqn: &str, role: Role) -> Result<TypeInfo, GeneratorError> {
        if let Some(known) = well_known(fqn) {
            return Ok(self.well_known_type(known, role));
        }
        let prefix = match role {
            Role::Input => "Input",
            _ => "Object",
        };
        Ok(TypeInfo {
            name: normalize_fqn(fqn),
            prefix: prefix.to_string(),
            module: self.module_of(fqn)?,
            rust_type: self.rust_type_path(fqn)?,
            ..Default::default()
        })
    }

    fn base_type(
        &self,
        field: &FieldDescriptorProto,
        role: Role,
    ) -> Result<TypeInfo, GeneratorError> {
        let scalar = |name: &str| TypeInfo {
            name: name.to_string(),
            is_scalar: true,
            is_non_null: true,
            ..Default::default()
        };
        match field.r#type() {
            Type::Float | Type::Double => Ok(scalar("Float")),
            Type::Int32
            | Type::Int64
            | Type::Uint32
            | Type::Uint64
            | Type::Sint32
            | Type::Sint64
            | Type::Fixed32
            | Type::Fixed64
            | Type::Sfixed32
            | Type::Sfixed64 => Ok(scalar("Int")),
            Type::Bool => Ok(scalar("Boolean")),
            Type::String => Ok(scalar("String")),
            Type::Bytes => Ok(scalar("bytes")),
            Type::Enum => {
                let fqn = field.type_name.as_deref().unwrap_or("");
                Ok(TypeInfo {
                    name: normalize_fqn(fqn),
                    prefix: "Enum".to_string(),
                    module: self.module_of(fqn)?,
                    rust_type: self.rust_type_path(fqn)?,
                    ..Default::default()
                })
            }
            Type::Message | Type::Group => {
                let fqn = field.type_name.as_deref().unwrap_or("");
                if let Some(entry) = self.model.map_entry(fqn) {
                    return Ok(self.map_type(fqn, entry, role));
                }
                self.message_type(fqn, role)
            }
        }
    }

    fn map_type(
        &self,
        fqn: &str,
        _entry: &prost_types::DescriptorProto,
        role: Role,
    ) -> TypeInfo {
        match self.params.map_fields {
            MapStrategy::Json => TypeInfo {
                name: "JSON".to_string(),
                is_scalar: true,
                ..Default::default()
            },
            MapStrategy::Pairs => TypeInfo {
                name: normalize_fqn(fqn),
                prefix: "Map".to_string(),
                suffix: if role == Role::Input {
                    "Input".to_string()
                } else {
                    String::new()
                },
                is_list: true,
                ..Default::default()
            },
        }
    }

    fn well_known_type(&self, known: WellKnown, role: Role) -> TypeInfo {
        match known {
            WellKnown::Empty => TypeInfo {
                name: "Empty".to_string(),
                is_scalar: true,
                rust_type: "()".to_string(),
                ..Default::default()
            },
            WellKnown::Timestamp => TypeInfo {
                name: "Timestamp".to_string(),
                is_scalar: true,
                rust_type: "::prost_types::Timestamp".to_string(),
                ..Default::default()
            },
            WellKnown::Duration => TypeInfo {
                name: "Duration".to_string(),
                is_scalar: true,
                rust_type: "::prost_types::Duration".to_string(),
                ..Default::default()
            },
            WellKnown::Wrapper(wrapper) => TypeInfo {
                name: format!("wrapperspb_{wrapper}"),
                prefix: if role == Role::Input { "Input" } else { "Object" }.to_string(),
                suffix: if role == Role::Input {
                    "Input".to_string()
                } else {
                    String::new()
                },
                rust_type: wrapper_rust_type(wrapper).to_string(),
                ..Default::default()
            },
        }
    }

    /// Whether a field is a protobuf map (references a local map entry).
    pub fn is_map_field(&self, field: &FieldDescriptorProto) -> bool {
        field
            .type_name
            .as_deref()
            .is_some_and(|t| self.model.map_entry(t).is_some())
    }

    fn module_of(&self, fqn: &str) -> Result<String, GeneratorError> {
        let owner = self
            .set
            .owner_of(fqn)
            .ok_or_else(|| GeneratorError::UnknownDependency(fqn.to_string()))?;
        if owner == self.model.name {
            return Ok(String::new());
        }
        self.params
            .module_for(owner)
            .ok_or_else(|| GeneratorError::MissingModuleMapping(owner.to_string()))
    }

    /// Rust path of the prost-generated type for `fqn`, relative to the
    /// emitted module (extern modules prepended when the owner differs).
    pub fn rust_type_path(&self, fqn: &str) -> Result<String, GeneratorError> {
        let owner = self
            .set
            .owner_of(fqn)
            .ok_or_else(|| GeneratorError::UnknownDependency(fqn.to_string()))?;
        let package = self
            .set
            .file(owner)
            .and_then(|f| f.package.as_deref())
            .unwrap_or("");
        let relative = fqn
            .trim_start_matches('.')
            .strip_prefix(package)
            .map(|rest| rest.trim_start_matches('.'))
            .unwrap_or_else(|| fqn.trim_start_matches('.'));
        let segments: Vec<&str> = relative.split('.').collect();
        let mut path = String::new();
        if owner != self.model.name {
            path.push_str(
                &self
                    .params
                    .module_for(owner)
                    .ok_or_else(|| GeneratorError::MissingModuleMapping(owner.to_string()))?,
            );
            path.push_str("::");
        }
        for parent in &segments[..segments.len() - 1] {
            path.push_str(&parent.to_snake_case());
            path.push_str("::");
        }
        path.push_str(&segments[segments.len() - 1].to_upper_camel_case());
        Ok(path)
    }
}

fn wrapper_rust_type(wrapper: &str) -> &'static str {
    match wrapper {
        "BoolValue" => "bool",
        "StringValue" => "String",
        "BytesValue" => "Vec<u8>",
        "FloatValue" => "f32",
        "DoubleValue" => "f64",
        "Int32Value" | "SInt32Value" | "SFixed32Value" => "i32",
        "Int64Value" | "SInt64Value" | "SFixed64Value" => "i64",
        "UInt32Value" | "Fixed32Value" => "u32",
        "UInt64Value" | "Fixed64Value" => "u64",
        _ => "()",
    }
}

/// The GraphQL field name: the JSON name when protoc supplies one, otherwise
/// the lower-camel conversion of the proto name.
pub fn graphql_field_name(field: &FieldDescriptorProto) -> String {
    match field.json_name.as_deref() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => field
            .name
            .as_deref()
            .unwrap_or("")
            .to_lower_camel_case(),
    }
}

/// The Rust accessor for a proto field, with keyword escaping.
pub fn rust_field_ident(name: &str) -> proc_macro2::Ident {
    escape_rust_keyword(&name.to_snake_case())
}

/// Escape Rust keywords by prefixing with r#.
pub fn escape_rust_keyword(name: &str) -> proc_macro2::Ident {
    const RUST_KEYWORDS: &[&str] = &[
        "as", "break", "const", "continue", "crate", "else", "enum", "extern",
        "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
        "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct",
        "super", "trait", "true", "type", "unsafe", "use", "where", "while",
        "async", "await", "dyn", "abstract", "become", "box", "do", "final",
        "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
    ];

    if RUST_KEYWORDS.contains(&name) {
        quote::format_ident!("r#{}", name)
    } else {
        quote::format_ident!("{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_lookup() {
        assert_eq!(
            well_known(".google.protobuf.Timestamp"),
            Some(WellKnown::Timestamp)
        );
        assert_eq!(
            well_known("google.protobuf.StringValue"),
            Some(WellKnown::Wrapper("StringValue"))
        );
        assert_eq!(well_known(".hello.Hello"), None);
    }

    #[test]
    fn test_graphql_name_composition() {
        let scalar = TypeInfo {
            name: "String".to_string(),
            is_scalar: true,
            is_non_null: true,
            ..Default::default()
        };
        assert_eq!(scalar.graphql_name(), "String");

        let input = TypeInfo {
            name: "hello_Hello".to_string(),
            prefix: "Input".to_string(),
            ..Default::default()
        };
        assert_eq!(input.graphql_name(), "Input_hello_Hello");

        let wrapper_input = TypeInfo {
            name: "wrapperspb_StringValue".to_string(),
            prefix: "Input".to_string(),
            suffix: "Input".to_string(),
            ..Default::default()
        };
        assert_eq!(
            wrapper_input.graphql_name(),
            "Input_wrapperspb_StringValueInput"
        );
    }

    #[test]
    fn test_graphql_field_name() {
        let mut field = FieldDescriptorProto {
            name: Some("first_name".to_string()),
            ..Default::default()
        };
        assert_eq!(graphql_field_name(&field), "firstName");
        field.json_name = Some("firstName".to_string());
        assert_eq!(graphql_field_name(&field), "firstName");
    }

    #[test]
    fn test_rust_field_ident_escapes_keywords() {
        assert_eq!(rust_field_ident("type").to_string(), "r#type");
        assert_eq!(rust_field_ident("first_name").to_string(), "first_name");
    }
}
