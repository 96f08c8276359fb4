//! Map shim emission (`pairs` strategy only).
//!
//! One object and one input object per map-entry FQN, each carrying exactly
//! `key` and `value` fields typed after the map's key and value descriptors.
//! The parent field resolver hands each entry to the engine as an owned
//! `(key, value)` tuple.

use proc_macro2::TokenStream;
use prost_types::FieldDescriptorProto;
use quote::{format_ident, quote};

use super::{downcast_source, rust_path, type_ref_tokens};
use crate::error::GeneratorError;
use crate::model::FileModel;
use crate::symbol::{Role, Symbol};
use crate::translate::Translator;

/// Emit the map shim constructor for a map-entry symbol.
pub fn emit(
    translator: &Translator<'_, '_>,
    model: &FileModel<'_>,
    symbol: &Symbol,
) -> Result<TokenStream, GeneratorError> {
    let entry = model
        .map_entry(&symbol.ident.fqn)
        .ok_or_else(|| GeneratorError::CodeGen(format!("unknown map entry {}", symbol.ident.fqn)))?;
    let key_field = entry_field(entry, 1, &symbol.ident.fqn)?;
    let value_field = entry_field(entry, 2, &symbol.ident.fqn)?;

    match symbol.ident.role {
        Role::Input => emit_input(translator, symbol, key_field, value_field),
        _ => emit_object(translator, symbol, key_field, value_field),
    }
}

fn entry_field<'a>(
    entry: &'a prost_types::DescriptorProto,
    number: i32,
    fqn: &str,
) -> Result<&'a FieldDescriptorProto, GeneratorError> {
    entry
        .field
        .iter()
        .find(|f| f.number == Some(number))
        .ok_or_else(|| GeneratorError::CodeGen(format!("malformed map entry {fqn}")))
}

fn emit_object(
    translator: &Translator<'_, '_>,
    symbol: &Symbol,
    key_field: &FieldDescriptorProto,
    value_field: &FieldDescriptorProto,
) -> Result<TokenStream, GeneratorError> {
    let name = symbol.graphql_name();
    let fn_ident = format_ident!("{}", name);

    let key_info = translator.field_type(key_field, Role::Object, false)?;
    let value_info = translator.field_type(value_field, Role::Object, false)?;
    let key_ref = type_ref_tokens(&key_info);
    let value_ref = type_ref_tokens(&value_info);

    let tuple_type = entry_tuple_type(translator, key_field, value_field)?;
    let downcast = downcast_source(&tuple_type);
    let key_body = entry_value_body(translator, key_field, quote! { source.0 })?;
    let value_body = entry_value_body(translator, value_field, quote! { source.1 })?;

    Ok(quote! {
        #[allow(non_snake_case)]
        #[allow(unused_imports)]
        pub fn #fn_ident() -> async_graphql::dynamic::Object {
            use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
            Object::new(#name)
                .field(Field::new("key", #key_ref, |ctx| {
                    FieldFuture::new(async move {
                        #downcast
                        #key_body
                    })
                }))
                .field(Field::new("value", #value_ref, |ctx| {
                    FieldFuture::new(async move {
                        #downcast
                        #value_body
                    })
                }))
        }
    })
}

fn emit_input(
    translator: &Translator<'_, '_>,
    symbol: &Symbol,
    key_field: &FieldDescriptorProto,
    value_field: &FieldDescriptorProto,
) -> Result<TokenStream, GeneratorError> {
    let name = symbol.graphql_name();
    let fn_ident = format_ident!("{}", name);
    let key_info = translator.field_type(key_field, Role::Input, false)?;
    let value_info = translator.field_type(value_field, Role::Input, false)?;
    let key_ref = type_ref_tokens(&key_info);
    let value_ref = type_ref_tokens(&value_info);

    Ok(quote! {
        #[allow(non_snake_case)]
        #[allow(unused_imports)]
        pub fn #fn_ident() -> async_graphql::dynamic::InputObject {
            use async_graphql::dynamic::{InputObject, InputValue, TypeRef};
            InputObject::new(#name)
                .field(InputValue::new("key", #key_ref))
                .field(InputValue::new("value", #value_ref))
        }
    })
}

// Resolver tail for one side of the entry tuple. Unlike message fields, map
// values are stored directly, without the Option wrapper.
fn entry_value_body(
    translator: &Translator<'_, '_>,
    field: &FieldDescriptorProto,
    access: TokenStream,
) -> Result<TokenStream, GeneratorError> {
    use crate::translate::{well_known, WellKnown};
    use prost_types::field_descriptor_proto::Type;
    let tokens = match field.r#type() {
        Type::Enum => {
            let enum_path =
                rust_path(&translator.rust_type_path(field.type_name.as_deref().unwrap_or(""))?)?;
            quote! {
                let value = #enum_path::try_from(#access)
                    .map_err(|_| graphql_edge::EdgeError::BadValue)?;
                Ok(Some(FieldValue::value(value.as_str_name())))
            }
        }
        Type::Bytes => quote! {
            Ok(Some(FieldValue::value(graphql_edge::encode_bytes(&#access))))
        },
        Type::Message | Type::Group => {
            match well_known(field.type_name.as_deref().unwrap_or("")) {
                Some(WellKnown::Empty) => quote! { Ok(None) },
                Some(WellKnown::Timestamp) => quote! {
                    Ok(Some(FieldValue::value(graphql_edge::serialize_timestamp(&#access)?)))
                },
                Some(WellKnown::Duration) => quote! {
                    Ok(Some(FieldValue::value(graphql_edge::serialize_duration(&#access)?)))
                },
                Some(WellKnown::Wrapper(_)) => quote! {
                    Ok(#access.clone().map(FieldValue::owned_any))
                },
                None => quote! {
                    Ok(Some(FieldValue::owned_any(#access.clone())))
                },
            }
        }
        _ => quote! {
            Ok(Some(FieldValue::value(#access.clone())))
        },
    };
    Ok(tokens)
}

// The owned `(key, value)` tuple the parent resolver hands to the engine.
fn entry_tuple_type(
    translator: &Translator<'_, '_>,
    key_field: &FieldDescriptorProto,
    value_field: &FieldDescriptorProto,
) -> Result<TokenStream, GeneratorError> {
    let key = scalar_rust_type(key_field, translator)?;
    let value = scalar_rust_type(value_field, translator)?;
    Ok(quote! { (#key, #value) })
}

fn scalar_rust_type(
    field: &FieldDescriptorProto,
    translator: &Translator<'_, '_>,
) -> Result<TokenStream, GeneratorError> {
    use prost_types::field_descriptor_proto::Type;
    let tokens = match field.r#type() {
        Type::Double => quote! { f64 },
        Type::Float => quote! { f32 },
        Type::Int64 | Type::Sfixed64 | Type::Sint64 => quote! { i64 },
        Type::Uint64 | Type::Fixed64 => quote! { u64 },
        Type::Int32 | Type::Sfixed32 | Type::Sint32 => quote! { i32 },
        Type::Uint32 | Type::Fixed32 => quote! { u32 },
        Type::Bool => quote! { bool },
        Type::String => quote! { String },
        Type::Bytes => quote! { Vec<u8> },
        Type::Enum => quote! { i32 },
        Type::Message | Type::Group => {
            use crate::translate::{well_known, WellKnown};
            let fqn = field.type_name.as_deref().unwrap_or("");
            match well_known(fqn) {
                Some(WellKnown::Empty) => quote! { () },
                Some(WellKnown::Timestamp) => quote! { ::prost_types::Timestamp },
                Some(WellKnown::Duration) => quote! { ::prost_types::Duration },
                Some(WellKnown::Wrapper(wrapper)) => {
                    let inner = rust_path(wrapper_primitive(wrapper))?;
                    quote! { Option<#inner> }
                }
                None => rust_path(&translator.rust_type_path(fqn)?)?,
            }
        }
    };
    Ok(tokens)
}

fn wrapper_primitive(wrapper: &str) -> &'static str {
    match wrapper {
        "BoolValue" => "bool",
        "StringValue" => "String",
        "BytesValue" => "Vec<u8>",
        "FloatValue" => "f32",
        "DoubleValue" => "f64",
        "UInt32Value" | "Fixed32Value" => "u32",
        "UInt64Value" | "Fixed64Value" => "u64",
        "Int64Value" | "SInt64Value" | "SFixed64Value" => "i64",
        _ => "i32",
    }
}
