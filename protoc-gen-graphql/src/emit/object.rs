//! GraphQL object type emission.
//!
//! One constructor per `Object` symbol. Field resolvers downcast the source
//! value to the prost message and hand the accessor value to the engine;
//! enum fields resolve to the value's string name, well-known scalars go
//! through the runtime serialize helpers, and each oneof surfaces as a
//! synthetic field typed with its union.

use proc_macro2::TokenStream;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::FieldDescriptorProto;
use quote::{format_ident, quote};

use super::{downcast_source, resolver_body, rust_path, type_ref_tokens};
use crate::error::GeneratorError;
use crate::model::{FileModel, MessageModel};
use crate::params::MapStrategy;
use crate::symbol::{normalize_fqn, Role, Symbol};
use crate::translate::{graphql_field_name, rust_field_ident, Translator};

/// Emit the object constructor for a message symbol.
pub fn emit(
    translator: &Translator<'_, '_>,
    model: &FileModel<'_>,
    symbol: &Symbol,
) -> Result<TokenStream, GeneratorError> {
    let message = model
        .message(&symbol.ident.fqn)
        .ok_or_else(|| GeneratorError::CodeGen(format!("unknown message {}", symbol.ident.fqn)))?;
    let name = symbol.graphql_name();
    let fn_ident = format_ident!("{}", name);
    let source_type = rust_path(&translator.rust_type_path(&symbol.ident.fqn)?)?;

    let mut fields: Vec<TokenStream> = Vec::new();
    for field in message.plain_fields() {
        fields.push(emit_field(translator, message, field, &source_type)?);
    }
    for oneof in &message.oneofs {
        fields.push(emit_oneof_field(translator, message, oneof, &source_type)?);
    }

    Ok(quote! {
        #[allow(non_snake_case)]
        #[allow(unused_imports)]
        pub fn #fn_ident() -> async_graphql::dynamic::Object {
            use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, TypeRef};
            Object::new(#name)
                #(.field(#fields))*
        }
    })
}

fn emit_field(
    translator: &Translator<'_, '_>,
    message: &MessageModel<'_>,
    field: &FieldDescriptorProto,
    source_type: &TokenStream,
) -> Result<TokenStream, GeneratorError> {
    let gql_name = graphql_field_name(field);
    let optional = field.proto3_optional.unwrap_or(false);
    let info = translator.field_type(field, Role::Object, optional)?;
    let type_ref = type_ref_tokens(&info);
    let downcast = downcast_source(source_type);
    let access_ident = rust_field_ident(field.name.as_deref().unwrap_or(""));
    let access = quote! { source.#access_ident };

    let body = if translator.is_map_field(field) {
        map_field_body(translator, message, field, access)?
    } else {
        let repeated = field.label == Some(Label::Repeated as i32);
        resolver_body(translator, field, access, repeated, optional)?
    };

    Ok(quote! {
        Field::new(#gql_name, #type_ref, |ctx| {
            FieldFuture::new(async move {
                #downcast
                #body
            })
        })
    })
}

// Map fields either collapse into the JSON scalar or fan out into a list of
// key/value shim objects, depending on the configured strategy.
fn map_field_body(
    translator: &Translator<'_, '_>,
    _message: &MessageModel<'_>,
    field: &FieldDescriptorProto,
    access: TokenStream,
) -> Result<TokenStream, GeneratorError> {
    let entry_fqn = field.type_name.as_deref().unwrap_or("");
    let entry = translator
        .model
        .map_entry(entry_fqn)
        .ok_or_else(|| GeneratorError::CodeGen(format!("unknown map entry {entry_fqn}")))?;
    let value_field = entry
        .field
        .iter()
        .find(|f| f.number == Some(2))
        .ok_or_else(|| GeneratorError::CodeGen(format!("map entry {entry_fqn} without value")))?;

    match translator.params.map_fields {
        MapStrategy::Json => {
            let is_message_value = value_field.r#type() == Type::Message
                && crate::translate::well_known(value_field.type_name.as_deref().unwrap_or(""))
                    .is_none();
            if is_message_value {
                Ok(quote! {
                    Ok(Some(FieldValue::value(graphql_edge::message_map(&#access)?)))
                })
            } else {
                Ok(quote! {
                    Ok(Some(FieldValue::value(graphql_edge::scalar_map(&#access)?)))
                })
            }
        }
        MapStrategy::Pairs => Ok(quote! {
            Ok(Some(FieldValue::list(#access.iter().map(|(key, value)| {
                FieldValue::owned_any((key.clone(), value.clone()))
            }))))
        }),
    }
}

// The synthetic field named after the oneof. Its resolver discriminates on
// the oneof enum and tags the member value with its object type.
fn emit_oneof_field(
    translator: &Translator<'_, '_>,
    message: &MessageModel<'_>,
    oneof: &crate::model::OneofModel<'_>,
    source_type: &TokenStream,
) -> Result<TokenStream, GeneratorError> {
    let union_name = format!("Union_{}_{}", normalize_fqn(&message.fqn), oneof.name);
    let field_ident = rust_field_ident(&oneof.name);
    let downcast = downcast_source(source_type);

    let oneof_enum = oneof_enum_path(translator, message, &oneof.name)?;
    let mut arms: Vec<TokenStream> = Vec::new();
    for member in &oneof.fields {
        if member.r#type() != Type::Message {
            continue;
        }
        let variant = format_ident!(
            "{}",
            heck::ToUpperCamelCase::to_upper_camel_case(member.name.as_deref().unwrap_or(""))
        );
        let member_object = format!(
            "Object_{}",
            normalize_fqn(member.type_name.as_deref().unwrap_or(""))
        );
        arms.push(quote! {
            Some(#oneof_enum::#variant(value)) => {
                Some(FieldValue::owned_any(value).with_type(#member_object))
            }
        });
    }

    let field_name = oneof.name.as_str();
    Ok(quote! {
        Field::new(#field_name, TypeRef::named(#union_name), |ctx| {
            FieldFuture::new(async move {
                #downcast
                Ok(match source.#field_ident.clone() {
                    #(#arms)*
                    _ => None,
                })
            })
        })
    })
}

// Rust path of the prost oneof enum: parent modules in snake case, then the
// UpperCamel oneof name.
fn oneof_enum_path(
    translator: &Translator<'_, '_>,
    message: &MessageModel<'_>,
    oneof_name: &str,
) -> Result<TokenStream, GeneratorError> {
    use heck::{ToSnakeCase, ToUpperCamelCase};
    let package = &translator.model.package;
    let relative = message
        .fqn
        .trim_start_matches('.')
        .strip_prefix(package.as_str())
        .map(|rest| rest.trim_start_matches('.'))
        .unwrap_or_else(|| message.fqn.trim_start_matches('.'));
    let mut path = String::new();
    for segment in relative.split('.') {
        path.push_str(&segment.to_snake_case());
        path.push_str("::");
    }
    path.push_str(&oneof_name.to_upper_camel_case());
    rust_path(&path)
}
