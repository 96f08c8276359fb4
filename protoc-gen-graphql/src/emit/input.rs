//! GraphQL input object emission.
//!
//! Input objects mirror their message's fields without resolvers. Oneof
//! members appear as individual optional fields; at most one should be set,
//! which protobuf enforces when the request message is built.

use proc_macro2::TokenStream;
use prost_types::FieldDescriptorProto;
use quote::{format_ident, quote};

use super::type_ref_tokens;
use crate::error::GeneratorError;
use crate::model::FileModel;
use crate::symbol::{Role, Symbol};
use crate::translate::{graphql_field_name, Translator};

/// Emit the input object constructor for a message symbol.
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

    let mut fields: Vec<TokenStream> = Vec::new();
    for field in message.plain_fields() {
        fields.push(emit_field(translator, field, false)?);
    }
    for oneof in &message.oneofs {
        for member in &oneof.fields {
            fields.push(emit_field(translator, member, true)?);
        }
    }

    Ok(quote! {
        #[allow(non_snake_case)]
        #[allow(unused_imports)]
        pub fn #fn_ident() -> async_graphql::dynamic::InputObject {
            use async_graphql::dynamic::{InputObject, InputValue, TypeRef};
            InputObject::new(#name)
                #(.field(#fields))*
        }
    })
}

fn emit_field(
    translator: &Translator<'_, '_>,
    field: &FieldDescriptorProto,
    oneof_member: bool,
) -> Result<TokenStream, GeneratorError> {
    let gql_name = graphql_field_name(field);
    let mut info = translator.field_type(field, Role::Input, oneof_member)?;
    // proto3 optional fields are explicitly nullable in input position.
    if field.proto3_optional.unwrap_or(false) {
        info.is_non_null = false;
    }
    let type_ref = type_ref_tokens(&info);
    Ok(quote! {
        InputValue::new(#gql_name, #type_ref)
    })
}
