//! GraphQL union emission for oneof declarations.
//!
//! The union's possible types are the message members in field order. Member
//! selection happens in the surface field's resolver, which matches on the
//! oneof discriminator and tags the value with its object type.

use proc_macro2::TokenStream;
use prost_types::field_descriptor_proto::Type;
use quote::{format_ident, quote};

use crate::error::GeneratorError;
use crate::model::FileModel;
use crate::symbol::{normalize_fqn, Role, Symbol};
use crate::translate::Translator;

/// Emit the union constructor for a oneof symbol.
pub fn emit(
    _translator: &Translator<'_, '_>,
    model: &FileModel<'_>,
    symbol: &Symbol,
) -> Result<TokenStream, GeneratorError> {
    let (message_fqn, oneof_name) = symbol
        .ident
        .fqn
        .rsplit_once('.')
        .ok_or_else(|| GeneratorError::CodeGen(format!("bad oneof fqn {}", symbol.ident.fqn)))?;
    let message = model
        .message(message_fqn)
        .ok_or_else(|| GeneratorError::CodeGen(format!("unknown message {message_fqn}")))?;
    let oneof = message
        .oneofs
        .iter()
        .find(|o| o.name == oneof_name)
        .ok_or_else(|| GeneratorError::CodeGen(format!("unknown oneof {}", symbol.ident.fqn)))?;

    let member_role = match symbol.ident.role {
        Role::Union => "Object",
        _ => "Input",
    };
    let members: Vec<String> = oneof
        .fields
        .iter()
        .filter(|member| member.r#type() == Type::Message)
        .map(|member| {
            format!(
                "{}_{}",
                member_role,
                normalize_fqn(member.type_name.as_deref().unwrap_or(""))
            )
        })
        .collect();

    let name = symbol.graphql_name();
    let fn_ident = format_ident!("{}", name);
    Ok(quote! {
        #[allow(non_snake_case)]
        #[allow(unused_imports)]
        pub fn #fn_ident() -> async_graphql::dynamic::Union {
            use async_graphql::dynamic::Union;
            Union::new(#name)
                #(.possible_type(#members))*
        }
    })
}
