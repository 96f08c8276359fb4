//! GraphQL enum emission.
//!
//! Items are the proto value names. The name/number tables live on the
//! prost-generated enum (`as_str_name`/`try_from`), which the field
//! resolvers use; the GraphQL enum itself serializes by name.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::error::GeneratorError;
use crate::model::FileModel;
use crate::symbol::Symbol;

/// Emit the enum constructor for an enum symbol.
pub fn emit(model: &FileModel<'_>, symbol: &Symbol) -> Result<TokenStream, GeneratorError> {
    let descriptor = model
        .enum_type(&symbol.ident.fqn)
        .ok_or_else(|| GeneratorError::CodeGen(format!("unknown enum {}", symbol.ident.fqn)))?;
    let name = symbol.graphql_name();
    let fn_ident = format_ident!("{}", name);
    let items: Vec<&str> = descriptor
        .value
        .iter()
        .filter_map(|value| value.name.as_deref())
        .collect();

    Ok(quote! {
        #[allow(non_snake_case)]
        #[allow(unused_imports)]
        pub fn #fn_ident() -> async_graphql::dynamic::Enum {
            use async_graphql::dynamic::Enum;
            Enum::new(#name)
                #(.item(#items))*
        }
    })
}
