//! Emission of the generated GraphQL artifact.
//!
//! The emitter walks the symbol table in insertion order and builds every
//! declaration as a token stream; the assembled file is printed once all
//! symbols are known. Output is formatted with prettyplease and then passed
//! through `rustfmt` when one is on the PATH (stdin/stdout bound, awaited);
//! without it the prettyplease output ships as-is.

mod enums;
mod input;
mod map_entry;
mod object;
mod service;
mod union;

use std::io::Write as _;
use std::process::{Command, Stdio};

use proc_macro2::TokenStream;
use prost_types::field_descriptor_proto::Type;
use prost_types::FieldDescriptorProto;
use quote::{format_ident, quote};

use crate::error::GeneratorError;
use crate::model::FileModel;
use crate::symbol::{Role, SymbolKind, SymbolTable};
use crate::translate::{well_known, TypeInfo, Translator, WellKnown};

/// Emit the complete artifact for one file.
pub fn emit_file(
    translator: &Translator<'_, '_>,
    model: &FileModel<'_>,
    table: &SymbolTable,
) -> Result<String, GeneratorError> {
    let mut items: Vec<TokenStream> = Vec::new();

    for symbol in table.iter() {
        if symbol.ident.file != model.name {
            continue;
        }
        let item = match symbol.kind {
            SymbolKind::Enum => enums::emit(model, symbol)?,
            SymbolKind::Message => match symbol.ident.role {
                Role::Input => input::emit(translator, model, symbol)?,
                _ => object::emit(translator, model, symbol)?,
            },
            SymbolKind::Oneof => union::emit(translator, model, symbol)?,
            SymbolKind::MapEntry => map_entry::emit(translator, model, symbol)?,
        };
        items.push(item);
    }

    for svc in &model.services {
        if !svc.queries.is_empty() {
            items.push(service::emit(translator, model, svc, service::OperationTable::Queries)?);
        }
        if !svc.mutations.is_empty() {
            items.push(service::emit(
                translator,
                model,
                svc,
                service::OperationTable::Mutations,
            )?);
        }
    }

    items.push(emit_hook(model, table));

    let tokens = quote! { #(#items)* };
    Ok(format_artifact(tokens, &model.name))
}

// The initialization hook: registers every generated output, input, enum,
// union, and map type owned by this file.
fn emit_hook(model: &FileModel<'_>, table: &SymbolTable) -> TokenStream {
    let mut calls: Vec<TokenStream> = Vec::new();
    for symbol in table.iter() {
        if symbol.ident.file != model.name {
            continue;
        }
        let ctor = format_ident!("{}", symbol.graphql_name());
        let call = match (symbol.kind, symbol.ident.role) {
            (SymbolKind::Message, Role::Input) | (SymbolKind::MapEntry, Role::Input) => {
                quote! { registry.register_type(graphql_edge::GraphType::Input(#ctor())); }
            }
            (SymbolKind::Message, _) | (SymbolKind::MapEntry, _) => {
                quote! { registry.register_type(graphql_edge::GraphType::Object(#ctor())); }
            }
            (SymbolKind::Enum, _) => {
                quote! { registry.register_type(graphql_edge::GraphType::Enum(#ctor())); }
            }
            // Output-role unions are referenced by object fields; input-role
            // unions are declared but never referenced by the schema.
            (SymbolKind::Oneof, Role::Union) => {
                quote! { registry.register_type(graphql_edge::GraphType::Union(#ctor())); }
            }
            (SymbolKind::Oneof, _) => continue,
        };
        calls.push(call);
    }
    if calls.is_empty() {
        return quote! {
            /// Register every GraphQL type generated for this file.
            pub fn register_graphql_types(_registry: &mut graphql_edge::TypeRegistry) {}
        };
    }
    quote! {
        /// Register every GraphQL type generated for this file.
        pub fn register_graphql_types(registry: &mut graphql_edge::TypeRegistry) {
            #(#calls)*
        }
    }
}

/// Compose the `TypeRef` expression for a translated type, outside-in:
/// `list(nonNull(name))`.
pub(super) fn type_ref_tokens(info: &TypeInfo) -> TokenStream {
    let name = info.graphql_name();
    let mut tokens = quote! { TypeRef::named(#name) };
    if info.is_non_null {
        tokens = quote! { TypeRef::NonNull(Box::new(#tokens)) };
    }
    if info.is_list {
        tokens = quote! { TypeRef::List(Box::new(#tokens)) };
    }
    tokens
}

/// Parse a Rust type path produced by the translator into tokens.
pub(super) fn rust_path(path: &str) -> Result<TokenStream, GeneratorError> {
    path.parse::<TokenStream>()
        .map_err(|e| GeneratorError::CodeGen(format!("bad rust path {path:?}: {e}")))
}

/// Statement downcasting the resolver source to the parent message.
pub(super) fn downcast_source(rust_type: &TokenStream) -> TokenStream {
    quote! {
        let source = ctx
            .parent_value
            .try_downcast_ref::<#rust_type>()
            .map_err(|_| graphql_edge::EdgeError::BadValue)?;
    }
}

/// Resolver tail for a singular or repeated non-map field. `access` is the
/// expression reading the field from the downcast source; `optional` marks
/// explicit presence (proto3 `optional`), which stores scalars as `Option`.
pub(super) fn resolver_body(
    translator: &Translator<'_, '_>,
    field: &FieldDescriptorProto,
    access: TokenStream,
    repeated: bool,
    optional: bool,
) -> Result<TokenStream, GeneratorError> {
    let tokens = match field.r#type() {
        Type::Enum => {
            let enum_path =
                rust_path(&translator.rust_type_path(field.type_name.as_deref().unwrap_or(""))?)?;
            if repeated {
                quote! {
                    let mut items = Vec::with_capacity(#access.len());
                    for raw in &#access {
                        let value = #enum_path::try_from(*raw)
                            .map_err(|_| graphql_edge::EdgeError::BadValue)?;
                        items.push(FieldValue::value(value.as_str_name()));
                    }
                    Ok(Some(FieldValue::list(items)))
                }
            } else if optional {
                quote! {
                    Ok(match #access {
                        Some(raw) => {
                            let value = #enum_path::try_from(raw)
                                .map_err(|_| graphql_edge::EdgeError::BadValue)?;
                            Some(FieldValue::value(value.as_str_name()))
                        }
                        None => None,
                    })
                }
            } else {
                quote! {
                    let value = #enum_path::try_from(#access)
                        .map_err(|_| graphql_edge::EdgeError::BadValue)?;
                    Ok(Some(FieldValue::value(value.as_str_name())))
                }
            }
        }
        Type::Message | Type::Group => {
            let fqn = field.type_name.as_deref().unwrap_or("");
            match well_known(fqn) {
                Some(WellKnown::Empty) => quote! {
                    Ok(None)
                },
                Some(WellKnown::Timestamp) => {
                    if repeated {
                        quote! {
                            let mut items = Vec::with_capacity(#access.len());
                            for value in &#access {
                                items.push(FieldValue::value(graphql_edge::serialize_timestamp(value)?));
                            }
                            Ok(Some(FieldValue::list(items)))
                        }
                    } else {
                        quote! {
                            Ok(match #access.as_ref() {
                                Some(value) => {
                                    Some(FieldValue::value(graphql_edge::serialize_timestamp(value)?))
                                }
                                None => None,
                            })
                        }
                    }
                }
                Some(WellKnown::Duration) => {
                    if repeated {
                        quote! {
                            let mut items = Vec::with_capacity(#access.len());
                            for value in &#access {
                                items.push(FieldValue::value(graphql_edge::serialize_duration(value)?));
                            }
                            Ok(Some(FieldValue::list(items)))
                        }
                    } else {
                        quote! {
                            Ok(match #access.as_ref() {
                                Some(value) => {
                                    Some(FieldValue::value(graphql_edge::serialize_duration(value)?))
                                }
                                None => None,
                            })
                        }
                    }
                }
                // Wrappers and plain messages both resolve by handing the
                // cloned value to the engine as the child source.
                _ => {
                    if repeated {
                        quote! {
                            Ok(Some(FieldValue::list(
                                #access.iter().cloned().map(FieldValue::owned_any),
                            )))
                        }
                    } else {
                        quote! {
                            Ok(#access.clone().map(FieldValue::owned_any))
                        }
                    }
                }
            }
        }
        Type::Bytes => {
            if repeated {
                quote! {
                    Ok(Some(FieldValue::list(
                        #access
                            .iter()
                            .map(|item| FieldValue::value(graphql_edge::encode_bytes(item))),
                    )))
                }
            } else if optional {
                quote! {
                    Ok(#access
                        .as_ref()
                        .map(|item| FieldValue::value(graphql_edge::encode_bytes(item))))
                }
            } else {
                quote! {
                    Ok(Some(FieldValue::value(graphql_edge::encode_bytes(&#access))))
                }
            }
        }
        _ => {
            if repeated {
                quote! {
                    Ok(Some(FieldValue::value(async_graphql::Value::List(
                        #access
                            .iter()
                            .map(|item| async_graphql::Value::from(item.clone()))
                            .collect(),
                    ))))
                }
            } else if optional {
                quote! {
                    Ok(#access.clone().map(FieldValue::value))
                }
            } else {
                quote! {
                    Ok(Some(FieldValue::value(#access.clone())))
                }
            }
        }
    };
    Ok(tokens)
}

/// Format the assembled artifact and prepend the generated-file header.
pub(super) fn format_artifact(tokens: TokenStream, source: &str) -> String {
    let raw = tokens.to_string();
    let formatted = match syn::parse_file(&raw) {
        Ok(parsed) => prettyplease::unparse(&parsed),
        Err(_) => raw,
    };
    let formatted = rustfmt(&formatted).unwrap_or(formatted);
    format!(
        "// Code generated by protoc-gen-graphql. DO NOT EDIT.\n// source: {source}\n\n{formatted}"
    )
}

fn rustfmt(source: &str) -> Option<String> {
    let mut child = Command::new("rustfmt")
        .arg("--edition")
        .arg("2021")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .ok()?;
    child.stdin.take()?.write_all(source.as_bytes()).ok()?;
    let output = child.wait_with_output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_composes_outside_in() {
        let info = TypeInfo {
            name: "String".to_string(),
            is_scalar: true,
            is_list: true,
            is_non_null: true,
            ..Default::default()
        };
        let rendered = type_ref_tokens(&info).to_string();
        let compact: String = rendered.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(
            compact,
            r#"TypeRef::List(Box::new(TypeRef::NonNull(Box::new(TypeRef::named("String")))))"#
        );
    }

    #[test]
    fn test_type_ref_nullable_named() {
        let info = TypeInfo {
            name: "hello_Hello".to_string(),
            prefix: "Object".to_string(),
            ..Default::default()
        };
        let rendered = type_ref_tokens(&info).to_string();
        let compact: String = rendered.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(compact, r#"TypeRef::named("Object_hello_Hello")"#);
    }
}
