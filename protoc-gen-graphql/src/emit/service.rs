//! Service registration emission.
//!
//! One registration function per operation kind for every service with at
//! least one GraphQL-visible RPC. Each registered field takes a single
//! `input` argument typed with the operation's input object, returns the
//! operation's output object, and resolves by decoding the input into a
//! request message, calling the tonic client inside a tracing span, and
//! handing the response back as the source value.

use heck::ToSnakeCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use super::{rust_path, type_ref_tokens};
use crate::error::GeneratorError;
use crate::model::{FileModel, OperationModel, ServiceModel};
use crate::symbol::Role;
use crate::translate::{well_known, Translator, WellKnown};

/// Which operation table a registration function populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationTable {
    Queries,
    Mutations,
}

/// Emit `register_<service>_queries` or `register_<service>_mutations`.
pub fn emit(
    translator: &Translator<'_, '_>,
    _model: &FileModel<'_>,
    service: &ServiceModel<'_>,
    table: OperationTable,
) -> Result<TokenStream, GeneratorError> {
    let (operations, suffix, register) = match table {
        OperationTable::Queries => (&service.queries, "queries", quote! { register_query }),
        OperationTable::Mutations => (&service.mutations, "mutations", quote! { register_mutation }),
    };
    let fn_ident = format_ident!("register_{}_{}", service.name.to_snake_case(), suffix);
    let client_ident = format_ident!("{}Client", service.name);
    let client_module = format_ident!("{}_client", service.name.to_snake_case());
    let service_name = service.name.as_str();

    let mut registrations: Vec<TokenStream> = Vec::new();
    for operation in operations {
        registrations.push(emit_operation(translator, service_name, operation, &register)?);
    }

    let doc = format!(
        "Register the GraphQL {suffix} of `{service_name}` against the registry.",
    );
    Ok(quote! {
        #[doc = #doc]
        #[allow(unused_imports)]
        pub fn #fn_ident(
            registry: &mut graphql_edge::TypeRegistry,
            client: #client_module::#client_ident<tonic::transport::Channel>,
        ) -> Result<(), graphql_edge::RegistryError> {
            use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, TypeRef};
            #(#registrations)*
            Ok(())
        }
    })
}

fn emit_operation(
    translator: &Translator<'_, '_>,
    service_name: &str,
    operation: &OperationModel<'_>,
    register: &TokenStream,
) -> Result<TokenStream, GeneratorError> {
    let operation_name = operation.name.as_str();
    let method_name = operation.method.name.as_deref().unwrap_or("");
    let method_ident = format_ident!("{}", method_name.to_snake_case());

    let input_fqn = operation.method.input_type.as_deref().unwrap_or("");
    let output_fqn = operation.method.output_type.as_deref().unwrap_or("");
    let input_info = translator.message_type(input_fqn, Role::Input)?;
    let output_info = translator.message_type(output_fqn, Role::Object)?;
    let input_ref = type_ref_tokens(&input_info);
    let output_ref = type_ref_tokens(&output_info);

    let decode = decode_tokens(translator, input_fqn)?;
    let respond = respond_tokens(output_fqn);

    Ok(quote! {
        {
            let client = client.clone();
            registry.#register(
                #operation_name,
                Field::new(#operation_name, #output_ref, move |ctx| {
                    let client = client.clone();
                    FieldFuture::new(async move {
                        let mut client = client;
                        let input = match ctx.args.get("input") {
                            Some(value) => value.deserialize::<serde_json::Value>()?,
                            None => serde_json::Value::Null,
                        };
                        #decode
                        let span = tracing::info_span!(
                            "grpc_call",
                            service = #service_name,
                            method = #method_name,
                        );
                        let response = tracing::Instrument::instrument(
                            client.#method_ident(request),
                            span,
                        )
                        .await
                        .map_err(|status| async_graphql::Error::new(status.to_string()))?
                        .into_inner();
                        #respond
                    })
                })
                .argument(InputValue::new("input", #input_ref)),
            )?;
        }
    })
}

// How the `input` argument becomes the request message.
fn decode_tokens(
    translator: &Translator<'_, '_>,
    input_fqn: &str,
) -> Result<TokenStream, GeneratorError> {
    let tokens = match well_known(input_fqn) {
        Some(WellKnown::Empty) => quote! {
            let _ = input;
            let request = ();
        },
        Some(WellKnown::Timestamp) => quote! {
            let request = match input {
                serde_json::Value::String(literal) => graphql_edge::parse_timestamp(&literal)?,
                _ => {
                    return Err(graphql_edge::EdgeError::InvalidRequest(
                        "expected a Timestamp literal".to_string(),
                    )
                    .into());
                }
            };
        },
        Some(WellKnown::Duration) => quote! {
            let request = match input {
                serde_json::Value::String(literal) => graphql_edge::parse_duration(&literal)?,
                _ => {
                    return Err(graphql_edge::EdgeError::InvalidRequest(
                        "expected a Duration literal".to_string(),
                    )
                    .into());
                }
            };
        },
        _ => {
            let request_type = rust_path(&translator.rust_type_path(input_fqn)?)?;
            quote! {
                let request: #request_type = graphql_edge::decode_request(input)?;
            }
        }
    };
    Ok(tokens)
}

// How the gRPC response becomes the resolver result.
fn respond_tokens(output_fqn: &str) -> TokenStream {
    match well_known(output_fqn) {
        Some(WellKnown::Empty) => quote! {
            let _ = response;
            Ok(None)
        },
        Some(WellKnown::Timestamp) => quote! {
            Ok(Some(FieldValue::value(graphql_edge::serialize_timestamp(&response)?)))
        },
        Some(WellKnown::Duration) => quote! {
            Ok(Some(FieldValue::value(graphql_edge::serialize_duration(&response)?)))
        },
        _ => quote! {
            Ok(Some(FieldValue::owned_any(response)))
        },
    }
}
