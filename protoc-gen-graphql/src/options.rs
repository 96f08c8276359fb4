//! `(graphql.type)` method option extraction.
//!
//! The option is a custom extension on `google.protobuf.MethodOptions`
//! carrying `query: "<name>"` or `mutation: "<name>"`. protoc resolves the
//! extension when `graphql.proto` is imported, but prost drops unknown
//! extensions while decoding the request, so the raw request bytes are
//! re-read through a `prost_reflect::DescriptorPool` built from the request's
//! own descriptor set. Descriptors built by hand in unit tests carry the
//! option as an `uninterpreted_option` instead; both paths feed the same
//! index, which is threaded explicitly through the pipeline.

use std::collections::HashMap;

use prost::Message;
use prost_reflect::{DescriptorPool, Value};
use prost_types::compiler::CodeGeneratorRequest;
use prost_types::{FileDescriptorSet, UninterpretedOption};

use crate::error::GeneratorError;

const TYPE_EXTENSION_NAME: &str = "graphql.type";

/// Whether an RPC is exposed as a GraphQL query or mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    /// The option key and error label for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
        }
    }
}

/// The raw `(graphql.type)` option value read from one method.
#[derive(Debug, Clone, Default)]
pub struct GraphqlOption {
    pub query: Option<String>,
    pub mutation: Option<String>,
}

impl GraphqlOption {
    /// Promote the option to an operation. Presence of both `query` and
    /// `mutation` is a configuration error.
    pub fn operation(&self, method: &str) -> Result<Option<(OperationKind, String)>, GeneratorError> {
        match (self.query.as_deref(), self.mutation.as_deref()) {
            (Some(_), Some(_)) => Err(GeneratorError::BadOption {
                method: method.to_string(),
                reason: "both query and mutation set".to_string(),
            }),
            (Some(""), None) | (None, Some("")) => Err(GeneratorError::BadOption {
                method: method.to_string(),
                reason: "empty operation name".to_string(),
            }),
            (Some(name), None) => Ok(Some((OperationKind::Query, name.to_string()))),
            (None, Some(name)) => Ok(Some((OperationKind::Mutation, name.to_string()))),
            (None, None) => Ok(None),
        }
    }
}

/// Index of `(graphql.type)` options keyed by (file, service, method).
#[derive(Debug, Default)]
pub struct OptionIndex {
    options: HashMap<(String, String, String), GraphqlOption>,
}

impl OptionIndex {
    /// Build the index from the decoded request, using the raw bytes for
    /// extension recovery when available.
    pub fn collect(raw: Option<&[u8]>, request: &CodeGeneratorRequest) -> Self {
        let mut index = OptionIndex::default();
        index.collect_uninterpreted(request);
        if let Some(bytes) = raw {
            index.collect_extensions(bytes);
        }
        index
    }

    /// Look up the option for one method.
    pub fn get(&self, file: &str, service: &str, method: &str) -> Option<&GraphqlOption> {
        self.options
            .get(&(file.to_string(), service.to_string(), method.to_string()))
    }

    // Fallback path: read options protoc left uninterpreted (hand-built
    // descriptors in tests take this route).
    fn collect_uninterpreted(&mut self, request: &CodeGeneratorRequest) {
        for file in &request.proto_file {
            let file_name = file.name.as_deref().unwrap_or("");
            for service in &file.service {
                let service_name = service.name.as_deref().unwrap_or("");
                for method in &service.method {
                    let method_name = method.name.as_deref().unwrap_or("");
                    let Some(opts) = method.options.as_ref() else {
                        continue;
                    };
                    if let Some(option) = parse_uninterpreted(&opts.uninterpreted_option) {
                        self.options.insert(
                            (
                                file_name.to_string(),
                                service_name.to_string(),
                                method_name.to_string(),
                            ),
                            option,
                        );
                    }
                }
            }
        }
    }

    // Primary path: rebuild the descriptor pool from the request's own
    // descriptor set and read the resolved extension values.
    fn collect_extensions(&mut self, bytes: &[u8]) {
        let Ok(request) = CodeGeneratorRequest::decode(bytes) else {
            return;
        };
        let set = FileDescriptorSet {
            file: request.proto_file.clone(),
        };
        let Ok(pool) = DescriptorPool::from_file_descriptor_set(set) else {
            return;
        };
        let Some(extension) = pool.get_extension_by_name(TYPE_EXTENSION_NAME) else {
            return;
        };
        for file in pool.files() {
            for service in file.services() {
                for method in service.methods() {
                    let options = method.options();
                    if !options.has_extension(&extension) {
                        continue;
                    }
                    let value = options.get_extension(&extension);
                    let Some(message) = value.as_message() else {
                        continue;
                    };
                    let mut option = GraphqlOption::default();
                    if let Some(v) = message.get_field_by_name("query") {
                        if let Value::String(s) = v.as_ref() {
                            if !s.is_empty() {
                                option.query = Some(s.clone());
                            }
                        }
                    }
                    if let Some(v) = message.get_field_by_name("mutation") {
                        if let Value::String(s) = v.as_ref() {
                            if !s.is_empty() {
                                option.mutation = Some(s.clone());
                            }
                        }
                    }
                    if option.query.is_some() || option.mutation.is_some() {
                        self.options.insert(
                            (
                                file.name().to_string(),
                                service.name().to_string(),
                                method.name().to_string(),
                            ),
                            option,
                        );
                    }
                }
            }
        }
    }
}

fn parse_uninterpreted(options: &[UninterpretedOption]) -> Option<GraphqlOption> {
    let mut result = GraphqlOption::default();
    let mut found = false;
    for option in options {
        let Some(first) = option.name.first() else {
            continue;
        };
        if first.name_part != TYPE_EXTENSION_NAME || !first.is_extension {
            continue;
        }
        found = true;
        match option.name.get(1).map(|part| part.name_part.as_str()) {
            // option (graphql.type).query = "name";
            Some("query") => result.query = option.string_value_utf8(),
            Some("mutation") => result.mutation = option.string_value_utf8(),
            // option (graphql.type) = { query: "name" };
            _ => {
                if let Some(aggregate) = option.aggregate_value.as_deref() {
                    if let Some(name) = extract_quoted(aggregate, "query") {
                        result.query = Some(name);
                    }
                    if let Some(name) = extract_quoted(aggregate, "mutation") {
                        result.mutation = Some(name);
                    }
                }
            }
        }
    }
    found.then_some(result)
}

trait StringValueUtf8 {
    fn string_value_utf8(&self) -> Option<String>;
}

impl StringValueUtf8 for UninterpretedOption {
    fn string_value_utf8(&self) -> Option<String> {
        self.string_value
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

// Extracts the quoted value of `key: "value"` from a textproto aggregate.
fn extract_quoted(aggregate: &str, key: &str) -> Option<String> {
    let mut rest = aggregate;
    while let Some(pos) = rest.find(key) {
        let before_ok = rest[..pos]
            .chars()
            .next_back()
            .map(|c| !c.is_alphanumeric() && c != '_')
            .unwrap_or(true);
        let after = &rest[pos + key.len()..];
        let trimmed = after.trim_start();
        if before_ok {
            if let Some(after_colon) = trimmed.strip_prefix(':') {
                let value = after_colon.trim_start();
                if let Some(quoted) = value.strip_prefix('"') {
                    if let Some(end) = quoted.find('"') {
                        return Some(quoted[..end].replace("\\\"", "\""));
                    }
                }
            }
        }
        rest = after;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::uninterpreted_option::NamePart;

    fn aggregate_option(value: &str) -> UninterpretedOption {
        UninterpretedOption {
            name: vec![NamePart {
                name_part: "graphql.type".to_string(),
                is_extension: true,
            }],
            aggregate_value: Some(value.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_aggregate_query() {
        let option = parse_uninterpreted(&[aggregate_option(r#"query: "greeting""#)]).unwrap();
        assert_eq!(option.query.as_deref(), Some("greeting"));
        assert_eq!(option.mutation, None);
    }

    #[test]
    fn test_parse_aggregate_mutation() {
        let option = parse_uninterpreted(&[aggregate_option(r#"mutation:"setGreeting""#)]).unwrap();
        assert_eq!(option.mutation.as_deref(), Some("setGreeting"));
    }

    #[test]
    fn test_parse_field_path_form() {
        let option = UninterpretedOption {
            name: vec![
                NamePart {
                    name_part: "graphql.type".to_string(),
                    is_extension: true,
                },
                NamePart {
                    name_part: "query".to_string(),
                    is_extension: false,
                },
            ],
            string_value: Some(b"greeting".to_vec()),
            ..Default::default()
        };
        let parsed = parse_uninterpreted(&[option]).unwrap();
        assert_eq!(parsed.query.as_deref(), Some("greeting"));
    }

    #[test]
    fn test_unrelated_option_ignored() {
        let option = UninterpretedOption {
            name: vec![NamePart {
                name_part: "other.option".to_string(),
                is_extension: true,
            }],
            aggregate_value: Some(r#"query: "x""#.to_string()),
            ..Default::default()
        };
        assert!(parse_uninterpreted(&[option]).is_none());
    }

    #[test]
    fn test_operation_conflict() {
        let option = GraphqlOption {
            query: Some("a".to_string()),
            mutation: Some("b".to_string()),
        };
        assert!(matches!(
            option.operation("pkg.Svc.Method"),
            Err(GeneratorError::BadOption { .. })
        ));
    }

    #[test]
    fn test_operation_promotion() {
        let option = GraphqlOption {
            query: Some("greeting".to_string()),
            mutation: None,
        };
        let (kind, name) = option.operation("m").unwrap().unwrap();
        assert_eq!(kind, OperationKind::Query);
        assert_eq!(name, "greeting");
        assert!(GraphqlOption::default().operation("m").unwrap().is_none());
    }
}
