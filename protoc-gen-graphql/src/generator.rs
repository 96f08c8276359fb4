//! Code generation orchestration.
//!
//! Runs the pipeline per requested file: normalize descriptors, resolve
//! symbols, translate and emit. Generator errors short-circuit into the
//! response error string; files generated before the failure are kept.

use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};

use crate::emit;
use crate::error::GeneratorError;
use crate::model::{DescriptorSetIndex, FileModel};
use crate::options::OptionIndex;
use crate::params::Parameters;
use crate::symbol::{resolve_file, SymbolTable};
use crate::translate::Translator;

/// Process a full request into a response. Errors are reported through the
/// response error string; the exit code stays 0 either way.
pub fn generate(request: &CodeGeneratorRequest, options: &OptionIndex) -> CodeGeneratorResponse {
    let mut response = CodeGeneratorResponse {
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    };

    let params = match Parameters::parse(request.parameter.as_deref()) {
        Ok(params) => params,
        Err(e) => {
            response.error = Some(e.to_string());
            return response;
        }
    };

    let set = DescriptorSetIndex::build(&request.proto_file);
    for file_name in &request.file_to_generate {
        let Some(file) = set.file(file_name) else {
            response.error = Some(
                GeneratorError::UnknownDependency(file_name.clone()).to_string(),
            );
            return response;
        };
        match generate_file(file, &set, &params, options) {
            Ok(Some(generated)) => response.file.push(generated),
            Ok(None) => {}
            Err(e) => {
                response.error = Some(format!("{file_name}: {e}"));
                return response;
            }
        }
    }
    response
}

/// Generate the artifact for one file. Files with nothing to translate
/// produce no output.
pub fn generate_file(
    file: &prost_types::FileDescriptorProto,
    set: &DescriptorSetIndex<'_>,
    params: &Parameters,
    options: &OptionIndex,
) -> Result<Option<File>, GeneratorError> {
    let model = FileModel::build(file, set, options)?;

    let has_operations = model.services.iter().any(|svc| svc.has_operations());
    if !has_operations && model.message_order.is_empty() && model.enum_order.is_empty() {
        return Ok(None);
    }

    let mut table = SymbolTable::default();
    resolve_file(&model, params.map_fields, &mut table);

    let translator = Translator {
        model: &model,
        set,
        params,
    };
    let content = emit::emit_file(&translator, &model, &table)?;

    Ok(Some(File {
        name: Some(output_name(&model.name)),
        content: Some(content),
        ..Default::default()
    }))
}

fn output_name(proto_path: &str) -> String {
    let prefix = proto_path.strip_suffix(".proto").unwrap_or(proto_path);
    format!("{prefix}_graphql.pb.rs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{resolve_file as resolve_symbols, SymbolTable};
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::uninterpreted_option::NamePart;
    use prost_types::{
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        FileDescriptorProto, MessageOptions, MethodDescriptorProto, MethodOptions,
        OneofDescriptorProto, ServiceDescriptorProto, UninterpretedOption,
    };
    use std::collections::HashSet;

    fn contains_compact(code: &str, needle: &str) -> bool {
        let compact = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        compact(code).contains(&compact(needle))
    }

    fn field(
        name: &str,
        number: i32,
        r#type: Type,
        type_name: Option<&str>,
        label: Label,
    ) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            r#type: Some(r#type as i32),
            type_name: type_name.map(|s| s.to_string()),
            label: Some(label as i32),
            json_name: Some(heck::ToLowerCamelCase::to_lower_camel_case(name)),
            ..Default::default()
        }
    }

    fn graphql_method(
        name: &str,
        input: &str,
        output: &str,
        option: &str,
    ) -> MethodDescriptorProto {
        MethodDescriptorProto {
            name: Some(name.to_string()),
            input_type: Some(input.to_string()),
            output_type: Some(output.to_string()),
            options: Some(MethodOptions {
                uninterpreted_option: vec![UninterpretedOption {
                    name: vec![NamePart {
                        name_part: "graphql.type".to_string(),
                        is_extension: true,
                    }],
                    aggregate_value: Some(option.to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn hello_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("hello.proto".to_string()),
            package: Some("hello".to_string()),
            dependency: vec![
                "google/protobuf/wrappers.proto".to_string(),
                "google/protobuf/timestamp.proto".to_string(),
            ],
            enum_type: vec![EnumDescriptorProto {
                name: Some("HelloTypeEnum".to_string()),
                value: vec![
                    EnumValueDescriptorProto {
                        name: Some("NONE".to_string()),
                        number: Some(0),
                        ..Default::default()
                    },
                    EnumValueDescriptorProto {
                        name: Some("ANY".to_string()),
                        number: Some(1),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            message_type: vec![
                DescriptorProto {
                    name: Some("Hello".to_string()),
                    field: vec![
                        field("name", 1, Type::String, None, Label::Optional),
                        field("type", 2, Type::Enum, Some(".hello.HelloTypeEnum"), Label::Optional),
                        field("messages", 3, Type::String, None, Label::Repeated),
                    ],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("ServerError".to_string()),
                    field: vec![
                        field("code", 1, Type::Int32, None, Label::Optional),
                        field("description", 2, Type::String, None, Label::Optional),
                    ],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("ValidationError".to_string()),
                    field: vec![field("field", 1, Type::String, None, Label::Optional)],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("HelloResponse".to_string()),
                    field: vec![
                        field("data", 1, Type::Message, Some(".hello.Hello"), Label::Optional),
                        FieldDescriptorProto {
                            oneof_index: Some(0),
                            ..field("srv", 2, Type::Message, Some(".hello.ServerError"), Label::Optional)
                        },
                        FieldDescriptorProto {
                            oneof_index: Some(0),
                            ..field("val", 3, Type::Message, Some(".hello.ValidationError"), Label::Optional)
                        },
                    ],
                    oneof_decl: vec![OneofDescriptorProto {
                        name: Some("error".to_string()),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                DescriptorProto {
                    name: Some("Wrapped".to_string()),
                    field: vec![
                        field(
                            "nickname",
                            1,
                            Type::Message,
                            Some(".google.protobuf.StringValue"),
                            Label::Optional,
                        ),
                        field(
                            "created_at",
                            2,
                            Type::Message,
                            Some(".google.protobuf.Timestamp"),
                            Label::Optional,
                        ),
                        field(
                            "attributes",
                            8,
                            Type::Message,
                            Some(".hello.Wrapped.AttributesEntry"),
                            Label::Repeated,
                        ),
                    ],
                    nested_type: vec![DescriptorProto {
                        name: Some("AttributesEntry".to_string()),
                        field: vec![
                            field("key", 1, Type::String, None, Label::Optional),
                            field("value", 2, Type::String, None, Label::Optional),
                        ],
                        options: Some(MessageOptions {
                            map_entry: Some(true),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            ],
            service: vec![ServiceDescriptorProto {
                name: Some("HelloService".to_string()),
                method: vec![
                    graphql_method(
                        "Greeting",
                        ".hello.Hello",
                        ".hello.HelloResponse",
                        r#"query: "greeting""#,
                    ),
                    graphql_method(
                        "SetGreeting",
                        ".hello.Hello",
                        ".hello.HelloResponse",
                        r#"mutation: "setGreeting""#,
                    ),
                ],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn request_for(file: FileDescriptorProto) -> CodeGeneratorRequest {
        CodeGeneratorRequest {
            file_to_generate: vec![file.name.clone().unwrap_or_default()],
            proto_file: vec![file],
            ..Default::default()
        }
    }

    fn generate_content(request: &CodeGeneratorRequest) -> String {
        let options = OptionIndex::collect(None, request);
        let response = generate(request, &options);
        assert_eq!(response.error, None, "unexpected error: {:?}", response.error);
        assert_eq!(response.file.len(), 1);
        response.file[0].content.clone().unwrap_or_default()
    }

    #[test]
    fn test_output_name() {
        assert_eq!(output_name("hello.proto"), "hello_graphql.pb.rs");
        assert_eq!(output_name("dir/hello.proto"), "dir/hello_graphql.pb.rs");
    }

    #[test]
    fn test_object_input_and_enum_generation() {
        let request = request_for(hello_file());
        let code = generate_content(&request);

        assert!(contains_compact(&code, "pub fn Object_hello_Hello()"));
        assert!(contains_compact(&code, "pub fn Input_hello_Hello()"));
        assert!(contains_compact(&code, "pub fn Enum_hello_HelloTypeEnum()"));
        assert!(contains_compact(&code, ".item(\"NONE\")"));
        assert!(contains_compact(&code, ".item(\"ANY\")"));
        // name: String!, messages: [String!], type: nullable enum reference
        assert!(contains_compact(&code, "TypeRef::NonNull"));
        assert!(contains_compact(&code, "TypeRef::List"));
        assert!(contains_compact(&code, "TypeRef::named(\"Enum_hello_HelloTypeEnum\")"));
        // enum fields resolve through the prost name table
        assert!(contains_compact(&code, "as_str_name"));
        // the file registers its own types
        assert!(contains_compact(&code, "pub fn register_graphql_types"));
        assert!(contains_compact(&code, "graphql_edge::GraphType::Enum(Enum_hello_HelloTypeEnum())"));
    }

    #[test]
    fn test_service_registration() {
        let request = request_for(hello_file());
        let code = generate_content(&request);

        assert!(contains_compact(&code, "pub fn register_hello_service_queries"));
        assert!(contains_compact(&code, "pub fn register_hello_service_mutations"));
        assert!(contains_compact(&code, "register_query"));
        assert!(contains_compact(&code, "\"greeting\""));
        assert!(contains_compact(&code, "\"setGreeting\""));
        assert!(contains_compact(&code, "TypeRef::named(\"Input_hello_Hello\")"));
        assert!(contains_compact(&code, "TypeRef::named(\"Object_hello_HelloResponse\")"));
        assert!(contains_compact(&code, "graphql_edge::decode_request"));
        assert!(contains_compact(&code, "hello_service_client::HelloServiceClient"));
    }

    #[test]
    fn test_duplicate_operation_is_fatal() {
        let mut file = hello_file();
        file.service[0].method.push(graphql_method(
            "GreetingAgain",
            ".hello.Hello",
            ".hello.HelloResponse",
            r#"query: "greeting""#,
        ));
        let request = request_for(file);
        let options = OptionIndex::collect(None, &request);
        let response = generate(&request, &options);
        let error = response.error.unwrap_or_default();
        assert!(error.contains("duplicate query"), "got {error:?}");
    }

    #[test]
    fn test_oneof_union_members_in_field_order() {
        let request = request_for(hello_file());
        let code = generate_content(&request);

        assert!(contains_compact(&code, "pub fn Union_hello_HelloResponse_error()"));
        let compact: String = code.chars().filter(|c| !c.is_whitespace()).collect();
        let srv = compact.find("possible_type(\"Object_hello_ServerError\")").unwrap();
        let val = compact
            .find("possible_type(\"Object_hello_ValidationError\")")
            .unwrap();
        assert!(srv < val);
        // the surface field discriminates and tags the member type
        assert!(contains_compact(&code, "Field::new(\"error\""));
        assert!(contains_compact(&code, ".with_type(\"Object_hello_ServerError\")"));
        assert!(contains_compact(&code, "hello_response::Error::Srv"));
    }

    #[test]
    fn test_well_known_substitution() {
        let request = request_for(hello_file());
        let code = generate_content(&request);

        assert!(contains_compact(&code, "TypeRef::named(\"Object_wrapperspb_StringValue\")"));
        assert!(contains_compact(&code, "graphql_edge::serialize_timestamp"));
        // no declaration is generated for google.protobuf types
        assert!(!contains_compact(&code, "pub fn Object_google_protobuf_StringValue"));
        assert!(!contains_compact(&code, "pub fn Object_google_protobuf_Timestamp"));
    }

    #[test]
    fn test_map_field_json_strategy() {
        let request = request_for(hello_file());
        let code = generate_content(&request);

        assert!(contains_compact(&code, "Field::new(\"attributes\""));
        assert!(contains_compact(&code, "TypeRef::named(\"JSON\")"));
        assert!(contains_compact(&code, "graphql_edge::scalar_map"));
        assert!(!contains_compact(&code, "Map_hello_Wrapped_AttributesEntry"));
    }

    #[test]
    fn test_map_field_pairs_strategy() {
        let mut request = request_for(hello_file());
        request.parameter = Some("map_fields=pairs".to_string());
        let code = generate_content(&request);

        assert!(contains_compact(&code, "pub fn Map_hello_Wrapped_AttributesEntry()"));
        assert!(contains_compact(&code, "pub fn Map_hello_Wrapped_AttributesEntryInput()"));
        assert!(contains_compact(&code, "TypeRef::named(\"Map_hello_Wrapped_AttributesEntry\")"));
        assert!(contains_compact(&code, "Field::new(\"key\""));
        assert!(contains_compact(&code, "Field::new(\"value\""));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let request = request_for(hello_file());
        let first = generate_content(&request);
        let second = generate_content(&request);
        assert_eq!(first, second);
    }

    #[test]
    fn test_symbol_identities_are_unique() {
        let request = request_for(hello_file());
        let options = OptionIndex::collect(None, &request);
        let set = DescriptorSetIndex::build(&request.proto_file);
        let file = set.file("hello.proto").unwrap();
        let params = Parameters::default();
        let model = FileModel::build(file, &set, &options).unwrap();
        let mut table = SymbolTable::default();
        resolve_symbols(&model, params.map_fields, &mut table);

        let mut seen = HashSet::new();
        for symbol in table.iter() {
            assert!(
                seen.insert((symbol.ident.fqn.clone(), symbol.ident.role)),
                "duplicate identity for {}",
                symbol.ident.fqn
            );
        }
        let mut names = HashSet::new();
        for symbol in table.iter() {
            assert!(names.insert(symbol.graphql_name()));
        }
    }

    #[test]
    fn test_file_without_content_is_skipped() {
        let file = FileDescriptorProto {
            name: Some("empty.proto".to_string()),
            package: Some("empty".to_string()),
            ..Default::default()
        };
        let request = request_for(file);
        let options = OptionIndex::collect(None, &request);
        let response = generate(&request, &options);
        assert_eq!(response.error, None);
        assert!(response.file.is_empty());
    }

    #[test]
    fn test_unknown_dependency_is_fatal() {
        let mut file = hello_file();
        file.dependency.push("missing/other.proto".to_string());
        let request = request_for(file);
        let options = OptionIndex::collect(None, &request);
        let response = generate(&request, &options);
        let error = response.error.unwrap_or_default();
        assert!(error.contains("unknown dependency"), "got {error:?}");
    }
}
