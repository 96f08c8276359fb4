//! Normalized views over the input descriptors.
//!
//! The loader flattens nested messages into an FQN-keyed table, routes
//! map-entry messages into their own table, groups oneof members, and scans
//! services for `(graphql.type)` operations. All iteration follows descriptor
//! order so the output is stable across runs.

use std::collections::HashMap;

use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    MethodDescriptorProto, ServiceDescriptorProto,
};

use crate::error::GeneratorError;
use crate::options::{OperationKind, OptionIndex};

/// Well-known proto files need no entry in the descriptor set.
pub fn is_well_known_proto(path: &str) -> bool {
    path.starts_with("google/protobuf/")
}

/// Compute the leading-dot fully-qualified name of a construct.
pub fn fqn(package: &str, path: &[&str]) -> String {
    let mut out = String::new();
    if !package.is_empty() {
        out.push('.');
        out.push_str(package);
    }
    for segment in path {
        out.push('.');
        out.push_str(segment);
    }
    out
}

/// Request-wide index: file lookup by name and FQN ownership.
#[derive(Debug, Default)]
pub struct DescriptorSetIndex<'a> {
    files: HashMap<&'a str, &'a FileDescriptorProto>,
    owners: HashMap<String, &'a str>,
}

impl<'a> DescriptorSetIndex<'a> {
    /// Index every file in the request's descriptor set.
    pub fn build(proto_files: &'a [FileDescriptorProto]) -> Self {
        let mut index = DescriptorSetIndex::default();
        for file in proto_files {
            let file_name = file.name.as_deref().unwrap_or("");
            index.files.insert(file_name, file);
            let package = file.package.as_deref().unwrap_or("");
            for message in &file.message_type {
                index.claim_message(file_name, package, &[], message);
            }
            for enum_type in &file.enum_type {
                let name = enum_type.name.as_deref().unwrap_or("");
                index.owners.insert(fqn(package, &[name]), file_name);
            }
        }
        index
    }

    fn claim_message(
        &mut self,
        file_name: &'a str,
        package: &str,
        parents: &[&str],
        message: &'a DescriptorProto,
    ) {
        let name = message.name.as_deref().unwrap_or("");
        let mut path = parents.to_vec();
        path.push(name);
        self.owners.insert(fqn(package, &path), file_name);
        for nested in &message.nested_type {
            self.claim_message(file_name, package, &path, nested);
        }
        for enum_type in &message.enum_type {
            let enum_name = enum_type.name.as_deref().unwrap_or("");
            let mut enum_path = path.clone();
            enum_path.push(enum_name);
            self.owners.insert(fqn(package, &enum_path), file_name);
        }
    }

    /// The proto file declaring `fqn`, if it is in the descriptor set.
    pub fn owner_of(&self, fqn: &str) -> Option<&'a str> {
        self.owners.get(fqn).copied()
    }

    /// Look up a file descriptor by proto path.
    pub fn file(&self, name: &str) -> Option<&'a FileDescriptorProto> {
        self.files.get(name).copied()
    }
}

/// One oneof declaration with its member fields.
#[derive(Debug)]
pub struct OneofModel<'a> {
    pub name: String,
    pub fields: Vec<&'a FieldDescriptorProto>,
}

/// A message hoisted into the flat FQN table.
#[derive(Debug)]
pub struct MessageModel<'a> {
    pub fqn: String,
    pub descriptor: &'a DescriptorProto,
    pub oneofs: Vec<OneofModel<'a>>,
}

impl<'a> MessageModel<'a> {
    /// Fields outside any real oneof (proto3 optional synthesis included).
    pub fn plain_fields(&self) -> Vec<&'a FieldDescriptorProto> {
        self.descriptor
            .field
            .iter()
            .filter(|f| f.oneof_index.is_none() || f.proto3_optional.unwrap_or(false))
            .collect()
    }
}

/// An RPC promoted to a GraphQL operation.
#[derive(Debug)]
pub struct OperationModel<'a> {
    pub name: String,
    pub method: &'a MethodDescriptorProto,
}

/// A service with its query and mutation tables.
#[derive(Debug)]
pub struct ServiceModel<'a> {
    pub name: String,
    pub descriptor: &'a ServiceDescriptorProto,
    pub queries: Vec<OperationModel<'a>>,
    pub mutations: Vec<OperationModel<'a>>,
}

impl ServiceModel<'_> {
    /// Whether any RPC of this service is GraphQL-visible.
    pub fn has_operations(&self) -> bool {
        !self.queries.is_empty() || !self.mutations.is_empty()
    }
}

/// The normalized view of one generated file.
#[derive(Debug)]
pub struct FileModel<'a> {
    pub file: &'a FileDescriptorProto,
    pub name: String,
    pub package: String,
    /// Message FQNs in descriptor walk order (map entries excluded).
    pub message_order: Vec<String>,
    pub messages: HashMap<String, MessageModel<'a>>,
    /// Map-entry messages keyed by FQN.
    pub map_entries: HashMap<String, &'a DescriptorProto>,
    /// Enum FQNs in descriptor walk order.
    pub enum_order: Vec<String>,
    pub enums: HashMap<String, &'a EnumDescriptorProto>,
    pub services: Vec<ServiceModel<'a>>,
}

impl<'a> FileModel<'a> {
    /// Normalize one file descriptor.
    pub fn build(
        file: &'a FileDescriptorProto,
        set: &DescriptorSetIndex<'a>,
        options: &OptionIndex,
    ) -> Result<Self, GeneratorError> {
        let name = file.name.as_deref().unwrap_or("").to_string();
        for dependency in &file.dependency {
            if set.file(dependency).is_none() && !is_well_known_proto(dependency) {
                return Err(GeneratorError::UnknownDependency(dependency.clone()));
            }
        }

        let mut model = FileModel {
            file,
            name: name.clone(),
            package: file.package.as_deref().unwrap_or("").to_string(),
            message_order: Vec::new(),
            messages: HashMap::new(),
            map_entries: HashMap::new(),
            enum_order: Vec::new(),
            enums: HashMap::new(),
            services: Vec::new(),
        };

        for enum_type in &file.enum_type {
            model.add_enum(&[], enum_type);
        }
        for message in &file.message_type {
            model.add_message(&[], message);
        }
        for service in &file.service {
            let service_model = model.scan_service(service, options)?;
            model.services.push(service_model);
        }
        Ok(model)
    }

    /// Look up a local message by FQN.
    pub fn message(&self, fqn: &str) -> Option<&MessageModel<'a>> {
        self.messages.get(fqn)
    }

    /// Look up a local map entry by FQN.
    pub fn map_entry(&self, fqn: &str) -> Option<&'a DescriptorProto> {
        self.map_entries.get(fqn).copied()
    }

    /// Look up a local enum by FQN.
    pub fn enum_type(&self, fqn: &str) -> Option<&'a EnumDescriptorProto> {
        self.enums.get(fqn).copied()
    }

    fn add_enum(&mut self, parents: &[&str], enum_type: &'a EnumDescriptorProto) {
        let name = enum_type.name.as_deref().unwrap_or("");
        let mut path = parents.to_vec();
        path.push(name);
        let enum_fqn = fqn(&self.package, &path);
        self.enum_order.push(enum_fqn.clone());
        self.enums.insert(enum_fqn, enum_type);
    }

    fn add_message(&mut self, parents: &[&str], message: &'a DescriptorProto) {
        let name = message.name.as_deref().unwrap_or("");
        let mut path = parents.to_vec();
        path.push(name);
        let message_fqn = fqn(&self.package, &path);

        if message
            .options
            .as_ref()
            .and_then(|o| o.map_entry)
            .unwrap_or(false)
        {
            self.map_entries.insert(message_fqn, message);
            return;
        }

        let oneofs = extract_oneofs(message);
        self.message_order.push(message_fqn.clone());
        self.messages.insert(
            message_fqn,
            MessageModel {
                fqn: fqn(&self.package, &path),
                descriptor: message,
                oneofs,
            },
        );

        for enum_type in &message.enum_type {
            self.add_enum(&path, enum_type);
        }
        for nested in &message.nested_type {
            self.add_message(&path, nested);
        }
    }

    fn scan_service(
        &self,
        service: &'a ServiceDescriptorProto,
        options: &OptionIndex,
    ) -> Result<ServiceModel<'a>, GeneratorError> {
        let service_name = service.name.as_deref().unwrap_or("").to_string();
        let mut queries: Vec<OperationModel<'a>> = Vec::new();
        let mut mutations: Vec<OperationModel<'a>> = Vec::new();
        for method in &service.method {
            let method_name = method.name.as_deref().unwrap_or("");
            let Some(option) = options.get(&self.name, &service_name, method_name) else {
                continue;
            };
            let method_fqn = fqn(&self.package, &[service_name.as_str(), method_name]);
            let Some((kind, operation_name)) = option.operation(&method_fqn)? else {
                continue;
            };
            let table = match kind {
                OperationKind::Query => &mut queries,
                OperationKind::Mutation => &mut mutations,
            };
            if table.iter().any(|op| op.name == operation_name) {
                return Err(GeneratorError::DuplicateOperation {
                    service: service_name,
                    kind: kind.as_str(),
                    name: operation_name,
                });
            }
            table.push(OperationModel {
                name: operation_name,
                method,
            });
        }
        Ok(ServiceModel {
            name: service_name,
            descriptor: service,
            queries,
            mutations,
        })
    }
}

fn extract_oneofs<'a>(message: &'a DescriptorProto) -> Vec<OneofModel<'a>> {
    let mut oneofs = Vec::new();
    for (index, declaration) in message.oneof_decl.iter().enumerate() {
        let members: Vec<&FieldDescriptorProto> = message
            .field
            .iter()
            .filter(|f| {
                f.oneof_index == Some(index as i32) && !f.proto3_optional.unwrap_or(false)
            })
            .collect();
        // proto3 optional fields synthesize single-member oneofs; skip them.
        if members.is_empty() {
            continue;
        }
        oneofs.push(OneofModel {
            name: declaration.name.as_deref().unwrap_or("").to_string(),
            fields: members,
        });
    }
    oneofs
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::field_descriptor_proto::{Label, Type};
    use prost_types::{MessageOptions, OneofDescriptorProto};

    fn scalar_field(name: &str, number: i32, r#type: Type) -> FieldDescriptorProto {
        FieldDescriptorProto {
            name: Some(name.to_string()),
            number: Some(number),
            r#type: Some(r#type as i32),
            label: Some(Label::Optional as i32),
            json_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn test_file() -> FileDescriptorProto {
        FileDescriptorProto {
            name: Some("test.proto".to_string()),
            package: Some("test".to_string()),
            message_type: vec![DescriptorProto {
                name: Some("Outer".to_string()),
                field: vec![scalar_field("name", 1, Type::String)],
                nested_type: vec![
                    DescriptorProto {
                        name: Some("Inner".to_string()),
                        field: vec![scalar_field("id", 1, Type::Int64)],
                        ..Default::default()
                    },
                    DescriptorProto {
                        name: Some("AttributesEntry".to_string()),
                        field: vec![
                            scalar_field("key", 1, Type::String),
                            scalar_field("value", 2, Type::String),
                        ],
                        options: Some(MessageOptions {
                            map_entry: Some(true),
                            ..Default::default()
                        }),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_fqn() {
        assert_eq!(fqn("pkg", &["Outer", "Inner"]), ".pkg.Outer.Inner");
        assert_eq!(fqn("", &["Top"]), ".Top");
    }

    #[test]
    fn test_nested_walk_and_map_entries() {
        let file = test_file();
        let files = [file];
        let set = DescriptorSetIndex::build(&files);
        let model = FileModel::build(&files[0], &set, &OptionIndex::default()).unwrap();

        assert_eq!(model.message_order, vec![".test.Outer", ".test.Outer.Inner"]);
        assert!(model.message(".test.Outer.Inner").is_some());
        assert!(model.map_entry(".test.Outer.AttributesEntry").is_some());
        assert!(model.message(".test.Outer.AttributesEntry").is_none());
    }

    #[test]
    fn test_owner_index() {
        let files = [test_file()];
        let set = DescriptorSetIndex::build(&files);
        assert_eq!(set.owner_of(".test.Outer.Inner"), Some("test.proto"));
        assert_eq!(set.owner_of(".other.Thing"), None);
    }

    #[test]
    fn test_unknown_dependency() {
        let mut file = test_file();
        file.dependency = vec!["missing.proto".to_string()];
        let files = [file];
        let set = DescriptorSetIndex::build(&files);
        assert!(matches!(
            FileModel::build(&files[0], &set, &OptionIndex::default()),
            Err(GeneratorError::UnknownDependency(_))
        ));
    }

    #[test]
    fn test_well_known_dependency_allowed() {
        let mut file = test_file();
        file.dependency = vec!["google/protobuf/timestamp.proto".to_string()];
        let files = [file];
        let set = DescriptorSetIndex::build(&files);
        assert!(FileModel::build(&files[0], &set, &OptionIndex::default()).is_ok());
    }

    #[test]
    fn test_oneof_extraction_skips_proto3_optional() {
        let message = DescriptorProto {
            name: Some("R".to_string()),
            field: vec![
                FieldDescriptorProto {
                    oneof_index: Some(0),
                    ..scalar_field("srv", 1, Type::Message)
                },
                FieldDescriptorProto {
                    oneof_index: Some(0),
                    ..scalar_field("val", 2, Type::Message)
                },
                FieldDescriptorProto {
                    oneof_index: Some(1),
                    proto3_optional: Some(true),
                    ..scalar_field("maybe", 3, Type::String)
                },
            ],
            oneof_decl: vec![
                OneofDescriptorProto {
                    name: Some("error".to_string()),
                    ..Default::default()
                },
                OneofDescriptorProto {
                    name: Some("_maybe".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let oneofs = extract_oneofs(&message);
        assert_eq!(oneofs.len(), 1);
        assert_eq!(oneofs[0].name, "error");
        assert_eq!(oneofs[0].fields.len(), 2);
    }
}
