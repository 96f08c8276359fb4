//! The GraphQL type registry.
//!
//! A [`TypeRegistry`] is an explicit value threaded through the generated
//! `register_graphql_types` hooks and the host's service-registration calls.
//! Once every generated file and service has been registered, the host calls
//! [`TypeRegistry::build_schema`] exactly once and serves the result.

use std::collections::HashMap;

use async_graphql::dynamic::{Enum, Field, InputObject, Object, Scalar, Schema, Union};

use crate::error::RegistryError;
use crate::{scalars, wrappers};

/// A registrable GraphQL type.
#[derive(Debug)]
pub enum GraphType {
    Object(Object),
    Input(InputObject),
    Enum(Enum),
    Union(Union),
    Scalar(Scalar),
}

impl GraphType {
    /// The GraphQL type name this entry registers under.
    pub fn name(&self) -> &str {
        match self {
            GraphType::Object(t) => t.type_name(),
            GraphType::Input(t) => t.type_name(),
            GraphType::Enum(t) => t.type_name(),
            GraphType::Union(t) => t.type_name(),
            GraphType::Scalar(t) => t.type_name(),
        }
    }
}

impl From<Object> for GraphType {
    fn from(t: Object) -> Self {
        GraphType::Object(t)
    }
}

impl From<InputObject> for GraphType {
    fn from(t: InputObject) -> Self {
        GraphType::Input(t)
    }
}

impl From<Enum> for GraphType {
    fn from(t: Enum) -> Self {
        GraphType::Enum(t)
    }
}

impl From<Union> for GraphType {
    fn from(t: Union) -> Self {
        GraphType::Union(t)
    }
}

impl From<Scalar> for GraphType {
    fn from(t: Scalar) -> Self {
        GraphType::Scalar(t)
    }
}

/// Accumulates GraphQL types and root operation fields until schema build.
pub struct TypeRegistry {
    types: Vec<GraphType>,
    index: HashMap<String, usize>,
    queries: Vec<(String, Field)>,
    mutations: Vec<(String, Field)>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a registry pre-populated with the built-in scalars and the
    /// wrapper object/input pairs.
    pub fn new() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            index: HashMap::new(),
            queries: Vec::new(),
            mutations: Vec::new(),
        };
        registry.register_type(scalars::scalar_empty().into());
        registry.register_type(scalars::scalar_duration().into());
        registry.register_type(scalars::scalar_timestamp().into());
        registry.register_type(scalars::scalar_bytes().into());
        registry.register_type(scalars::scalar_json().into());
        registry.register_type(wrappers::object_bool_value().into());
        registry.register_type(wrappers::input_bool_value().into());
        registry.register_type(wrappers::object_string_value().into());
        registry.register_type(wrappers::input_string_value().into());
        registry.register_type(wrappers::object_bytes_value().into());
        registry.register_type(wrappers::input_bytes_value().into());
        registry.register_type(wrappers::object_float_value().into());
        registry.register_type(wrappers::input_float_value().into());
        registry.register_type(wrappers::object_double_value().into());
        registry.register_type(wrappers::input_double_value().into());
        registry.register_type(wrappers::object_int32_value().into());
        registry.register_type(wrappers::input_int32_value().into());
        registry.register_type(wrappers::object_uint32_value().into());
        registry.register_type(wrappers::input_uint32_value().into());
        registry.register_type(wrappers::object_int64_value().into());
        registry.register_type(wrappers::input_int64_value().into());
        registry.register_type(wrappers::object_uint64_value().into());
        registry.register_type(wrappers::input_uint64_value().into());
        registry.register_type(wrappers::object_sint32_value().into());
        registry.register_type(wrappers::input_sint32_value().into());
        registry.register_type(wrappers::object_sint64_value().into());
        registry.register_type(wrappers::input_sint64_value().into());
        registry.register_type(wrappers::object_fixed32_value().into());
        registry.register_type(wrappers::input_fixed32_value().into());
        registry.register_type(wrappers::object_fixed64_value().into());
        registry.register_type(wrappers::input_fixed64_value().into());
        registry.register_type(wrappers::object_sfixed32_value().into());
        registry.register_type(wrappers::input_sfixed32_value().into());
        registry.register_type(wrappers::object_sfixed64_value().into());
        registry.register_type(wrappers::input_sfixed64_value().into());
        registry
    }

    /// Register a type. A later registration with the same name replaces the
    /// earlier one in place, preserving insertion order.
    pub fn register_type(&mut self, ty: GraphType) {
        match self.index.get(ty.name()) {
            Some(&slot) => self.types[slot] = ty,
            None => {
                self.index.insert(ty.name().to_string(), self.types.len());
                self.types.push(ty);
            }
        }
    }

    /// Look up a registered type by name.
    pub fn lookup_type(&self, name: &str) -> Option<&GraphType> {
        self.index.get(name).map(|&slot| &self.types[slot])
    }

    /// Registered types in insertion order.
    pub fn types(&self) -> impl Iterator<Item = &GraphType> {
        self.types.iter()
    }

    /// Register a root query field.
    pub fn register_query(&mut self, name: &str, field: Field) -> Result<(), RegistryError> {
        if self.queries.iter().any(|(existing, _)| existing == name) {
            return Err(RegistryError::DuplicateQuery(name.to_string()));
        }
        self.queries.push((name.to_string(), field));
        Ok(())
    }

    /// Register a root mutation field.
    pub fn register_mutation(&mut self, name: &str, field: Field) -> Result<(), RegistryError> {
        if self.mutations.iter().any(|(existing, _)| existing == name) {
            return Err(RegistryError::DuplicateMutation(name.to_string()));
        }
        self.mutations.push((name.to_string(), field));
        Ok(())
    }

    /// Build the schema from the accumulated roots and the ordered type list.
    pub fn build_schema(self) -> Result<Schema, RegistryError> {
        let mutation_name = if self.mutations.is_empty() {
            None
        } else {
            Some("RootMutation")
        };
        let mut builder = Schema::build("RootQuery", mutation_name, None::<&str>);

        let mut root_query = Object::new("RootQuery");
        for (_, field) in self.queries {
            root_query = root_query.field(field);
        }
        builder = builder.register(root_query);

        if mutation_name.is_some() {
            let mut root_mutation = Object::new("RootMutation");
            for (_, field) in self.mutations {
                root_mutation = root_mutation.field(field);
            }
            builder = builder.register(root_mutation);
        }

        for ty in self.types {
            builder = match ty {
                GraphType::Object(t) => builder.register(t),
                GraphType::Input(t) => builder.register(t),
                GraphType::Enum(t) => builder.register(t),
                GraphType::Union(t) => builder.register(t),
                GraphType::Scalar(t) => builder.register(t),
            };
        }

        builder
            .finish()
            .map_err(|e| RegistryError::Schema(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::dynamic::{FieldFuture, FieldValue, TypeRef};

    fn string_field(name: &str, value: &'static str) -> Field {
        Field::new(name, TypeRef::named_nn(TypeRef::STRING), move |_| {
            FieldFuture::new(async move { Ok(Some(FieldValue::value(value))) })
        })
    }

    #[test]
    fn test_builtin_types_registered() {
        let registry = TypeRegistry::new();
        for name in [
            "Empty",
            "Timestamp",
            "Duration",
            "bytes",
            "JSON",
            "Object_wrapperspb_StringValue",
            "Input_wrapperspb_StringValueInput",
            "Object_wrapperspb_SFixed64Value",
        ] {
            assert!(registry.lookup_type(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_register_type_replaces_in_place() {
        let mut registry = TypeRegistry::new();
        registry.register_type(Object::new("A").into());
        registry.register_type(Object::new("B").into());
        let before: Vec<_> = registry.types().map(|t| t.name().to_string()).collect();
        registry.register_type(Enum::new("A").item("X").into());
        let after: Vec<_> = registry.types().map(|t| t.name().to_string()).collect();
        assert_eq!(before, after);
        assert!(matches!(registry.lookup_type("A"), Some(GraphType::Enum(_))));
    }

    #[test]
    fn test_duplicate_query() {
        let mut registry = TypeRegistry::new();
        registry
            .register_query("greeting", string_field("greeting", "hi"))
            .unwrap();
        let err = registry
            .register_query("greeting", string_field("greeting", "hi"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateQuery(name) if name == "greeting"));
    }

    #[test]
    fn test_duplicate_mutation() {
        let mut registry = TypeRegistry::new();
        registry
            .register_mutation("setGreeting", string_field("setGreeting", "ok"))
            .unwrap();
        let err = registry
            .register_mutation("setGreeting", string_field("setGreeting", "ok"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateMutation(_)));
    }

    #[tokio::test]
    async fn test_build_schema_and_execute() {
        let mut registry = TypeRegistry::new();
        registry
            .register_query("ping", string_field("ping", "pong"))
            .unwrap();
        let schema = registry.build_schema().unwrap();
        let response = schema.execute("{ ping }").await;
        assert!(response.errors.is_empty(), "{:?}", response.errors);
        assert_eq!(
            response.data.into_json().unwrap(),
            serde_json::json!({ "ping": "pong" })
        );
    }
}
