//! Runtime type library for `protoc-gen-graphql` generated code.
//!
//! Generated artifacts register their GraphQL types and resolvers against a
//! [`TypeRegistry`]; the host links everything together and builds the final
//! schema:
//!
//! ```ignore
//! let mut registry = graphql_edge::TypeRegistry::new();
//! hello::register_graphql_types(&mut registry);
//! hello::register_hello_service_queries(&mut registry, client.clone())?;
//! hello::register_hello_service_mutations(&mut registry, client)?;
//! let schema = registry.build_schema()?;
//! ```
//!
//! The library also carries the fixed scalars (`Empty`, `Timestamp`,
//! `Duration`, `bytes`, `JSON`), the wrapper object/input pairs for
//! `google.protobuf.*Value` types, and the request codec used by generated
//! operation resolvers.

pub mod codec;
pub mod error;
pub mod registry;
pub mod scalars;
pub mod wrappers;

pub use codec::{decode_request, normalize_input};
pub use error::{EdgeError, RegistryError};
pub use registry::{GraphType, TypeRegistry};
pub use scalars::{
    decode_bytes, encode_bytes, message_map, parse_duration, parse_timestamp, scalar_map,
    serialize_duration, serialize_timestamp,
};
