//! Error types shared between the runtime library and generated resolvers.

/// Errors surfaced to the GraphQL caller as field errors.
///
/// Generated resolvers return these when a source value cannot be used:
/// the engine converts them into field errors carrying the original message.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EdgeError {
    /// A resolver source did not downcast to the expected protobuf message.
    #[error("invalid value")]
    BadValue,

    /// The upstream gRPC call produced a response the resolver cannot use.
    #[error("invalid upstream response")]
    UpstreamResponse,

    /// A Timestamp, Duration or bytes literal failed to parse.
    #[error("invalid scalar value: {0}")]
    InvalidScalar(String),

    /// The `input` argument could not be decoded into the request message.
    #[error("invalid request input: {0}")]
    InvalidRequest(String),
}

/// Errors returned by [`TypeRegistry`](crate::TypeRegistry) registration and
/// schema construction. These surface at host startup, not at query time.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The same query name was registered twice.
    #[error("duplicate query: {0}")]
    DuplicateQuery(String),

    /// The same mutation name was registered twice.
    #[error("duplicate mutation: {0}")]
    DuplicateMutation(String),

    /// The GraphQL engine rejected the accumulated schema.
    #[error("schema error: {0}")]
    Schema(String),
}
