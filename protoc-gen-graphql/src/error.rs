//! Error types for GraphQL code generation.

/// Error type for GraphQL code generation.
///
/// Generator-side errors short-circuit the current file and are surfaced in
/// the `CodeGeneratorResponse` error string; the process still exits 0.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The same query or mutation name was registered twice within a service.
    #[error("duplicate {kind} {name:?} in service {service}")]
    DuplicateOperation {
        /// Service the collision occurred in.
        service: String,
        /// `query` or `mutation`.
        kind: &'static str,
        /// The colliding operation name.
        name: String,
    },

    /// Malformed `(graphql.type)` option value.
    #[error("bad (graphql.type) option on {method}: {reason}")]
    BadOption {
        /// Fully-qualified method the option was read from.
        method: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Malformed plugin parameter string.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// An import that is neither a well-known proto nor in the descriptor set.
    #[error("unknown dependency: {0}")]
    UnknownDependency(String),

    /// A cross-file reference without an `M<proto>=<module>` mapping.
    #[error("no module mapping for dependency {0}, pass M{0}=<module>")]
    MissingModuleMapping(String),

    /// Failed to decode the protobuf request.
    #[error("decode error: {0}")]
    Decode(String),

    /// Code generation failed.
    #[error("code generation error: {0}")]
    CodeGen(String),
}

impl From<String> for GeneratorError {
    fn from(s: String) -> Self {
        GeneratorError::CodeGen(s)
    }
}
