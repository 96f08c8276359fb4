//! protoc-gen-graphql
//!
//! A protoc plugin that translates protobuf messages, enums, oneofs, maps
//! and annotated service RPCs into GraphQL type declarations and resolver
//! bindings against the `graphql-edge` runtime library.
//!
//! Usage:
//!   protoc --graphql_out=paths=source_relative:./gen proto/*.proto
//!   protoc --graphql_out=map_fields=pairs,Mother.proto=crate::other:./gen proto/*.proto

#![deny(missing_docs)]

use std::io::{self, Read, Write};

use prost::Message;
use prost_types::compiler::CodeGeneratorRequest;

mod emit;
mod error;
mod generator;
mod model;
mod options;
mod params;
mod symbol;
mod translate;

pub use error::GeneratorError;

use options::OptionIndex;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Read the CodeGeneratorRequest from stdin
    let mut input = Vec::new();
    io::stdin().read_to_end(&mut input)?;

    let request = CodeGeneratorRequest::decode(&input[..])?;

    // Extension values are dropped by prost; recover them from the raw bytes.
    let options = OptionIndex::collect(Some(&input), &request);

    let response = generator::generate(&request, &options);

    // Write the response to stdout
    let mut output = Vec::new();
    response.encode(&mut output)?;
    io::stdout().write_all(&output)?;

    Ok(())
}
