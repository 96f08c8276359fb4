//! Plugin parameter parsing.
//!
//! Parameters arrive as the comma-separated `key=value` portion of
//! `--graphql_out=<params>:<outdir>`. Recognized keys:
//!
//! - `import_prefix=<path>` — prepended to derived extern module paths.
//! - `import_path=<path>` — proto path prefix stripped before applying
//!   `import_prefix`.
//! - `map_fields=json|pairs` — map field strategy (default `json`).
//! - `M<proto_file>=<module>` — explicit Rust module path for a dependency
//!   proto; takes precedence over any derived path.

use std::collections::HashMap;

use crate::error::GeneratorError;

/// How protobuf map fields appear in the GraphQL schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapStrategy {
    /// Map fields are a single opaque `JSON` scalar.
    #[default]
    Json,
    /// Map fields are a list of generated `Map_<FQN>` key/value objects.
    Pairs,
}

impl std::str::FromStr for MapStrategy {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(MapStrategy::Json),
            "pairs" => Ok(MapStrategy::Pairs),
            other => Err(GeneratorError::BadParameter(format!(
                "map_fields must be `json` or `pairs`, got {other:?}"
            ))),
        }
    }
}

/// Parsed plugin parameters.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    /// Prefix prepended to derived extern module paths.
    pub import_prefix: String,
    /// Proto path prefix stripped before applying `import_prefix`.
    pub import_path: String,
    /// Map field strategy.
    pub map_fields: MapStrategy,
    /// Per-proto-file module overrides (`M<proto>=<module>`).
    pub file_modules: HashMap<String, String>,
}

impl Parameters {
    /// Parse the raw parameter string. `None` or empty yields the defaults.
    pub fn parse(parameter: Option<&str>) -> Result<Self, GeneratorError> {
        let mut params = Parameters::default();
        let Some(raw) = parameter else {
            return Ok(params);
        };
        for pair in raw.split(',').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                GeneratorError::BadParameter(format!("expected key=value, got {pair:?}"))
            })?;
            match key {
                "import_prefix" => params.import_prefix = value.to_string(),
                "import_path" => params.import_path = value.to_string(),
                "map_fields" => params.map_fields = value.parse()?,
                _ => {
                    if let Some(proto) = key.strip_prefix('M') {
                        if proto.is_empty() {
                            return Err(GeneratorError::BadParameter(format!(
                                "empty proto path in {pair:?}"
                            )));
                        }
                        params
                            .file_modules
                            .insert(proto.to_string(), value.to_string());
                    } else {
                        return Err(GeneratorError::BadParameter(format!(
                            "unknown parameter {key:?}"
                        )));
                    }
                }
            }
        }
        Ok(params)
    }

    /// The Rust module path for a dependency proto file, if one can be
    /// determined. `M` mappings win; otherwise a path is derived from the
    /// proto path with `import_path` stripped and `import_prefix` prepended.
    pub fn module_for(&self, proto_path: &str) -> Option<String> {
        if let Some(module) = self.file_modules.get(proto_path) {
            return Some(module.clone());
        }
        if self.import_prefix.is_empty() {
            return None;
        }
        let stripped = proto_path
            .strip_prefix(self.import_path.as_str())
            .unwrap_or(proto_path)
            .trim_start_matches('/');
        let stem = stripped.strip_suffix(".proto").unwrap_or(stripped);
        let module = stem.replace(['/', '-', '.'], "_");
        Some(format!("{}::{}", self.import_prefix, module))
    }
}
