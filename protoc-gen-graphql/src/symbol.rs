//! GraphQL symbol assignment and deduplication.
//!
//! Every translated construct gets a [`GqlIdent`] (role + FQN + owning file)
//! and a slot in the [`SymbolTable`]. The table records insertion order for
//! the emitter and ignores re-registration, so shared references collapse to
//! a single declaration. Well-known `google.protobuf` types resolve to
//! runtime names and never enter the table; types owned by other files are
//! referenced by name only and generated by their own file.

use std::collections::HashMap;

use crate::model::FileModel;
use crate::params::MapStrategy;
use crate::translate::well_known;

/// The GraphQL role of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Object,
    Input,
    Scalar,
    Enum,
    Union,
    Query,
    Mutation,
}

/// Unique identity of an emitted construct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GqlIdent {
    /// Leading-dot fully-qualified protobuf name.
    pub fqn: String,
    pub role: Role,
    /// Proto file that declares the construct.
    pub file: String,
}

/// What kind of protobuf construct a symbol stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Message,
    Enum,
    Oneof,
    MapEntry,
}

/// One entry of the symbol table.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub ident: GqlIdent,
    pub kind: SymbolKind,
    /// Index of the parent symbol; `None` is the root sentinel.
    pub parent: Option<usize>,
}

impl Symbol {
    /// The emitted name, `role_` + FQN with separators normalized.
    pub fn graphql_name(&self) -> String {
        let base = normalize_fqn(&self.ident.fqn);
        match (self.kind, self.ident.role) {
            (SymbolKind::Message, Role::Object) => format!("Object_{base}"),
            (SymbolKind::Message, Role::Input) => format!("Input_{base}"),
            (SymbolKind::Enum, _) => format!("Enum_{base}"),
            (SymbolKind::Oneof, Role::Union) => format!("Union_{base}"),
            (SymbolKind::Oneof, _) => format!("Union_{base}Input"),
            (SymbolKind::MapEntry, Role::Object) => format!("Map_{base}"),
            (SymbolKind::MapEntry, _) => format!("Map_{base}Input"),
            (SymbolKind::Message, _) => format!("Object_{base}"),
        }
    }
}

/// Normalize a leading-dot FQN into an identifier fragment.
pub fn normalize_fqn(fqn: &str) -> String {
    fqn.trim_start_matches('.').replace('.', "_")
}

/// Insertion-ordered symbol list with identity lookup.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<(String, Role), usize>,
}

impl SymbolTable {
    /// Append a symbol. Re-registration of an existing identity is a no-op.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        let key = (symbol.ident.fqn.clone(), symbol.ident.role);
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.symbols.len());
        self.symbols.push(symbol);
        true
    }

    /// Whether an identity is already registered.
    pub fn contains(&self, fqn: &str, role: Role) -> bool {
        self.index.contains_key(&(fqn.to_string(), role))
    }

    /// Symbols in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// Number of registered symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Populate the table for one file: enums first, then every message in both
/// roles, then operation inputs and outputs.
pub fn resolve_file(model: &FileModel<'_>, strategy: MapStrategy, table: &mut SymbolTable) {
    let resolver = Resolver { model, strategy };
    for enum_fqn in &model.enum_order {
        if is_top_level(enum_fqn, &model.package) {
            resolver.insert_enum(table, enum_fqn, None);
        }
    }
    for message_fqn in &model.message_order {
        if is_top_level(message_fqn, &model.package) {
            resolver.resolve_message(table, message_fqn, Role::Object, None);
        }
    }
    for message_fqn in &model.message_order {
        if is_top_level(message_fqn, &model.package) {
            resolver.resolve_message(table, message_fqn, Role::Input, None);
        }
    }
    for service in &model.services {
        for operation in service.queries.iter().chain(&service.mutations) {
            if let Some(input) = operation.method.input_type.as_deref() {
                resolver.resolve_message(table, input, Role::Input, None);
            }
            if let Some(output) = operation.method.output_type.as_deref() {
                resolver.resolve_message(table, output, Role::Object, None);
            }
        }
    }
}

fn is_top_level(fqn: &str, package: &str) -> bool {
    let expected = if package.is_empty() {
        1
    } else {
        package.split('.').count() + 1
    };
    fqn.trim_start_matches('.').split('.').count() == expected
}

struct Resolver<'m, 'a> {
    model: &'m FileModel<'a>,
    strategy: MapStrategy,
}

impl Resolver<'_, '_> {
    fn insert_enum(&self, table: &mut SymbolTable, fqn: &str, parent: Option<usize>) {
        if self.model.enum_type(fqn).is_none() {
            return;
        }
        table.insert(Symbol {
            ident: GqlIdent {
                fqn: fqn.to_string(),
                role: Role::Enum,
                file: self.model.name.clone(),
            },
            kind: SymbolKind::Enum,
            parent,
        });
    }

    fn resolve_message(
        &self,
        table: &mut SymbolTable,
        fqn: &str,
        role: Role,
        parent: Option<usize>,
    ) {
        if well_known(fqn).is_some() || self.model.map_entry(fqn).is_some() {
            return;
        }
        let Some(message) = self.model.message(fqn) else {
            // Externs are referenced by name and emitted by their own file.
            return;
        };
        if table.contains(fqn, role) {
            return;
        }

        for enum_fqn in self.nested_enums(fqn) {
            self.insert_enum(table, &enum_fqn, parent);
        }
        for oneof in &message.oneofs {
            let oneof_fqn = format!("{}.{}", fqn, oneof.name);
            let oneof_role = match role {
                Role::Object => Role::Union,
                _ => Role::Input,
            };
            table.insert(Symbol {
                ident: GqlIdent {
                    fqn: oneof_fqn,
                    role: oneof_role,
                    file: self.model.name.clone(),
                },
                kind: SymbolKind::Oneof,
                parent,
            });
        }
        for nested_fqn in self.nested_messages(fqn) {
            self.resolve_message(table, &nested_fqn, role, parent);
        }

        let inserted = table.insert(Symbol {
            ident: GqlIdent {
                fqn: fqn.to_string(),
                role,
                file: self.model.name.clone(),
            },
            kind: SymbolKind::Message,
            parent,
        });
        if !inserted {
            // A reference cycle through the nested walk already resolved us.
            return;
        }
        let slot = table.len() - 1;

        for field in &message.descriptor.field {
            let Some(type_name) = field.type_name.as_deref() else {
                continue;
            };
            if let Some(entry) = self.model.map_entry(type_name) {
                if self.strategy == MapStrategy::Pairs {
                    table.insert(Symbol {
                        ident: GqlIdent {
                            fqn: type_name.to_string(),
                            role: if role == Role::Input {
                                Role::Input
                            } else {
                                Role::Object
                            },
                            file: self.model.name.clone(),
                        },
                        kind: SymbolKind::MapEntry,
                        parent: Some(slot),
                    });
                    if let Some(value_field) = entry.field.iter().find(|f| f.number == Some(2)) {
                        if let Some(value_type) = value_field.type_name.as_deref() {
                            self.resolve_message(table, value_type, role, Some(slot));
                            self.insert_enum(table, value_type, Some(slot));
                        }
                    }
                }
                continue;
            }
            if self.model.enum_type(type_name).is_some() {
                self.insert_enum(table, type_name, Some(slot));
                continue;
            }
            self.resolve_message(table, type_name, role, Some(slot));
        }
    }

    fn nested_enums(&self, parent_fqn: &str) -> Vec<String> {
        direct_children(&self.model.enum_order, parent_fqn)
    }

    fn nested_messages(&self, parent_fqn: &str) -> Vec<String> {
        direct_children(&self.model.message_order, parent_fqn)
    }
}

fn direct_children(order: &[String], parent_fqn: &str) -> Vec<String> {
    let prefix = format!("{parent_fqn}.");
    order
        .iter()
        .filter(|fqn| {
            fqn.starts_with(&prefix) && !fqn[prefix.len()..].contains('.')
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(fqn: &str, role: Role, kind: SymbolKind) -> Symbol {
        Symbol {
            ident: GqlIdent {
                fqn: fqn.to_string(),
                role,
                file: "test.proto".to_string(),
            },
            kind,
            parent: None,
        }
    }

    #[test]
    fn test_graphql_names() {
        let cases = [
            (".hello.Hello", Role::Object, SymbolKind::Message, "Object_hello_Hello"),
            (".hello.Hello", Role::Input, SymbolKind::Message, "Input_hello_Hello"),
            (".hello.HelloTypeEnum", Role::Enum, SymbolKind::Enum, "Enum_hello_HelloTypeEnum"),
            (".hello.R.error", Role::Union, SymbolKind::Oneof, "Union_hello_R_error"),
            (".hello.R.error", Role::Input, SymbolKind::Oneof, "Union_hello_R_errorInput"),
            (
                ".hello.Test.AttributesEntry",
                Role::Object,
                SymbolKind::MapEntry,
                "Map_hello_Test_AttributesEntry",
            ),
            (
                ".hello.Test.AttributesEntry",
                Role::Input,
                SymbolKind::MapEntry,
                "Map_hello_Test_AttributesEntryInput",
            ),
        ];
        for (fqn, role, kind, want) in cases {
            assert_eq!(symbol(fqn, role, kind).graphql_name(), want);
        }
    }

    #[test]
    fn test_table_idempotent_insert() {
        let mut table = SymbolTable::default();
        assert!(table.insert(symbol(".a.B", Role::Object, SymbolKind::Message)));
        assert!(!table.insert(symbol(".a.B", Role::Object, SymbolKind::Message)));
        assert!(table.insert(symbol(".a.B", Role::Input, SymbolKind::Message)));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_order_is_stable() {
        let mut table = SymbolTable::default();
        table.insert(symbol(".a.B", Role::Object, SymbolKind::Message));
        table.insert(symbol(".a.A", Role::Object, SymbolKind::Message));
        let names: Vec<_> = table.iter().map(|s| s.graphql_name()).collect();
        assert_eq!(names, vec!["Object_a_B", "Object_a_A"]);
    }
}
