//! # Schema Catalog
//!
//! The read side of the schema as the fill pass sees it: table names,
//! per-table columns, single-column foreign key references and unique
//! columns. Composite foreign keys are rejected. `DatabaseSchema` (an
//! introspected snapshot) implements the catalog, so the rest of the crate
//! never touches a live connection to learn the schema.

use indexmap::IndexMap;

use crate::error::{DataForgeError, Result};
use crate::schema::types::{Column, DatabaseSchema, Table};

/// Source of table metadata for a fill pass.
pub trait SchemaCatalog {
    fn list_tables(&self) -> Vec<String>;
    fn columns_of(&self, table: &str) -> Result<Vec<Column>>;
    fn foreign_keys_of(&self, table: &str) -> Result<Vec<ForeignKeyRef>>;
    fn unique_columns_of(&self, table: &str) -> Result<Vec<String>>;
}

/// One constrained column pointing at exactly one referenced column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKeyRef {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl ForeignKeyRef {
    pub fn is_self_reference(&self, table: &str) -> bool {
        self.referenced_table == table
    }
}

impl DatabaseSchema {
    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| DataForgeError::UnknownTable {
                table: name.to_string(),
            })
    }
}

impl SchemaCatalog for DatabaseSchema {
    fn list_tables(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    fn columns_of(&self, table: &str) -> Result<Vec<Column>> {
        Ok(self.table(table)?.columns.values().cloned().collect())
    }

    /// Only single-column keys can be filled: each column draws its value on
    /// its own, so the columns of a composite key would rarely name an
    /// existing referenced row. A composite key is a configuration error.
    fn foreign_keys_of(&self, table: &str) -> Result<Vec<ForeignKeyRef>> {
        self.table(table)?
            .foreign_keys
            .iter()
            .map(|fk| match (&fk.source_columns[..], &fk.referenced_columns[..]) {
                ([column], [referenced_column]) => Ok(ForeignKeyRef {
                    column: column.clone(),
                    referenced_table: fk.referenced_table.clone(),
                    referenced_column: referenced_column.clone(),
                }),
                _ => Err(DataForgeError::config(format!(
                    "{} has a composite foreign key ({}) -> {}({}); only single-column \
                     foreign keys can be filled, exclude '{}' from the pass",
                    table,
                    fk.source_columns.join(", "),
                    fk.referenced_table,
                    fk.referenced_columns.join(", "),
                    table
                ))),
            })
            .collect()
    }

    fn unique_columns_of(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.unique_columns())
    }
}

/// Immutable view of one table for the duration of its fill.
#[derive(Debug, Clone)]
pub struct TableSnapshot {
    pub name: String,
    pub columns: Vec<Column>,
    /// Keyed by constrained column name.
    pub foreign_keys: IndexMap<String, ForeignKeyRef>,
    pub unique_columns: Vec<String>,
}

impl TableSnapshot {
    pub fn read(catalog: &impl SchemaCatalog, table: &str) -> Result<Self> {
        let foreign_keys = catalog
            .foreign_keys_of(table)?
            .into_iter()
            .map(|fk| (fk.column.clone(), fk))
            .collect();

        Ok(Self {
            name: table.to_string(),
            columns: catalog.columns_of(table)?,
            foreign_keys,
            unique_columns: catalog.unique_columns_of(table)?,
        })
    }

    pub fn is_unique(&self, column: &str) -> bool {
        self.unique_columns.iter().any(|c| c == column)
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKeyRef> {
        self.foreign_keys.get(column)
    }
}
