//! # Referential Value Pool
//!
//! Per-table cache of the values a constrained column must respect:
//!
//! - for each unique column, the values already present in the store plus
//!   the values assigned so far during this table's fill;
//! - for each foreign key, the values present in the referenced column.
//!
//! The pool is reset and re-read at the start of every table so it sees the
//! rows committed by the tables filled before it. Within one table the pool
//! is not re-read; uniqueness across the table's own new rows comes from
//! `record_assigned`.
//!
//! Entries are keyed by `(table, column)` name pairs. Unique values are
//! compared by `Value::column_key`, so a generated `true` collides with a
//! stored `1` in a boolean column.

use indexmap::{IndexMap, IndexSet};

use crate::error::Result;
use crate::generate::value::Value;
use crate::schema::catalog::TableSnapshot;
use crate::schema::types::Column;
use crate::store::Store;

type ColumnKey = (String, String);

fn key(table: &str, column: &str) -> ColumnKey {
    (table.to_string(), column.to_string())
}

/// Keys taken in one unique column.
#[derive(Debug)]
struct UsedValues {
    column: Column,
    keys: IndexSet<String>,
}

#[derive(Debug, Default)]
pub struct ReferentialValuePool {
    /// Unique column -> values that may not be used again.
    existing: IndexMap<ColumnKey, UsedValues>,
    /// Referenced column -> values a foreign key may point at.
    referenced: IndexMap<ColumnKey, IndexMap<String, Value>>,
}

impl ReferentialValuePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything cached for the previous table.
    pub fn reset(&mut self) {
        self.existing.clear();
        self.referenced.clear();
    }

    /// Load the lookups `table` needs, reading each `(table, column)` at most once.
    ///
    /// Foreign keys listed in `skip` (references detached from the pass) are not read.
    pub async fn prepare<S: Store>(
        &mut self,
        store: &S,
        table: &TableSnapshot,
        skip: &[String],
    ) -> Result<()> {
        self.reset();

        for column in &table.columns {
            if !table.is_unique(&column.name) || column.is_database_assigned() {
                continue;
            }
            let values = store.select_all_values(&table.name, &column.name).await?;
            let keys: IndexSet<String> = values.iter().map(|v| v.column_key(column)).collect();
            tracing::debug!(
                "{}.{}: {} existing unique values",
                table.name,
                column.name,
                keys.len()
            );
            self.existing.insert(
                key(&table.name, &column.name),
                UsedValues {
                    column: column.clone(),
                    keys,
                },
            );
        }

        for fk in table.foreign_keys.values() {
            if skip.contains(&fk.column) {
                continue;
            }
            let k = key(&fk.referenced_table, &fk.referenced_column);
            if self.referenced.contains_key(&k) {
                continue;
            }
            let values = store
                .select_all_values(&fk.referenced_table, &fk.referenced_column)
                .await?;
            let map: IndexMap<String, Value> = values
                .into_iter()
                .map(|v| (v.to_unique_key(), v))
                .collect();
            tracing::debug!(
                "{}.{}: {} referenced values",
                fk.referenced_table,
                fk.referenced_column,
                map.len()
            );
            self.referenced.insert(k, map);
        }

        Ok(())
    }

    /// Values already taken for a unique column.
    pub fn existing_values(&self, table: &str, column: &str) -> Option<&IndexSet<String>> {
        self.existing.get(&key(table, column)).map(|used| &used.keys)
    }

    pub fn is_used(&self, table: &str, column: &str, value: &Value) -> bool {
        self.existing
            .get(&key(table, column))
            .is_some_and(|used| used.keys.contains(&value.column_key(&used.column)))
    }

    /// Values present in a referenced column, in store order.
    pub fn referenced_values(
        &self,
        referenced_table: &str,
        referenced_column: &str,
    ) -> impl Iterator<Item = &Value> {
        self.referenced
            .get(&key(referenced_table, referenced_column))
            .into_iter()
            .flat_map(|m| m.values())
    }

    /// Remember a value assigned to a unique column during this table's fill.
    pub fn record_assigned(&mut self, table: &str, column: &str, value: &Value) {
        if value.is_null() {
            return;
        }
        if let Some(used) = self.existing.get_mut(&key(table, column)) {
            used.keys.insert(value.column_key(&used.column));
        }
    }
}
