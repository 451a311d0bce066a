//! In-memory store and schema fixtures for exercising whole fill passes
//! without a database.

use std::sync::Mutex;

use dataforge_core::error::{DataForgeError, Result};
use dataforge_core::schema::types::*;
use dataforge_core::store::Store;
use dataforge_core::Value;
use indexmap::IndexMap;

pub type Row = IndexMap<String, Value>;

#[derive(Debug, Default)]
struct MemoryTable {
    /// Columns the store numbers itself, like an auto-increment key.
    assigned: Vec<String>,
    next_id: i64,
    rows: Vec<Row>,
}

/// A `Store` that keeps rows in memory and numbers database-assigned columns
/// from 1, the way an auto-increment key would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: IndexMap<String, MemoryTable>,
    selects: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    /// An empty store with one table per schema table.
    pub fn for_schema(schema: &DatabaseSchema) -> Self {
        let tables = schema
            .tables
            .values()
            .map(|t| {
                let assigned = t
                    .columns
                    .values()
                    .filter(|c| c.is_database_assigned())
                    .map(|c| c.name.clone())
                    .collect();
                (
                    t.name.clone(),
                    MemoryTable {
                        assigned,
                        next_id: 1,
                        rows: Vec::new(),
                    },
                )
            })
            .collect();

        Self {
            tables,
            selects: Mutex::new(Vec::new()),
        }
    }

    /// Add a pre-existing row, bypassing the fill pass.
    pub fn seed_row(&mut self, table: &str, values: &[(&str, Value)]) {
        let row: Row = values
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        if let Some(t) = self.tables.get_mut(table) {
            t.push(row);
        }
    }

    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables
            .get(table)
            .map(|t| t.rows.as_slice())
            .unwrap_or_default()
    }

    /// Every value stored in one column, nulls included, in insertion order.
    pub fn column(&self, table: &str, column: &str) -> Vec<Value> {
        self.rows(table)
            .iter()
            .map(|r| r.get(column).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// `(table, column)` pairs read through `select_all_values`, in call order.
    pub fn select_log(&self) -> Vec<(String, String)> {
        self.selects
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

impl MemoryTable {
    fn push(&mut self, mut row: Row) {
        for column in &self.assigned {
            match row.get(column).and_then(Value::as_int) {
                Some(id) => self.next_id = self.next_id.max(id + 1),
                None => {
                    row.insert(column.clone(), Value::Int(self.next_id));
                    self.next_id += 1;
                }
            }
        }
        self.rows.push(row);
    }
}

impl Store for MemoryStore {
    async fn select_all_values(&self, table: &str, column: &str) -> Result<Vec<Value>> {
        if let Ok(mut log) = self.selects.lock() {
            log.push((table.to_string(), column.to_string()));
        }
        let t = self
            .tables
            .get(table)
            .ok_or_else(|| DataForgeError::UnknownTable {
                table: table.to_string(),
            })?;
        Ok(t.rows
            .iter()
            .filter_map(|r| r.get(column))
            .filter(|v| !v.is_null())
            .cloned()
            .collect())
    }

    async fn insert_row(&mut self, table: &str, row: &IndexMap<String, Value>) -> Result<()> {
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| DataForgeError::UnknownTable {
                table: table.to_string(),
            })?;
        t.push(row.clone());
        Ok(())
    }
}

fn id_column() -> Column {
    Column::new("id".to_string(), DataType::Integer, "int".to_string()).auto_increment()
}

fn primary_key(table: &mut Table, column: &str) {
    table.primary_key = Some(PrimaryKey {
        columns: vec![column.to_string()],
        name: None,
    });
}

fn unique(table: &mut Table, column: &str) {
    table.unique_constraints.push(UniqueConstraint {
        name: None,
        columns: vec![column.to_string()],
    });
}

fn int_column(name: &str) -> Column {
    Column::new(name.to_string(), DataType::Integer, "int".to_string())
}

fn varchar_column(name: &str, max_length: u32) -> Column {
    Column::new(
        name.to_string(),
        DataType::VarChar,
        format!("varchar({})", max_length),
    )
    .with_max_length(max_length)
}

/// `users` and `orders`: orders.user_id is a required reference, users has
/// a unique email and a nullable self-reference to a manager.
pub fn shop_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new(DatabaseType::MySQL, "shop".to_string());

    // Declared before users so the fill order can't come from declaration order
    let mut orders = Table::new("orders".to_string());
    orders.add_column(id_column());
    orders.add_column(int_column("user_id").not_null());
    orders.add_column(varchar_column("status", 12).not_null());
    orders.add_column(Column::new(
        "note".to_string(),
        DataType::Text,
        "text".to_string(),
    ));
    primary_key(&mut orders, "id");
    orders
        .foreign_keys
        .push(ForeignKey::single("user_id", "users", "id"));
    schema.add_table(orders);

    let mut users = Table::new("users".to_string());
    users.add_column(id_column());
    users.add_column(varchar_column("email", 255).not_null());
    users.add_column(varchar_column("first_name", 100).not_null());
    users.add_column(int_column("manager_id"));
    primary_key(&mut users, "id");
    unique(&mut users, "email");
    users
        .foreign_keys
        .push(ForeignKey::single("manager_id", "users", "id"));
    schema.add_table(users);

    schema
}

/// `a` and `b` referencing each other. `a.b_id` is nullable, `b.a_id` is not,
/// so the pass only succeeds when `a` is ranked first.
pub fn two_cycle_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new(DatabaseType::PostgreSQL, "cycle".to_string());

    let mut a = Table::new("a".to_string());
    a.add_column(id_column());
    a.add_column(int_column("b_id"));
    primary_key(&mut a, "id");
    a.foreign_keys.push(ForeignKey::single("b_id", "b", "id"));
    schema.add_table(a);

    let mut b = Table::new("b".to_string());
    b.add_column(id_column());
    b.add_column(int_column("a_id").not_null());
    primary_key(&mut b, "id");
    b.foreign_keys.push(ForeignKey::single("a_id", "a", "id"));
    schema.add_table(b);

    schema
}

/// One `accounts` table with a unique, required email column.
pub fn accounts_schema() -> DatabaseSchema {
    let mut schema = DatabaseSchema::new(DatabaseType::SQLite, "accounts".to_string());

    let mut accounts = Table::new("accounts".to_string());
    accounts.add_column(id_column());
    accounts.add_column(varchar_column("email", 64).not_null());
    primary_key(&mut accounts, "id");
    unique(&mut accounts, "email");
    schema.add_table(accounts);

    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_numbers_assigned_columns() {
        let schema = accounts_schema();
        let mut store = MemoryStore::for_schema(&schema);
        store.seed_row("accounts", &[("id", Value::Int(7)), ("email", Value::text("a@x.io"))]);

        let mut row = Row::new();
        row.insert("email".to_string(), Value::text("b@x.io"));
        store.insert_row("accounts", &row).await.unwrap();

        assert_eq!(
            store.column("accounts", "id"),
            vec![Value::Int(7), Value::Int(8)]
        );
        let emails = store.select_all_values("accounts", "email").await.unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(
            store.select_log(),
            vec![("accounts".to_string(), "email".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let store = MemoryStore::for_schema(&accounts_schema());
        assert!(store.select_all_values("ghosts", "id").await.is_err());
    }
}
