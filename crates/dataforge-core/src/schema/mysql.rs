//! MySQL introspection through `information_schema`.
//!
//! MySQL 8 labels `information_schema` columns in upper case, so every
//! selected column is aliased to the lower-case name it is read by. Length
//! and scale columns are `BIGINT UNSIGNED`.

use indexmap::IndexMap;
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::Row;

use crate::error::{DataForgeError, Result};
use crate::schema::introspect::SchemaIntrospector;
use crate::schema::types::*;

pub struct MySqlIntrospector {
    pool: MySqlPool,
    database_name: String,
}

impl MySqlIntrospector {
    pub fn new(pool: MySqlPool, database_name: String) -> Self {
        Self {
            pool,
            database_name,
        }
    }

    async fn fetch(&self, what: &str, query: &str) -> Result<Vec<MySqlRow>> {
        sqlx::query(query)
            .bind(&self.database_name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DataForgeError::Introspection {
                query: what.to_string(),
                source: e,
            })
    }

    async fn introspect_tables(&self) -> Result<IndexMap<String, Table>> {
        let rows = self
            .fetch(
                "fetch tables",
                "SELECT table_name AS table_name FROM information_schema.tables \
                 WHERE table_schema = ? AND table_type = 'BASE TABLE' ORDER BY table_name",
            )
            .await?;

        let mut tables = IndexMap::new();
        for row in rows {
            let name: String = row.get("table_name");
            tables.insert(name.clone(), Table::new(name));
        }
        Ok(tables)
    }

    async fn introspect_columns(&self, tables: &mut IndexMap<String, Table>) -> Result<()> {
        let query = r#"
            SELECT
                table_name AS table_name,
                column_name AS column_name,
                data_type AS data_type,
                column_type AS column_type,
                is_nullable AS is_nullable,
                character_maximum_length AS character_maximum_length,
                numeric_scale AS numeric_scale,
                extra AS extra
            FROM information_schema.columns
            WHERE table_schema = ?
            ORDER BY table_name, ordinal_position
        "#;

        for row in self.fetch("fetch columns", query).await? {
            let table_name: String = row.get("table_name");
            let column = ColumnRow {
                name: row.get("column_name"),
                data_type: row.get("data_type"),
                column_type: row.get("column_type"),
                is_nullable: row.get("is_nullable"),
                max_length: row.get("character_maximum_length"),
                numeric_scale: row.get("numeric_scale"),
                extra: row.get("extra"),
            }
            .into_column();

            if let Some(table) = tables.get_mut(&table_name) {
                table.add_column(column);
            }
        }

        Ok(())
    }

    async fn introspect_primary_keys(&self, tables: &mut IndexMap<String, Table>) -> Result<()> {
        let query = r#"
            SELECT
                table_name AS table_name,
                column_name AS column_name
            FROM information_schema.key_column_usage
            WHERE table_schema = ?
                AND constraint_name = 'PRIMARY'
            ORDER BY table_name, ordinal_position
        "#;

        for row in self.fetch("fetch primary keys", query).await? {
            let table_name: String = row.get("table_name");
            let column_name: String = row.get("column_name");

            if let Some(table) = tables.get_mut(&table_name) {
                table
                    .primary_key
                    .get_or_insert_with(|| PrimaryKey {
                        columns: Vec::new(),
                        name: Some("PRIMARY".to_string()),
                    })
                    .columns
                    .push(column_name);
            }
        }

        Ok(())
    }

    /// Every key column with a referenced table is part of a foreign key;
    /// columns of one constraint arrive in key order.
    async fn introspect_foreign_keys(&self, tables: &mut IndexMap<String, Table>) -> Result<()> {
        let query = r#"
            SELECT
                table_name AS table_name,
                constraint_name AS constraint_name,
                column_name AS column_name,
                referenced_table_name AS referenced_table_name,
                referenced_column_name AS referenced_column_name
            FROM information_schema.key_column_usage
            WHERE table_schema = ?
                AND referenced_table_name IS NOT NULL
            ORDER BY table_name, constraint_name, ordinal_position
        "#;

        let mut fk_map: IndexMap<(String, String), ForeignKey> = IndexMap::new();
        for row in self.fetch("fetch foreign keys", query).await? {
            let table_name: String = row.get("table_name");
            let constraint_name: String = row.get("constraint_name");

            let fk = fk_map
                .entry((table_name, constraint_name.clone()))
                .or_insert_with(|| ForeignKey {
                    name: Some(constraint_name),
                    source_columns: Vec::new(),
                    referenced_table: row.get("referenced_table_name"),
                    referenced_columns: Vec::new(),
                });
            fk.source_columns.push(row.get("column_name"));
            fk.referenced_columns.push(row.get("referenced_column_name"));
        }

        for ((table_name, _), fk) in fk_map {
            if let Some(table) = tables.get_mut(&table_name) {
                table.foreign_keys.push(fk);
            }
        }

        Ok(())
    }

    /// Unique indexes, which also back every UNIQUE constraint.
    async fn introspect_unique_constraints(
        &self,
        tables: &mut IndexMap<String, Table>,
    ) -> Result<()> {
        let query = r#"
            SELECT
                table_name AS table_name,
                index_name AS index_name,
                column_name AS column_name
            FROM information_schema.statistics
            WHERE table_schema = ?
                AND non_unique = 0
                AND index_name <> 'PRIMARY'
            ORDER BY table_name, index_name, seq_in_index
        "#;

        let mut uc_map: IndexMap<(String, String), Vec<String>> = IndexMap::new();
        for row in self.fetch("fetch unique constraints", query).await? {
            let table_name: String = row.get("table_name");
            let index_name: String = row.get("index_name");
            // NULL for functional key parts; those indexes are skipped below
            let column_name: Option<String> = row.get("column_name");

            let columns = uc_map.entry((table_name, index_name)).or_default();
            columns.push(column_name.unwrap_or_default());
        }

        for ((table_name, index_name), columns) in uc_map {
            if columns.iter().any(String::is_empty) {
                continue;
            }
            if let Some(table) = tables.get_mut(&table_name) {
                table.unique_constraints.push(UniqueConstraint {
                    name: Some(index_name),
                    columns,
                });
            }
        }

        Ok(())
    }
}

impl SchemaIntrospector for MySqlIntrospector {
    async fn introspect(&self) -> Result<DatabaseSchema> {
        let mut schema = DatabaseSchema::new(DatabaseType::MySQL, self.database_name.clone());

        schema.tables = self.introspect_tables().await?;
        self.introspect_columns(&mut schema.tables).await?;
        self.introspect_primary_keys(&mut schema.tables).await?;
        self.introspect_foreign_keys(&mut schema.tables).await?;
        self.introspect_unique_constraints(&mut schema.tables)
            .await?;

        tracing::debug!(
            "MySQL schema '{}': {} tables",
            schema.database_name,
            schema.table_count()
        );
        Ok(schema)
    }
}

/// One row of `information_schema.columns`.
struct ColumnRow {
    name: String,
    data_type: String,
    column_type: String,
    is_nullable: String,
    max_length: Option<u64>,
    numeric_scale: Option<u64>,
    extra: String,
}

impl ColumnRow {
    fn into_column(self) -> Column {
        let data_type = logical_type(&self.name, &self.data_type, &self.column_type);
        let enum_values = matches!(data_type, DataType::Enum(_))
            .then(|| parse_mysql_enum_values(&self.column_type));
        let extra = self.extra.to_ascii_lowercase();

        // column_type keeps "unsigned" and the enum members, which rules can match on
        let mut column = Column::new(self.name, data_type, self.column_type);
        column.nullable = self.is_nullable == "YES";
        column.is_auto_increment = extra.contains("auto_increment");
        // "DEFAULT_GENERATED" only marks an expression default
        column.is_generated =
            extra.contains("virtual generated") || extra.contains("stored generated");
        if column.data_type.is_string() {
            column.max_length = self.max_length.and_then(|v| u32::try_from(v).ok());
        }
        if column.data_type == DataType::Numeric {
            column.numeric_scale = self.numeric_scale.and_then(|v| u32::try_from(v).ok());
        }
        column.enum_values = enum_values;
        column
    }
}

/// Map MySQL's `data_type`/`column_type` pair onto a logical type.
fn logical_type(column_name: &str, data_type: &str, column_type: &str) -> DataType {
    match data_type.to_ascii_lowercase().as_str() {
        // BOOL and BOOLEAN are stored as tinyint(1)
        "tinyint" if column_type.to_ascii_lowercase().starts_with("tinyint(1)") => {
            DataType::Boolean
        }
        "enum" | "set" => DataType::Enum(column_name.to_string()),
        "year" => DataType::SmallInt,
        "bit" if column_type != "bit(1)" => DataType::Binary,
        other => DataType::from_raw(other),
    }
}

/// Members of an `enum('a','b')` or `set(..)` column type.
///
/// Members are single-quoted; a doubled quote is a literal quote and commas
/// inside quotes belong to the member.
fn parse_mysql_enum_values(column_type: &str) -> Vec<String> {
    let Some(inner) = column_type
        .trim()
        .split_once('(')
        .and_then(|(_, rest)| rest.strip_suffix(')'))
    else {
        return Vec::new();
    };

    let mut values = Vec::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\'' {
            continue;
        }
        let mut value = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\'' if chars.peek() == Some(&'\'') => {
                    chars.next();
                    value.push('\'');
                }
                '\'' => break,
                other => value.push(other),
            }
        }
        values.push(value);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, data_type: &str, column_type: &str, extra: &str) -> ColumnRow {
        ColumnRow {
            name: name.to_string(),
            data_type: data_type.to_string(),
            column_type: column_type.to_string(),
            is_nullable: "NO".to_string(),
            max_length: None,
            numeric_scale: None,
            extra: extra.to_string(),
        }
    }

    #[test]
    fn test_parse_mysql_enum_values() {
        let values = parse_mysql_enum_values("enum('active','inactive','suspended')");
        assert_eq!(values, vec!["active", "inactive", "suspended"]);
    }

    #[test]
    fn test_enum_members_keep_commas_and_quotes() {
        let values = parse_mysql_enum_values("enum('a,b','it''s','(x)')");
        assert_eq!(values, vec!["a,b", "it's", "(x)"]);

        assert!(parse_mysql_enum_values("varchar(10").is_empty());
    }

    #[test]
    fn test_tinyint_one_is_boolean() {
        assert_eq!(logical_type("active", "tinyint", "tinyint(1)"), DataType::Boolean);
        assert_eq!(
            logical_type("rank", "tinyint", "tinyint unsigned"),
            DataType::SmallInt
        );
        assert_eq!(
            logical_type("status", "enum", "enum('a')"),
            DataType::Enum("status".to_string())
        );
    }

    #[test]
    fn test_generated_columns_are_database_assigned() {
        let stored = row("total", "decimal", "decimal(10,2)", "STORED GENERATED").into_column();
        assert!(stored.is_database_assigned());

        let created =
            row("created_at", "timestamp", "timestamp", "DEFAULT_GENERATED").into_column();
        assert!(!created.is_database_assigned());

        let id = row("id", "int", "int unsigned", "auto_increment").into_column();
        assert!(id.is_database_assigned());
    }

    #[test]
    fn test_length_and_scale_only_where_they_apply() {
        let mut price = row("price", "decimal", "decimal(10,2)", "");
        price.numeric_scale = Some(2);
        let price = price.into_column();
        assert_eq!(price.data_type, DataType::Numeric);
        assert_eq!(price.numeric_scale, Some(2));

        let mut body = row("body", "longtext", "longtext", "");
        body.max_length = Some(4_294_967_295);
        assert_eq!(body.into_column().max_length, Some(u32::MAX));

        let mut blob = row("data", "varbinary", "varbinary(16)", "");
        blob.max_length = Some(16);
        assert_eq!(blob.into_column().max_length, None);
    }
}
