use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of a database schema, read once per fill pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub database_type: DatabaseType,
    pub database_name: String,
    pub tables: IndexMap<String, Table>,
}

impl DatabaseSchema {
    pub fn new(database_type: DatabaseType, database_name: String) -> Self {
        Self {
            database_type,
            database_name,
            tables: IndexMap::new(),
        }
    }

    /// Insert a table keyed by its own name.
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn foreign_key_count(&self) -> usize {
        self.tables.values().map(|t| t.foreign_keys.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::PostgreSQL => write!(f, "PostgreSQL"),
            DatabaseType::MySQL => write!(f, "MySQL"),
            DatabaseType::SQLite => write!(f, "SQLite"),
        }
    }
}

/// A database table with its columns, keys and uniqueness constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: IndexMap<String, Column>,
    pub primary_key: Option<PrimaryKey>,
    pub foreign_keys: Vec<ForeignKey>,
    pub unique_constraints: Vec<UniqueConstraint>,
}

impl Table {
    pub fn new(name: String) -> Self {
        Self {
            name,
            columns: IndexMap::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
            unique_constraints: Vec::new(),
        }
    }

    pub fn add_column(&mut self, column: Column) {
        self.columns.insert(column.name.clone(), column);
    }

    /// Columns that must hold distinct values on their own: single-column
    /// UNIQUE constraints plus a single-column primary key. Composite
    /// constraints do not make any one of their columns unique.
    pub fn unique_columns(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let single_pk = self
            .primary_key
            .as_ref()
            .filter(|pk| pk.columns.len() == 1)
            .map(|pk| &pk.columns[0]);
        let single_uniques = self
            .unique_constraints
            .iter()
            .filter(|uc| uc.columns.len() == 1)
            .map(|uc| &uc.columns[0]);

        for name in single_pk.into_iter().chain(single_uniques) {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }
}

/// A single column in a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub raw_type: String,
    pub nullable: bool,
    pub is_auto_increment: bool,
    pub max_length: Option<u32>,
    /// Digits after the decimal point of an exact numeric.
    pub numeric_scale: Option<u32>,
    /// Computed by the database from other columns; never written.
    pub is_generated: bool,
    pub enum_values: Option<Vec<String>>,
}

impl Column {
    pub fn new(name: String, data_type: DataType, raw_type: String) -> Self {
        Self {
            name,
            data_type,
            raw_type,
            nullable: true,
            is_auto_increment: false,
            max_length: None,
            numeric_scale: None,
            is_generated: false,
            enum_values: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_numeric_scale(mut self, scale: u32) -> Self {
        self.numeric_scale = Some(scale);
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self.nullable = false;
        self
    }

    /// True when the database assigns this column's value on insert.
    pub fn is_database_assigned(&self) -> bool {
        self.is_auto_increment || self.is_generated || self.data_type.is_serial()
    }
}

/// Normalized logical type covering all supported databases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    /// Small integer (int2, smallint, tinyint)
    SmallInt,
    /// Standard integer (int4, integer, int)
    Integer,
    /// Large integer (int8, bigint)
    BigInt,
    /// Single-precision float (float4, real)
    Float,
    /// Double-precision float (float8, double precision)
    Double,
    /// Exact numeric with precision/scale (numeric, decimal)
    Numeric,
    /// Fixed-length string (char)
    Char,
    /// Variable-length string (varchar, character varying)
    VarChar,
    /// Unbounded text (text)
    Text,
    Boolean,
    Date,
    Time,
    /// Timestamp without timezone
    Timestamp,
    /// Timestamp with timezone
    TimestampTz,
    Uuid,
    Json,
    /// Binary JSON (jsonb)
    Jsonb,
    /// Binary/blob data (bytea, blob)
    Binary,
    /// Database-specific enum type
    Enum(String),
    /// Serial (auto-incrementing integer, PG)
    Serial,
    /// Big serial (auto-incrementing bigint, PG)
    BigSerial,
    /// Unknown or unrecognized type
    Unknown(String),
}

impl DataType {
    /// Parse a raw SQL type string into a normalized DataType.
    pub fn from_raw(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        let normalized = normalized.as_str();

        match normalized {
            // Integer types
            "smallint" | "int2" | "smallserial" | "serial2" | "tinyint" => DataType::SmallInt,
            "integer" | "int" | "int4" | "mediumint" => DataType::Integer,
            "bigint" | "int8" => DataType::BigInt,
            "serial" | "serial4" => DataType::Serial,
            "bigserial" | "serial8" => DataType::BigSerial,

            // Float types
            "real" | "float4" | "float" => DataType::Float,
            "double precision" | "float8" | "double" => DataType::Double,

            s if s.starts_with("numeric") || s.starts_with("decimal") => DataType::Numeric,

            // String types
            s if s.starts_with("character varying") || s.starts_with("varchar") => {
                DataType::VarChar
            }
            s if s.starts_with("char") || s.starts_with("character(") => DataType::Char,
            "text" | "tinytext" | "mediumtext" | "longtext" | "clob" => DataType::Text,

            "boolean" | "bool" | "bit" => DataType::Boolean,

            // Date/time
            "date" => DataType::Date,
            "time" | "time without time zone" => DataType::Time,
            "timestamp" | "timestamp without time zone" | "datetime" => DataType::Timestamp,
            "timestamp with time zone" | "timestamptz" => DataType::TimestampTz,

            "uuid" => DataType::Uuid,

            "json" => DataType::Json,
            "jsonb" => DataType::Jsonb,

            "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary" | "varbinary" => {
                DataType::Binary
            }

            other => DataType::Unknown(other.to_string()),
        }
    }

    /// Returns true if this type represents an auto-incrementing sequence.
    pub fn is_serial(&self) -> bool {
        matches!(self, DataType::Serial | DataType::BigSerial)
    }

    /// Returns true if this type is a string/text type.
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::Char | DataType::VarChar | DataType::Text)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::SmallInt => write!(f, "smallint"),
            DataType::Integer => write!(f, "integer"),
            DataType::BigInt => write!(f, "bigint"),
            DataType::Float => write!(f, "real"),
            DataType::Double => write!(f, "double precision"),
            DataType::Numeric => write!(f, "numeric"),
            DataType::Char => write!(f, "char"),
            DataType::VarChar => write!(f, "varchar"),
            DataType::Text => write!(f, "text"),
            DataType::Boolean => write!(f, "boolean"),
            DataType::Date => write!(f, "date"),
            DataType::Time => write!(f, "time"),
            DataType::Timestamp => write!(f, "timestamp"),
            DataType::TimestampTz => write!(f, "timestamptz"),
            DataType::Uuid => write!(f, "uuid"),
            DataType::Json => write!(f, "json"),
            DataType::Jsonb => write!(f, "jsonb"),
            DataType::Binary => write!(f, "binary"),
            DataType::Enum(name) => write!(f, "enum({})", name),
            DataType::Serial => write!(f, "serial"),
            DataType::BigSerial => write!(f, "bigserial"),
            DataType::Unknown(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub columns: Vec<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub source_columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

impl ForeignKey {
    /// Single-column foreign key, the shape most schemas use.
    pub fn single(column: &str, referenced_table: &str, referenced_column: &str) -> Self {
        Self {
            name: None,
            source_columns: vec![column.to_string()],
            referenced_table: referenced_table.to_string(),
            referenced_columns: vec![referenced_column.to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_normalizes_common_types() {
        assert_eq!(DataType::from_raw("VARCHAR(255)"), DataType::VarChar);
        assert_eq!(DataType::from_raw("character varying"), DataType::VarChar);
        assert_eq!(DataType::from_raw("tinyint"), DataType::SmallInt);
        assert_eq!(DataType::from_raw("datetime"), DataType::Timestamp);
        assert_eq!(DataType::from_raw("longblob"), DataType::Binary);
        assert_eq!(
            DataType::from_raw("geometry"),
            DataType::Unknown("geometry".to_string())
        );
    }

    #[test]
    fn test_unique_columns_include_single_pk_and_skip_composites() {
        let mut table = Table::new("memberships".to_string());
        table.primary_key = Some(PrimaryKey {
            columns: vec!["id".to_string()],
            name: None,
        });
        table.unique_constraints.push(UniqueConstraint {
            name: None,
            columns: vec!["code".to_string()],
        });
        table.unique_constraints.push(UniqueConstraint {
            name: None,
            columns: vec!["user_id".to_string(), "team_id".to_string()],
        });
        table.unique_constraints.push(UniqueConstraint {
            name: None,
            columns: vec!["id".to_string()],
        });

        assert_eq!(table.unique_columns(), vec!["id", "code"]);
    }

    #[test]
    fn test_serial_columns_are_database_assigned() {
        let serial = Column::new("id".to_string(), DataType::Serial, "serial".to_string());
        let plain = Column::new("n".to_string(), DataType::Integer, "integer".to_string());
        assert!(serial.is_database_assigned());
        assert!(!plain.is_database_assigned());
        assert!(plain.auto_increment().is_database_assigned());
    }
}
