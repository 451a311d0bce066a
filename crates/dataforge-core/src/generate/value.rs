use std::borrow::Cow;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::types::{Column, DataType, DatabaseType};

/// A value for one database column.
///
/// The `String` variant uses `Cow<'static, str>` so that values drawn from
/// static lookup tables (genders, statuses) stay zero-cost `&'static str`
/// borrows while generated text is owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Cow<'static, str>),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::String(Cow::Owned(s.into()))
    }

    /// Convert to a SQL literal string suitable for INSERT statements.
    pub fn to_sql_literal(&self, db_type: &DatabaseType) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match db_type {
                DatabaseType::MySQL | DatabaseType::SQLite => {
                    if *b {
                        "1".to_string()
                    } else {
                        "0".to_string()
                    }
                }
                DatabaseType::PostgreSQL => {
                    if *b {
                        "TRUE".to_string()
                    } else {
                        "FALSE".to_string()
                    }
                }
            },
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.is_finite() {
                    format!("{}", f)
                } else {
                    "NULL".to_string()
                }
            }
            Value::String(s) => quote_text(s, db_type),
            Value::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Value::Time(t) => format!("'{}'", t.format("%H:%M:%S")),
            Value::Uuid(u) => format!("'{}'", u),
            Value::Json(j) => quote_text(&j.to_string(), db_type),
            Value::Bytes(b) => match db_type {
                DatabaseType::PostgreSQL => format!("'\\x{}'", hex_encode(b)),
                _ => format!("X'{}'", hex_encode(b)),
            },
        }
    }

    /// String form used for uniqueness and membership checks.
    ///
    /// Values read back from a store arrive as text, so the key of a generated
    /// value must match the text the database would return for it.
    pub fn to_unique_key(&self) -> String {
        match self {
            Value::Null => "__NULL__".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format!("{}", f),
            Value::String(s) => s.to_string(),
            Value::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.format("%H:%M:%S").to_string(),
            Value::Uuid(u) => u.to_string(),
            Value::Json(j) => j.to_string(),
            Value::Bytes(b) => hex_encode(b),
        }
    }

    /// Key of this value as stored in `column`, for uniqueness checks.
    ///
    /// Read-back text depends on the database: booleans come back as `1`/`0`,
    /// `t`/`f` or `true`/`false`, and exact numerics carry their scale
    /// (`12.30`). Generated and read-back values are brought to one form per
    /// column type before they are compared.
    pub fn column_key(&self, column: &Column) -> String {
        match column.data_type {
            DataType::Boolean => match self.as_bool_like() {
                Some(b) => b.to_string(),
                None => self.to_unique_key(),
            },
            DataType::Float | DataType::Double | DataType::Numeric => match self.as_number() {
                Some(n) => match column.numeric_scale {
                    Some(scale) => format!("{:.*}", scale as usize, n),
                    None => format!("{}", n),
                },
                None => self.to_unique_key(),
            },
            _ => self.to_unique_key(),
        }
    }

    fn as_bool_like(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "t" | "true" | "y" | "yes" | "on" => Some(true),
                "0" | "f" | "false" | "n" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Cut text to at most `max_chars` characters. Non-text values pass through.
    pub fn truncated(self, max_chars: usize) -> Self {
        match self {
            Value::String(s) if s.chars().count() > max_chars => {
                Value::text(s.chars().take(max_chars).collect::<String>())
            }
            other => other,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bytes(b) => write!(f, "{}", hex_encode(b)),
            other => write!(f, "{}", other.to_unique_key()),
        }
    }
}

fn quote_text(s: &str, db_type: &DatabaseType) -> String {
    let escaped = s.replace('\'', "''");
    match db_type {
        // MySQL treats backslash as an escape character inside string literals
        DatabaseType::MySQL => format!("'{}'", escaped.replace('\\', "\\\\")),
        _ => format!("'{}'", escaped),
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_counts_characters() {
        let v = Value::text("héllo world").truncated(5);
        assert_eq!(v.as_string(), Some("héllo"));

        let short = Value::text("abc").truncated(10);
        assert_eq!(short.as_string(), Some("abc"));

        assert_eq!(Value::Int(123456).truncated(2), Value::Int(123456));
    }

    #[test]
    fn test_sql_literal_escaping() {
        let v = Value::text("O'Brien \\ co");
        assert_eq!(
            v.to_sql_literal(&DatabaseType::PostgreSQL),
            "'O''Brien \\ co'"
        );
        assert_eq!(v.to_sql_literal(&DatabaseType::MySQL), "'O''Brien \\\\ co'");
        assert_eq!(Value::Bool(true).to_sql_literal(&DatabaseType::MySQL), "1");
        assert_eq!(
            Value::Bytes(vec![0xab, 0x01]).to_sql_literal(&DatabaseType::PostgreSQL),
            "'\\xab01'"
        );
    }

    #[test]
    fn test_unique_key_matches_database_text() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(Value::Timestamp(ts).to_unique_key(), "2024-03-01 08:30:00");
        assert_eq!(Value::Int(7).to_unique_key(), Value::text("7").to_unique_key());
    }

    #[test]
    fn test_column_key_matches_read_back_text() {
        let flag = Column::new("active".to_string(), DataType::Boolean, "tinyint(1)".to_string());
        assert_eq!(Value::Bool(true).column_key(&flag), Value::text("1").column_key(&flag));
        assert_eq!(Value::Bool(false).column_key(&flag), Value::text("f").column_key(&flag));
        assert_ne!(Value::Bool(true).column_key(&flag), Value::text("0").column_key(&flag));

        let price = Column::new("price".to_string(), DataType::Numeric, "numeric(10,2)".to_string())
            .with_numeric_scale(2);
        assert_eq!(Value::Float(12.3).column_key(&price), "12.30");
        assert_eq!(Value::text("12.30").column_key(&price), "12.30");

        let ratio = Column::new("ratio".to_string(), DataType::Double, "double".to_string());
        assert_eq!(Value::Float(1.0).column_key(&ratio), Value::text("1.0").column_key(&ratio));

        // Text columns compare the text itself
        let code = Column::new("code".to_string(), DataType::VarChar, "varchar".to_string());
        assert_ne!(Value::text("1").column_key(&code), Value::text("true").column_key(&code));
        assert_eq!(Value::Null.column_key(&flag), Value::Null.to_unique_key());
    }
}
