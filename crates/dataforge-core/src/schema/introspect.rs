use crate::error::{DataForgeError, Result};
use crate::schema::types::{DatabaseSchema, DatabaseType};

/// Trait for database schema introspection.
/// Each database backend implements this to extract schema metadata.
pub trait SchemaIntrospector: Send + Sync {
    /// Introspect the database and return the full schema.
    fn introspect(&self) -> impl std::future::Future<Output = Result<DatabaseSchema>> + Send;
}

/// Determine the database type from a connection URL.
pub fn database_type_from_url(url: &str) -> Result<DatabaseType> {
    let scheme = url.split("://").next().unwrap_or("");
    match scheme {
        "postgres" | "postgresql" => Ok(DatabaseType::PostgreSQL),
        "mysql" | "mariadb" => Ok(DatabaseType::MySQL),
        "sqlite" | "file" => Ok(DatabaseType::SQLite),
        other => Err(DataForgeError::UnsupportedDatabase {
            scheme: other.to_string(),
        }),
    }
}

/// Database name from the path segment of a URL, ignoring query parameters.
pub fn database_name_from_url(url: &str) -> Option<String> {
    url.rsplit('/')
        .next()
        .map(|s| s.split('?').next().unwrap_or(s).to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_from_url() {
        assert_eq!(
            database_type_from_url("mysql://root@localhost/app").unwrap(),
            DatabaseType::MySQL
        );
        assert_eq!(
            database_type_from_url("postgresql://localhost/app").unwrap(),
            DatabaseType::PostgreSQL
        );
        assert!(matches!(
            database_type_from_url("oracle://x"),
            Err(DataForgeError::UnsupportedDatabase { .. })
        ));
    }

    #[test]
    fn test_database_name_from_url() {
        assert_eq!(
            database_name_from_url("mysql://u:p@host:3306/shop?ssl-mode=required").as_deref(),
            Some("shop")
        );
        assert_eq!(database_name_from_url("mysql://u:p@host/"), None);
    }
}
