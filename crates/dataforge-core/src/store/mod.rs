//! # Stores
//!
//! The write side of a fill pass. A `Store` answers "which values does this
//! column hold right now" and persists one row at a time. `SqlStore` is the
//! sqlx-backed implementation; tests use an in-memory one.

pub mod sql;

use std::future::Future;

use indexmap::IndexMap;

use crate::error::Result;
use crate::generate::value::Value;

/// Backing storage the fill pass reads referents from and writes rows to.
pub trait Store {
    /// Every non-null value currently stored in `table.column`.
    fn select_all_values(
        &self,
        table: &str,
        column: &str,
    ) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Persist one row atomically. Columns absent from `row` take their
    /// database default.
    fn insert_row(
        &mut self,
        table: &str,
        row: &IndexMap<String, Value>,
    ) -> impl Future<Output = Result<()>> + Send;
}
