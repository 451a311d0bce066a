pub mod config;
pub mod error;
pub mod fill;
pub mod generate;
pub mod graph;
pub mod schema;
pub mod store;

// Re-export key types for convenience
pub use error::{DataForgeError, ExhaustionReason, Result};
pub use fill::{run_fill, FillEvent, FillReport, FillSettings};
pub use generate::rules::{Generator, RuleSet, SpecialFieldRule};
pub use generate::value::Value;
pub use graph::cycle::{ConfiguredOrder, FillOrder, OrderingSource};
pub use graph::dag::TableSelection;
pub use schema::catalog::{SchemaCatalog, TableSnapshot};
pub use schema::types::{DatabaseSchema, DatabaseType};
pub use store::Store;
