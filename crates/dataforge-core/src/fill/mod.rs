//! The insertion driver: one complete fill pass over the selected tables.

pub mod driver;
pub mod report;

pub use driver::{plan_fill, run_fill, FillEvent, FillSettings, Observer};
pub use report::{FillReport, TableReport};
