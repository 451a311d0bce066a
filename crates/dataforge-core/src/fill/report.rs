use crate::graph::cycle::FillOrder;

/// Rows written to one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub rows_inserted: usize,
}

/// Outcome of a completed fill pass.
#[derive(Debug, Clone)]
pub struct FillReport {
    pub order: FillOrder,
    /// One entry per filled table, in fill order.
    pub tables: Vec<TableReport>,
    pub seed: u64,
}

impl FillReport {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows_inserted).sum()
    }

    pub fn rows_for(&self, table: &str) -> Option<usize> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .map(|t| t.rows_inserted)
    }

    pub fn had_cycle(&self) -> bool {
        !self.order.cycle_tables.is_empty()
    }
}
