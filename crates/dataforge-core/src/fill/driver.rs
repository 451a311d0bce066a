//! # Insertion Driver
//!
//! Runs one fill pass: resolve the table selection and fill order, then for
//! each table in order refresh the referential pool, build `rows` rows and
//! insert them one at a time. Any error stops the pass; rows already
//! inserted stay committed.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::fill::report::{FillReport, TableReport};
use crate::generate::pipeline::{RowPlan, ValueGenerationPipeline, DEFAULT_MAX_UNIQUE_RETRIES};
use crate::generate::pool::ReferentialValuePool;
use crate::generate::rules::RuleSet;
use crate::graph::cycle::{resolve_fill_order, FillOrder, OrderingSource};
use crate::graph::dag::{Relations, TableSelection};
use crate::schema::catalog::{SchemaCatalog, TableSnapshot};
use crate::store::Store;

/// Knobs for one fill pass.
#[derive(Debug, Clone)]
pub struct FillSettings {
    /// Rows inserted into every selected table.
    pub rows: usize,
    pub seed: u64,
    pub selection: TableSelection,
    pub max_unique_retries: usize,
}

impl Default for FillSettings {
    fn default() -> Self {
        Self {
            rows: 10,
            seed: 0,
            selection: TableSelection::default(),
            max_unique_retries: DEFAULT_MAX_UNIQUE_RETRIES,
        }
    }
}

/// Progress notifications emitted during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillEvent<'a> {
    /// The dependency graph has a cycle through these tables.
    CycleDetected { tables: &'a BTreeSet<String> },
    /// The fill order is settled; filling starts next.
    OrderResolved { tables: &'a [String] },
    TableStarted { table: &'a str, rows: usize },
    /// `count` rows of `table` are in so far.
    RowInserted { table: &'a str, count: usize },
    TableCompleted { table: &'a str },
}

pub type Observer<'a> = &'a (dyn Fn(&FillEvent) + Send + Sync);

fn emit(observer: Option<Observer>, event: FillEvent) {
    if let Some(cb) = observer {
        cb(&event);
    }
}

/// Resolve the fill order for `settings.selection` without touching the store.
pub fn plan_fill(
    catalog: &impl SchemaCatalog,
    ordering: &mut dyn OrderingSource,
    settings: &FillSettings,
    observer: Option<Observer>,
) -> Result<(Relations, FillOrder)> {
    let relations = Relations::build(catalog, &settings.selection)?;
    let on_cycle = |tables: &BTreeSet<String>| emit(observer, FillEvent::CycleDetected { tables });
    let order = resolve_fill_order(&relations, ordering, Some(&on_cycle))?;
    Ok((relations, order))
}

/// Fill every selected table with `settings.rows` rows.
pub async fn run_fill<C, S>(
    catalog: &C,
    store: &mut S,
    ordering: &mut dyn OrderingSource,
    rules: &RuleSet,
    settings: &FillSettings,
    observer: Option<Observer<'_>>,
) -> Result<FillReport>
where
    C: SchemaCatalog,
    S: Store,
{
    let (relations, order) = plan_fill(catalog, ordering, settings, observer)?;
    emit(
        observer,
        FillEvent::OrderResolved {
            tables: &order.tables,
        },
    );
    tracing::info!(
        "Filling {} tables with {} rows each (seed {})",
        order.tables.len(),
        settings.rows,
        settings.seed
    );

    let mut pipeline = ValueGenerationPipeline::new(rules, settings.seed)
        .with_max_unique_retries(settings.max_unique_retries);
    let mut pool = ReferentialValuePool::new();
    let mut tables = Vec::with_capacity(order.tables.len());

    for table in &order.tables {
        let snapshot = TableSnapshot::read(catalog, table)?;
        let plan = row_plan(&snapshot, &relations, &order);

        emit(
            observer,
            FillEvent::TableStarted {
                table,
                rows: settings.rows,
            },
        );
        pool.prepare(&*store, &snapshot, &plan.detached).await?;

        for i in 0..settings.rows {
            let row = pipeline.build_row(&snapshot, &mut pool, &plan)?;
            store.insert_row(table, &row).await?;
            emit(
                observer,
                FillEvent::RowInserted {
                    table,
                    count: i + 1,
                },
            );
        }

        tracing::debug!("Filled {} with {} rows", table, settings.rows);
        emit(observer, FillEvent::TableCompleted { table });
        tables.push(TableReport {
            table: table.clone(),
            rows_inserted: settings.rows,
        });
    }

    Ok(FillReport {
        order,
        tables,
        seed: settings.seed,
    })
}

fn row_plan(snapshot: &TableSnapshot, relations: &Relations, order: &FillOrder) -> RowPlan {
    let late_references = snapshot
        .foreign_keys
        .values()
        .filter(|fk| {
            fk.is_self_reference(&snapshot.name)
                || order.broken_edges.iter().any(|e| {
                    e.referencing == snapshot.name
                        && e.referenced == fk.referenced_table
                        && e.columns.contains(&fk.column)
                })
        })
        .map(|fk| fk.column.clone())
        .collect();

    RowPlan {
        detached: relations.detached_columns(&snapshot.name).to_vec(),
        late_references,
    }
}
