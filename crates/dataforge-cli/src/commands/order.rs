use anyhow::Result;
use comfy_table::{Cell, Table as ComfyTable};

use dataforge_core::fill::{plan_fill, FillSettings};

use crate::args::OrderArgs;
use crate::commands::{connect, load_config, ordering_source, selection};

pub async fn run(args: &OrderArgs) -> Result<()> {
    let config = load_config()?;
    let (store, schema) = connect(&args.target, config.as_ref()).await?;
    store.close().await;

    let settings = FillSettings {
        selection: selection(&args.target, config.as_ref()),
        ..FillSettings::default()
    };
    let mut ordering = ordering_source(&args.target, config.as_ref());
    let (relations, order) = plan_fill(&schema, &mut *ordering, &settings, None)?;

    let mut t = ComfyTable::new();
    t.set_header(vec!["#", "Table", "Depends on", "NULL (unselected)"]);
    for (i, table) in order.tables.iter().enumerate() {
        let depends_on: Vec<&str> = relations
            .depends_on
            .get(table)
            .map(|deps| {
                deps.keys()
                    .filter(|referenced| {
                        !order
                            .broken_edges
                            .iter()
                            .any(|e| &e.referencing == table && &e.referenced == *referenced)
                    })
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default();

        t.add_row(vec![
            Cell::new(i + 1),
            Cell::new(table),
            Cell::new(depends_on.join(", ")),
            Cell::new(relations.detached_columns(table).join(", ")),
        ]);
    }
    println!("{}", t);

    if !order.cycle_tables.is_empty() {
        let cycle: Vec<&str> = order.cycle_tables.iter().map(String::as_str).collect();
        println!("\nCycle resolved among: {}", cycle.join(", "));
        for edge in &order.broken_edges {
            println!(
                "  {} no longer waits for {} ({})",
                edge.referencing,
                edge.referenced,
                edge.columns.join(", ")
            );
        }
    }

    Ok(())
}
