use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use comfy_table::{Cell, Table as ComfyTable};
use indicatif::{ProgressBar, ProgressStyle};

use dataforge_core::config::DataForgeConfig;
use dataforge_core::fill::{run_fill, FillEvent, FillReport, FillSettings, Observer};
use dataforge_core::generate::rules::RuleSet;

use crate::args::FillArgs;
use crate::commands::{connect, load_config, ordering_source, selection};

pub async fn run(args: &FillArgs) -> Result<()> {
    let config = load_config()?;
    let (mut store, schema) = connect(&args.target, config.as_ref()).await?;

    let rules = rule_set(args, config.as_ref())?;
    let settings = fill_settings(args, config.as_ref());
    let mut ordering = ordering_source(&args.target, config.as_ref());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} Filling {msg}... {bar:40.cyan/dim} {pos}/{len} ({eta})")?
            .progress_chars("█▓░"),
    );

    let observer: Observer = &|event| match event {
        FillEvent::CycleDetected { tables } => {
            let names: Vec<&str> = tables.iter().map(String::as_str).collect();
            eprintln!("Dependency cycle among: {}", names.join(", "));
        }
        FillEvent::OrderResolved { tables } => {
            pb.set_length((tables.len() * settings.rows) as u64);
        }
        FillEvent::TableStarted { table, .. } => pb.set_message(table.to_string()),
        FillEvent::RowInserted { .. } => pb.inc(1),
        FillEvent::TableCompleted { table } => tracing::debug!("{} done", table),
    };

    let result = run_fill(
        &schema,
        &mut store,
        &mut *ordering,
        &rules,
        &settings,
        Some(observer),
    )
    .await;
    store.close().await;

    let report = match result {
        Ok(report) => {
            pb.finish_and_clear();
            report
        }
        Err(err) => {
            pb.abandon();
            return Err(err.into());
        }
    };

    print_report(&report);
    eprintln!(
        "\n✓ Inserted {} rows across {} tables into {} (seed {})",
        report.total_rows(),
        report.tables.len(),
        schema.database_type,
        report.seed
    );
    Ok(())
}

/// Configured rules, then the built-in ones unless switched off.
fn rule_set(args: &FillArgs, config: Option<&DataForgeConfig>) -> Result<RuleSet> {
    let mut config = config.cloned().unwrap_or_default();
    if args.no_builtin_rules {
        config.rules.builtin = false;
    }
    Ok(config.rule_set()?)
}

/// CLI flags over dataforge.toml over defaults. Without a seed anywhere, a
/// time-based one is used and printed so the pass can be repeated.
fn fill_settings(args: &FillArgs, config: Option<&DataForgeConfig>) -> FillSettings {
    let base = config
        .map(DataForgeConfig::fill_settings)
        .unwrap_or_default();
    let seed = args
        .seed
        .or_else(|| config.and_then(|c| c.fill.seed))
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        });

    FillSettings {
        rows: args.rows.unwrap_or(base.rows),
        seed,
        selection: selection(&args.target, config),
        max_unique_retries: args.max_unique_retries.unwrap_or(base.max_unique_retries),
    }
}

fn print_report(report: &FillReport) {
    let mut t = ComfyTable::new();
    t.set_header(vec!["#", "Table", "Rows"]);
    for (i, table) in report.tables.iter().enumerate() {
        t.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&table.table),
            Cell::new(table.rows_inserted),
        ]);
    }
    println!("{}", t);

    if !report.order.broken_edges.is_empty() {
        println!("\nReferences filled before their target (NULL where the target was empty):");
        for edge in &report.order.broken_edges {
            for column in &edge.columns {
                println!("  {}.{} → {}", edge.referencing, column, edge.referenced);
            }
        }
    }
}
