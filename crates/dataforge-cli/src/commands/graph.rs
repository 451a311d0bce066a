use anyhow::Result;

use dataforge_core::fill::{plan_fill, FillSettings};
use dataforge_core::graph::visualize::{self, GraphFormat as VizFormat};

use crate::args::GraphArgs;
use crate::commands::{connect, load_config, ordering_source, selection};

pub async fn run(args: &GraphArgs) -> Result<()> {
    let config = load_config()?;
    let (store, schema) = connect(&args.target, config.as_ref()).await?;
    store.close().await;

    let settings = FillSettings {
        selection: selection(&args.target, config.as_ref()),
        ..FillSettings::default()
    };
    let mut ordering = ordering_source(&args.target, config.as_ref());
    let (relations, order) = plan_fill(&schema, &mut *ordering, &settings, None)?;

    let format = match args.format {
        crate::args::GraphFormat::Mermaid => VizFormat::Mermaid,
        crate::args::GraphFormat::Dot => VizFormat::Dot,
    };

    let output = visualize::visualize(&relations, &order.broken_edges, format);
    println!("{}", output);

    Ok(())
}
