pub mod fill;
pub mod graph;
pub mod order;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use dataforge_core::config::{read_config, DataForgeConfig};
use dataforge_core::error::DataForgeError;
use dataforge_core::graph::cycle::{ConfiguredOrder, OrderingSource};
use dataforge_core::graph::dag::TableSelection;
use dataforge_core::schema::types::DatabaseSchema;
use dataforge_core::store::sql::SqlStore;

use crate::args::TargetArgs;
use crate::prompt::PromptOrder;

/// Load dataforge.toml from the working directory, if present.
pub fn load_config() -> Result<Option<DataForgeConfig>> {
    Ok(read_config(Path::new("."))?)
}

/// Connect and read the schema, with a spinner while it runs.
pub async fn connect(target: &TargetArgs, config: Option<&DataForgeConfig>) -> Result<(SqlStore, DatabaseSchema)> {
    let db_url = resolve_db_url(target.db.as_deref(), config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.set_message("Introspecting schema...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let store = SqlStore::connect(&db_url).await?;
    let schema = store.introspect().await?;

    pb.finish_with_message(format!(
        "Introspecting schema... ✓ {} tables, {} foreign keys",
        schema.table_count(),
        schema.foreign_key_count()
    ));
    Ok((store, schema))
}

/// Flags win; the config file fills in what they leave empty.
pub fn selection(target: &TargetArgs, config: Option<&DataForgeConfig>) -> TableSelection {
    let from_config = config.map(|c| c.fill_settings().selection).unwrap_or_default();
    TableSelection {
        include: if target.include.is_empty() {
            from_config.include
        } else {
            target.include.clone()
        },
        exclude: if target.exclude.is_empty() {
            from_config.exclude
        } else {
            target.exclude.clone()
        },
    }
}

/// `--cycle-order`, then `[graph] cycle_order`, then an interactive prompt.
pub fn ordering_source(
    target: &TargetArgs,
    config: Option<&DataForgeConfig>,
) -> Box<dyn OrderingSource + Send> {
    if !target.cycle_order.is_empty() {
        return Box::new(ConfiguredOrder::new(target.cycle_order.clone()));
    }
    match config.and_then(DataForgeConfig::cycle_order) {
        Some(order) => Box::new(order),
        None => Box::new(PromptOrder::new()),
    }
}

/// Resolve the database URL: `--db` or DATABASE_URL (clap reads both),
/// then the DB_HOST/DB_USER/DB_PASSWORD/DB_NAME variables, then dataforge.toml.
pub fn resolve_db_url(explicit: Option<&str>, config: Option<&DataForgeConfig>) -> Result<String> {
    if let Some(url) = explicit {
        return Ok(url.to_string());
    }

    if let Some(url) = url_from_parts()? {
        return Ok(url);
    }

    if let Some(url) = config.and_then(|c| c.database.url.clone()) {
        return Ok(url);
    }

    Err(DataForgeError::NoDatabaseUrl.into())
}

/// A mysql:// URL from the DB_* variables, when host, user and name are all set.
fn url_from_parts() -> Result<Option<String>> {
    let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
    let (Some(host), Some(user), Some(name)) = (var("DB_HOST"), var("DB_USER"), var("DB_NAME"))
    else {
        return Ok(None);
    };

    let mut url = url::Url::parse(&format!("mysql://{}/{}", host, name))
        .with_context(|| format!("DB_HOST '{}' / DB_NAME '{}' do not form a valid URL", host, name))?;
    url.set_username(&user)
        .map_err(|_| anyhow!("DB_USER '{}' cannot be used in a URL", user))?;
    if let Some(password) = var("DB_PASSWORD") {
        url.set_password(Some(&password))
            .map_err(|_| anyhow!("DB_PASSWORD cannot be used in a URL"))?;
    }
    Ok(Some(url.to_string()))
}
