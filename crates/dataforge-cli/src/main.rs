use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod commands;
mod prompt;

use args::{Cli, Command};

#[tokio::main]
async fn main() {
    // Load .env before parsing so clap's env fallbacks see it
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Command::Fill(args) => commands::fill::run(args).await,
        Command::Order(args) => commands::order::run(args).await,
        Command::Graph(args) => commands::graph::run(args).await,
    };

    if let Err(err) = result {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
