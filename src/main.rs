//! docdb-install - DocDB installation tool

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docdb_install::cli::Cli;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(cli) {
        error!("Error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Starting docdb-install {}", env!("CARGO_PKG_VERSION"));
    cli.execute().context("installation aborted")?;
    Ok(())
}

fn init_logging(debug: bool) {
    let default_filter = if debug {
        "docdb_install=debug"
    } else {
        "docdb_install=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
