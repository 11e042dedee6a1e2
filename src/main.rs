//! timingsbot - answers server timings links with a list of what looks wrong

use clap::Parser;

mod cache;
mod cli;
mod client;
mod config;
mod error;
mod listener;
mod output;
mod timings;

use cli::{Cli, CommandContext, Commands, GlobalOptions};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Version => {
            println!("timingsbot version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Analyze { text } => cli::analyze::run(CommandContext::new(&opts)?, text).await,
        Commands::Listen { sender } => cli::listen::run(CommandContext::new(&opts)?, sender).await,
    }
}

/// Warnings only unless `--debug`; `RUST_LOG` always wins
fn init_logging(debug: bool) {
    let default_filter = if debug { "timingsbot=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}
