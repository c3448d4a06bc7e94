//! Apiary CLI
//!
//! Inspect and reset the local stores an API workbench keeps per application.

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.default_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = commands::run(cli).await?;
    println!("{}", output);
    Ok(())
}
