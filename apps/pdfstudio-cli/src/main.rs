//! PDF Studio binary
//!
//! Entry point for the command line tools.

use clap::Parser;
use pdfstudio_cli::{commands, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries the result path and `info` JSON, logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting PDF Studio v{}", env!("CARGO_PKG_VERSION"));

    if let Some(path) = commands::run(cli).await? {
        println!("{}", path.display());
    }
    Ok(())
}
