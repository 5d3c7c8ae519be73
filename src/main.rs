mod aggregate;
mod cli;
mod config;
mod map;
mod model;
mod observe;
mod oracle;
mod pipeline;
mod pose;
mod report;
mod video;

use std::process;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries only the report path.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
