mod api;
mod bundle;
mod cli;
mod config;
mod solve;

use std::process;

use tracing_subscriber::EnvFilter;

fn main() {
    // Progress and warnings go to stderr; stdout carries only the fix.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sextant=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
