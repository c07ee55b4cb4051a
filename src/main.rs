use std::process;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use mwematch::cli::Args;

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.debug);
    match mwematch::run(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(2);
        }
    }
}
