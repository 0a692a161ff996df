//! staticapi CLI - static API tree generator.
//!
//! Reads a nested `schema.json` route tree and materializes it as a mirrored
//! directory tree of static JSON documents, one per route, each annotated
//! with links to its children. The output is meant to be served by any
//! static file server in place of a live API.

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::BuildArgs;
use output::Output;

/// staticapi - static API tree generator.
#[derive(Parser)]
#[command(name = "staticapi", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize the route tree as static JSON documents.
    Build(BuildArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // Bare `staticapi` behaves like `staticapi build` with defaults
    let args = match cli.command {
        Some(Commands::Build(args)) => args,
        None => BuildArgs::default(),
    };

    // Initialize tracing with appropriate log level
    // --verbose enables INFO level, otherwise RUST_LOG decides
    let filter = if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let result = rt.block_on(args.execute());

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
