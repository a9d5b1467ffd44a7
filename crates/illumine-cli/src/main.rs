#![allow(clippy::unwrap_used, clippy::expect_used, clippy::clone_on_ref_ptr)]
#![allow(clippy::needless_pass_by_value, clippy::redundant_clone)]

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;
mod providers;
mod repositories;

use commands::{chunk, run, serve};

/// Illumine CLI - chunk prose and illustrate it chapter by chapter
///
/// Commands:
///
///   chunk   split a text file into bounded-size chunks (§4.1)
///   run     ingest a text file and run it through the full chapter
///           pipeline against development-stub text/image providers (§4.12)
///   serve   expose the ingest API and status query over HTTP (§6)
#[derive(Parser)]
#[command(name = "illumine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Illumine - chunk prose, run the chapter-illustration pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a text file into bounded-size chunks
    Chunk(chunk::ChunkArgs),

    /// Ingest a text file and illustrate every chapter end to end
    Run(run::RunArgs),

    /// Expose the ingest API and status query over HTTP
    Serve(serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Chunk(args) => chunk::run(args).await,
        Commands::Run(args) => run::run(args).await,
        Commands::Serve(args) => serve::run(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clap_parses_known_subcommands() {
        let cli = Cli::try_parse_from(["illumine", "chunk", "file.txt"]).expect("parse chunk");
        assert!(matches!(cli.command, Commands::Chunk(_)));

        let cli = Cli::try_parse_from(["illumine", "run", "book.txt", "--style", "noir"])
            .expect("parse run");
        assert!(matches!(cli.command, Commands::Run(_)));

        let cli = Cli::try_parse_from(["illumine", "serve", "--port", "9090"]).expect("parse serve");
        assert!(matches!(cli.command, Commands::Serve(_)));
    }

    #[test]
    fn clap_enforces_required_args() {
        assert!(Cli::try_parse_from(["illumine", "chunk"]).is_err());
        assert!(Cli::try_parse_from(["illumine", "run"]).is_err());
    }
}
