//! compairr-rs main executable

use clap::{Parser, Subcommand};
use console::{Emoji, Term};
use compairr_rs::{commands, common};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Rapid comparison of adaptive immune receptor repertoires",
    long_about = "compairr compares and clusters repertoires of adaptive immune receptors (T-cell or B-cell) by amino acid or nucleotide sequence, with optional approximate matching and V/J gene constraints."
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Subcommand)]
enum Commands {
    /// Repertoire x repertoire overlap matrix between two files.
    Matrix(commands::matrix::Args),
    /// Per-sequence existence vector of one repertoire against another set's repertoires.
    Existence(commands::existence::Args),
    /// Single-linkage clustering of one repertoire file.
    Cluster(commands::cluster::Args),
    /// Exact-match deduplication within each repertoire of one file.
    Deduplicate(commands::deduplicate::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Matrix(args) => commands::matrix::run(&cli.common, args)?,
            Commands::Existence(args) => commands::existence::run(&cli.common, args)?,
            Commands::Cluster(args) => commands::cluster::run(&cli.common, args)?,
            Commands::Deduplicate(args) => commands::deduplicate::run(&cli.common, args)?,
        }

        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")))?;

    Ok(())
}
