//! Shared CLI argument groups flattened into each subcommand's own `Args`.

use clap::Args;

use crate::alphabet::Alphabet;
use crate::err::CompairrError;
use crate::score::Score;

/// Options governing the approximate-match relation itself; shared by
/// `matrix`, `existence`, and `cluster` (deduplicate is exact-match only
/// and has no notion of `differences`).
#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    /// Maximum number of differences (edits) allowed between two sequences.
    #[arg(short = 'd', long, default_value_t = 0)]
    pub differences: u32,

    /// Allow one insertion or deletion; only valid together with `--differences 1`.
    #[arg(short = 'i', long)]
    pub indels: bool,

    /// Treat every `duplicate_count` as 1.
    #[arg(short = 'f', long)]
    pub ignore_counts: bool,

    /// Disable the V/J gene equality requirement.
    #[arg(short = 'g', long)]
    pub ignore_genes: bool,

    /// Skip rows containing residues outside the active alphabet instead of failing.
    #[arg(long)]
    pub ignore_unknown: bool,

    /// Use the 4-letter nucleotide alphabet instead of the 20 amino acids.
    #[arg(long)]
    pub nucleotides: bool,

    /// Use the `cdr3`/`cdr3_aa` columns instead of `junction`/`junction_aa`.
    #[arg(long)]
    pub cdr3: bool,
}

impl MatchArgs {
    pub fn alphabet(&self) -> Alphabet {
        if self.nucleotides {
            Alphabet::Nucleotide
        } else {
            Alphabet::AminoAcid
        }
    }

    pub fn validate(&self) -> Result<(), CompairrError> {
        if self.indels && self.differences != 1 {
            return Err(CompairrError::UnsupportedCombination(
                "--indels is only supported together with --differences 1".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Options for the exact-match-only `deduplicate` subcommand: unlike
/// `MatchArgs`, there is no `differences`/`indels` knob since dedup only
/// ever compares for equality.
#[derive(Args, Debug, Clone)]
pub struct ExactMatchArgs {
    /// Treat every `duplicate_count` as 1.
    #[arg(short = 'f', long)]
    pub ignore_counts: bool,

    /// Disable the V/J gene equality requirement.
    #[arg(short = 'g', long)]
    pub ignore_genes: bool,

    /// Skip rows containing residues outside the active alphabet instead of failing.
    #[arg(long)]
    pub ignore_unknown: bool,

    /// Use the 4-letter nucleotide alphabet instead of the 20 amino acids.
    #[arg(long)]
    pub nucleotides: bool,

    /// Use the `cdr3`/`cdr3_aa` columns instead of `junction`/`junction_aa`.
    #[arg(long)]
    pub cdr3: bool,
}

impl ExactMatchArgs {
    pub fn alphabet(&self) -> Alphabet {
        if self.nucleotides {
            Alphabet::Nucleotide
        } else {
            Alphabet::AminoAcid
        }
    }
}

/// Options governing execution resources and I/O shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of worker threads (1-256).
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Output file path, or `-` for standard output.
    #[arg(short = 'o', long, default_value = "-")]
    pub output: String,

    /// Log file path, or `-` for standard error.
    #[arg(short = 'l', long, default_value = "-")]
    pub log: String,
}

impl RunArgs {
    pub fn validate(&self) -> Result<usize, CompairrError> {
        let threads = self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        if threads == 0 || threads > crate::common::MAX_THREADS {
            return Err(CompairrError::TooManyThreads(threads));
        }
        Ok(threads)
    }
}

/// Options specific to the two matrix-shaped commands (`matrix`, `existence`).
#[derive(Args, Debug, Clone)]
pub struct ScoringArgs {
    /// Per-match score function.
    #[arg(long, default_value = "product")]
    pub score: Score,

    /// Emit column-triples instead of a dense matrix.
    #[arg(short = 'a', long)]
    pub alternative: bool,

    /// Write one record per accepted match to this path.
    #[arg(short = 'p', long)]
    pub pairs: Option<String>,

    /// Append a numeric distance column to the pairs stream.
    #[arg(long)]
    pub distance: bool,

    /// Comma-separated extra columns to copy through into the pairs stream.
    #[arg(long)]
    pub keep_columns: Option<String>,
}

impl ScoringArgs {
    pub fn keep_columns_vec(&self) -> Vec<String> {
        self.keep_columns
            .as_deref()
            .map(|s| s.split(',').map(|c| c.trim().to_owned()).collect())
            .unwrap_or_default()
    }

    pub fn validate(&self, differences: u32) -> Result<(), CompairrError> {
        if self.score.is_postprocessed() && differences != 0 {
            return Err(CompairrError::ConflictingOptions(format!(
                "--score {:?} requires --differences 0",
                self.score
            )));
        }
        if self.keep_columns.is_some() && self.pairs.is_none() {
            return Err(CompairrError::ConflictingOptions(
                "--keep-columns requires --pairs".to_owned(),
            ));
        }
        Ok(())
    }
}
