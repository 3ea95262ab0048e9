//! Typed domain errors.
//!
//! `CompairrError` covers the taxonomy of configuration, parsing, and I/O
//! failures that callers want to match on; everything else propagates as
//! `anyhow::Error` through the `?` operator, converted at the command boundary.

#[derive(thiserror::Error, Debug, Clone)]
pub enum CompairrError {
    #[error("conflicting options: {0}")]
    ConflictingOptions(String),

    #[error("unsupported option combination: {0}")]
    UnsupportedCombination(String),

    #[error("missing required column(s) in header: {0}")]
    MissingColumns(String),

    #[error("illegal residue '{symbol}' in sequence {sequence:?}")]
    IllegalResidue { symbol: char, sequence: String },

    #[error("malformed duplicate_count {value:?} on line {line}")]
    MalformedCount { line: u64, value: String },

    #[error("empty required field on line {line}: {field}")]
    EmptyField { line: u64, field: String },

    #[error("too many threads requested: {0} (max 256)")]
    TooManyThreads(usize),
}
