//! Subcommand implementations: `matrix`, `existence`, `cluster`, `deduplicate`.

pub mod cluster;
pub mod deduplicate;
pub mod existence;
pub mod matrix;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

use crate::alphabet::Alphabet;
use crate::cli::{ExactMatchArgs, MatchArgs};
use crate::store::{GeneRegistries, IngestOptions, SequenceSet};
use crate::zobrist::ZobristTables;

/// Opens `path` for reading, or standard input when `path == "-"`.
pub fn open_input(path: &str) -> Result<Box<dyn Read>, anyhow::Error> {
    if path == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// Opens `path` for writing, or standard output when `path == "-"`.
pub fn open_output(path: &str) -> Result<Box<dyn Write>, anyhow::Error> {
    if path == "-" {
        Ok(Box::new(BufWriter::new(io::stdout())))
    } else {
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

fn seq_column_label(match_args: &MatchArgs) -> &'static str {
    match (match_args.cdr3, match_args.alphabet()) {
        (false, Alphabet::AminoAcid) => "junction_aa",
        (false, Alphabet::Nucleotide) => "junction",
        (true, Alphabet::AminoAcid) => "cdr3_aa",
        (true, Alphabet::Nucleotide) => "cdr3",
    }
}

pub fn seq_column_name(match_args: &MatchArgs) -> &'static str {
    seq_column_label(match_args)
}

pub fn ingest_options(
    match_args: &MatchArgs,
    need_sequence_id: bool,
    keep_columns: Vec<String>,
    default_repertoire_id: &str,
) -> IngestOptions {
    IngestOptions {
        alphabet: match_args.alphabet(),
        ignore_counts: match_args.ignore_counts,
        ignore_genes: match_args.ignore_genes,
        ignore_unknown: match_args.ignore_unknown,
        use_cdr3: match_args.cdr3,
        need_sequence_id,
        keep_columns,
        default_repertoire_id: default_repertoire_id.to_owned(),
    }
}

/// Same as `ingest_options`, for the exact-match-only `deduplicate` subcommand.
pub fn ingest_options_exact(
    args: &ExactMatchArgs,
    need_sequence_id: bool,
    keep_columns: Vec<String>,
    default_repertoire_id: &str,
) -> IngestOptions {
    IngestOptions {
        alphabet: args.alphabet(),
        ignore_counts: args.ignore_counts,
        ignore_genes: args.ignore_genes,
        ignore_unknown: args.ignore_unknown,
        use_cdr3: args.cdr3,
        need_sequence_id,
        keep_columns,
        default_repertoire_id: default_repertoire_id.to_owned(),
    }
}

/// Read one input file into a fresh `SequenceSet`, logging row counts.
pub fn load_set(
    path: &str,
    opts: &IngestOptions,
    genes: &mut GeneRegistries,
    label: &str,
) -> Result<SequenceSet, anyhow::Error> {
    let reader = open_input(path)?;
    let mut set = SequenceSet::new();
    let stats = crate::store::ingest(reader, opts, genes, &mut set)?;
    tracing::info!(
        "{label}: read {} rows ({} repertoires, {} skipped for unknown residues)",
        stats.read,
        set.repertoires.len(),
        stats.skipped_unknown
    );
    crate::common::trace_rss_now();
    Ok(set)
}

/// Build Zobrist tables sized for every sequence across both sets, then
/// stamp each clonotype's fingerprint.
pub fn build_tables_and_fingerprint(
    alphabet: Alphabet,
    sets: &mut [&mut SequenceSet],
    genes: &GeneRegistries,
) -> ZobristTables {
    let longest = sets.iter().map(|s| s.longest).max().unwrap_or(0);
    let tables = ZobristTables::new(
        longest,
        alphabet.size(),
        genes.v.len().max(1),
        genes.j.len().max(1),
    );
    for set in sets.iter_mut() {
        for c in set.clonotypes.iter_mut() {
            c.fingerprint = tables.hash(&c.seq, c.v_gene_no, c.j_gene_no);
        }
    }
    tables
}
