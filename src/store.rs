//! Sequence store: ingest of AIRR-style tab-separated rearrangement tables
//! into a compact in-memory clonotype set, plus the V/J gene and repertoire
//! id registries used to intern their text labels.

use std::io::{BufRead, BufReader, Read};

use indexmap::IndexMap;

use crate::alphabet::Alphabet;
use crate::err::CompairrError;

/// Insertion-ordered bijection between a text label and a dense integer id;
/// the id is simply the label's insertion index, so the reverse mapping
/// comes for free from the same map.
#[derive(Debug, Default)]
pub struct Registry {
    forward: IndexMap<String, u32>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            forward: IndexMap::new(),
        }
    }

    /// Look up `name`'s id, interning it if this is the first occurrence.
    pub fn intern(&mut self, name: &str) -> u32 {
        if let Some(&id) = self.forward.get(name) {
            return id;
        }
        let id = self.forward.len() as u32;
        self.forward.insert(name.to_owned(), id);
        id
    }

    pub fn name(&self, id: u32) -> &str {
        self.forward
            .get_index(id as usize)
            .map(|(k, _)| k.as_str())
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// The V and J gene registries are shared across both input files of a run.
#[derive(Debug, Default)]
pub struct GeneRegistries {
    pub v: Registry,
    pub j: Registry,
}

/// One parsed input row.
#[derive(Debug, Clone)]
pub struct Clonotype {
    pub repertoire_id_no: u32,
    pub sequence_id: Option<String>,
    pub seq: Vec<u8>,
    pub v_gene_no: u32,
    pub j_gene_no: u32,
    pub count: u64,
    pub keep: Option<String>,
    pub fingerprint: u64,
}

/// All clonotypes read from one input file, with the repertoire id registry
/// scoped to that file.
#[derive(Debug, Default)]
pub struct SequenceSet {
    pub repertoires: Registry,
    pub clonotypes: Vec<Clonotype>,
    pub longest: usize,
}

impl SequenceSet {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub alphabet: Alphabet,
    pub ignore_counts: bool,
    pub ignore_genes: bool,
    pub ignore_unknown: bool,
    pub use_cdr3: bool,
    pub need_sequence_id: bool,
    pub keep_columns: Vec<String>,
    /// Repertoire id substituted when the input has no `repertoire_id` column.
    pub default_repertoire_id: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct IngestStats {
    pub read: u64,
    pub skipped_unknown: u64,
}

fn seq_column_name(opts: &IngestOptions) -> &'static str {
    match (opts.use_cdr3, opts.alphabet) {
        (false, Alphabet::AminoAcid) => "junction_aa",
        (false, Alphabet::Nucleotide) => "junction",
        (true, Alphabet::AminoAcid) => "cdr3_aa",
        (true, Alphabet::Nucleotide) => "cdr3",
    }
}

struct Header {
    seq: usize,
    repertoire_id: Option<usize>,
    sequence_id: Option<usize>,
    duplicate_count: Option<usize>,
    v_call: Option<usize>,
    j_call: Option<usize>,
    keep: Vec<(String, usize)>,
}

fn parse_header(line: &str, opts: &IngestOptions) -> Result<Header, CompairrError> {
    let mut index: IndexMap<&str, usize> = IndexMap::new();
    for (i, col) in line.split('\t').enumerate() {
        index.insert(col, i);
    }

    let seq_col = seq_column_name(opts);
    let mut missing = Vec::new();

    let seq = *index.get(seq_col).unwrap_or_else(|| {
        missing.push(seq_col.to_owned());
        &usize::MAX
    });

    let duplicate_count = if opts.ignore_counts {
        None
    } else {
        match index.get("duplicate_count") {
            Some(&i) => Some(i),
            None => {
                missing.push("duplicate_count".to_owned());
                None
            }
        }
    };

    let (v_call, j_call) = if opts.ignore_genes {
        (None, None)
    } else {
        let v = match index.get("v_call") {
            Some(&i) => Some(i),
            None => {
                missing.push("v_call".to_owned());
                None
            }
        };
        let j = match index.get("j_call") {
            Some(&i) => Some(i),
            None => {
                missing.push("j_call".to_owned());
                None
            }
        };
        (v, j)
    };

    let sequence_id = if opts.need_sequence_id {
        match index.get("sequence_id") {
            Some(&i) => Some(i),
            None => {
                missing.push("sequence_id".to_owned());
                None
            }
        }
    } else {
        index.get("sequence_id").copied()
    };

    if !missing.is_empty() {
        return Err(CompairrError::MissingColumns(missing.join(", ")));
    }

    let keep = opts
        .keep_columns
        .iter()
        .filter_map(|name| index.get(name.as_str()).map(|&i| (name.clone(), i)))
        .collect();

    Ok(Header {
        seq,
        repertoire_id: index.get("repertoire_id").copied(),
        sequence_id,
        duplicate_count,
        v_call,
        j_call,
        keep,
    })
}

/// Stream-parse one AIRR TSV file into `set`, interning V/J gene labels into
/// the shared `genes` registries. Lines starting with `#` or `@` before the
/// header are treated as comments and skipped.
pub fn ingest<R: Read>(
    reader: R,
    opts: &IngestOptions,
    genes: &mut GeneRegistries,
    set: &mut SequenceSet,
) -> Result<IngestStats, anyhow::Error> {
    let mut lines = BufReader::new(reader).lines();
    let mut header_line = None;
    for line in &mut lines {
        let line = line?;
        if line.starts_with('#') || line.starts_with('@') {
            continue;
        }
        header_line = Some(line);
        break;
    }
    let header_line =
        header_line.ok_or_else(|| CompairrError::MissingColumns("(empty input)".to_owned()))?;
    let header = parse_header(header_line.trim_end_matches('\r'), opts)?;

    let mut stats = IngestStats::default();
    for (line_no, line) in lines.enumerate() {
        let line_no = line_no as u64 + 2; // 1-based, header is line 1
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        stats.read += 1;
        let fields: Vec<&str> = line.split('\t').collect();

        let raw_seq = fields.get(header.seq).copied().unwrap_or("");
        let seq = match opts.alphabet.encode(raw_seq, opts.ignore_unknown)? {
            Some(seq) => seq,
            None => {
                stats.skipped_unknown += 1;
                continue;
            }
        };
        if seq.is_empty() {
            return Err(CompairrError::EmptyField {
                line: line_no,
                field: seq_column_name(opts).to_owned(),
            }
            .into());
        }

        let repertoire_id = header
            .repertoire_id
            .and_then(|i| fields.get(i))
            .copied()
            .unwrap_or(opts.default_repertoire_id.as_str());
        let repertoire_id_no = set.repertoires.intern(repertoire_id);

        let sequence_id = header
            .sequence_id
            .and_then(|i| fields.get(i))
            .map(|s| s.to_string());
        if opts.need_sequence_id
            && sequence_id.as_deref().unwrap_or("").is_empty()
        {
            return Err(CompairrError::EmptyField {
                line: line_no,
                field: "sequence_id".to_owned(),
            }
            .into());
        }

        let count = if opts.ignore_counts {
            1
        } else {
            let i = header.duplicate_count.unwrap();
            let raw = fields.get(i).copied().unwrap_or("");
            raw.parse::<u64>().map_err(|_| CompairrError::MalformedCount {
                line: line_no,
                value: raw.to_owned(),
            })?
        };

        let (v_gene_no, j_gene_no) = if opts.ignore_genes {
            (0, 0)
        } else {
            let v = fields.get(header.v_call.unwrap()).copied().unwrap_or("");
            let j = fields.get(header.j_call.unwrap()).copied().unwrap_or("");
            (genes.v.intern(v), genes.j.intern(j))
        };

        let keep = if header.keep.is_empty() {
            None
        } else {
            Some(
                header
                    .keep
                    .iter()
                    .map(|(_, i)| fields.get(*i).copied().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join("\t"),
            )
        };

        set.longest = set.longest.max(seq.len());
        set.clonotypes.push(Clonotype {
            repertoire_id_no,
            sequence_id,
            seq,
            v_gene_no,
            j_gene_no,
            count,
            keep,
            fingerprint: 0,
        });
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn opts() -> IngestOptions {
        IngestOptions {
            alphabet: Alphabet::AminoAcid,
            ignore_counts: false,
            ignore_genes: false,
            ignore_unknown: false,
            use_cdr3: false,
            need_sequence_id: false,
            keep_columns: Vec::new(),
            default_repertoire_id: "1".to_owned(),
        }
    }

    #[test]
    fn parses_minimal_airr_tsv() {
        let tsv = "junction_aa\tv_call\tj_call\tduplicate_count\nCASSLGQGAEQFF\tTRBV1\tTRBJ1\t3\n";
        let mut set = SequenceSet::new();
        let mut genes = GeneRegistries::default();
        let stats = ingest(tsv.as_bytes(), &opts(), &mut genes, &mut set).unwrap();
        assert_eq!(stats.read, 1);
        assert_eq!(set.clonotypes.len(), 1);
        assert_eq!(set.clonotypes[0].count, 3);
        assert_eq!(genes.v.name(0), "TRBV1");
        assert_eq!(set.repertoires.name(0), "1");
    }

    #[test]
    fn skips_comment_lines_before_header() {
        let tsv = "# generated by somebody\n@meta\njunction_aa\tv_call\tj_call\tduplicate_count\nCASS\tV1\tJ1\t1\n";
        let mut set = SequenceSet::new();
        let mut genes = GeneRegistries::default();
        let stats = ingest(tsv.as_bytes(), &opts(), &mut genes, &mut set).unwrap();
        assert_eq!(stats.read, 1);
    }

    #[test]
    fn missing_column_is_an_error() {
        let tsv = "junction_aa\tv_call\nCASS\tV1\n";
        let mut set = SequenceSet::new();
        let mut genes = GeneRegistries::default();
        let err = ingest(tsv.as_bytes(), &opts(), &mut genes, &mut set).unwrap_err();
        assert!(err.to_string().contains("j_call") || err.to_string().contains("duplicate_count"));
    }

    #[test]
    fn default_repertoire_id_used_when_column_absent() {
        let tsv = "junction_aa\tv_call\tj_call\tduplicate_count\nCASS\tV1\tJ1\t1\n";
        let mut set = SequenceSet::new();
        let mut genes = GeneRegistries::default();
        ingest(tsv.as_bytes(), &opts(), &mut genes, &mut set).unwrap();
        assert_eq!(set.clonotypes[0].repertoire_id_no, 0);
        assert_eq!(set.repertoires.name(0), "1");
    }

    #[test]
    fn ignore_unknown_skips_illegal_rows() {
        let mut o = opts();
        o.ignore_unknown = true;
        let tsv = "junction_aa\tv_call\tj_call\tduplicate_count\nCASJ\tV1\tJ1\t1\nCASS\tV1\tJ1\t1\n";
        let mut set = SequenceSet::new();
        let mut genes = GeneRegistries::default();
        let stats = ingest(tsv.as_bytes(), &o, &mut genes, &mut set).unwrap();
        assert_eq!(stats.skipped_unknown, 1);
        assert_eq!(set.clonotypes.len(), 1);
    }
}
