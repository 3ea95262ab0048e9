//! Neighbor engine: for one query sequence, finds every clonotype in a
//! target index within edit distance `d`, and falls back to brute-force
//! pairwise comparison once `d` exceeds what the variant generator covers.

use std::collections::HashSet;
use std::sync::Arc;

use crate::alphabet::Alphabet;
use crate::bloom::{BloomFilter, DenseBloom};
use crate::common::MAXDIFF_HASH;
use crate::hashindex::HashIndex;
use crate::store::{Clonotype, SequenceSet};
use crate::variants::{self, VariantOptions};
use crate::zobrist::ZobristTables;

/// A built target set: the sequence data plus its hash index and Bloom
/// filter, ready to be probed by queries from either the same set or
/// another one. Holds an `Arc` (rather than a borrow) so it can be shared
/// across the worker pool's threads without a lifetime parameter.
pub struct TargetIndex {
    pub set: Arc<SequenceSet>,
    pub hash: HashIndex,
    pub bloom: DenseBloom,
}

impl TargetIndex {
    pub fn build(set: Arc<SequenceSet>) -> Self {
        let mut hash = HashIndex::with_capacity_for(set.clonotypes.len());
        let mut bloom = DenseBloom::new(hash.capacity() * 2);
        for (i, c) in set.clonotypes.iter().enumerate() {
            hash.insert(c.fingerprint, i as u32);
            bloom.set(c.fingerprint);
        }
        Self { set, hash, bloom }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MatchOptions {
    pub differences: u32,
    pub indels: bool,
    pub ignore_genes: bool,
    pub alphabet: Alphabet,
    /// Restrict matches to candidates in the query's own repertoire. Set by
    /// `deduplicate`, which merges clonotypes per repertoire; `matrix`,
    /// `existence`, and `cluster` leave this `false`.
    pub require_same_repertoire: bool,
}

#[inline]
fn candidate_eligible(opts: &MatchOptions, a: &Clonotype, b: &Clonotype) -> bool {
    if opts.require_same_repertoire && a.repertoire_id_no != b.repertoire_id_no {
        return false;
    }
    opts.ignore_genes || (a.v_gene_no == b.v_gene_no && a.j_gene_no == b.j_gene_no)
}

/// Brute-force mismatch count with early exit once it would exceed
/// `max_diff`; used above `MAXDIFF_HASH` where indels are not supported.
fn seq_within_distance(a: &[u8], b: &[u8], max_diff: u32) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diffs = 0u32;
    for (x, y) in a.iter().zip(b.iter()) {
        if x != y {
            diffs += 1;
            if diffs > max_diff {
                return false;
            }
        }
    }
    true
}

/// Find every clonotype in `target` within distance of `query`, calling
/// `sink` once per distinct match. When `self_index` is `Some`, that index
/// within `target` is excluded (the query is itself a member of `target`).
pub fn find_matches(
    query: &Clonotype,
    self_index: Option<u32>,
    tables: &ZobristTables,
    target: &TargetIndex,
    opts: &MatchOptions,
    sink: &mut impl FnMut(u32),
) {
    let mut seen = HashSet::new();
    let mut emit = |t_idx: u32| {
        if seen.insert(t_idx) {
            sink(t_idx);
        }
    };

    if opts.differences <= MAXDIFF_HASH {
        let variant_opts = VariantOptions {
            differences: opts.differences,
            indels: opts.indels,
            alphabet: opts.alphabet,
        };
        let mut variants = Vec::with_capacity(variants::max_variants(query.seq.len(), &variant_opts));
        variants::generate(&query.seq, query.fingerprint, tables, &variant_opts, &mut variants);

        for variant in &variants {
            if !target.bloom.get(variant.fingerprint) {
                continue;
            }
            for t_idx in target.hash.iter_equal(variant.fingerprint) {
                if self_index == Some(t_idx) {
                    continue;
                }
                let candidate = &target.set.clonotypes[t_idx as usize];
                if !candidate_eligible(opts, query, candidate) {
                    continue;
                }
                let derived = variants::apply(&query.seq, &variant.kind);
                if derived == candidate.seq {
                    emit(t_idx);
                }
            }
        }
    } else {
        for (t_idx, candidate) in target.set.clonotypes.iter().enumerate() {
            let t_idx = t_idx as u32;
            if self_index == Some(t_idx) {
                continue;
            }
            if !candidate_eligible(opts, query, candidate) {
                continue;
            }
            if seq_within_distance(&query.seq, &candidate.seq, opts.differences) {
                emit(t_idx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SequenceSet;
    use pretty_assertions::assert_eq;

    fn clono(seq: &[u8], v: u32, j: u32, count: u64) -> Clonotype {
        clono_in_rep(seq, 0, v, j, count)
    }

    fn clono_in_rep(seq: &[u8], repertoire_id_no: u32, v: u32, j: u32, count: u64) -> Clonotype {
        Clonotype {
            repertoire_id_no,
            sequence_id: None,
            seq: seq.to_vec(),
            v_gene_no: v,
            j_gene_no: j,
            count,
            keep: None,
            fingerprint: 0,
        }
    }

    fn fingerprint_all(set: &mut SequenceSet, tables: &ZobristTables) {
        for c in set.clonotypes.iter_mut() {
            c.fingerprint = tables.hash(&c.seq, c.v_gene_no, c.j_gene_no);
        }
    }

    #[test]
    fn finds_exact_match_at_d0() {
        let tables = ZobristTables::new(8, 20, 2, 2);
        let mut set = SequenceSet::new();
        set.clonotypes.push(clono(&[0, 1, 2, 3], 0, 0, 1));
        fingerprint_all(&mut set, &tables);
        let target = TargetIndex::build(std::sync::Arc::new(set));

        let query = clono(&[0, 1, 2, 3], 0, 0, 1);
        let mut hits = Vec::new();
        let opts = MatchOptions {
            differences: 0,
            indels: false,
            ignore_genes: false,
            alphabet: Alphabet::AminoAcid,
            require_same_repertoire: false,
        };
        find_matches(&query, None, &tables, &target, &opts, &mut |t| hits.push(t));
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn finds_single_substitution_at_d1() {
        let tables = ZobristTables::new(8, 20, 2, 2);
        let mut set = SequenceSet::new();
        set.clonotypes.push(clono(&[0, 1, 2, 3], 0, 0, 1));
        fingerprint_all(&mut set, &tables);
        let target = TargetIndex::build(std::sync::Arc::new(set));

        let mut query = clono(&[0, 1, 2, 3], 0, 0, 1);
        query.seq[1] = 5;
        query.fingerprint = tables.hash(&query.seq, 0, 0);

        let mut hits = Vec::new();
        let opts = MatchOptions {
            differences: 1,
            indels: false,
            ignore_genes: false,
            alphabet: Alphabet::AminoAcid,
            require_same_repertoire: false,
        };
        find_matches(&query, None, &tables, &target, &opts, &mut |t| hits.push(t));
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn gene_mismatch_blocks_match_unless_ignored() {
        let tables = ZobristTables::new(8, 20, 2, 2);
        let mut set = SequenceSet::new();
        set.clonotypes.push(clono(&[0, 1, 2, 3], 1, 0, 1));
        fingerprint_all(&mut set, &tables);
        let target = TargetIndex::build(std::sync::Arc::new(set));

        let query = clono(&[0, 1, 2, 3], 0, 0, 1);
        let opts = MatchOptions {
            differences: 0,
            indels: false,
            ignore_genes: false,
            alphabet: Alphabet::AminoAcid,
            require_same_repertoire: false,
        };
        let mut hits = Vec::new();
        find_matches(&query, None, &tables, &target, &opts, &mut |t| hits.push(t));
        assert!(hits.is_empty());

        let opts_ignored = MatchOptions {
            ignore_genes: true,
            ..opts
        };
        let mut hits = Vec::new();
        find_matches(&query, None, &tables, &target, &opts_ignored, &mut |t| hits.push(t));
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn traditional_path_used_above_maxdiff_hash() {
        let tables = ZobristTables::new(8, 20, 2, 2);
        let mut set = SequenceSet::new();
        set.clonotypes.push(clono(&[0, 1, 2, 3, 4, 5], 0, 0, 1));
        fingerprint_all(&mut set, &tables);
        let target = TargetIndex::build(std::sync::Arc::new(set));

        let mut query = clono(&[0, 1, 2, 3, 4, 5], 0, 0, 1);
        query.seq[0] = 9;
        query.seq[1] = 9;
        query.seq[2] = 9;
        query.fingerprint = tables.hash(&query.seq, 0, 0);

        let opts = MatchOptions {
            differences: 3,
            indels: false,
            ignore_genes: false,
            alphabet: Alphabet::AminoAcid,
            require_same_repertoire: false,
        };
        let mut hits = Vec::new();
        find_matches(&query, None, &tables, &target, &opts, &mut |t| hits.push(t));
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn self_index_excludes_the_query_itself() {
        let tables = ZobristTables::new(8, 20, 2, 2);
        let mut set = SequenceSet::new();
        set.clonotypes.push(clono(&[0, 1, 2, 3], 0, 0, 1));
        fingerprint_all(&mut set, &tables);
        let query = set.clonotypes[0].clone();
        let target = TargetIndex::build(std::sync::Arc::new(set));

        let opts = MatchOptions {
            differences: 0,
            indels: false,
            ignore_genes: false,
            alphabet: Alphabet::AminoAcid,
            require_same_repertoire: false,
        };
        let mut hits = Vec::new();
        find_matches(&query, Some(0), &tables, &target, &opts, &mut |t| hits.push(t));
        assert!(hits.is_empty());
    }

    #[test]
    fn repeated_residues_do_not_double_count_under_indels() {
        // seq "AA" deleted at position 0 or 1 both yield "A": exercise the
        // per-query dedup so a target matching "A" is only reported once.
        let tables = ZobristTables::new(8, 20, 2, 2);
        let mut set = SequenceSet::new();
        set.clonotypes.push(clono(&[0], 0, 0, 1)); // "A"
        fingerprint_all(&mut set, &tables);
        let target = TargetIndex::build(std::sync::Arc::new(set));

        let mut query = clono(&[0, 0], 0, 0, 1); // "AA"
        query.fingerprint = tables.hash(&query.seq, 0, 0);

        let opts = MatchOptions {
            differences: 1,
            indels: true,
            ignore_genes: false,
            alphabet: Alphabet::AminoAcid,
            require_same_repertoire: false,
        };
        let mut hits = Vec::new();
        find_matches(&query, None, &tables, &target, &opts, &mut |t| hits.push(t));
        assert_eq!(hits, vec![0]);
    }

    #[test]
    fn require_same_repertoire_blocks_cross_repertoire_matches() {
        let tables = ZobristTables::new(8, 20, 2, 2);
        let mut set = SequenceSet::new();
        set.clonotypes.push(clono_in_rep(&[0, 1, 2, 3], 1, 0, 0, 1));
        fingerprint_all(&mut set, &tables);
        let target = TargetIndex::build(std::sync::Arc::new(set));

        let query = clono_in_rep(&[0, 1, 2, 3], 0, 0, 0, 1);
        let opts = MatchOptions {
            differences: 0,
            indels: false,
            ignore_genes: false,
            alphabet: Alphabet::AminoAcid,
            require_same_repertoire: true,
        };
        let mut hits = Vec::new();
        find_matches(&query, None, &tables, &target, &opts, &mut |t| hits.push(t));
        assert!(hits.is_empty());

        let opts_same_rep = MatchOptions {
            require_same_repertoire: false,
            ..opts
        };
        let mut hits = Vec::new();
        find_matches(&query, None, &tables, &target, &opts_same_rep, &mut |t| hits.push(t));
        assert_eq!(hits, vec![0]);
    }
}
