//! Variant generator: enumerates the fingerprints of every sequence within
//! edit distance `d` of a seed, without ever materializing the neighbor
//! sequence itself (the neighbor engine verifies by exact comparison once a
//! hash hit is found).

use crate::alphabet::Alphabet;
use crate::err::CompairrError;
use crate::zobrist::ZobristTables;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Identical,
    Substitution { pos: usize, residue: u8 },
    Deletion { pos: usize },
    Insertion { pos: usize, residue: u8 },
    SubSub {
        pos1: usize,
        residue1: u8,
        pos2: usize,
        residue2: u8,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Variant {
    pub kind: VariantKind,
    pub fingerprint: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct VariantOptions {
    pub differences: u32,
    pub indels: bool,
    pub alphabet: Alphabet,
}

impl VariantOptions {
    /// Validates the combination the neighbor engine refuses to generate:
    /// indels are only supported at `d = 1`. The variant generator's
    /// coverage for two combined edits that include an indel is not
    /// guaranteed complete, so the combination is rejected up front rather
    /// than silently under-reporting matches.
    pub fn new(differences: u32, indels: bool, alphabet: Alphabet) -> Result<Self, CompairrError> {
        if indels && differences != 1 {
            return Err(CompairrError::UnsupportedCombination(
                "--indels is only supported together with --differences 1".to_owned(),
            ));
        }
        Ok(Self {
            differences,
            indels,
            alphabet,
        })
    }
}

/// Upper bound on the number of variants `generate` can emit for a sequence
/// of length `n`, used to pre-size the output buffer.
pub fn max_variants(n: usize, opts: &VariantOptions) -> usize {
    let a = opts.alphabet.size();
    let mut total = 1 + n * (a - 1);
    if opts.indels {
        total += n + (n + 1) * (a - 1);
    }
    if opts.differences >= 2 {
        let pairs = n * n.saturating_sub(1) / 2;
        total += pairs * (a - 1) * (a - 1);
    }
    total
}

/// Enumerate every neighbor fingerprint of `(seq, v_gene, j_gene)` at
/// distance <= `opts.differences`, appending to `out`. Duplicates are
/// tolerated by callers since every hash hit is verified exactly.
pub fn generate(
    seq: &[u8],
    seed_fingerprint: u64,
    tables: &ZobristTables,
    opts: &VariantOptions,
    out: &mut Vec<Variant>,
) {
    out.push(Variant {
        kind: VariantKind::Identical,
        fingerprint: seed_fingerprint,
    });

    let alphabet_size = opts.alphabet.size() as u8;

    for i in 0..seq.len() {
        for x in 0..alphabet_size {
            if x == seq[i] {
                continue;
            }
            out.push(Variant {
                kind: VariantKind::Substitution { pos: i, residue: x },
                fingerprint: tables.substitute(seed_fingerprint, i, seq[i], x),
            });
        }
    }

    if opts.indels {
        for i in 0..seq.len() {
            out.push(Variant {
                kind: VariantKind::Deletion { pos: i },
                fingerprint: tables.delete(seed_fingerprint, seq, i),
            });
        }
        for pos in 0..=seq.len() {
            for x in 0..alphabet_size {
                out.push(Variant {
                    kind: VariantKind::Insertion { pos, residue: x },
                    fingerprint: tables.insert(seed_fingerprint, seq, pos, x),
                });
            }
        }
    }

    if opts.differences >= 2 {
        for i in 0..seq.len() {
            for j in (i + 1)..seq.len() {
                for x in 0..alphabet_size {
                    if x == seq[i] {
                        continue;
                    }
                    let h1 = tables.substitute(seed_fingerprint, i, seq[i], x);
                    for y in 0..alphabet_size {
                        if y == seq[j] {
                            continue;
                        }
                        let h2 = tables.substitute(h1, j, seq[j], y);
                        out.push(Variant {
                            kind: VariantKind::SubSub {
                                pos1: i,
                                residue1: x,
                                pos2: j,
                                residue2: y,
                            },
                            fingerprint: h2,
                        });
                    }
                }
            }
        }
    }
}

/// Materialize the sequence a variant kind describes, for verification
/// against a candidate hash hit.
pub fn apply(seq: &[u8], kind: &VariantKind) -> Vec<u8> {
    match *kind {
        VariantKind::Identical => seq.to_vec(),
        VariantKind::Substitution { pos, residue } => {
            let mut s = seq.to_vec();
            s[pos] = residue;
            s
        }
        VariantKind::Deletion { pos } => {
            let mut s = seq.to_vec();
            s.remove(pos);
            s
        }
        VariantKind::Insertion { pos, residue } => {
            let mut s = seq.to_vec();
            s.insert(pos, residue);
            s
        }
        VariantKind::SubSub {
            pos1,
            residue1,
            pos2,
            residue2,
        } => {
            let mut s = seq.to_vec();
            s[pos1] = residue1;
            s[pos2] = residue2;
            s
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zobrist::ZobristTables;
    use pretty_assertions::assert_eq;

    fn tables() -> ZobristTables {
        ZobristTables::new(16, 20, 4, 4)
    }

    #[test]
    fn identical_variant_matches_seed() {
        let t = tables();
        let seq = [0u8, 1, 2, 3];
        let h = t.hash(&seq, 0, 0);
        let opts = VariantOptions::new(1, false, Alphabet::AminoAcid).unwrap();
        let mut out = Vec::new();
        generate(&seq, h, &t, &opts, &mut out);
        assert!(out
            .iter()
            .any(|v| matches!(v.kind, VariantKind::Identical) && v.fingerprint == h));
    }

    #[test]
    fn substitution_fingerprint_matches_target_hash() {
        let t = tables();
        let seq = [0u8, 1, 2, 3];
        let h = t.hash(&seq, 0, 0);
        let opts = VariantOptions::new(1, false, Alphabet::AminoAcid).unwrap();
        let mut out = Vec::new();
        generate(&seq, h, &t, &opts, &mut out);

        let mut target = seq;
        target[1] = 5;
        let target_hash = t.hash(&target, 0, 0);
        assert!(out.iter().any(|v| v.fingerprint == target_hash));
    }

    #[test]
    fn rejects_indels_with_d_greater_than_one() {
        assert!(VariantOptions::new(2, true, Alphabet::AminoAcid).is_err());
    }

    #[test]
    fn insertion_variant_round_trips_via_apply() {
        let t = tables();
        let seq = vec![0u8, 1, 2];
        let opts = VariantOptions::new(1, true, Alphabet::AminoAcid).unwrap();
        let h = t.hash(&seq, 0, 0);
        let mut out = Vec::new();
        generate(&seq, h, &t, &opts, &mut out);
        let ins = out
            .iter()
            .find(|v| matches!(v.kind, VariantKind::Insertion { pos, residue } if pos == 1 && residue == 9));
        assert!(ins.is_some());
        let applied = apply(&seq, &ins.unwrap().kind);
        assert_eq!(applied, vec![0, 9, 1, 2]);
    }

    #[test]
    fn max_variants_bounds_actual_count() {
        let seq = vec![0u8, 1, 2, 3, 4];
        let opts = VariantOptions::new(2, false, Alphabet::AminoAcid).unwrap();
        let t = tables();
        let h = t.hash(&seq, 0, 0);
        let mut out = Vec::new();
        generate(&seq, h, &t, &opts, &mut out);
        assert!(out.len() <= max_variants(seq.len(), &opts));
    }
}
