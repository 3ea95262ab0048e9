//! Zobrist fingerprinting: a 64-bit hash over residues and gene labels that
//! supports O(1)-per-edit incremental updates, used by the variant generator
//! to avoid rehashing each candidate neighbor from scratch.

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

/// Largest number of insertion slots a supported variant kind can add
/// relative to the seed length; sizes the position table's margin.
pub const MAX_INSERTS: usize = 2;

/// The seed CompAIRR's fingerprint is built from. Fixed so that a run is
/// reproducible and so that two processes comparing the same inputs agree
/// on fingerprints without exchanging the table.
const ZOBRIST_SEED: u64 = 1;

/// Per-position, per-symbol, per-V-gene, per-J-gene random key tables.
#[derive(Debug)]
pub struct ZobristTables {
    alphabet_size: usize,
    longest: usize,
    pos: Vec<u64>,
    v_gene: Vec<u64>,
    j_gene: Vec<u64>,
}

impl ZobristTables {
    /// Build tables sized for sequences up to `longest` residues (plus the
    /// insertion margin) and for the observed V/J gene registry counts.
    pub fn new(longest: usize, alphabet_size: usize, v_genes: usize, j_genes: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let pos_len = (longest + MAX_INSERTS) * alphabet_size;
        let pos = (0..pos_len).map(|_| rng.gen::<u64>()).collect();
        let v_gene = (0..v_genes.max(1)).map(|_| rng.gen::<u64>()).collect();
        let j_gene = (0..j_genes.max(1)).map(|_| rng.gen::<u64>()).collect();
        Self {
            alphabet_size,
            longest,
            pos,
            v_gene,
            j_gene,
        }
    }

    #[inline]
    fn pos_key(&self, position: usize, symbol: u8) -> u64 {
        self.pos[position * self.alphabet_size + symbol as usize]
    }

    #[inline]
    fn v_key(&self, v_gene: u32) -> u64 {
        self.v_gene[v_gene as usize % self.v_gene.len()]
    }

    #[inline]
    fn j_key(&self, j_gene: u32) -> u64 {
        self.j_gene[j_gene as usize % self.j_gene.len()]
    }

    /// Longest sequence length the position table was sized for (without
    /// the insertion margin).
    pub fn longest(&self) -> usize {
        self.longest
    }

    /// Fingerprint of a full tagged sequence.
    pub fn hash(&self, seq: &[u8], v_gene: u32, j_gene: u32) -> u64 {
        let mut h = self.v_key(v_gene) ^ self.j_key(j_gene);
        for (i, &s) in seq.iter().enumerate() {
            h ^= self.pos_key(i, s);
        }
        h
    }

    /// Fingerprint after replacing `seq[pos]` with `new_symbol`.
    pub fn substitute(&self, h: u64, pos: usize, old_symbol: u8, new_symbol: u8) -> u64 {
        h ^ self.pos_key(pos, old_symbol) ^ self.pos_key(pos, new_symbol)
    }

    /// Fingerprint of `seq` with the residue at `pos` deleted. Every residue
    /// to the right of `pos` shifts one position to the left, so its
    /// contribution must move from `Z_pos[k]` to `Z_pos[k-1]`.
    pub fn delete(&self, h: u64, seq: &[u8], pos: usize) -> u64 {
        let mut h = h ^ self.pos_key(pos, seq[pos]);
        for k in (pos + 1)..seq.len() {
            h ^= self.pos_key(k, seq[k]);
            h ^= self.pos_key(k - 1, seq[k]);
        }
        h
    }

    /// Fingerprint of `seq` with `new_symbol` inserted before `pos`. Every
    /// residue at or after `pos` shifts one position to the right.
    pub fn insert(&self, h: u64, seq: &[u8], pos: usize, new_symbol: u8) -> u64 {
        let mut h = h;
        for k in (pos..seq.len()).rev() {
            h ^= self.pos_key(k, seq[k]);
            h ^= self.pos_key(k + 1, seq[k]);
        }
        h ^ self.pos_key(pos, new_symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tables() -> ZobristTables {
        ZobristTables::new(16, 20, 4, 4)
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let a = ZobristTables::new(8, 20, 2, 2);
        let b = ZobristTables::new(8, 20, 2, 2);
        let seq = [0u8, 1, 2, 3];
        assert_eq!(a.hash(&seq, 0, 0), b.hash(&seq, 0, 0));
    }

    #[test]
    fn substitute_matches_full_recompute() {
        let t = tables();
        let seq = [0u8, 1, 2, 3, 4];
        let h = t.hash(&seq, 1, 2);
        let mut seq2 = seq;
        seq2[2] = 7;
        let expected = t.hash(&seq2, 1, 2);
        assert_eq!(t.substitute(h, 2, seq[2], seq2[2]), expected);
    }

    #[test]
    fn delete_matches_full_recompute() {
        let t = tables();
        let seq = [0u8, 1, 2, 3, 4];
        let h = t.hash(&seq, 1, 2);
        let mut deleted = seq.to_vec();
        deleted.remove(2);
        let expected = t.hash(&deleted, 1, 2);
        assert_eq!(t.delete(h, &seq, 2), expected);
    }

    #[test]
    fn insert_matches_full_recompute() {
        let t = tables();
        let seq = [0u8, 1, 2, 3, 4];
        let h = t.hash(&seq, 1, 2);
        let mut inserted = seq.to_vec();
        inserted.insert(2, 9);
        let expected = t.hash(&inserted, 1, 2);
        assert_eq!(t.insert(h, &seq, 2, 9), expected);
    }

    #[test]
    fn gene_labels_affect_fingerprint() {
        let t = tables();
        let seq = [0u8, 1, 2];
        assert_ne!(t.hash(&seq, 0, 0), t.hash(&seq, 1, 0));
        assert_ne!(t.hash(&seq, 0, 0), t.hash(&seq, 0, 1));
    }
}
