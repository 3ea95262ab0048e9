//! Residue alphabets and the case-insensitive lookup table used during ingest.

use crate::err::CompairrError;

/// The twenty standard amino acid one-letter codes, in table order.
pub const AMINO_ACIDS: &str = "ACDEFGHIKLMNPQRSTVWY";

/// The four nucleotide one-letter codes.
pub const NUCLEOTIDES: &str = "ACGT";

/// An alphabet fixes the symbol set a sequence column is decoded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    AminoAcid,
    Nucleotide,
}

impl Alphabet {
    pub fn size(self) -> usize {
        match self {
            Alphabet::AminoAcid => AMINO_ACIDS.len(),
            Alphabet::Nucleotide => NUCLEOTIDES.len(),
        }
    }

    pub fn chars(self) -> &'static str {
        match self {
            Alphabet::AminoAcid => AMINO_ACIDS,
            Alphabet::Nucleotide => NUCLEOTIDES,
        }
    }

    /// Build the 256-entry lookup table mapping a raw input byte to a symbol
    /// index, or -1 for characters outside the alphabet. Lowercase letters
    /// fold to their uppercase counterpart; `u`/`U` fold onto `t`'s slot for
    /// the nucleotide alphabet (RNA transcripts are accepted transparently).
    fn lookup_table(self) -> [i8; 256] {
        let mut table = [-1i8; 256];
        for (idx, ch) in self.chars().bytes().enumerate() {
            table[ch as usize] = idx as i8;
            table[ch.to_ascii_lowercase() as usize] = idx as i8;
        }
        if matches!(self, Alphabet::Nucleotide) {
            let t_idx = self.chars().bytes().position(|c| c == b'T').unwrap() as i8;
            table[b'U' as usize] = t_idx;
            table[b'u' as usize] = t_idx;
        }
        table
    }

    /// Encode a raw sequence cell into symbol indices. Fails on the first
    /// byte outside the alphabet unless `ignore_unknown` demotes that to a
    /// skip signal (returned as `Ok(None)`).
    pub fn encode(self, raw: &str, ignore_unknown: bool) -> Result<Option<Vec<u8>>, CompairrError> {
        let table = self.lookup_table();
        let mut out = Vec::with_capacity(raw.len());
        for b in raw.bytes() {
            let m = table[b as usize];
            if m < 0 {
                if ignore_unknown {
                    return Ok(None);
                }
                return Err(CompairrError::IllegalResidue {
                    symbol: b as char,
                    sequence: raw.to_owned(),
                });
            }
            out.push(m as u8);
        }
        Ok(Some(out))
    }

    pub fn symbol(self, index: u8) -> u8 {
        self.chars().as_bytes()[index as usize]
    }

    pub fn decode(self, seq: &[u8]) -> String {
        seq.iter().map(|&i| self.symbol(i) as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn encodes_amino_acids_case_insensitively() {
        let a = Alphabet::AminoAcid;
        assert_eq!(
            a.encode("Cass", false).unwrap(),
            a.encode("CASS", false).unwrap()
        );
    }

    #[test]
    fn nucleotide_u_folds_to_t() {
        let a = Alphabet::Nucleotide;
        assert_eq!(a.encode("ACGU", false).unwrap(), a.encode("ACGT", false).unwrap());
    }

    #[test]
    fn rejects_illegal_residue() {
        let a = Alphabet::AminoAcid;
        assert!(a.encode("CASJ", false).is_err());
    }

    #[test]
    fn ignore_unknown_demotes_to_skip() {
        let a = Alphabet::AminoAcid;
        assert_eq!(a.encode("CASJ", true).unwrap(), None);
    }

    #[rstest::rstest]
    #[case("CASSLGQGAEQFF")]
    #[case("CASSIRSSYEQYF")]
    fn round_trips_through_decode(#[case] seq: &str) {
        let a = Alphabet::AminoAcid;
        let encoded = a.encode(seq, false).unwrap().unwrap();
        assert_eq!(a.decode(&encoded), seq);
    }
}
