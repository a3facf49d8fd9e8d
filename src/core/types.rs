use serde::{Deserialize, Serialize};

/// Gap symbol stored in every alignment row.
pub const GAP: u8 = b'-';

/// Fraction of non-gap symbols drawn from `ACGTUN` above which an alignment
/// is classified as nucleotide.
pub const NUCLEOTIDE_FRACTION: f64 = 0.95;

/// Alphabet of an alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidueType {
    Protein,
    Nucleotide,
    /// Nucleotide alignment whose columns come in reading-frame triplets
    Codon,
}

impl ResidueType {
    /// Symbol that carries no residue information for this alphabet
    #[must_use]
    pub fn indeterminate(self) -> u8 {
        match self {
            Self::Protein => b'X',
            Self::Nucleotide | Self::Codon => b'N',
        }
    }

    /// Whether `symbol` is a gap or indeterminate for this alphabet
    #[must_use]
    pub fn is_uninformative(self, symbol: u8) -> bool {
        symbol == GAP || symbol == b'?' || symbol == self.indeterminate()
    }

    /// Classify raw rows by composition.
    #[must_use]
    pub fn detect<S: AsRef<[u8]>>(rows: &[S]) -> Self {
        let mut residues = 0usize;
        let mut nucleotides = 0usize;

        for row in rows {
            for &symbol in row.as_ref() {
                if symbol == GAP {
                    continue;
                }
                residues += 1;
                if matches!(symbol, b'A' | b'C' | b'G' | b'T' | b'U' | b'N') {
                    nucleotides += 1;
                }
            }
        }

        if residues > 0 && count_to_f64(nucleotides) / count_to_f64(residues) >= NUCLEOTIDE_FRACTION
        {
            Self::Nucleotide
        } else {
            Self::Protein
        }
    }
}

impl std::fmt::Display for ResidueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Protein => write!(f, "protein"),
            Self::Nucleotide => write!(f, "nucleotide"),
            Self::Codon => write!(f, "codon"),
        }
    }
}

/// Normalize a raw symbol: uppercase, with the alternative gap glyphs folded into [`GAP`].
#[must_use]
pub fn normalize_symbol(symbol: u8) -> u8 {
    match symbol {
        b'.' | b'~' => GAP,
        other => other.to_ascii_uppercase(),
    }
}

/// Convert a count to f64 for ratio calculations.
/// Precision loss is acceptable for alignment-sized counts.
#[inline]
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn count_to_f64(count: usize) -> f64 {
    count as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_nucleotide() {
        let rows = [b"ACGT-ACGTN".to_vec(), b"ACGTTACG-A".to_vec()];
        assert_eq!(ResidueType::detect(&rows), ResidueType::Nucleotide);
    }

    #[test]
    fn test_detect_protein() {
        let rows = [b"MKVLAAGIVG".to_vec(), b"MKILSAG-VG".to_vec()];
        assert_eq!(ResidueType::detect(&rows), ResidueType::Protein);
    }

    #[test]
    fn test_all_gap_rows_are_protein() {
        let rows = [b"----".to_vec()];
        assert_eq!(ResidueType::detect(&rows), ResidueType::Protein);
    }

    #[test]
    fn test_uninformative_symbols() {
        assert!(ResidueType::Protein.is_uninformative(b'X'));
        assert!(!ResidueType::Protein.is_uninformative(b'N'));
        assert!(ResidueType::Nucleotide.is_uninformative(b'N'));
        assert!(ResidueType::Codon.is_uninformative(GAP));
        assert!(ResidueType::Nucleotide.is_uninformative(b'?'));
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(b'a'), b'A');
        assert_eq!(normalize_symbol(b'.'), GAP);
        assert_eq!(normalize_symbol(b'~'), GAP);
        assert_eq!(normalize_symbol(b'-'), GAP);
    }
}
