//! Residue-pair scoring tables.
//!
//! A [`SimilarityMatrix`] maps every pair of residue symbols to a score and
//! exposes that score normalized to `[0, 1]` over the matrix's own range.
//! Symbols the matrix does not know (indeterminate or degenerate codes)
//! score the matrix minimum.
//!
//! ## Matrix files
//!
//! The first non-comment line lists the symbols. Each following line holds
//! one row of scores, optionally prefixed by its symbol:
//!
//! ```text
//! # comment
//!    A  C  G  T
//! A  5 -4 -4 -4
//! C -4  5 -4 -4
//! G -4 -4  5 -4
//! T -4 -4 -4  5
//! ```
//!
//! Asymmetric entries are averaged so the loaded matrix is symmetric.

use std::io::BufRead;
use std::path::Path;

use crate::core::error::TrimError;
use crate::core::types::ResidueType;

/// Number of symbols in the embedded protein table
const AA_DIM: usize = 24;

/// Symbols of the embedded protein table, in table order
const AA_SYMBOLS: &[u8; AA_DIM] = b"ARNDCQEGHILKMFPSTWYVBZX*";

/// Leading symbols of [`AA_SYMBOLS`] that are scored; `X` and `*` fall back to
/// the minimum like any unknown symbol.
const AA_SCORED: usize = 22;

/// Symbols of the embedded nucleotide table
const NT_SYMBOLS: &[u8] = b"ACGTU";

/// Symmetric residue-pair scoring table.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    name: String,
    symbols: Vec<u8>,
    lookup: [Option<u8>; 256],
    scores: Vec<f64>,
    min: f64,
    max: f64,
}

impl SimilarityMatrix {
    /// Build a matrix from symbols and a row-major score table.
    ///
    /// # Errors
    ///
    /// Returns `TrimError::Parse` if the table is not square over `symbols`,
    /// a symbol repeats, or there are more than 255 symbols.
    pub fn new(name: impl Into<String>, symbols: &[u8], scores: &[f64]) -> Result<Self, TrimError> {
        let dim = symbols.len();
        if dim == 0 || dim > usize::from(u8::MAX) {
            return Err(TrimError::Parse(format!(
                "similarity matrix must have between 1 and 255 symbols, got {dim}"
            )));
        }
        if scores.len() != dim * dim {
            return Err(TrimError::Parse(format!(
                "similarity matrix has {} scores, expected {}",
                scores.len(),
                dim * dim
            )));
        }

        let mut seen = [false; 256];
        for &symbol in symbols {
            let slot = &mut seen[usize::from(symbol.to_ascii_uppercase())];
            if *slot {
                return Err(TrimError::Parse(format!(
                    "symbol '{}' appears twice in similarity matrix",
                    symbol.to_ascii_uppercase() as char
                )));
            }
            *slot = true;
        }

        Ok(Self::build(name.into(), symbols, scores))
    }

    /// Assemble a matrix from a square table with unique symbols of at most 255 entries.
    fn build(name: String, symbols: &[u8], scores: &[f64]) -> Self {
        let dim = symbols.len();
        let mut lookup = [None; 256];
        for (i, &symbol) in symbols.iter().enumerate() {
            lookup[usize::from(symbol.to_ascii_uppercase())] = u8::try_from(i).ok();
        }

        // Average asymmetric entries
        let mut symmetric = vec![0.0; dim * dim];
        for i in 0..dim {
            for j in 0..dim {
                symmetric[i * dim + j] = (scores[i * dim + j] + scores[j * dim + i]) / 2.0;
            }
        }

        let min = symmetric.iter().copied().fold(f64::INFINITY, f64::min);
        let max = symmetric.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            name,
            symbols: symbols.iter().map(u8::to_ascii_uppercase).collect(),
            lookup,
            scores: symmetric,
            min,
            max,
        }
    }

    /// BLOSUM62 over the twenty standard amino acids plus `B` and `Z`.
    #[must_use]
    pub fn blosum62() -> Self {
        let mut scores = Vec::with_capacity(AA_SCORED * AA_SCORED);
        for i in 0..AA_SCORED {
            for j in 0..AA_SCORED {
                scores.push(f64::from(BLOSUM62[i * AA_DIM + j]));
            }
        }
        Self::build("BLOSUM62".to_string(), &AA_SYMBOLS[..AA_SCORED], &scores)
    }

    /// Identity table over `ACGTU`, with `T` and `U` equivalent.
    #[must_use]
    pub fn nucleotide() -> Self {
        let dim = NT_SYMBOLS.len();
        let canonical = |s: u8| if s == b'U' { b'T' } else { s };
        let mut scores = Vec::with_capacity(dim * dim);
        for &a in NT_SYMBOLS {
            for &b in NT_SYMBOLS {
                scores.push(if canonical(a) == canonical(b) { 1.0 } else { 0.0 });
            }
        }
        Self::build("NUC".to_string(), NT_SYMBOLS, &scores)
    }

    /// Default matrix for an alphabet.
    #[must_use]
    pub fn for_residue_type(residue_type: ResidueType) -> Self {
        match residue_type {
            ResidueType::Protein => Self::blosum62(),
            ResidueType::Nucleotide | ResidueType::Codon => Self::nucleotide(),
        }
    }

    /// Load a matrix file.
    ///
    /// # Errors
    ///
    /// Returns `TrimError::Parse` if the file cannot be read or is malformed.
    pub fn load_from_file(path: &Path) -> Result<Self, TrimError> {
        let file = std::fs::File::open(path)
            .map_err(|e| TrimError::Parse(format!("{}: {e}", path.display())))?;
        let name = path
            .file_stem()
            .map_or_else(|| "custom".to_string(), |s| s.to_string_lossy().to_string());
        Self::from_reader(name, std::io::BufReader::new(file))
    }

    /// Parse a matrix from any buffered reader.
    ///
    /// # Errors
    ///
    /// Returns `TrimError::Parse` on I/O failure, a bad symbol line, a row
    /// with the wrong number of scores, or a non-numeric score.
    pub fn from_reader<R: BufRead>(name: impl Into<String>, reader: R) -> Result<Self, TrimError> {
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| TrimError::Parse(format!("reading matrix: {e}")))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            lines.push(trimmed.to_string());
        }

        let (header, rows) = lines
            .split_first()
            .ok_or_else(|| TrimError::Parse("similarity matrix is empty".to_string()))?;

        let symbols: Vec<u8> = header
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .map(|b| b.to_ascii_uppercase())
            .collect();
        if let Some(bad) = symbols.iter().find(|b| !(b.is_ascii_uppercase() || **b == b'*')) {
            return Err(TrimError::Parse(format!(
                "invalid symbol '{}' in similarity matrix header",
                *bad as char
            )));
        }

        let dim = symbols.len();
        if rows.len() != dim {
            return Err(TrimError::Parse(format!(
                "similarity matrix has {} rows, expected {dim}",
                rows.len()
            )));
        }

        let mut scores = Vec::with_capacity(dim * dim);
        for (i, row) in rows.iter().enumerate() {
            let mut fields: Vec<&str> = row.split_whitespace().collect();
            if fields.len() == dim + 1 {
                let label = fields.remove(0).to_ascii_uppercase();
                if label.as_bytes() != [symbols[i]] {
                    return Err(TrimError::Parse(format!(
                        "row {} is labelled '{label}', expected '{}'",
                        i + 1,
                        symbols[i] as char
                    )));
                }
            }
            if fields.len() != dim {
                return Err(TrimError::Parse(format!(
                    "row {} has {} scores, expected {dim}",
                    i + 1,
                    fields.len()
                )));
            }
            for field in fields {
                let value: f64 = field.parse().map_err(|_| {
                    TrimError::Parse(format!("invalid score '{field}' in row {}", i + 1))
                })?;
                scores.push(value);
            }
        }

        Self::new(name, &symbols, &scores)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Table index of a symbol, `None` for unknown symbols
    #[must_use]
    pub fn index_of(&self, symbol: u8) -> Option<usize> {
        self.lookup[usize::from(symbol.to_ascii_uppercase())].map(usize::from)
    }

    #[must_use]
    pub fn min_score(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max_score(&self) -> f64 {
        self.max
    }

    /// Raw score of a symbol pair; unknown symbols score the minimum.
    #[must_use]
    pub fn score(&self, a: u8, b: u8) -> f64 {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.score_at(i, j),
            _ => self.min,
        }
    }

    /// Raw score by table indices
    #[must_use]
    pub fn score_at(&self, i: usize, j: usize) -> f64 {
        self.scores[i * self.symbols.len() + j]
    }

    /// Score of a symbol pair mapped to `[0, 1]` over the matrix range.
    #[must_use]
    pub fn normalized(&self, a: u8, b: u8) -> f64 {
        self.normalize(self.score(a, b))
    }

    /// Map a raw score into `[0, 1]`. A flat matrix maps everything to 1.
    #[must_use]
    pub fn normalize(&self, score: f64) -> f64 {
        let range = self.max - self.min;
        if range <= 0.0 {
            1.0
        } else {
            ((score - self.min) / range).clamp(0.0, 1.0)
        }
    }
}

/// BLOSUM62, NCBI values.
#[rustfmt::skip]
const BLOSUM62: [i8; AA_DIM * AA_DIM] = [
//   A   R   N   D   C   Q   E   G   H   I   L   K   M   F   P   S   T   W   Y   V   B   Z   X   *
     4, -1, -2, -2,  0, -1, -1,  0, -2, -1, -1, -1, -1, -2, -1,  1,  0, -3, -2,  0, -2, -1,  0, -4, // A
    -1,  5,  0, -2, -3,  1,  0, -2,  0, -3, -2,  2, -1, -3, -2, -1, -1, -3, -2, -3, -1,  0, -1, -4, // R
    -2,  0,  6,  1, -3,  0,  0,  0,  1, -3, -3,  0, -2, -3, -2,  1,  0, -4, -2, -3,  3,  0, -1, -4, // N
    -2, -2,  1,  6, -3,  0,  2, -1, -1, -3, -4, -1, -3, -3, -1,  0, -1, -4, -3, -3,  4,  1, -1, -4, // D
     0, -3, -3, -3,  9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1, -3, -3, -2, -4, // C
    -1,  1,  0,  0, -3,  5,  2, -2,  0, -3, -2,  1,  0, -3, -1,  0, -1, -2, -1, -2,  0,  3, -1, -4, // Q
    -1,  0,  0,  2, -4,  2,  5, -2,  0, -3, -3,  1, -2, -3, -1,  0, -1, -3, -2, -2,  1,  4, -1, -4, // E
     0, -2,  0, -1, -3, -2, -2,  6, -2, -4, -4, -2, -3, -3, -2,  0, -2, -2, -3, -3, -1, -2, -1, -4, // G
    -2,  0,  1, -1, -3,  0,  0, -2,  8, -3, -3, -1, -2, -1, -2, -1, -2, -2,  2, -3,  0,  0, -1, -4, // H
    -1, -3, -3, -3, -1, -3, -3, -4, -3,  4,  2, -3,  1,  0, -3, -2, -1, -3, -1,  3, -3, -3, -1, -4, // I
    -1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4, -2,  2,  0, -3, -2, -1, -2, -1,  1, -4, -3, -1, -4, // L
    -1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5, -1, -3, -1,  0, -1, -3, -2, -2,  0,  1, -1, -4, // K
    -1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,  0, -2, -1, -1, -1, -1,  1, -3, -1, -1, -4, // M
    -2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6, -4, -2, -2,  1,  3, -1, -3, -3, -1, -4, // F
    -1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7, -1, -1, -4, -3, -2, -2, -1, -2, -4, // P
     1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,  1, -3, -2, -2,  0,  0,  0, -4, // S
     0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5, -2, -2,  0, -1, -1,  0, -4, // T
    -3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,  2, -3, -4, -3, -2, -4, // W
    -2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7, -1, -3, -2, -1, -4, // Y
     0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4, -3, -2, -1, -4, // V
    -2, -1,  3,  4, -3,  0,  1, -1,  0, -3, -4,  0, -3, -3, -2,  0, -1, -4, -3, -3,  4,  1, -1, -4, // B
    -1,  0,  0,  1, -3,  3,  4, -2,  0, -3, -3,  1, -1, -3, -1,  0, -1, -3, -2, -2,  1,  4, -1, -4, // Z
     0, -1, -1, -1, -2, -1, -1, -1, -1, -1, -1, -1, -1, -1, -2,  0,  0, -2, -1, -1, -1, -1, -1, -4, // X
    -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,  1, // *
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_blosum62_known_values() {
        let m = SimilarityMatrix::blosum62();
        assert!((m.score(b'W', b'W') - 11.0).abs() < f64::EPSILON);
        assert!((m.score(b'A', b'R') + 1.0).abs() < f64::EPSILON);
        assert!((m.score(b'a', b'r') + 1.0).abs() < f64::EPSILON);
        assert!((m.min_score() + 4.0).abs() < f64::EPSILON);
        assert!((m.max_score() - 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_symbols_score_minimum() {
        let m = SimilarityMatrix::blosum62();
        assert!((m.score(b'X', b'A') - m.min_score()).abs() < f64::EPSILON);
        assert!((m.score(b'-', b'-') - m.min_score()).abs() < f64::EPSILON);
        assert!(m.normalized(b'X', b'X').abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalized_range() {
        let m = SimilarityMatrix::blosum62();
        assert!((m.normalized(b'W', b'W') - 1.0).abs() < f64::EPSILON);
        for &a in m.symbols() {
            for &b in m.symbols() {
                let s = m.normalized(a, b);
                assert!((0.0..=1.0).contains(&s));
                assert!((s - m.normalized(b, a)).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn test_nucleotide_matrix() {
        let m = SimilarityMatrix::nucleotide();
        assert!((m.normalized(b'A', b'A') - 1.0).abs() < f64::EPSILON);
        assert!((m.normalized(b'T', b'U') - 1.0).abs() < f64::EPSILON);
        assert!(m.normalized(b'A', b'G').abs() < f64::EPSILON);
        assert!(m.normalized(b'N', b'A').abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_with_row_labels() {
        let text = "# test\n  A C\nA 2 -1\nC -1 3\n";
        let m = SimilarityMatrix::from_reader("test", Cursor::new(text)).unwrap();
        assert_eq!(m.symbols(), b"AC");
        assert!((m.score(b'C', b'C') - 3.0).abs() < f64::EPSILON);
        assert!((m.score(b'A', b'C') + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_without_row_labels_symmetrizes() {
        let text = "A C\n2 0\n-2 3\n";
        let m = SimilarityMatrix::from_reader("test", Cursor::new(text)).unwrap();
        assert!((m.score(b'A', b'C') + 1.0).abs() < f64::EPSILON);
        assert!((m.score(b'C', b'A') + 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_errors() {
        let cases = [
            "",
            "A C\n1 0\n",
            "A C\n1 0\n0 x\n",
            "A A\n1 0\n0 1\n",
            "A 1\n1 0\n0 1\n",
            "A C\nC 1 0\n0 1\n",
        ];
        for text in cases {
            let result = SimilarityMatrix::from_reader("bad", Cursor::new(text));
            assert!(
                matches!(result, Err(TrimError::Parse(_))),
                "expected parse error for {text:?}"
            );
        }
    }

    #[test]
    fn test_flat_matrix_normalizes_to_one() {
        let m = SimilarityMatrix::new("flat", b"AC", &[1.0, 1.0, 1.0, 1.0]).unwrap();
        assert!((m.normalized(b'A', b'C') - 1.0).abs() < f64::EPSILON);
    }
}
