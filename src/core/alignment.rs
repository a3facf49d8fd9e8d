use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::error::TrimError;
use crate::core::types::{normalize_symbol, ResidueType, GAP};

/// One aligned row: a name and its residues/gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub residues: Vec<u8>,
}

impl Sequence {
    /// Create a sequence, uppercasing residues and folding `.`/`~` into `-`.
    pub fn new(name: impl Into<String>, residues: impl AsRef<[u8]>) -> Self {
        Self {
            name: name.into(),
            residues: residues.as_ref().iter().copied().map(normalize_symbol).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Number of gap symbols in the row
    #[must_use]
    pub fn gap_count(&self) -> usize {
        self.residues.iter().filter(|&&s| s == GAP).count()
    }

    /// Residues with every gap removed
    #[must_use]
    pub fn ungapped(&self) -> Vec<u8> {
        self.residues.iter().copied().filter(|&s| s != GAP).collect()
    }
}

/// A rectangular multiple sequence alignment.
///
/// Built once by a reader and never mutated afterwards: trimming produces a
/// new owned `Alignment` via [`Alignment::select`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    sequences: Vec<Sequence>,
    residue_type: ResidueType,
    num_columns: usize,
}

impl Alignment {
    /// Build an alignment, detecting the residue type from its content.
    ///
    /// # Errors
    ///
    /// Returns `TrimError::InvalidAlignment` when there are no sequences, no
    /// columns, rows of differing length, or duplicated names.
    pub fn new(sequences: Vec<Sequence>) -> Result<Self, TrimError> {
        let residue_type = ResidueType::detect(
            &sequences.iter().map(|s| s.residues.as_slice()).collect::<Vec<_>>(),
        );
        Self::with_residue_type(sequences, residue_type)
    }

    /// Build an alignment with an explicit residue type.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Alignment::new`].
    pub fn with_residue_type(
        sequences: Vec<Sequence>,
        residue_type: ResidueType,
    ) -> Result<Self, TrimError> {
        let num_columns = validate_rows(&sequences)?;
        Ok(Self {
            sequences,
            residue_type,
            num_columns,
        })
    }

    #[must_use]
    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    #[must_use]
    pub fn residue_type(&self) -> ResidueType {
        self.residue_type
    }

    #[must_use]
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    #[must_use]
    pub fn sequence(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }

    /// Residue rows as byte slices, in alignment order
    #[must_use]
    pub fn rows(&self) -> Vec<&[u8]> {
        self.sequences.iter().map(|s| s.residues.as_slice()).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sequences.iter().map(|s| s.name.as_str())
    }

    /// Position of the sequence called `name`
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.sequences.iter().position(|s| s.name == name)
    }

    /// Symbol at (`row`, `column`). Panics when out of bounds.
    #[must_use]
    pub fn symbol(&self, row: usize, column: usize) -> u8 {
        self.sequences[row].residues[column]
    }

    /// Symbols of one column, top to bottom
    pub fn column(&self, column: usize) -> impl Iterator<Item = u8> + '_ {
        self.sequences.iter().map(move |s| s.residues[column])
    }

    /// Project onto the rows and columns whose mask entry is `true`.
    ///
    /// The result may have no columns (complementary output of a run that
    /// kept everything) or no rows when the caller allowed an empty result.
    #[must_use]
    pub fn select(&self, rows: &[bool], columns: &[bool]) -> Alignment {
        debug_assert_eq!(rows.len(), self.sequences.len());
        debug_assert_eq!(columns.len(), self.num_columns);

        let sequences: Vec<Sequence> = self
            .sequences
            .iter()
            .zip(rows)
            .filter(|(_, &keep)| keep)
            .map(|(seq, _)| Sequence {
                name: seq.name.clone(),
                residues: seq
                    .residues
                    .iter()
                    .zip(columns)
                    .filter(|(_, &keep)| keep)
                    .map(|(&s, _)| s)
                    .collect(),
            })
            .collect();

        Alignment {
            sequences,
            residue_type: self.residue_type,
            num_columns: columns.iter().filter(|&&keep| keep).count(),
        }
    }
}

fn validate_rows(sequences: &[Sequence]) -> Result<usize, TrimError> {
    let first = sequences
        .first()
        .ok_or_else(|| TrimError::InvalidAlignment("alignment has no sequences".to_string()))?;

    let num_columns = first.len();
    if num_columns == 0 {
        return Err(TrimError::InvalidAlignment(format!(
            "sequence '{}' is empty",
            first.name
        )));
    }

    let mut seen = HashSet::with_capacity(sequences.len());
    for seq in sequences {
        if seq.len() != num_columns {
            return Err(TrimError::InvalidAlignment(format!(
                "sequence '{}' has {} columns, expected {}",
                seq.name,
                seq.len(),
                num_columns
            )));
        }
        if !seen.insert(seq.name.as_str()) {
            return Err(TrimError::InvalidAlignment(format!(
                "duplicate sequence name '{}'",
                seq.name
            )));
        }
    }

    Ok(num_columns)
}
