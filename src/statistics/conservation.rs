use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::alignment::Alignment;
use crate::core::types::{count_to_f64, ResidueType, GAP};
use crate::statistics::similarity_matrix::SimilarityMatrix;

/// How column conservation is scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConservationMeasure {
    /// Mean normalized similarity-matrix score over residue pairs
    #[default]
    Similarity,
    /// Fraction of residue pairs holding the identical residue
    Identity,
}

/// Per-column conservation scores in `[0, 1]`.
///
/// Columns without any residue have no score (`None`). A column holding a
/// single residue has no pair to compare and scores `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConservationStatistics {
    measure: ConservationMeasure,
    values: Vec<Option<f64>>,
}

impl ConservationStatistics {
    /// Score every column over all sequences.
    #[must_use]
    pub fn compute(
        alignment: &Alignment,
        matrix: &SimilarityMatrix,
        measure: ConservationMeasure,
    ) -> Self {
        let active = vec![true; alignment.num_sequences()];
        Self::compute_rows(alignment, &active, matrix, measure)
    }

    /// Score every column over the sequences whose `active` flag is set.
    #[must_use]
    pub fn compute_rows(
        alignment: &Alignment,
        active: &[bool],
        matrix: &SimilarityMatrix,
        measure: ConservationMeasure,
    ) -> Self {
        match measure {
            ConservationMeasure::Similarity => Self::similarity(alignment, active, matrix),
            ConservationMeasure::Identity => Self::identity(alignment, active),
        }
    }

    /// Similarity-weighted variant.
    #[must_use]
    pub fn similarity(alignment: &Alignment, active: &[bool], matrix: &SimilarityMatrix) -> Self {
        let values = column_counts(alignment, active)
            .map(|counts| similarity_score(&counts, matrix))
            .collect();
        Self {
            measure: ConservationMeasure::Similarity,
            values,
        }
    }

    /// Plain identity variant.
    #[must_use]
    pub fn identity(alignment: &Alignment, active: &[bool]) -> Self {
        let residue_type = alignment.residue_type();
        let values = column_counts(alignment, active)
            .map(|counts| identity_score(&counts, residue_type))
            .collect();
        Self {
            measure: ConservationMeasure::Identity,
            values,
        }
    }

    #[must_use]
    pub fn measure(&self) -> ConservationMeasure {
        self.measure
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.values.len()
    }

    /// Raw scores, `None` for columns without residues
    #[must_use]
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    #[must_use]
    pub fn value(&self, column: usize) -> Option<f64> {
        self.values[column]
    }

    /// Scores used for thresholding; undefined columns count as 0.0.
    #[must_use]
    pub fn scores(&self) -> Vec<f64> {
        self.values.iter().map(|v| v.unwrap_or(0.0)).collect()
    }
}

/// Distinct non-gap symbols of a column with their counts
type SymbolCounts = Vec<(u8, usize)>;

fn column_counts<'a>(
    alignment: &'a Alignment,
    active: &'a [bool],
) -> impl IndexedParallelIterator<Item = SymbolCounts> + 'a {
    let rows: Vec<&[u8]> = alignment
        .rows()
        .into_iter()
        .zip(active)
        .filter(|(_, &on)| on)
        .map(|(row, _)| row)
        .collect();

    (0..alignment.num_columns()).into_par_iter().map(move |col| {
        let mut tally = [0usize; 256];
        for row in &rows {
            let symbol = row[col];
            if symbol != GAP {
                tally[usize::from(symbol)] += 1;
            }
        }
        tally
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .filter_map(|(s, &c)| u8::try_from(s).ok().map(|s| (s, c)))
            .collect()
    })
}

fn pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

fn similarity_score(counts: &SymbolCounts, matrix: &SimilarityMatrix) -> Option<f64> {
    let residues: usize = counts.iter().map(|(_, c)| c).sum();
    if residues == 0 {
        return None;
    }
    let total_pairs = pairs(residues);
    if total_pairs == 0 {
        return Some(0.0);
    }

    let mut sum = 0.0;
    for (i, &(a, ca)) in counts.iter().enumerate() {
        sum += count_to_f64(pairs(ca)) * matrix.normalized(a, a);
        for &(b, cb) in &counts[i + 1..] {
            sum += count_to_f64(ca * cb) * matrix.normalized(a, b);
        }
    }
    Some(sum / count_to_f64(total_pairs))
}

fn identity_score(counts: &SymbolCounts, residue_type: ResidueType) -> Option<f64> {
    let residues: usize = counts.iter().map(|(_, c)| c).sum();
    if residues == 0 {
        return None;
    }
    let total_pairs = pairs(residues);
    if total_pairs == 0 {
        return Some(0.0);
    }

    let identical: usize = counts
        .iter()
        .filter(|(s, _)| !residue_type.is_uninformative(*s))
        .map(|&(_, c)| pairs(c))
        .sum();
    Some(count_to_f64(identical) / count_to_f64(total_pairs))
}
