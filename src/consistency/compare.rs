use rayon::prelude::*;
use serde::Serialize;

use crate::core::alignment::Alignment;
use crate::core::error::TrimError;
use crate::core::types::{count_to_f64, GAP};

/// Consistency of each candidate alignment against the others
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    /// Mean column consistency per alignment, in input order
    pub scores: Vec<f64>,
    /// Index of the first alignment with the highest score
    pub best: usize,
    /// Per-column consistency for every alignment
    pub column_consistency: Vec<Vec<f64>>,
}

impl ComparisonResult {
    #[must_use]
    pub fn best_score(&self) -> f64 {
        self.scores[self.best]
    }
}

/// Residue ordinals of one alignment, rows in the reference name order.
struct ResidueMap {
    /// `ordinals[row][column]`: 1-based residue ordinal, 0 for a gap
    ordinals: Vec<Vec<usize>>,
    /// `columns[row][ordinal - 1]`: column holding that residue
    columns: Vec<Vec<usize>>,
}

impl ResidueMap {
    fn build(alignment: &Alignment, order: &[usize]) -> Self {
        let mut ordinals = Vec::with_capacity(order.len());
        let mut columns = Vec::with_capacity(order.len());

        for &row in order {
            let residues = &alignment.sequences()[row].residues;
            let mut row_ordinals = Vec::with_capacity(residues.len());
            let mut row_columns = Vec::new();
            for (column, &symbol) in residues.iter().enumerate() {
                if symbol == GAP {
                    row_ordinals.push(0);
                } else {
                    row_columns.push(column);
                    row_ordinals.push(row_columns.len());
                }
            }
            ordinals.push(row_ordinals);
            columns.push(row_columns);
        }

        Self { ordinals, columns }
    }

    fn num_columns(&self) -> usize {
        self.ordinals.first().map_or(0, Vec::len)
    }

    fn column_score(&self, column: usize, others: &[&ResidueMap]) -> f64 {
        let n = self.ordinals.len();
        let mut pairs = 0usize;
        let mut hits = 0usize;

        for k in 0..n {
            let ordinal = self.ordinals[k][column];
            if ordinal == 0 {
                continue;
            }
            for other in others {
                let other_column = other.columns[k][ordinal - 1];
                for m in (k + 1)..n {
                    let expected = self.ordinals[m][column];
                    if expected == 0 {
                        continue;
                    }
                    pairs += 1;
                    if other.ordinals[m][other_column] == expected {
                        hits += 1;
                    }
                }
            }
        }

        if pairs == 0 {
            0.0
        } else {
            count_to_f64(hits) / count_to_f64(pairs)
        }
    }
}

/// Score each alignment by how consistently the others pair up its residues.
///
/// For each residue pair sharing a column, every other alignment that also
/// places both residues in one column counts a hit. A column scores
/// hits / pairs and an alignment scores the mean over its columns.
///
/// # Errors
///
/// - `TrimError::Config` with fewer than two alignments
/// - `TrimError::IncompatibleSet` when sequence names or ungapped lengths differ
pub fn compare_alignments(alignments: &[Alignment]) -> Result<ComparisonResult, TrimError> {
    if alignments.len() < 2 {
        return Err(TrimError::Config(format!(
            "at least two alignments are needed for comparison, got {}",
            alignments.len()
        )));
    }

    let orders = alignments
        .iter()
        .enumerate()
        .map(|(i, alignment)| name_order(&alignments[0], alignment, i))
        .collect::<Result<Vec<_>, _>>()?;

    let maps: Vec<ResidueMap> = alignments
        .par_iter()
        .zip(orders.par_iter())
        .map(|(alignment, order)| ResidueMap::build(alignment, order))
        .collect();

    let column_consistency: Vec<Vec<f64>> = (0..maps.len())
        .into_par_iter()
        .map(|i| {
            let others: Vec<&ResidueMap> = maps
                .iter()
                .enumerate()
                .filter(|(l, _)| *l != i)
                .map(|(_, map)| map)
                .collect();
            (0..maps[i].num_columns())
                .map(|column| maps[i].column_score(column, &others))
                .collect()
        })
        .collect();

    let scores: Vec<f64> = column_consistency
        .iter()
        .map(|columns| {
            if columns.is_empty() {
                0.0
            } else {
                columns.iter().sum::<f64>() / count_to_f64(columns.len())
            }
        })
        .collect();

    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = i;
        }
    }

    Ok(ComparisonResult {
        scores,
        best,
        column_consistency,
    })
}

/// Row index in `candidate` of every sequence of `reference`, by name.
fn name_order(
    reference: &Alignment,
    candidate: &Alignment,
    position: usize,
) -> Result<Vec<usize>, TrimError> {
    if reference.num_sequences() != candidate.num_sequences() {
        return Err(TrimError::IncompatibleSet(format!(
            "alignment {position} has {} sequences, expected {}",
            candidate.num_sequences(),
            reference.num_sequences()
        )));
    }

    reference
        .sequences()
        .iter()
        .map(|seq| {
            let index = candidate.index_of(&seq.name).ok_or_else(|| {
                TrimError::IncompatibleSet(format!(
                    "sequence '{}' is missing from alignment {position}",
                    seq.name
                ))
            })?;
            let other = &candidate.sequences()[index];
            let expected = seq.len() - seq.gap_count();
            let found = other.len() - other.gap_count();
            if expected != found {
                return Err(TrimError::IncompatibleSet(format!(
                    "sequence '{}' has {found} residues in alignment {position}, expected {expected}",
                    seq.name
                )));
            }
            Ok(index)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::Sequence;

    fn alignment(rows: &[(&str, &str)]) -> Alignment {
        Alignment::new(
            rows.iter()
                .map(|(name, residues)| Sequence::new(*name, residues))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_identical_alignments_tie() {
        let aln = alignment(&[("a", "MKV-LA"), ("b", "MKVQLA"), ("c", "M-VQLA")]);
        let result = compare_alignments(&[aln.clone(), aln.clone(), aln]).unwrap();

        assert_eq!(result.best, 0);
        assert!((result.scores[0] - 1.0).abs() < 0.001);
        assert!((result.scores[1] - result.scores[0]).abs() < 0.001);
        assert!((result.scores[2] - result.scores[0]).abs() < 0.001);
    }

    #[test]
    fn test_row_order_does_not_matter() {
        let first = alignment(&[("a", "MKVLA"), ("b", "MKVLA")]);
        let second = alignment(&[("b", "MKVLA"), ("a", "MKVLA")]);
        let result = compare_alignments(&[first, second]).unwrap();

        assert!((result.scores[0] - 1.0).abs() < 0.001);
        assert!((result.scores[1] - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_disagreement_lowers_score() {
        // Majority places K under K; the odd one shifts it
        let good = alignment(&[("a", "MK-V"), ("b", "MKLV")]);
        let bad = alignment(&[("a", "M-KV"), ("b", "MKLV")]);
        let result = compare_alignments(&[bad.clone(), good.clone(), good]).unwrap();

        assert_eq!(result.best, 1);
        assert!(result.scores[0] < result.scores[1]);
        // Column 0 pairs M with M in every alignment
        assert!((result.column_consistency[0][0] - 1.0).abs() < 0.001);
        // The gap column of the bad alignment has no pair
        assert!(result.column_consistency[0][1].abs() < 0.001);
    }

    #[test]
    fn test_requires_two_alignments() {
        let aln = alignment(&[("a", "MKV"), ("b", "MKV")]);
        assert!(matches!(compare_alignments(&[aln]), Err(TrimError::Config(_))));
    }

    #[test]
    fn test_incompatible_sets() {
        let base = alignment(&[("a", "MKV"), ("b", "MKV")]);
        let renamed = alignment(&[("a", "MKV"), ("c", "MKV")]);
        let longer = alignment(&[("a", "MKVL"), ("b", "MKV-")]);

        assert!(matches!(
            compare_alignments(&[base.clone(), renamed]),
            Err(TrimError::IncompatibleSet(_))
        ));
        assert!(matches!(
            compare_alignments(&[base, longer]),
            Err(TrimError::IncompatibleSet(_))
        ));
    }
}
