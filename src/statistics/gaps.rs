use rayon::prelude::*;

use crate::core::alignment::Alignment;
use crate::core::error::TrimError;
use crate::core::types::{count_to_f64, GAP};

/// Per-column gap counts, with terminal gaps tracked separately.
///
/// A terminal gap lies before the first or after the last residue of its
/// sequence; all other gaps are internal. A row made only of gaps is terminal
/// throughout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapStatistics {
    num_sequences: usize,
    gaps: Vec<usize>,
    terminal_gaps: Vec<usize>,
}

impl GapStatistics {
    /// Compute from raw rows.
    ///
    /// # Errors
    ///
    /// Returns `TrimError::InvalidAlignment` if there are no rows or the rows
    /// differ in length.
    pub fn from_rows<S: AsRef<[u8]> + Sync>(rows: &[S]) -> Result<Self, TrimError> {
        let first = rows
            .first()
            .ok_or_else(|| TrimError::InvalidAlignment("alignment has no sequences".to_string()))?;
        let width = first.as_ref().len();
        if let Some(pos) = rows.iter().position(|r| r.as_ref().len() != width) {
            return Err(TrimError::InvalidAlignment(format!(
                "sequence {} has {} columns, expected {width}",
                pos + 1,
                rows[pos].as_ref().len()
            )));
        }
        Ok(Self::from_rectangular(rows, width))
    }

    /// Compute over every sequence of an alignment.
    #[must_use]
    pub fn compute(alignment: &Alignment) -> Self {
        Self::from_rectangular(&alignment.rows(), alignment.num_columns())
    }

    /// Compute over the sequences whose `active` flag is set.
    #[must_use]
    pub fn compute_rows(alignment: &Alignment, active: &[bool]) -> Self {
        let rows: Vec<&[u8]> = alignment
            .rows()
            .into_iter()
            .zip(active)
            .filter(|(_, &on)| on)
            .map(|(row, _)| row)
            .collect();
        Self::from_rectangular(&rows, alignment.num_columns())
    }

    fn from_rectangular<S: AsRef<[u8]> + Sync>(rows: &[S], width: usize) -> Self {
        // Residue span of each row; None for all-gap rows
        let spans: Vec<Option<(usize, usize)>> = rows
            .par_iter()
            .map(|row| {
                let row = row.as_ref();
                let first = row.iter().position(|&s| s != GAP)?;
                let last = row.iter().rposition(|&s| s != GAP)?;
                Some((first, last))
            })
            .collect();

        let (gaps, terminal_gaps): (Vec<usize>, Vec<usize>) = (0..width)
            .into_par_iter()
            .map(|col| {
                let mut gaps = 0;
                let mut terminal = 0;
                for (row, span) in rows.iter().zip(&spans) {
                    if row.as_ref()[col] != GAP {
                        continue;
                    }
                    gaps += 1;
                    match span {
                        Some((first, last)) if col > *first && col < *last => {}
                        _ => terminal += 1,
                    }
                }
                (gaps, terminal)
            })
            .unzip();

        Self {
            num_sequences: rows.len(),
            gaps,
            terminal_gaps,
        }
    }

    #[must_use]
    pub fn num_sequences(&self) -> usize {
        self.num_sequences
    }

    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.gaps.len()
    }

    /// Gap counts per column
    #[must_use]
    pub fn gap_counts(&self) -> &[usize] {
        &self.gaps
    }

    /// Gap counts per column, terminal gaps excluded
    #[must_use]
    pub fn internal_gap_counts(&self) -> Vec<usize> {
        self.gaps
            .iter()
            .zip(&self.terminal_gaps)
            .map(|(g, t)| g - t)
            .collect()
    }

    #[must_use]
    pub fn terminal_gaps(&self, column: usize) -> usize {
        self.terminal_gaps[column]
    }

    /// Gap counts used for thresholding
    #[must_use]
    pub fn counts(&self, ignore_terminal: bool) -> Vec<usize> {
        if ignore_terminal {
            self.internal_gap_counts()
        } else {
            self.gaps.clone()
        }
    }

    /// Gap count over sequence count. Without sequences every column counts as all gaps.
    #[must_use]
    pub fn fraction(&self, gaps: usize) -> f64 {
        if self.num_sequences == 0 {
            1.0
        } else {
            count_to_f64(gaps) / count_to_f64(self.num_sequences)
        }
    }

    #[must_use]
    pub fn gap_fraction(&self, column: usize) -> f64 {
        self.fraction(self.gaps[column])
    }

    /// Per-column gap fractions, optionally ignoring terminal gaps
    #[must_use]
    pub fn fractions(&self, ignore_terminal: bool) -> Vec<f64> {
        self.counts(ignore_terminal)
            .into_iter()
            .map(|g| self.fraction(g))
            .collect()
    }

    /// Number of columns holding exactly `k` gaps, for `k` in `0..=max`
    #[must_use]
    pub fn histogram(&self, ignore_terminal: bool) -> Vec<usize> {
        histogram(&self.counts(ignore_terminal))
    }

    /// Columns with no gap at all
    pub fn gap_free_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.gaps
            .iter()
            .enumerate()
            .filter(|(_, &g)| g == 0)
            .map(|(i, _)| i)
    }
}

/// Histogram of gap counts, sized to the largest observed count.
#[must_use]
pub fn histogram(counts: &[usize]) -> Vec<usize> {
    let max = counts.iter().copied().max().unwrap_or(0);
    let mut hist = vec![0; max + 1];
    for &c in counts {
        hist[c] += 1;
    }
    hist
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alignment::Sequence;

    fn alignment(rows: &[&str]) -> Alignment {
        Alignment::new(
            rows.iter()
                .enumerate()
                .map(|(i, r)| Sequence::new(format!("s{i}"), r))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_gap_fractions() {
        let aln = alignment(&["AC-T", "A--T", "AC-T", "ACGT"]);
        let stats = GapStatistics::compute(&aln);

        assert_eq!(stats.gap_counts(), &[0, 1, 3, 0]);
        assert!((stats.gap_fraction(2) - 0.75).abs() < 0.001);
        assert!(stats.gap_fraction(0).abs() < 0.001);
        assert_eq!(stats.gap_free_columns().collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn test_terminal_gaps() {
        let aln = alignment(&["--ACG-T--", "ACGTACGTA", "-A-C-----"]);
        let stats = GapStatistics::compute(&aln);

        // Row 0: leading 0,1 and trailing 7,8 are terminal, 5 internal
        // Row 2: leading 0, internal 2, trailing 4..=8
        assert_eq!(stats.gap_counts(), &[2, 1, 1, 0, 1, 2, 1, 2, 2]);
        assert_eq!(stats.internal_gap_counts(), vec![0, 0, 1, 0, 0, 1, 0, 0, 0]);
        assert_eq!(stats.terminal_gaps(0), 2);
        assert!((stats.fractions(true)[5] - 1.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_all_gap_row_is_terminal() {
        let aln = alignment(&["----", "ACGT"]);
        let stats = GapStatistics::compute(&aln);
        assert_eq!(stats.internal_gap_counts(), vec![0, 0, 0, 0]);
        assert_eq!(stats.gap_counts(), &[1, 1, 1, 1]);
    }

    #[test]
    fn test_compute_rows_subset() {
        let aln = alignment(&["A-GT", "A--T", "ACGT"]);
        let stats = GapStatistics::compute_rows(&aln, &[true, false, true]);

        assert_eq!(stats.num_sequences(), 2);
        assert_eq!(stats.gap_counts(), &[0, 1, 0, 0]);
        assert!((stats.gap_fraction(1) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let result = GapStatistics::from_rows(&["ACGT", "AC"]);
        assert!(matches!(result, Err(TrimError::InvalidAlignment(_))));

        let empty: [&str; 0] = [];
        assert!(GapStatistics::from_rows(&empty).is_err());
    }

    #[test]
    fn test_histogram() {
        assert_eq!(histogram(&[0, 2, 2, 5]), vec![1, 0, 2, 0, 0, 1]);
        assert_eq!(histogram(&[]), vec![0]);
    }
}
