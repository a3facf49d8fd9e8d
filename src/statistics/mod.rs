//! Column and sequence statistics over an alignment.
//!
//! - [`SimilarityMatrix`]: residue-pair scores, BLOSUM62 or nucleotide identity by default
//! - [`GapStatistics`]: gap and terminal-gap counts per column
//! - [`ConservationStatistics`]: similarity-weighted or identity conservation per column
//! - [`SequencesMatrix`]: pairwise identity/overlap, max-identity filtering, clustering
//!
//! Every statistic is a pure function of an immutable [`Alignment`](crate::core::Alignment)
//! snapshot. Per-column and per-pair work is spread over the rayon thread
//! pool and collected in index order, so results match a sequential pass.

pub mod conservation;
pub mod gaps;
pub mod identity;
pub mod similarity_matrix;

pub use conservation::{ConservationMeasure, ConservationStatistics};
pub use gaps::GapStatistics;
pub use identity::SequencesMatrix;
pub use similarity_matrix::SimilarityMatrix;

use crate::core::error::TrimError;
use crate::core::types::count_to_f64;

/// Replace each value by the mean over `[i - half_window, i + half_window]`,
/// mirroring indices that fall off either end.
///
/// # Errors
///
/// Returns `TrimError::Config` when the window exceeds a quarter of the values.
pub fn smooth(values: &[f64], half_window: usize) -> Result<Vec<f64>, TrimError> {
    if half_window == 0 {
        return Ok(values.to_vec());
    }
    let n = values.len();
    if half_window > n / 4 {
        return Err(TrimError::Config(format!(
            "half window {half_window} is larger than a quarter of the {n} columns"
        )));
    }

    let width = count_to_f64(2 * half_window + 1);
    Ok((0..n)
        .map(|i| {
            let sum: f64 = (0..=2 * half_window)
                .map(|k| {
                    let offset = i + k;
                    let j = if offset < half_window {
                        half_window - offset
                    } else if offset - half_window >= n {
                        2 * (n - 1) + half_window - offset
                    } else {
                        offset - half_window
                    };
                    values[j]
                })
                .sum();
            sum / width
        })
        .collect())
}
