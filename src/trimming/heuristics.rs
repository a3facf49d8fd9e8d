//! Automated column-selection policies.
//!
//! Each heuristic is a pure function from column statistics to a pair of
//! cutoffs, so the same statistics always produce the same thresholds.
//!
//! | Heuristic    | Gap cutoff                       | Conservation cutoff            |
//! |--------------|----------------------------------|--------------------------------|
//! | `nogaps`     | 0                                | none                           |
//! | `noallgaps`  | (n - 1) / n                      | none                           |
//! | `gappyout`   | [`second_slope_cut`] / n         | none                           |
//! | `strict`     | as gappyout                      | [`strict_conservation_cutoff`] |
//! | `strictplus` | as gappyout                      | as strict                      |
//! | `automated1` | gappyout or strict, see [`choose_automated`] |                    |

use serde::Serialize;

use crate::core::types::count_to_f64;
use crate::statistics::identity::SequencesMatrix;
use crate::trimming::strategy::Heuristic;

/// Mean identity at or above which automated1 picks gappyout
pub const HIGH_IDENTITY: f64 = 0.55;

/// Mean identity at or below which automated1 picks strict
pub const LOW_IDENTITY: f64 = 0.38;

/// Alignments with at most this many sequences fall back to gappyout
pub const SMALL_ALIGNMENT: usize = 20;

/// Mean closest-neighbour identity range that still favours gappyout
pub const GAPPYOUT_MAX_IDENTITY_RANGE: (f64, f64) = (0.5, 0.65);

/// Column statistics a policy looks at
#[derive(Debug, Clone, Copy)]
pub struct ColumnProfile<'a> {
    /// Gap count per column
    pub gap_counts: &'a [usize],
    pub num_sequences: usize,
    /// Conservation per column, undefined columns as 0.0
    pub conservation: &'a [f64],
}

/// Sequence identity summary used by automated1
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdentitySummary {
    pub num_sequences: usize,
    pub mean_identity: f64,
    pub mean_max_identity: f64,
}

impl IdentitySummary {
    #[must_use]
    pub fn from_matrix(matrix: &SequencesMatrix) -> Self {
        Self {
            num_sequences: matrix.len(),
            mean_identity: matrix.mean_identity(),
            mean_max_identity: matrix.mean_max_identity(),
        }
    }
}

/// Cutoffs produced by a heuristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Policy {
    /// Heuristic that produced the cutoffs; never `Automated1`
    pub heuristic: Heuristic,
    pub gap_cutoff: Option<f64>,
    pub conservation_cutoff: Option<f64>,
}

/// Evaluate `heuristic` over a column profile.
///
/// `identity` is only called for automated1, which needs pairwise identities.
pub fn policy(
    heuristic: Heuristic,
    profile: &ColumnProfile<'_>,
    identity: impl FnOnce() -> IdentitySummary,
) -> Policy {
    let resolved = match heuristic {
        Heuristic::Automated1 => choose_automated(&identity()),
        other => other,
    };

    let n = profile.num_sequences;
    let (gap_cutoff, conservation_cutoff) = match resolved {
        Heuristic::NoGaps => (Some(0.0), None),
        Heuristic::NoAllGaps => (Some(no_all_gaps_cutoff(n)), None),
        Heuristic::GappyOut => {
            let cut = second_slope_cut(profile.gap_counts, n);
            (Some(fraction(cut, n)), None)
        }
        Heuristic::Strict | Heuristic::StrictPlus | Heuristic::Automated1 => {
            let cut = second_slope_cut(profile.gap_counts, n);
            let conservation =
                strict_conservation_cutoff(profile.gap_counts, cut, profile.conservation);
            (Some(fraction(cut, n)), Some(conservation))
        }
    };

    Policy {
        heuristic: resolved,
        gap_cutoff,
        conservation_cutoff,
    }
}

fn fraction(count: usize, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        count_to_f64(count) / count_to_f64(n)
    }
}

/// Largest gap fraction short of a full column.
#[must_use]
pub fn no_all_gaps_cutoff(num_sequences: usize) -> f64 {
    fraction(num_sequences.saturating_sub(1), num_sequences)
}

/// Gap count at the steepest change of the gap distribution.
///
/// Walks the histogram "columns with exactly k gaps" over consecutive
/// non-empty points `(pprev, prev, act)`. The slope at `act` is the gap step
/// `(act - pprev) / n` over the column share `(h[act] + h[prev]) / columns`,
/// and the cut moves to `pprev` whenever the ratio of that slope to the
/// previously computed one is the largest seen. Starts at the smallest
/// observed gap count.
#[must_use]
pub fn second_slope_cut(gap_counts: &[usize], num_sequences: usize) -> usize {
    let hist = crate::statistics::gaps::histogram(gap_counts);
    let num_columns = count_to_f64(gap_counts.len());
    let n = count_to_f64(num_sequences.max(1));
    let points = hist.len();

    let next_point = |mut k: usize| {
        while k < points && hist[k] == 0 {
            k += 1;
        }
        k
    };

    let mut cut = next_point(0);
    if gap_counts.is_empty() {
        return 0;
    }

    let mut slopes: Vec<Option<f64>> = vec![None; points];
    let mut best_ratio = f64::NEG_INFINITY;
    let mut act = 0;

    while act < points {
        act = next_point(act);
        let pprev = act;
        if act + 1 >= points {
            break;
        }

        act = next_point(act + 1);
        let prev = act;
        if act + 1 >= points {
            break;
        }

        act = next_point(act + 1);
        if act >= points {
            break;
        }

        let slope =
            (count_to_f64(act - pprev) / n) / (count_to_f64(hist[act] + hist[prev]) / num_columns);
        slopes[act] = Some(slope);

        if let Some(earlier) = slopes[pprev].or(slopes[prev]) {
            let ratio = slope / earlier;
            if ratio > best_ratio {
                best_ratio = ratio;
                cut = pprev;
            }
        }
        act = prev;
    }

    cut
}

/// Conservation cutoff of the strict heuristics.
///
/// Among columns with at most `gap_cut` gaps, take the conservation values
/// at the 20% and 80% marks of the descending order and interpolate between
/// them on a log scale, one tenth of the way from the 80% value:
/// `p20^0.1 * p80^0.9`. A mark that no column reaches counts as 0.
#[must_use]
pub fn strict_conservation_cutoff(gap_counts: &[usize], gap_cut: usize, conservation: &[f64]) -> f64 {
    let mut values: Vec<f64> = gap_counts
        .iter()
        .zip(conservation)
        .filter(|(&g, _)| g <= gap_cut)
        .map(|(_, &c)| c)
        .collect();
    values.sort_by(|a, b| b.total_cmp(a));

    let mark = |percent: usize| {
        let rank = values.len() * percent / 100;
        if rank == 0 {
            0.0
        } else {
            values[rank - 1]
        }
    };

    let first20 = mark(20);
    let last80 = mark(80);
    first20.powf(0.1) * last80.powf(0.9)
}

/// Pick gappyout or strict from sequence identity statistics.
#[must_use]
pub fn choose_automated(summary: &IdentitySummary) -> Heuristic {
    let (low, high) = GAPPYOUT_MAX_IDENTITY_RANGE;
    if summary.mean_identity >= HIGH_IDENTITY {
        Heuristic::GappyOut
    } else if summary.mean_identity <= LOW_IDENTITY {
        Heuristic::Strict
    } else if summary.num_sequences <= SMALL_ALIGNMENT {
        Heuristic::GappyOut
    } else if (low..=high).contains(&summary.mean_max_identity) {
        Heuristic::GappyOut
    } else {
        Heuristic::Strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(n: usize, mean: f64, max: f64) -> IdentitySummary {
        IdentitySummary {
            num_sequences: n,
            mean_identity: mean,
            mean_max_identity: max,
        }
    }

    fn profile<'a>(gaps: &'a [usize], n: usize, cons: &'a [f64]) -> ColumnProfile<'a> {
        ColumnProfile {
            gap_counts: gaps,
            num_sequences: n,
            conservation: cons,
        }
    }

    #[test]
    fn test_nogaps_and_noallgaps() {
        let gaps = [0, 1, 4];
        let cons = [1.0, 1.0, 0.0];
        let p = policy(Heuristic::NoGaps, &profile(&gaps, 4, &cons), || unreachable!());
        assert_eq!(p.gap_cutoff, Some(0.0));
        assert_eq!(p.conservation_cutoff, None);

        let p = policy(Heuristic::NoAllGaps, &profile(&gaps, 4, &cons), || unreachable!());
        assert!((p.gap_cutoff.unwrap() - 0.75).abs() < 0.001);
        assert!(no_all_gaps_cutoff(1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_second_slope_starts_at_lowest_count() {
        // Every column has 2 gaps: only one histogram point
        assert_eq!(second_slope_cut(&[2, 2, 2, 2], 10), 2);
        assert_eq!(second_slope_cut(&[], 10), 0);
    }

    #[test]
    fn test_second_slope_finds_gappy_tail() {
        // 40 clean columns, a handful of lightly gapped ones and a block of near-empty columns
        let mut gaps = vec![0; 40];
        gaps.extend([1, 1, 1, 1, 1, 1, 2, 2, 2, 3]);
        gaps.extend([18, 19, 19, 19, 19]);
        let cut = second_slope_cut(&gaps, 20);

        assert!(cut >= 1);
        assert!(cut < 18);
    }

    #[test]
    fn test_second_slope_is_deterministic() {
        let gaps = [0, 0, 0, 1, 3, 3, 7, 7, 7, 9];
        assert_eq!(second_slope_cut(&gaps, 10), second_slope_cut(&gaps, 10));
    }

    #[test]
    fn test_strict_conservation_cutoff() {
        // Ten passing columns: p20 is the 2nd best, p80 the 8th best
        let gaps = [0; 10];
        let cons = [1.0, 0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3, 0.2, 0.1];
        let cutoff = strict_conservation_cutoff(&gaps, 0, &cons);
        let expected = 0.9f64.powf(0.1) * 0.3f64.powf(0.9);
        assert!((cutoff - expected).abs() < 1e-9);
        assert!(cutoff > 0.3 && cutoff < 0.9);
    }

    #[test]
    fn test_strict_cutoff_ignores_gappy_columns() {
        let gaps = [0, 0, 0, 0, 0, 9];
        let cons = [0.5, 0.5, 0.5, 0.5, 0.5, 0.0];
        let cutoff = strict_conservation_cutoff(&gaps, 1, &cons);
        assert!((cutoff - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_strict_cutoff_few_columns() {
        let cutoff = strict_conservation_cutoff(&[0, 0], 0, &[0.9, 0.8]);
        assert!(cutoff.abs() < f64::EPSILON);
    }

    #[test]
    fn test_strict_policy_sets_both_axes() {
        let gaps = [0, 0, 0, 0, 0, 1, 1, 5, 5, 5];
        let cons = [0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3, 0.2, 0.1, 0.0];
        let p = policy(Heuristic::Strict, &profile(&gaps, 5, &cons), || unreachable!());
        assert_eq!(p.heuristic, Heuristic::Strict);
        assert!(p.gap_cutoff.is_some());
        assert!(p.conservation_cutoff.is_some());
    }

    #[test]
    fn test_choose_automated() {
        assert_eq!(choose_automated(&summary(50, 0.6, 0.9)), Heuristic::GappyOut);
        assert_eq!(choose_automated(&summary(50, 0.3, 0.9)), Heuristic::Strict);
        assert_eq!(choose_automated(&summary(10, 0.45, 0.9)), Heuristic::GappyOut);
        assert_eq!(choose_automated(&summary(50, 0.45, 0.6)), Heuristic::GappyOut);
        assert_eq!(choose_automated(&summary(50, 0.45, 0.9)), Heuristic::Strict);
    }

    #[test]
    fn test_automated1_resolves() {
        let gaps = [0, 0, 1];
        let cons = [1.0, 1.0, 0.5];
        let p = policy(Heuristic::Automated1, &profile(&gaps, 4, &cons), || {
            summary(4, 0.9, 0.95)
        });
        assert_eq!(p.heuristic, Heuristic::GappyOut);
        assert_eq!(p.conservation_cutoff, None);
    }
}
