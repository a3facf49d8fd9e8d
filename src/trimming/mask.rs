//! Transforms over per-column keep masks.
//!
//! The cleaner builds a base mask from thresholds and then runs it through
//! these steps in order: neighbour rescue, block merge, terminal-only restore.

/// Tolerance for threshold comparisons
pub const EPSILON: f64 = 1e-9;

/// Keep a column iff its gap fraction is at most `gap_cutoff` and its
/// conservation is at least `conservation_cutoff`. A missing cutoff accepts all.
#[must_use]
pub fn threshold_mask(
    gap_fractions: &[f64],
    gap_cutoff: Option<f64>,
    conservation: &[f64],
    conservation_cutoff: Option<f64>,
) -> Vec<bool> {
    gap_fractions
        .iter()
        .zip(conservation)
        .map(|(&gap, &cons)| {
            gap_cutoff.map_or(true, |cut| gap <= cut + EPSILON)
                && conservation_cutoff.map_or(true, |cut| cons + EPSILON >= cut)
        })
        .collect()
}

/// Restore rejected columns whose neighbourhood is mostly kept.
///
/// Looks at the up to four columns within distance 2 in the unrescued mask.
/// With all four present at most one may be rejected; near the edges none may.
/// Masks shorter than three columns are returned unchanged.
#[must_use]
pub fn rescue_neighbours(mask: &[bool]) -> Vec<bool> {
    let n = mask.len();
    if n < 3 {
        return mask.to_vec();
    }

    let mut rescued = mask.to_vec();
    for (i, keep) in rescued.iter_mut().enumerate() {
        if *keep {
            continue;
        }
        let neighbours: Vec<bool> = [i.checked_sub(2), i.checked_sub(1), Some(i + 1), Some(i + 2)]
            .into_iter()
            .flatten()
            .filter(|&j| j < n)
            .map(|j| mask[j])
            .collect();
        let rejected = neighbours.iter().filter(|&&k| !k).count();
        let allowed = if neighbours.len() == 4 { 1 } else { 0 };
        *keep = rejected <= allowed;
    }
    rescued
}

/// Drop every kept run shorter than `block_size`.
#[must_use]
pub fn remove_short_blocks(mask: &[bool], block_size: usize) -> Vec<bool> {
    let mut result = mask.to_vec();
    for (start, end) in kept_runs(mask) {
        if end - start < block_size {
            result[start..end].fill(false);
        }
    }
    result
}

/// Force-keep the interior between the first and last gap-free column,
/// leaving only the terminal stretches open to removal.
#[must_use]
pub fn restore_interior(mask: &[bool], gap_counts: &[usize]) -> Vec<bool> {
    let mut result = mask.to_vec();
    let first = gap_counts.iter().position(|&g| g == 0);
    let last = gap_counts.iter().rposition(|&g| g == 0);
    if let (Some(first), Some(last)) = (first, last) {
        result[first..=last].fill(true);
    }
    result
}

/// Half-open `[start, end)` ranges of consecutive kept columns
#[must_use]
pub fn kept_runs(mask: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &keep) in mask.iter().enumerate() {
        match (keep, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, mask.len()));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(pattern: &str) -> Vec<bool> {
        pattern.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn test_threshold_mask() {
        let gaps = [0.0, 0.5, 0.75, 1.0];
        let cons = [1.0, 0.2, 0.9, 0.0];

        assert_eq!(
            threshold_mask(&gaps, Some(0.5), &cons, None),
            vec![true, true, false, false]
        );
        assert_eq!(
            threshold_mask(&gaps, None, &cons, Some(0.9)),
            vec![true, false, true, false]
        );
        assert_eq!(
            threshold_mask(&gaps, Some(1.0), &cons, Some(0.0)),
            vec![true; 4]
        );
    }

    #[test]
    fn test_rescue_interior() {
        // Lone rejection surrounded by kept columns comes back
        assert_eq!(rescue_neighbours(&mask("1101111")), mask("1111111"));
        // Two rejections side by side: each sees one rejected neighbour and is rescued
        assert_eq!(rescue_neighbours(&mask("11001111")), mask("11111111"));
        // Three in a row: each sees two rejected neighbours
        assert_eq!(rescue_neighbours(&mask("110001111")), mask("110001111"));
    }

    #[test]
    fn test_rescue_edges() {
        assert_eq!(rescue_neighbours(&mask("011")), mask("111"));
        assert_eq!(rescue_neighbours(&mask("010")), mask("010"));
        assert_eq!(rescue_neighbours(&mask("0111101")), mask("1111111"));
        assert_eq!(rescue_neighbours(&mask("0011111")), mask("0011111"));
        assert_eq!(rescue_neighbours(&mask("01")), mask("01"));
    }

    #[test]
    fn test_remove_short_blocks() {
        assert_eq!(remove_short_blocks(&mask("1101110111"), 3), mask("0001110111"));
        assert_eq!(remove_short_blocks(&mask("11"), 3), mask("00"));
        assert_eq!(remove_short_blocks(&mask("1111"), 1), mask("1111"));
    }

    #[test]
    fn test_restore_interior() {
        let gaps = [3, 1, 0, 2, 5, 0, 1];
        assert_eq!(restore_interior(&mask("0000000"), &gaps), mask("0011110"));
        assert_eq!(restore_interior(&mask("1000001"), &[1, 1, 1, 1, 1, 1, 1]), mask("1000001"));
    }

    #[test]
    fn test_kept_runs() {
        assert_eq!(kept_runs(&mask("0110111")), vec![(1, 3), (4, 7)]);
        assert!(kept_runs(&mask("000")).is_empty());
    }
}
