use rayon::prelude::*;

use crate::core::alignment::Alignment;
use crate::core::types::{count_to_f64, ResidueType};

/// Tolerance used when comparing identities against thresholds
const EPSILON: f64 = 1e-9;

/// Symmetric pairwise identity and overlap between sequences.
///
/// Both measures are normalized by the shorter effective length of the pair,
/// where effective length counts residues that are neither gaps nor
/// indeterminate. Self entries are 1.0 and never take part in pairwise
/// operations.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencesMatrix {
    size: usize,
    identity: Vec<f64>,
    overlap: Vec<f64>,
}

impl SequencesMatrix {
    #[must_use]
    pub fn compute(alignment: &Alignment) -> Self {
        let residue_type = alignment.residue_type();
        let rows = alignment.rows();
        let size = rows.len();

        let lengths: Vec<usize> = rows
            .iter()
            .map(|row| {
                row.iter()
                    .filter(|&&s| !residue_type.is_uninformative(s))
                    .count()
            })
            .collect();

        let upper: Vec<Vec<(f64, f64)>> = (0..size)
            .into_par_iter()
            .map(|i| {
                ((i + 1)..size)
                    .map(|j| pair_scores(rows[i], rows[j], lengths[i].min(lengths[j]), residue_type))
                    .collect()
            })
            .collect();

        let mut identity = vec![1.0; size * size];
        let mut overlap = vec![1.0; size * size];
        for (i, row) in upper.into_iter().enumerate() {
            for (offset, (id, ov)) in row.into_iter().enumerate() {
                let j = i + 1 + offset;
                identity[i * size + j] = id;
                identity[j * size + i] = id;
                overlap[i * size + j] = ov;
                overlap[j * size + i] = ov;
            }
        }

        Self {
            size,
            identity,
            overlap,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[must_use]
    pub fn identity(&self, i: usize, j: usize) -> f64 {
        self.identity[i * self.size + j]
    }

    #[must_use]
    pub fn overlap(&self, i: usize, j: usize) -> f64 {
        self.overlap[i * self.size + j]
    }

    /// Mean identity of `i` against every other sequence
    #[must_use]
    pub fn average_identity(&self, i: usize) -> f64 {
        if self.size < 2 {
            return 0.0;
        }
        let sum: f64 = (0..self.size)
            .filter(|&j| j != i)
            .map(|j| self.identity(i, j))
            .sum();
        sum / count_to_f64(self.size - 1)
    }

    /// Highest identity of `i` against any other sequence
    #[must_use]
    pub fn max_identity(&self, i: usize) -> f64 {
        (0..self.size)
            .filter(|&j| j != i)
            .map(|j| self.identity(i, j))
            .fold(0.0, f64::max)
    }

    /// Mean identity over all distinct pairs
    #[must_use]
    pub fn mean_identity(&self) -> f64 {
        if self.size < 2 {
            return 0.0;
        }
        let sum: f64 = (0..self.size).map(|i| self.average_identity(i)).sum();
        sum / count_to_f64(self.size)
    }

    /// Mean over sequences of their highest identity
    #[must_use]
    pub fn mean_max_identity(&self) -> f64 {
        if self.size < 2 {
            return 0.0;
        }
        let sum: f64 = (0..self.size).map(|i| self.max_identity(i)).sum();
        sum / count_to_f64(self.size)
    }

    /// Pairs `(i, j, identity)` with `i < j` whose identity exceeds `threshold`
    #[must_use]
    pub fn pairs_above(&self, threshold: f64) -> Vec<(usize, usize, f64)> {
        let mut pairs = Vec::new();
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                let id = self.identity(i, j);
                if id > threshold + EPSILON {
                    pairs.push((i, j, id));
                }
            }
        }
        pairs
    }

    /// Drop one member of every pair exceeding `threshold`.
    ///
    /// Pairs are visited from most to least identical (ties in index order)
    /// and skipped once either member is gone. The member with more gaps is
    /// dropped; on equal gaps the lower index goes. Returns, per sequence,
    /// the partner and identity that caused its removal.
    #[must_use]
    pub fn max_identity_filter(
        &self,
        gap_counts: &[usize],
        threshold: f64,
    ) -> Vec<Option<(usize, f64)>> {
        let mut pairs = self.pairs_above(threshold);
        pairs.sort_by(|a, b| b.2.total_cmp(&a.2).then((a.0, a.1).cmp(&(b.0, b.1))));

        let mut removed: Vec<Option<(usize, f64)>> = vec![None; self.size];
        for (i, j, id) in pairs {
            if removed[i].is_some() || removed[j].is_some() {
                continue;
            }
            let (drop, keep) = if gap_counts[j] > gap_counts[i] {
                (j, i)
            } else {
                (i, j)
            };
            removed[drop] = Some((keep, id));
        }
        removed
    }

    /// Single-linkage clusters over pairs with identity at least `threshold`.
    ///
    /// Members are ascending; clusters are ordered by their first member.
    #[must_use]
    pub fn clusters(&self, threshold: f64) -> Vec<Vec<usize>> {
        let mut parent: Vec<usize> = (0..self.size).collect();

        for i in 0..self.size {
            for j in (i + 1)..self.size {
                if self.identity(i, j) + EPSILON >= threshold {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                    if a != b {
                        parent[a.max(b)] = a.min(b);
                    }
                }
            }
        }

        let mut clusters: Vec<Vec<usize>> = Vec::new();
        let mut slot = vec![usize::MAX; self.size];
        for i in 0..self.size {
            let root = find(&mut parent, i);
            if slot[root] == usize::MAX {
                slot[root] = clusters.len();
                clusters.push(Vec::new());
            }
            clusters[slot[root]].push(i);
        }
        clusters
    }

    /// Member with the highest mean identity to the rest of its cluster.
    ///
    /// Ties go to the lower index. Panics on an empty cluster.
    #[must_use]
    pub fn representative(&self, cluster: &[usize]) -> usize {
        let mut best = cluster[0];
        let mut best_score = f64::NEG_INFINITY;
        for &i in cluster {
            let others = cluster.iter().filter(|&&j| j != i);
            let count = others.clone().count();
            let score = if count == 0 {
                0.0
            } else {
                others.map(|&j| self.identity(i, j)).sum::<f64>() / count_to_f64(count)
            };
            if score > best_score + EPSILON {
                best = i;
                best_score = score;
            }
        }
        best
    }

    /// Smallest identity threshold yielding at least `count` clusters.
    ///
    /// The cluster count only changes at observed pairwise identities, so the
    /// search runs over those values. When ties make `count` unreachable the
    /// next larger clustering is chosen.
    #[must_use]
    pub fn threshold_for_clusters(&self, count: usize) -> f64 {
        if count <= 1 || self.size < 2 {
            return 0.0;
        }

        let mut candidates: Vec<f64> = Vec::with_capacity(self.size * (self.size - 1) / 2 + 1);
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                candidates.push(self.identity(i, j));
            }
        }
        candidates.sort_by(f64::total_cmp);
        candidates.dedup_by(|a, b| (*a - *b).abs() < EPSILON);
        // Above every identity, nothing links
        candidates.push(1.0 + 2.0 * EPSILON.sqrt());

        let (mut lo, mut hi) = (0usize, candidates.len() - 1);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.clusters(candidates[mid]).len() >= count {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        candidates[lo]
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn pair_scores(a: &[u8], b: &[u8], shorter: usize, residue_type: ResidueType) -> (f64, f64) {
    if shorter == 0 {
        return (0.0, 0.0);
    }
    let mut shared = 0usize;
    let mut identical = 0usize;
    for (&x, &y) in a.iter().zip(b) {
        if residue_type.is_uninformative(x) || residue_type.is_uninformative(y) {
            continue;
        }
        shared += 1;
        if x == y {
            identical += 1;
        }
    }
    let denominator = count_to_f64(shorter);
    (
        count_to_f64(identical) / denominator,
        count_to_f64(shared) / denominator,
    )
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
    fn test_identity_and_overlap() {
        let aln = alignment(&["MKVLAG", "MKILA-", "--VL--"]);
        let m = SequencesMatrix::compute(&aln);

        assert_eq!(m.len(), 3);
        assert!((m.identity(0, 0) - 1.0).abs() < f64::EPSILON);
        // 4 identical of 5 shared, shorter length 5
        assert!((m.identity(0, 1) - 0.8).abs() < 0.001);
        assert!((m.identity(1, 0) - 0.8).abs() < 0.001);
        assert!((m.overlap(0, 1) - 1.0).abs() < 0.001);
        // shorter length 2, both columns identical
        assert!((m.identity(0, 2) - 1.0).abs() < 0.001);
        // V vs I, L vs L
        assert!((m.identity(1, 2) - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_empty_effective_length() {
        let aln = alignment(&["XX--", "MKVL"]);
        let m = SequencesMatrix::compute(&aln);
        assert!(m.identity(0, 1).abs() < f64::EPSILON);
        assert!(m.overlap(0, 1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_max_identity_drops_gappier_sequence() {
        // 19 of 20 identical
        let aln = alignment(&["MKVLAGIVGSTRLEHWQNPD", "MKVLAGIVGSTRLEHWQNP-"]);
        let m = SequencesMatrix::compute(&aln);
        assert!((m.identity(0, 1) - 1.0).abs() < 0.001);

        let removed = m.max_identity_filter(&[0, 1], 0.9);
        assert_eq!(removed[0], None);
        assert_eq!(removed[1].map(|(p, _)| p), Some(0));
    }

    #[test]
    fn test_max_identity_tie_drops_lower_index() {
        let aln = alignment(&["MKVLAGIVGSTRLEHWQNPD", "MKVLAGIVGSTRLEHWQNPE"]);
        let m = SequencesMatrix::compute(&aln);
        assert!((m.identity(0, 1) - 0.95).abs() < 0.001);
        assert_eq!(m.pairs_above(0.9).len(), 1);

        let removed = m.max_identity_filter(&[0, 0], 0.9);
        assert!(removed[0].is_some());
        assert!(removed[1].is_none());
    }

    #[test]
    fn test_max_identity_skips_resolved_pairs() {
        let aln = alignment(&["MKVLAG", "MKVLAG", "MKVLAG"]);
        let m = SequencesMatrix::compute(&aln);
        let removed = m.max_identity_filter(&[0, 0, 0], 0.9);
        // (0,1) drops 0, (0,2) skipped, (1,2) drops 1
        assert_eq!(removed.iter().filter(|r| r.is_some()).count(), 2);
        assert!(removed[2].is_none());
    }

    #[test]
    fn test_clusters_and_representative() {
        let aln = alignment(&["MKVLAG", "MKVLAA", "WWPPDE", "WWPPDD", "MKVLGG"]);
        let m = SequencesMatrix::compute(&aln);
        let clusters = m.clusters(0.8);

        assert_eq!(clusters, vec![vec![0, 1, 4], vec![2, 3]]);
        // 0 is closest to both 1 and 4
        assert_eq!(m.representative(&clusters[0]), 0);
        assert_eq!(m.representative(&clusters[1]), 2);
    }

    #[test]
    fn test_threshold_for_clusters() {
        let aln = alignment(&["MKVLAG", "MKVLAA", "WWPPDE", "WWPPDD", "MKVLGG"]);
        let m = SequencesMatrix::compute(&aln);

        assert!(m.threshold_for_clusters(1).abs() < f64::EPSILON);
        assert_eq!(m.clusters(m.threshold_for_clusters(2)).len(), 2);
        assert_eq!(m.clusters(m.threshold_for_clusters(5)).len(), 5);
        assert_eq!(m.clusters(m.threshold_for_clusters(9)).len(), 5);
    }

    #[test]
    fn test_summary_identities() {
        let aln = alignment(&["MKVL", "MKVL", "WWPP"]);
        let m = SequencesMatrix::compute(&aln);
        assert!((m.max_identity(0) - 1.0).abs() < 0.001);
        assert!((m.average_identity(0) - 0.5).abs() < 0.001);
        assert!((m.mean_identity() - 1.0 / 3.0).abs() < 0.001);
        assert!((m.mean_max_identity() - 2.0 / 3.0).abs() < 0.001);
    }
}
