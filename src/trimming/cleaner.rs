use crate::core::alignment::Alignment;
use crate::core::error::{EmptyAxis, TrimError};
use crate::core::report::{ColumnDecision, RemovalReason, SequenceDecision, TrimmingReport};
use crate::core::types::{count_to_f64, GAP};
use crate::statistics::conservation::ConservationStatistics;
use crate::statistics::gaps::GapStatistics;
use crate::statistics::identity::SequencesMatrix;
use crate::statistics::similarity_matrix::SimilarityMatrix;
use crate::statistics::smooth;
use crate::trimming::heuristics::{self, ColumnProfile, IdentitySummary};
use crate::trimming::mask::{self, EPSILON};
use crate::trimming::strategy::{ColumnSelection, Heuristic, SequenceFilter, Strategy};

/// Trimmed alignment plus the trace of how it was obtained
#[derive(Debug, Clone)]
pub struct TrimOutcome {
    pub alignment: Alignment,
    pub report: TrimmingReport,
}

/// Column statistics over the active sequences, in the form thresholds use
#[derive(Debug, Clone)]
struct ColumnStats {
    num_sequences: usize,
    /// Raw gap counts; terminal-only boundaries come from these
    gap_counts: Vec<usize>,
    /// Gap counts the heuristics see (internal only when ignoring terminal gaps)
    scored_gap_counts: Vec<usize>,
    gap_fractions: Vec<f64>,
    defined: Vec<bool>,
    conservation: Vec<f64>,
}

/// Column decisions and the cutoffs behind them
#[derive(Debug, Clone)]
struct ColumnChoice {
    mask: Vec<bool>,
    heuristic: Option<Heuristic>,
    gap_cutoff: Option<f64>,
    conservation_cutoff: Option<f64>,
    consistency_cutoff: Option<f64>,
    block_size: Option<usize>,
}

/// The trimming engine.
///
/// Borrows an immutable alignment and applies one [`Strategy`] to it,
/// returning a new alignment and a [`TrimmingReport`].
pub struct Cleaner<'a> {
    alignment: &'a Alignment,
    strategy: Strategy,
    matrix: SimilarityMatrix,
    column_consistency: Option<Vec<f64>>,
}

impl<'a> Cleaner<'a> {
    /// Create a cleaner using the default matrix for the alignment's alphabet
    #[must_use]
    pub fn new(alignment: &'a Alignment, strategy: Strategy) -> Self {
        let matrix = SimilarityMatrix::for_residue_type(alignment.residue_type());
        Self::with_matrix(alignment, strategy, matrix)
    }

    /// Create a cleaner with a custom similarity matrix
    #[must_use]
    pub fn with_matrix(alignment: &'a Alignment, strategy: Strategy, matrix: SimilarityMatrix) -> Self {
        Self {
            alignment,
            strategy,
            matrix,
            column_consistency: None,
        }
    }

    /// Supply per-column consistency scores for the consistency threshold,
    /// as produced by [`compare_alignments`](crate::consistency::compare_alignments).
    #[must_use]
    pub fn with_column_consistency(mut self, scores: Vec<f64>) -> Self {
        self.column_consistency = Some(scores);
        self
    }

    #[must_use]
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Run the full pipeline.
    ///
    /// Order: sequence filter, overlap fixed point, column thresholds,
    /// neighbour rescue, block merge, terminal-only restore, conserve floor,
    /// all-gap sequence removal, complementary projection.
    ///
    /// # Errors
    ///
    /// - `TrimError::Config` for an invalid strategy or smoothing window, or a
    ///   consistency threshold without matching consistency scores
    /// - `TrimError::NonConvergence` when overlap filtering hits its pass cap
    /// - `TrimError::EmptyResult` when nothing survives and empty output is not allowed
    pub fn run(&self) -> Result<TrimOutcome, TrimError> {
        self.strategy.validate()?;
        let num_sequences = self.alignment.num_sequences();
        let num_columns = self.alignment.num_columns();
        self.strategy.validate_for(num_sequences, num_columns)?;
        if self.strategy.consistency_threshold.is_some() {
            match &self.column_consistency {
                Some(scores) if scores.len() == num_columns => {}
                Some(scores) => {
                    return Err(TrimError::Config(format!(
                        "{} consistency scores for {num_columns} columns",
                        scores.len()
                    )));
                }
                None => {
                    return Err(TrimError::Config(
                        "a consistency threshold needs column consistency scores".to_string(),
                    ));
                }
            }
        }

        let mut rows = vec![true; num_sequences];
        let mut reasons: Vec<Option<RemovalReason>> = vec![None; num_sequences];

        self.filter_sequences(&mut rows, &mut reasons);
        let overlap_passes = self.filter_overlap(&mut rows, &mut reasons)?;

        if !rows.iter().any(|&r| r) {
            return self.empty_or_error(EmptyAxis::Sequence, &rows, &reasons, overlap_passes);
        }

        let stats = self.column_stats(&rows)?;
        let choice = self.apply_floor(self.choose_columns(&stats, &rows), &stats);

        if !choice.mask.iter().any(|&k| k) && !self.strategy.allow_empty {
            return Err(TrimError::EmptyResult(EmptyAxis::Column));
        }

        let output: Vec<bool> = choice
            .mask
            .iter()
            .map(|&kept| kept != self.strategy.complementary)
            .collect();

        if !self.strategy.keep_sequences && output.iter().any(|&o| o) {
            self.drop_all_gap_sequences(&output, &mut rows, &mut reasons);
            if !rows.iter().any(|&r| r) && !self.strategy.allow_empty {
                return Err(TrimError::EmptyResult(EmptyAxis::Sequence));
            }
        }

        let report = self.build_report(&stats, &choice, &rows, reasons, overlap_passes);
        Ok(TrimOutcome {
            alignment: self.alignment.select(&rows, &output),
            report,
        })
    }

    fn empty_or_error(
        &self,
        axis: EmptyAxis,
        rows: &[bool],
        reasons: &[Option<RemovalReason>],
        overlap_passes: usize,
    ) -> Result<TrimOutcome, TrimError> {
        if !self.strategy.allow_empty {
            return Err(TrimError::EmptyResult(axis));
        }
        let columns = vec![false; self.alignment.num_columns()];
        let choice = ColumnChoice {
            mask: columns.clone(),
            heuristic: None,
            gap_cutoff: None,
            conservation_cutoff: None,
            consistency_cutoff: None,
            block_size: None,
        };
        let stats = ColumnStats {
            num_sequences: 0,
            gap_counts: vec![0; columns.len()],
            scored_gap_counts: vec![0; columns.len()],
            gap_fractions: vec![1.0; columns.len()],
            defined: vec![false; columns.len()],
            conservation: vec![0.0; columns.len()],
        };
        let report = self.build_report(&stats, &choice, rows, reasons.to_vec(), overlap_passes);
        Ok(TrimOutcome {
            alignment: self.alignment.select(rows, &columns),
            report,
        })
    }

    /// Explicit, max-identity or clustering filter over the full alignment.
    fn filter_sequences(&self, rows: &mut [bool], reasons: &mut [Option<RemovalReason>]) {
        let Some(filter) = &self.strategy.sequence_filter else {
            return;
        };
        if let SequenceFilter::Explicit(remove) = filter {
            for &i in remove {
                rows[i] = false;
                reasons[i] = Some(RemovalReason::Selected);
            }
            return;
        }
        let identities = SequencesMatrix::compute(self.alignment);

        match *filter {
            SequenceFilter::Explicit(_) => {}
            SequenceFilter::MaxIdentity(threshold) => {
                let gap_counts: Vec<usize> = self
                    .alignment
                    .sequences()
                    .iter()
                    .map(|s| s.gap_count())
                    .collect();
                let removed = identities.max_identity_filter(&gap_counts, threshold);
                for (i, removal) in removed.into_iter().enumerate() {
                    if let Some((partner, identity)) = removal {
                        rows[i] = false;
                        reasons[i] = Some(RemovalReason::MaxIdentity { partner, identity });
                    }
                }
            }
            SequenceFilter::ClusterIdentity(threshold) => {
                keep_representatives(&identities, threshold, rows, reasons);
            }
            SequenceFilter::ClusterCount(count) => {
                let threshold = identities.threshold_for_clusters(count);
                keep_representatives(&identities, threshold, rows, reasons);
            }
        }
    }

    /// Drop sequences covering too few good columns until a pass removes
    /// nothing. Returns the number of passes run.
    fn filter_overlap(
        &self,
        rows: &mut [bool],
        reasons: &mut [Option<RemovalReason>],
    ) -> Result<usize, TrimError> {
        let Some(threshold) = self.strategy.overlap_threshold else {
            return Ok(0);
        };

        for pass in 1..=self.strategy.max_overlap_passes {
            if !rows.iter().any(|&r| r) {
                return Ok(pass - 1);
            }

            let stats = self.column_stats(rows)?;
            let good: Vec<usize> = self
                .choose_columns(&stats, rows)
                .mask
                .iter()
                .enumerate()
                .filter(|(_, &k)| k)
                .map(|(i, _)| i)
                .collect();
            if good.is_empty() {
                return Ok(pass);
            }

            let mut removed_any = false;
            for (i, seq) in self.alignment.sequences().iter().enumerate() {
                if !rows[i] {
                    continue;
                }
                let covered = good.iter().filter(|&&c| seq.residues[c] != GAP).count();
                let overlap = count_to_f64(covered) / count_to_f64(good.len());
                if overlap + EPSILON < threshold {
                    rows[i] = false;
                    reasons[i] = Some(RemovalReason::LowOverlap { overlap });
                    removed_any = true;
                }
            }

            if !removed_any {
                return Ok(pass);
            }
        }

        Err(TrimError::NonConvergence {
            passes: self.strategy.max_overlap_passes,
        })
    }

    fn column_stats(&self, rows: &[bool]) -> Result<ColumnStats, TrimError> {
        let gaps = GapStatistics::compute_rows(self.alignment, rows);
        let conservation =
            ConservationStatistics::compute_rows(self.alignment, rows, &self.matrix, self.strategy.measure);

        let ignore_terminal = self.strategy.ignore_terminal_gaps;
        let mut gap_fractions = gaps.fractions(ignore_terminal);
        let mut scores = conservation.scores();
        if self.strategy.half_window > 0 {
            gap_fractions = smooth(&gap_fractions, self.strategy.half_window)?;
            scores = smooth(&scores, self.strategy.half_window)?;
        }

        Ok(ColumnStats {
            num_sequences: gaps.num_sequences(),
            gap_counts: gaps.gap_counts().to_vec(),
            scored_gap_counts: gaps.counts(ignore_terminal),
            gap_fractions,
            defined: conservation.values().iter().map(Option::is_some).collect(),
            conservation: scores,
        })
    }

    fn identity_summary(&self, rows: &[bool]) -> IdentitySummary {
        let all_columns = vec![true; self.alignment.num_columns()];
        let active = self.alignment.select(rows, &all_columns);
        IdentitySummary::from_matrix(&SequencesMatrix::compute(&active))
    }

    /// Cutoffs from the selection mode, then the mask pipeline.
    fn choose_columns(&self, stats: &ColumnStats, rows: &[bool]) -> ColumnChoice {
        let (heuristic, gap_cutoff, conservation_cutoff) = match self.strategy.selection {
            ColumnSelection::Manual {
                gap_threshold,
                conservation_threshold,
            } => (None, gap_threshold, conservation_threshold),
            ColumnSelection::Explicit { .. } => (None, None, None),
            ColumnSelection::Automated { heuristic } => {
                let profile = ColumnProfile {
                    gap_counts: &stats.scored_gap_counts,
                    num_sequences: stats.num_sequences,
                    conservation: &stats.conservation,
                };
                let policy = heuristics::policy(heuristic, &profile, || self.identity_summary(rows));
                (
                    Some(policy.heuristic),
                    policy.gap_cutoff,
                    policy.conservation_cutoff,
                )
            }
        };

        let mut choice = ColumnChoice {
            mask: Vec::new(),
            heuristic,
            gap_cutoff,
            conservation_cutoff,
            consistency_cutoff: self.strategy.consistency_threshold,
            block_size: self
                .strategy
                .effective_block_size(heuristic, self.alignment.num_columns()),
        };
        choice.mask = self.column_mask(stats, &choice);
        choice
    }

    /// Base mask from the selection, then rescue, block merge and terminal restore.
    fn column_mask(&self, stats: &ColumnStats, choice: &ColumnChoice) -> Vec<bool> {
        let mut mask = match &self.strategy.selection {
            ColumnSelection::Explicit { remove } => {
                let mut mask = vec![true; self.alignment.num_columns()];
                for &column in remove {
                    mask[column] = false;
                }
                mask
            }
            _ => mask::threshold_mask(
                &stats.gap_fractions,
                choice.gap_cutoff,
                &stats.conservation,
                choice.conservation_cutoff,
            ),
        };
        if let (Some(cut), Some(scores)) = (choice.consistency_cutoff, &self.column_consistency) {
            for (keep, &score) in mask.iter_mut().zip(scores) {
                *keep &= score + EPSILON >= cut;
            }
        }
        if choice.heuristic.is_some_and(Heuristic::rescues_neighbours) {
            mask = mask::rescue_neighbours(&mask);
        }
        if let Some(block) = choice.block_size {
            mask = mask::remove_short_blocks(&mask, block);
        }
        if self.strategy.terminal_only {
            mask = mask::restore_interior(&mask, &stats.gap_counts);
        }
        mask
    }

    /// Relax cutoffs until the conserve floor is met.
    ///
    /// Each step loosens the axis rejecting the most columns (gap, then
    /// conservation, then consistency on ties) to the next value that lets at
    /// least one more column through. Once no axis rejects anything, a block
    /// size still holding the count under the floor is dropped.
    fn apply_floor(&self, mut choice: ColumnChoice, stats: &ColumnStats) -> ColumnChoice {
        let Some(percentage) = self.strategy.conserve_percentage else {
            return choice;
        };
        let target = floor_target(percentage, self.alignment.num_columns());

        while choice.mask.iter().filter(|&&k| k).count() < target {
            let gap_rejects = rejected_above(&stats.gap_fractions, choice.gap_cutoff);
            let cons_rejects = rejected_below(&stats.conservation, choice.conservation_cutoff);
            let consistency_rejects = match &self.column_consistency {
                Some(scores) => rejected_below(scores, choice.consistency_cutoff),
                None => Vec::new(),
            };

            let most = gap_rejects
                .len()
                .max(cons_rejects.len())
                .max(consistency_rejects.len());
            if most == 0 {
                if choice.block_size.take().is_none() {
                    break;
                }
            } else if gap_rejects.len() == most {
                choice.gap_cutoff = gap_rejects.into_iter().reduce(f64::min);
            } else if cons_rejects.len() == most {
                choice.conservation_cutoff = cons_rejects.into_iter().reduce(f64::max);
            } else {
                choice.consistency_cutoff = consistency_rejects.into_iter().reduce(f64::max);
            }

            choice.mask = self.column_mask(stats, &choice);
        }
        choice
    }

    fn drop_all_gap_sequences(
        &self,
        output: &[bool],
        rows: &mut [bool],
        reasons: &mut [Option<RemovalReason>],
    ) {
        for (i, seq) in self.alignment.sequences().iter().enumerate() {
            if !rows[i] {
                continue;
            }
            let has_residue = seq
                .residues
                .iter()
                .zip(output)
                .any(|(&s, &keep)| keep && s != GAP);
            if !has_residue {
                rows[i] = false;
                reasons[i] = Some(RemovalReason::AllGaps);
            }
        }
    }

    fn build_report(
        &self,
        stats: &ColumnStats,
        choice: &ColumnChoice,
        rows: &[bool],
        reasons: Vec<Option<RemovalReason>>,
        overlap_passes: usize,
    ) -> TrimmingReport {
        let columns = (0..self.alignment.num_columns())
            .map(|index| ColumnDecision {
                index,
                gap_fraction: stats.gap_fractions[index],
                conservation: stats.defined[index].then_some(stats.conservation[index]),
                consistency: self.column_consistency.as_ref().map(|scores| scores[index]),
                kept: choice.mask[index],
            })
            .collect();

        let sequences = self
            .alignment
            .sequences()
            .iter()
            .zip(reasons)
            .enumerate()
            .map(|(index, (seq, reason))| SequenceDecision {
                index,
                name: seq.name.clone(),
                kept: rows[index],
                reason,
            })
            .collect();

        TrimmingReport {
            columns,
            sequences,
            heuristic: choice.heuristic,
            gap_cutoff: choice.gap_cutoff,
            conservation_cutoff: choice.conservation_cutoff,
            consistency_cutoff: choice.consistency_cutoff,
            overlap_passes,
            complementary: self.strategy.complementary,
        }
    }
}

/// Columns that must survive: `ceil(percentage / 100 * columns)`
#[must_use]
pub fn floor_target(percentage: f64, num_columns: usize) -> usize {
    let target = (percentage / 100.0 * count_to_f64(num_columns) - EPSILON).ceil();
    // Bounded by the column count
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let target = target.max(0.0) as usize;
    target.min(num_columns)
}

/// Values a `value <= cutoff` test rejects
fn rejected_above(values: &[f64], cutoff: Option<f64>) -> Vec<f64> {
    cutoff.map_or_else(Vec::new, |cut| {
        values.iter().copied().filter(|&v| v > cut + EPSILON).collect()
    })
}

/// Values a `value >= cutoff` test rejects
fn rejected_below(values: &[f64], cutoff: Option<f64>) -> Vec<f64> {
    cutoff.map_or_else(Vec::new, |cut| {
        values.iter().copied().filter(|&v| v + EPSILON < cut).collect()
    })
}

fn keep_representatives(
    identities: &SequencesMatrix,
    threshold: f64,
    rows: &mut [bool],
    reasons: &mut [Option<RemovalReason>],
) {
    for cluster in identities.clusters(threshold) {
        let representative = identities.representative(&cluster);
        for member in cluster {
            if member != representative {
                rows[member] = false;
                reasons[member] = Some(RemovalReason::Clustered { representative });
            }
        }
    }
}
