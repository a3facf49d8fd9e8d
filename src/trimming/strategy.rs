use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::TrimError;
use crate::core::types::count_to_f64;
use crate::statistics::conservation::ConservationMeasure;

/// Default cap on overlap filtering passes
pub const DEFAULT_MAX_OVERLAP_PASSES: usize = 25;

/// Block size applied by the strict heuristic
pub const STRICT_BLOCK_SIZE: usize = 5;

/// Bounds of the strictplus block size, which scales with the column count
pub const STRICTPLUS_MIN_BLOCK: usize = 3;
pub const STRICTPLUS_MAX_BLOCK: usize = 12;

/// Named automated column-selection heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Heuristic {
    /// Remove every column holding a gap
    NoGaps,
    /// Remove only columns made entirely of gaps
    NoAllGaps,
    /// Gap cutoff at the steepest change of the gap distribution
    GappyOut,
    /// Gappyout cutoff plus a conservation cutoff, neighbour rescue and blocks of 5
    Strict,
    /// Strict with a block size scaled to the alignment length
    StrictPlus,
    /// Choose between gappyout and strict from sequence identity statistics
    Automated1,
}

impl Heuristic {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::NoGaps => "nogaps",
            Self::NoAllGaps => "noallgaps",
            Self::GappyOut => "gappyout",
            Self::Strict => "strict",
            Self::StrictPlus => "strictplus",
            Self::Automated1 => "automated1",
        }
    }

    /// Whether rejected columns surrounded by kept ones are restored
    #[must_use]
    pub fn rescues_neighbours(self) -> bool {
        matches!(self, Self::Strict | Self::StrictPlus)
    }

    /// Minimum kept block the heuristic enforces on its own
    #[must_use]
    pub fn default_block_size(self, num_columns: usize) -> Option<usize> {
        match self {
            Self::Strict => Some(STRICT_BLOCK_SIZE),
            Self::StrictPlus => {
                let scaled = (count_to_f64(num_columns) / 100.0).round();
                // Clamped to a small positive range before conversion
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let scaled = scaled
                    .clamp(STRICTPLUS_MIN_BLOCK as f64, STRICTPLUS_MAX_BLOCK as f64)
                    as usize;
                Some(scaled)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Heuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Top-level column selection mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ColumnSelection {
    /// Explicit thresholds; an absent axis accepts every column
    Manual {
        gap_threshold: Option<f64>,
        conservation_threshold: Option<f64>,
    },
    /// Thresholds derived by a named heuristic
    Automated { heuristic: Heuristic },
    /// Remove exactly these 0-based columns
    Explicit { remove: Vec<usize> },
}

impl Default for ColumnSelection {
    fn default() -> Self {
        Self::Manual {
            gap_threshold: None,
            conservation_threshold: None,
        }
    }
}

/// Sequence-level filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceFilter {
    /// Drop one sequence of every pair whose identity exceeds the value
    MaxIdentity(f64),
    /// Keep one representative per single-linkage cluster at this identity
    ClusterIdentity(f64),
    /// Keep one representative for each of this many clusters
    ClusterCount(usize),
    /// Remove exactly these 0-based sequences
    Explicit(Vec<usize>),
}

/// Immutable configuration for one trimming run.
///
/// ```
/// use msa_trim::trimming::strategy::{Heuristic, Strategy};
///
/// let strategy = Strategy::automated(Heuristic::GappyOut)
///     .with_block_size(3)
///     .with_conserve_percentage(60.0);
/// assert!(strategy.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Strategy {
    pub selection: ColumnSelection,
    pub measure: ConservationMeasure,
    pub sequence_filter: Option<SequenceFilter>,
    /// Minimum cross-alignment consistency of a kept column (manual thresholds only)
    pub consistency_threshold: Option<f64>,

    /// Minimum fraction of good columns a sequence must cover
    pub overlap_threshold: Option<f64>,
    pub max_overlap_passes: usize,

    /// Only trim gap-dominated runs at the alignment ends
    pub terminal_only: bool,
    /// Count only internal gaps when scoring columns
    pub ignore_terminal_gaps: bool,
    /// Minimum length of a kept column run
    pub block_size: Option<usize>,
    /// Percentage of original columns that must survive
    pub conserve_percentage: Option<f64>,
    /// Output the rejected columns instead of the kept ones
    pub complementary: bool,
    /// Keep sequences left with only gaps
    pub keep_sequences: bool,
    /// Return an empty alignment instead of failing
    pub allow_empty: bool,
    /// Half width of the smoothing window over column statistics, 0 disables
    pub half_window: usize,
}

impl Default for Strategy {
    fn default() -> Self {
        Self {
            selection: ColumnSelection::default(),
            measure: ConservationMeasure::default(),
            sequence_filter: None,
            consistency_threshold: None,
            overlap_threshold: None,
            max_overlap_passes: DEFAULT_MAX_OVERLAP_PASSES,
            terminal_only: false,
            ignore_terminal_gaps: false,
            block_size: None,
            conserve_percentage: None,
            complementary: false,
            keep_sequences: false,
            allow_empty: false,
            half_window: 0,
        }
    }
}

impl Strategy {
    #[must_use]
    pub fn manual(gap_threshold: Option<f64>, conservation_threshold: Option<f64>) -> Self {
        Self {
            selection: ColumnSelection::Manual {
                gap_threshold,
                conservation_threshold,
            },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn automated(heuristic: Heuristic) -> Self {
        Self {
            selection: ColumnSelection::Automated { heuristic },
            ..Self::default()
        }
    }

    /// Load a strategy from a JSON file; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `TrimError::Config` if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self, TrimError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| TrimError::Config(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| TrimError::Config(format!("{}: {e}", path.display())))
    }

    #[must_use]
    pub fn with_measure(mut self, measure: ConservationMeasure) -> Self {
        self.measure = measure;
        self
    }

    /// Remove exactly the listed 0-based columns
    #[must_use]
    pub fn explicit(remove: Vec<usize>) -> Self {
        Self {
            selection: ColumnSelection::Explicit { remove },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_consistency_threshold(mut self, threshold: f64) -> Self {
        self.consistency_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn with_sequence_filter(mut self, filter: SequenceFilter) -> Self {
        self.sequence_filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_overlap(mut self, threshold: f64) -> Self {
        self.overlap_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn with_max_overlap_passes(mut self, passes: usize) -> Self {
        self.max_overlap_passes = passes;
        self
    }

    #[must_use]
    pub fn with_terminal_only(mut self) -> Self {
        self.terminal_only = true;
        self
    }

    #[must_use]
    pub fn with_ignore_terminal_gaps(mut self) -> Self {
        self.ignore_terminal_gaps = true;
        self
    }

    #[must_use]
    pub fn with_block_size(mut self, size: usize) -> Self {
        self.block_size = Some(size);
        self
    }

    #[must_use]
    pub fn with_conserve_percentage(mut self, percentage: f64) -> Self {
        self.conserve_percentage = Some(percentage);
        self
    }

    #[must_use]
    pub fn with_complementary(mut self) -> Self {
        self.complementary = true;
        self
    }

    #[must_use]
    pub fn with_keep_sequences(mut self) -> Self {
        self.keep_sequences = true;
        self
    }

    #[must_use]
    pub fn with_allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    #[must_use]
    pub fn with_half_window(mut self, half_window: usize) -> Self {
        self.half_window = half_window;
        self
    }

    /// Heuristic selected, if any
    #[must_use]
    pub fn heuristic(&self) -> Option<Heuristic> {
        match self.selection {
            ColumnSelection::Automated { heuristic } => Some(heuristic),
            ColumnSelection::Manual { .. } | ColumnSelection::Explicit { .. } => None,
        }
    }

    /// Block size in force: an explicit size wins over the heuristic default.
    #[must_use]
    pub fn effective_block_size(&self, resolved: Option<Heuristic>, num_columns: usize) -> Option<usize> {
        self.block_size
            .or_else(|| resolved.and_then(|h| h.default_block_size(num_columns)))
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `TrimError::Config` naming the first out-of-range setting.
    pub fn validate(&self) -> Result<(), TrimError> {
        let manual = match self.selection {
            ColumnSelection::Manual {
                gap_threshold,
                conservation_threshold,
            } => {
                check_fraction("gap threshold", gap_threshold)?;
                check_fraction("conservation threshold", conservation_threshold)?;
                true
            }
            ColumnSelection::Explicit { .. } => {
                if self.block_size.is_some() || self.conserve_percentage.is_some() {
                    return Err(TrimError::Config(
                        "explicit column removal cannot be combined with a block size or conserve floor"
                            .to_string(),
                    ));
                }
                false
            }
            ColumnSelection::Automated { .. } => false,
        };

        check_fraction("consistency threshold", self.consistency_threshold)?;
        if self.consistency_threshold.is_some() && !manual {
            return Err(TrimError::Config(
                "a consistency threshold only combines with manual thresholds".to_string(),
            ));
        }

        match self.sequence_filter {
            Some(SequenceFilter::MaxIdentity(t)) => check_fraction("max identity", Some(t))?,
            Some(SequenceFilter::ClusterIdentity(t)) => {
                check_fraction("cluster identity", Some(t))?;
            }
            Some(SequenceFilter::ClusterCount(0)) => {
                return Err(TrimError::Config("cluster count must be positive".to_string()));
            }
            _ => {}
        }

        check_fraction("overlap threshold", self.overlap_threshold)?;
        if self.max_overlap_passes == 0 {
            return Err(TrimError::Config(
                "overlap pass limit must be positive".to_string(),
            ));
        }
        if self.block_size == Some(0) {
            return Err(TrimError::Config("block size must be positive".to_string()));
        }
        if self.half_window > 0 && !manual {
            return Err(TrimError::Config(
                "window smoothing only applies to manual thresholds".to_string(),
            ));
        }
        if let Some(pct) = self.conserve_percentage {
            if !(0.0..=100.0).contains(&pct) {
                return Err(TrimError::Config(format!(
                    "conserve percentage {pct} is outside [0, 100]"
                )));
            }
        }
        Ok(())
    }

    /// Check settings that depend on the alignment's dimensions.
    ///
    /// # Errors
    ///
    /// Returns `TrimError::Config` for a block size longer than the alignment
    /// or a listed index past its end.
    pub fn validate_for(&self, num_sequences: usize, num_columns: usize) -> Result<(), TrimError> {
        if let Some(block) = self.block_size {
            if block > num_columns {
                return Err(TrimError::Config(format!(
                    "block size {block} is larger than the {num_columns} columns"
                )));
            }
        }
        if let ColumnSelection::Explicit { remove } = &self.selection {
            check_indices("column", remove, num_columns)?;
        }
        if let Some(SequenceFilter::Explicit(remove)) = &self.sequence_filter {
            check_indices("sequence", remove, num_sequences)?;
        }
        Ok(())
    }
}

fn check_indices(kind: &str, indices: &[usize], len: usize) -> Result<(), TrimError> {
    match indices.iter().find(|&&i| i >= len) {
        Some(index) => Err(TrimError::Config(format!(
            "{kind} index {index} is outside the alignment ({len} {kind}s)"
        ))),
        None => Ok(()),
    }
}

fn check_fraction(name: &str, value: Option<f64>) -> Result<(), TrimError> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(TrimError::Config(format!(
            "{name} {v} is outside [0, 1]"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strategy_is_valid() {
        let strategy = Strategy::default();
        assert!(strategy.validate().is_ok());
        assert_eq!(strategy.max_overlap_passes, DEFAULT_MAX_OVERLAP_PASSES);
        assert_eq!(strategy.heuristic(), None);
    }

    #[test]
    fn test_out_of_range_values() {
        let bad = [
            Strategy::manual(Some(1.5), None),
            Strategy::manual(None, Some(-0.1)),
            Strategy::default().with_overlap(2.0),
            Strategy::default().with_block_size(0),
            Strategy::default().with_conserve_percentage(101.0),
            Strategy::default().with_max_overlap_passes(0),
            Strategy::default().with_sequence_filter(SequenceFilter::ClusterCount(0)),
            Strategy::default().with_sequence_filter(SequenceFilter::MaxIdentity(1.2)),
            Strategy::automated(Heuristic::GappyOut).with_half_window(2),
            Strategy::explicit(vec![1]).with_half_window(1),
            Strategy::explicit(vec![1]).with_block_size(3),
            Strategy::explicit(vec![1]).with_conserve_percentage(50.0),
            Strategy::automated(Heuristic::Strict).with_consistency_threshold(0.5),
            Strategy::manual(Some(0.5), None).with_consistency_threshold(1.5),
        ];
        for strategy in bad {
            assert!(
                matches!(strategy.validate(), Err(TrimError::Config(_))),
                "{strategy:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validate_for_alignment_dimensions() {
        let strategy = Strategy::manual(Some(1.0), None).with_block_size(10);
        assert!(strategy.validate().is_ok());
        assert!(matches!(strategy.validate_for(2, 8), Err(TrimError::Config(_))));
        assert!(strategy.validate_for(2, 10).is_ok());

        let strategy = Strategy::explicit(vec![0, 7])
            .with_sequence_filter(SequenceFilter::Explicit(vec![2]));
        assert!(strategy.validate_for(3, 8).is_ok());
        assert!(matches!(strategy.validate_for(2, 8), Err(TrimError::Config(_))));
        assert!(matches!(strategy.validate_for(3, 7), Err(TrimError::Config(_))));
    }

    #[test]
    fn test_explicit_selection_from_json() {
        let json = r#"{"selection": {"mode": "explicit", "remove": [0, 4]}, "sequence_filter": {"explicit": [1]}}"#;
        let strategy: Strategy = serde_json::from_str(json).unwrap();

        assert_eq!(strategy.selection, ColumnSelection::Explicit { remove: vec![0, 4] });
        assert_eq!(strategy.sequence_filter, Some(SequenceFilter::Explicit(vec![1])));
        assert!(strategy.validate().is_ok());
    }

    #[test]
    fn test_block_size_defaults() {
        assert_eq!(Heuristic::Strict.default_block_size(1000), Some(5));
        assert_eq!(Heuristic::StrictPlus.default_block_size(100), Some(3));
        assert_eq!(Heuristic::StrictPlus.default_block_size(750), Some(8));
        assert_eq!(Heuristic::StrictPlus.default_block_size(5000), Some(12));
        assert_eq!(Heuristic::GappyOut.default_block_size(1000), None);

        let strategy = Strategy::automated(Heuristic::Strict).with_block_size(2);
        assert_eq!(
            strategy.effective_block_size(Some(Heuristic::Strict), 100),
            Some(2)
        );
    }

    #[test]
    fn test_json_round_trip_with_defaults() {
        let json = r#"{"selection": {"mode": "automated", "heuristic": "strictplus"}, "block_size": 4}"#;
        let strategy: Strategy = serde_json::from_str(json).unwrap();

        assert_eq!(strategy.heuristic(), Some(Heuristic::StrictPlus));
        assert_eq!(strategy.block_size, Some(4));
        assert_eq!(strategy.max_overlap_passes, DEFAULT_MAX_OVERLAP_PASSES);
        assert!(!strategy.complementary);
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::with_suffix(".json").unwrap();
        writeln!(
            file,
            r#"{{"selection": {{"mode": "manual", "gap_threshold": 0.4, "conservation_threshold": null}}, "sequence_filter": {{"max_identity": 0.9}}}}"#
        )
        .unwrap();

        let strategy = Strategy::load_from_file(file.path()).unwrap();
        assert_eq!(
            strategy.selection,
            ColumnSelection::Manual {
                gap_threshold: Some(0.4),
                conservation_threshold: None
            }
        );
        assert_eq!(
            strategy.sequence_filter,
            Some(SequenceFilter::MaxIdentity(0.9))
        );
    }
}
