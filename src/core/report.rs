use serde::{Deserialize, Serialize};

use crate::trimming::strategy::Heuristic;

/// Decision record for one original column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDecision {
    pub index: usize,
    pub gap_fraction: f64,
    /// `None` for columns without any residue
    pub conservation: Option<f64>,
    /// Cross-alignment consistency, when scores were supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency: Option<f64>,
    pub kept: bool,
}

/// Why a sequence was dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemovalReason {
    /// Exceeded the identity threshold against `partner`
    MaxIdentity { partner: usize, identity: f64 },
    /// Member of a cluster represented by `representative`
    Clustered { representative: usize },
    /// Covered too few good columns
    LowOverlap { overlap: f64 },
    /// Only gaps remained in the kept columns
    AllGaps,
    /// Listed for removal by index
    Selected,
}

/// Decision record for one original sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceDecision {
    pub index: usize,
    pub name: String,
    pub kept: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RemovalReason>,
}

/// Read-only trace of a trimming run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimmingReport {
    pub columns: Vec<ColumnDecision>,
    pub sequences: Vec<SequenceDecision>,

    /// Heuristic actually applied (automated1 reports what it resolved to)
    pub heuristic: Option<Heuristic>,

    /// Gap cutoff applied after any conserve-floor relaxation
    pub gap_cutoff: Option<f64>,

    /// Conservation cutoff applied after any conserve-floor relaxation
    pub conservation_cutoff: Option<f64>,

    /// Consistency cutoff, present only when trimming by consistency scores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency_cutoff: Option<f64>,

    /// Overlap passes run, zero when overlap filtering was off
    pub overlap_passes: usize,

    /// Output holds the rejected columns instead of the kept ones
    pub complementary: bool,
}

impl TrimmingReport {
    /// Per-column kept flags over the original columns
    #[must_use]
    pub fn keep_mask(&self) -> Vec<bool> {
        self.columns.iter().map(|c| c.kept).collect()
    }

    /// Per-column flags of what was written out, honoring complementary mode
    #[must_use]
    pub fn output_mask(&self) -> Vec<bool> {
        self.columns
            .iter()
            .map(|c| c.kept != self.complementary)
            .collect()
    }

    /// Per-sequence kept flags over the original sequences
    #[must_use]
    pub fn sequence_mask(&self) -> Vec<bool> {
        self.sequences.iter().map(|s| s.kept).collect()
    }

    #[must_use]
    pub fn kept_columns(&self) -> usize {
        self.columns.iter().filter(|c| c.kept).count()
    }

    #[must_use]
    pub fn removed_columns(&self) -> usize {
        self.columns.len() - self.kept_columns()
    }

    #[must_use]
    pub fn kept_sequences(&self) -> usize {
        self.sequences.iter().filter(|s| s.kept).count()
    }

    /// Original indices of the kept columns
    #[must_use]
    pub fn kept_indices(&self) -> Vec<usize> {
        self.columns
            .iter()
            .filter(|c| c.kept)
            .map(|c| c.index)
            .collect()
    }
}
