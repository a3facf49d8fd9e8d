//! Core data types for alignment trimming.
//!
//! - [`Alignment`] / [`Sequence`]: the rectangular residue matrix, immutable once built
//! - [`ResidueType`]: protein, nucleotide or codon alphabet tag
//! - [`TrimError`]: failure kinds returned by every core operation
//! - [`TrimmingReport`]: per-column and per-sequence decision trace
//!
//! ## Symbols
//!
//! | Symbol | Meaning |
//! |--------|---------|
//! | `-`    | gap (`.` and `~` are folded into it) |
//! | `X`    | indeterminate protein residue |
//! | `N`    | indeterminate nucleotide |
//! | `?`    | indeterminate in either alphabet |
//!
//! Residues are stored uppercase.

pub mod alignment;
pub mod error;
pub mod report;
pub mod types;

pub use alignment::{Alignment, Sequence};
pub use error::{EmptyAxis, TrimError};
pub use report::{ColumnDecision, RemovalReason, SequenceDecision, TrimmingReport};
pub use types::ResidueType;
