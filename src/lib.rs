//! # msa-trim
//!
//! A library for trimming multiple sequence alignments before phylogenetic analysis.
//!
//! Alignments produced by aligners contain columns that are mostly gaps or
//! poorly conserved, and sequence sets often carry near-duplicates. Both add
//! noise to downstream tree inference. `msa-trim` scores every column and
//! sequence and removes the ones that do not meet a trimming strategy.
//!
//! ## Features
//!
//! - **Manual thresholds**: Keep columns by gap fraction, conservation and consistency
//! - **Explicit selection**: Remove listed columns or sequences by index
//! - **Automated heuristics**: nogaps, noallgaps, gappyout, strict, strictplus, automated1
//! - **Sequence filtering**: Maximum identity, identity clustering, overlap with good columns
//! - **Tweaks**: Terminal-only trimming, block size, complementary output, conserve floor
//! - **Consistency**: Pick the most consistent of several alternative alignments
//! - **Backtranslation**: Carry a protein trim over to the coding sequences
//!
//! ## Example
//!
//! ```rust
//! use msa_trim::{Alignment, Cleaner, Heuristic, Sequence, Strategy};
//!
//! let alignment = Alignment::new(vec![
//!     Sequence::new("human", "MKV-LAGH"),
//!     Sequence::new("mouse", "MKVQLAGH"),
//!     Sequence::new("fly",   "MRV-LSGH"),
//! ]).unwrap();
//!
//! let outcome = Cleaner::new(&alignment, Strategy::manual(Some(0.5), None))
//!     .run()
//!     .unwrap();
//! assert_eq!(outcome.alignment.num_columns(), 7);
//!
//! let automated = Cleaner::new(&alignment, Strategy::automated(Heuristic::NoGaps)).run().unwrap();
//! assert_eq!(automated.report.kept_columns(), 7);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Alignment model, errors and trimming reports
//! - [`statistics`]: Gap, conservation and identity statistics
//! - [`trimming`]: Strategies, heuristics and the [`Cleaner`] engine
//! - [`consistency`]: Cross-alignment consistency scoring
//! - [`formats`]: FASTA and PHYLIP readers and writers
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod consistency;
pub mod core;
pub mod formats;
pub mod statistics;
pub mod trimming;
pub mod utils;

// Re-export commonly used types for convenience
pub use crate::core::{Alignment, EmptyAxis, ResidueType, Sequence, TrimError, TrimmingReport};
pub use consistency::{compare_alignments, ComparisonResult};
pub use statistics::SimilarityMatrix;
pub use trimming::{Cleaner, ColumnSelection, Heuristic, SequenceFilter, Strategy, TrimOutcome};
