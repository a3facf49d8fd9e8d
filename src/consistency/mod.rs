//! Consistency scoring across alternative alignments of one sequence set.
//!
//! Each candidate is scored by how often the other candidates place the same
//! residue pairs in a shared column. The best-scoring candidate is the one a
//! trimming run should start from.
//!
//! ```rust
//! use msa_trim::core::{Alignment, Sequence};
//! use msa_trim::consistency::compare_alignments;
//!
//! let aln = Alignment::new(vec![
//!     Sequence::new("a", "MKV-LA"),
//!     Sequence::new("b", "MKVQLA"),
//! ]).unwrap();
//! let result = compare_alignments(&[aln.clone(), aln]).unwrap();
//! assert_eq!(result.best, 0);
//! ```

pub mod compare;

pub use compare::{compare_alignments, ComparisonResult};
