//! Column and sequence trimming.
//!
//! | Piece | Role |
//! |-------|------|
//! | [`Strategy`] | What to trim: manual thresholds or a heuristic, plus tweaks |
//! | [`heuristics`] | Pure cutoff policies over column statistics |
//! | [`mask`] | Rescue, block and terminal-only transforms over keep masks |
//! | [`Cleaner`] | Runs a strategy against one alignment |
//! | [`backtranslate`](backtranslate::backtranslate) | Projects a protein trim onto coding sequences |

pub mod backtranslate;
pub mod cleaner;
pub mod heuristics;
pub mod mask;
pub mod strategy;

pub use backtranslate::{backtranslate, backtranslate_report};
pub use cleaner::{Cleaner, TrimOutcome};
pub use heuristics::{IdentitySummary, Policy};
pub use strategy::{ColumnSelection, Heuristic, SequenceFilter, Strategy};
