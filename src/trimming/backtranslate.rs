//! Map a trimmed protein alignment back onto its coding sequences.
//!
//! Every protein column becomes three nucleotide columns. Residues consume the
//! next codon of the unaligned CDS; gaps emit `---`. Trailing CDS bases past
//! the last residue (typically a stop codon) are ignored.

use std::collections::HashMap;

use crate::core::alignment::{Alignment, Sequence};
use crate::core::error::{EmptyAxis, TrimError};
use crate::core::report::TrimmingReport;
use crate::core::types::{ResidueType, GAP};

const CODON: usize = 3;

/// Backtranslate the rows and columns selected by `report`.
///
/// # Errors
///
/// See [`backtranslate`].
pub fn backtranslate_report(
    protein: &Alignment,
    report: &TrimmingReport,
    cds: &[Sequence],
) -> Result<Alignment, TrimError> {
    backtranslate(protein, &report.sequence_mask(), &report.output_mask(), cds)
}

/// Build a codon alignment for the selected protein rows and columns.
///
/// `cds` is looked up by sequence name; any gaps it carries are dropped first.
///
/// # Errors
///
/// - `TrimError::Config` when a mask does not match the alignment shape
/// - `TrimError::IncompatibleSet` when a kept sequence has no coding sequence
/// - `TrimError::InvalidAlignment` when a coding sequence is too short
/// - `TrimError::EmptyResult` when no rows are selected
pub fn backtranslate(
    protein: &Alignment,
    rows: &[bool],
    columns: &[bool],
    cds: &[Sequence],
) -> Result<Alignment, TrimError> {
    if rows.len() != protein.num_sequences() || columns.len() != protein.num_columns() {
        return Err(TrimError::Config(format!(
            "mask shape {}x{} does not match alignment {}x{}",
            rows.len(),
            columns.len(),
            protein.num_sequences(),
            protein.num_columns()
        )));
    }
    if !rows.iter().any(|&r| r) {
        return Err(TrimError::EmptyResult(EmptyAxis::Sequence));
    }

    let by_name: HashMap<&str, &Sequence> = cds.iter().map(|s| (s.name.as_str(), s)).collect();

    let codon_rows = protein
        .sequences()
        .iter()
        .zip(rows)
        .filter(|(_, &keep)| keep)
        .map(|(seq, _)| {
            let coding = by_name.get(seq.name.as_str()).ok_or_else(|| {
                TrimError::IncompatibleSet(format!("no coding sequence named '{}'", seq.name))
            })?;
            expand(seq, &coding.ungapped()).map(|residues| Sequence {
                name: seq.name.clone(),
                residues,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let codons = Alignment::with_residue_type(codon_rows, ResidueType::Codon)?;
    let codon_columns: Vec<bool> = columns
        .iter()
        .flat_map(|&keep| [keep; CODON])
        .collect();
    Ok(codons.select(&vec![true; codons.num_sequences()], &codon_columns))
}

fn expand(protein: &Sequence, coding: &[u8]) -> Result<Vec<u8>, TrimError> {
    let residues = protein.len() - protein.gap_count();
    if coding.len() < residues * CODON {
        return Err(TrimError::InvalidAlignment(format!(
            "coding sequence '{}' has {} bases, {} needed for {} residues",
            protein.name,
            coding.len(),
            residues * CODON,
            residues
        )));
    }

    let mut codons = coding.chunks_exact(CODON);
    let mut expanded = Vec::with_capacity(protein.len() * CODON);
    for &symbol in &protein.residues {
        if symbol == GAP {
            expanded.extend_from_slice(&[GAP; CODON]);
        } else if let Some(codon) = codons.next() {
            expanded.extend(codon.iter().map(u8::to_ascii_uppercase));
        }
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protein() -> Alignment {
        Alignment::new(vec![
            Sequence::new("a", "MK-L"),
            Sequence::new("b", "M-WL"),
        ])
        .unwrap()
    }

    fn cds() -> Vec<Sequence> {
        vec![
            Sequence::new("b", "ATGTGGCTGTAA"),
            Sequence::new("a", "atgaaacttTAG"),
        ]
    }

    #[test]
    fn test_backtranslate_all_columns() {
        let codons = backtranslate(&protein(), &[true, true], &[true; 4], &cds()).unwrap();

        assert_eq!(codons.residue_type(), ResidueType::Codon);
        assert_eq!(codons.num_columns(), 12);
        assert_eq!(codons.sequences()[0].residues, b"ATGAAA---CTT".to_vec());
        assert_eq!(codons.sequences()[1].residues, b"ATG---TGGCTG".to_vec());
    }

    #[test]
    fn test_backtranslate_selected_columns_and_rows() {
        let codons = backtranslate(&protein(), &[false, true], &[true, false, false, true], &cds())
            .unwrap();

        assert_eq!(codons.num_sequences(), 1);
        assert_eq!(codons.sequences()[0].residues, b"ATGCTG".to_vec());
    }

    #[test]
    fn test_missing_coding_sequence() {
        let cds = vec![Sequence::new("a", "ATGAAACTT")];
        let result = backtranslate(&protein(), &[true, true], &[true; 4], &cds);

        assert!(matches!(result, Err(TrimError::IncompatibleSet(_))));
    }

    #[test]
    fn test_short_coding_sequence() {
        let cds = vec![Sequence::new("a", "ATGAAACTT"), Sequence::new("b", "ATGTGG")];
        let result = backtranslate(&protein(), &[true, true], &[true; 4], &cds);

        assert!(matches!(result, Err(TrimError::InvalidAlignment(_))));
    }

    #[test]
    fn test_mask_shape_checked() {
        let result = backtranslate(&protein(), &[true], &[true; 4], &cds());
        assert!(matches!(result, Err(TrimError::Config(_))));
    }
}
