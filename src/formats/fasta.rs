//! FASTA alignments via noodles.
//!
//! Every record becomes one row. The name is the text up to the first
//! whitespace of the definition line; descriptions are dropped.

use std::io::{self, BufRead, Write};

use noodles::fasta;

use crate::core::alignment::{Alignment, Sequence};
use crate::formats::{AlignmentFormat, FormatError, FormatHandler};
use crate::utils::validation::check_sequence_limit;

/// Residues per output line
pub const LINE_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, Default)]
pub struct FastaFormat;

impl FormatHandler for FastaFormat {
    fn parse(&self, reader: &mut dyn BufRead) -> Result<Alignment, FormatError> {
        let sequences = read_records(reader)?;
        Ok(Alignment::new(sequences)?)
    }

    fn serialize(&self, alignment: &Alignment, writer: &mut dyn Write) -> io::Result<()> {
        for seq in alignment.sequences() {
            writeln!(writer, ">{}", seq.name)?;
            for line in seq.residues.chunks(LINE_WIDTH) {
                writer.write_all(line)?;
                writer.write_all(b"\n")?;
            }
        }
        Ok(())
    }
}

/// Read every record without requiring equal lengths.
///
/// # Errors
///
/// Returns `FormatError::Noodles` if a record is malformed,
/// `FormatError::TooManySequences` past the sequence limit, or
/// `FormatError::InvalidFormat` when there are no records.
pub fn read_records(reader: &mut dyn BufRead) -> Result<Vec<Sequence>, FormatError> {
    let mut fasta_reader = fasta::io::Reader::new(reader);
    let mut sequences = Vec::new();

    for result in fasta_reader.records() {
        let record = result
            .map_err(|e| FormatError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

        if check_sequence_limit(sequences.len()).is_some() {
            return Err(FormatError::TooManySequences(sequences.len()));
        }

        let name = String::from_utf8_lossy(record.name()).to_string();
        sequences.push(Sequence::new(name, record.sequence().as_ref()));
    }

    if sequences.is_empty() {
        return Err(FormatError::InvalidFormat {
            format: AlignmentFormat::Fasta,
            message: "No sequences found".to_string(),
        });
    }

    Ok(sequences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::TrimError;
    use crate::core::types::ResidueType;

    fn parse(text: &str) -> Result<Alignment, FormatError> {
        FastaFormat.parse(&mut text.as_bytes())
    }

    #[test]
    fn test_parse_multiline_records() {
        let alignment = parse(">seq1 some description\nAC-G\ntT\n>seq2\nACAG\n.T\n").unwrap();

        assert_eq!(alignment.num_sequences(), 2);
        assert_eq!(alignment.num_columns(), 6);
        assert_eq!(alignment.sequences()[0].name, "seq1");
        assert_eq!(alignment.sequences()[0].residues, b"AC-GTT".to_vec());
        // '.' is folded into a gap
        assert_eq!(alignment.sequences()[1].residues, b"ACAG-T".to_vec());
        assert_eq!(alignment.residue_type(), ResidueType::Nucleotide);
    }

    #[test]
    fn test_parse_ragged_alignment() {
        let result = parse(">a\nACGT\n>b\nACG\n");
        assert!(matches!(
            result,
            Err(FormatError::Alignment(TrimError::InvalidAlignment(_)))
        ));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(parse(""), Err(FormatError::InvalidFormat { .. })));
    }

    #[test]
    fn test_serialize_wraps_lines() {
        let residues = "A".repeat(LINE_WIDTH + 5);
        let alignment = Alignment::new(vec![Sequence::new("long", &residues)]).unwrap();

        let mut out = Vec::new();
        FastaFormat.serialize(&alignment, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ">long");
        assert_eq!(lines[1].len(), LINE_WIDTH);
        assert_eq!(lines[2], "AAAAA");
    }
}
