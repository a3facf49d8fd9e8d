//! PHYLIP alignments.
//!
//! The header line holds the sequence and column counts. The first block
//! carries one `name residues` line per sequence; in the interleaved layout
//! later blocks continue the rows round-robin without names. Whitespace
//! inside residue runs is ignored and names are relaxed (any length, no
//! spaces).

use std::io::{self, BufRead, Write};

use crate::core::alignment::{Alignment, Sequence};
use crate::formats::{AlignmentFormat, FormatError, FormatHandler};
use crate::utils::validation::check_sequence_limit;

/// Minimum width of the name field on output
pub const NAME_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct PhylipFormat;

fn invalid(message: impl Into<String>) -> FormatError {
    FormatError::InvalidFormat {
        format: AlignmentFormat::Phylip,
        message: message.into(),
    }
}

fn parse_header(line: &str) -> Result<(usize, usize), FormatError> {
    let mut fields = line.split_whitespace();
    let mut number = |what: &str| {
        fields
            .next()
            .and_then(|f| f.parse::<usize>().ok())
            .ok_or_else(|| invalid(format!("header is missing the {what} count: '{line}'")))
    };
    let sequences = number("sequence")?;
    let columns = number("column")?;
    Ok((sequences, columns))
}

impl FormatHandler for PhylipFormat {
    fn parse(&self, reader: &mut dyn BufRead) -> Result<Alignment, FormatError> {
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }

        let Some((header, body)) = lines.split_first() else {
            return Err(invalid("empty input"));
        };
        let (num_sequences, num_columns) = parse_header(header)?;
        if num_sequences == 0 || num_columns == 0 {
            return Err(invalid(format!(
                "header declares {num_sequences} sequences of {num_columns} columns"
            )));
        }
        if let Some(message) = check_sequence_limit(num_sequences.saturating_sub(1)) {
            return Err(invalid(message));
        }
        if body.len() < num_sequences {
            return Err(invalid(format!(
                "expected {num_sequences} sequences, found {} lines",
                body.len()
            )));
        }

        let mut names = Vec::with_capacity(num_sequences);
        let mut residues: Vec<Vec<u8>> = Vec::with_capacity(num_sequences);
        for line in &body[..num_sequences] {
            let trimmed = line.trim_start();
            let (name, rest) = trimmed
                .split_once(char::is_whitespace)
                .unwrap_or((trimmed, ""));
            names.push(name.to_string());
            residues.push(rest.bytes().filter(|b| !b.is_ascii_whitespace()).collect());
        }

        for (i, line) in body[num_sequences..].iter().enumerate() {
            residues[i % num_sequences].extend(line.bytes().filter(|b| !b.is_ascii_whitespace()));
        }

        for (name, row) in names.iter().zip(&residues) {
            if row.len() != num_columns {
                return Err(invalid(format!(
                    "sequence '{name}' has {} columns, header declares {num_columns}",
                    row.len()
                )));
            }
        }

        let sequences = names
            .into_iter()
            .zip(residues)
            .map(|(name, row)| Sequence::new(name, row))
            .collect();
        Ok(Alignment::new(sequences)?)
    }

    fn serialize(&self, alignment: &Alignment, writer: &mut dyn Write) -> io::Result<()> {
        let width = alignment
            .names()
            .map(|name| name.len() + 1)
            .max()
            .unwrap_or(0)
            .max(NAME_WIDTH);

        writeln!(writer, " {} {}", alignment.num_sequences(), alignment.num_columns())?;
        for seq in alignment.sequences() {
            write!(writer, "{:<width$}", seq.name)?;
            writer.write_all(&seq.residues)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Alignment, FormatError> {
        PhylipFormat.parse(&mut text.as_bytes())
    }

    #[test]
    fn test_parse_sequential() {
        let alignment = parse(" 2 6\nalpha     MKV-LA\nbeta      MKVQLA\n").unwrap();

        assert_eq!(alignment.num_sequences(), 2);
        assert_eq!(alignment.sequences()[0].name, "alpha");
        assert_eq!(alignment.sequences()[0].residues, b"MKV-LA".to_vec());
    }

    #[test]
    fn test_parse_interleaved() {
        let text = "2 10\nalpha MKV-L\nbeta  MKVQL\n\nAGHIK\nAGH-K\n";
        let alignment = parse(text).unwrap();

        assert_eq!(alignment.num_columns(), 10);
        assert_eq!(alignment.sequences()[0].residues, b"MKV-LAGHIK".to_vec());
        assert_eq!(alignment.sequences()[1].residues, b"MKVQLAGH-K".to_vec());
    }

    #[test]
    fn test_parse_spaced_residues() {
        let alignment = parse("1 8\nseq MKVL AGHI\n").unwrap();
        assert_eq!(alignment.sequences()[0].residues, b"MKVLAGHI".to_vec());
    }

    #[test]
    fn test_column_count_mismatch() {
        assert!(matches!(
            parse("2 5\na MKV\nb MKV\n"),
            Err(FormatError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_bad_header() {
        assert!(parse("two 5\na MKVLA\n").is_err());
        assert!(parse("").is_err());
        assert!(parse("3 5\na MKVLA\n").is_err());
    }

    #[test]
    fn test_serialize_pads_names() {
        let alignment = Alignment::new(vec![
            Sequence::new("a", "MK-V"),
            Sequence::new("a_very_long_name", "MKLV"),
        ])
        .unwrap();

        let mut out = Vec::new();
        PhylipFormat.serialize(&alignment, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], " 2 4");
        assert_eq!(lines[1], format!("{:<17}MK-V", "a"));
        assert_eq!(lines[2], "a_very_long_name MKLV");
    }
}
